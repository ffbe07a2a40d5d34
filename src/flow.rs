//! Ethernet frame to IPv4 flow decoding.
//!
//! ```text
//!   | dst MAC (6) | src MAC (6) | type (2) | ... | IPv4 header (20+) |
//!                               │
//!                               ├─ <= 1500  802.3 length, LLC/SNAP follows
//!                               ├─ 0x8100   VLAN tag: TCI (2), type (2)
//!                               └─ 0x0800   IPv4
//! ```
//!
//! Only the IPv4 header fields needed for keying are read: total length and
//! the two addresses. Options and payload may be cut off by the snap length.

use std::fmt;
use std::net::Ipv4Addr;

use crate::tracker::Directional;

/// Smallest frame that can carry a MAC pair, an ethertype and an IPv4 header.
pub const MIN_FRAME_LEN: usize = 12 + 2 + 20;

const ETHERTYPE_OFFSET: usize = 12;
const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_VLAN: u16 = 0x8100;
/// Largest 802.3 length field; anything above is an ethertype.
const MAX_8023_LENGTH: u16 = 1500;
/// Length field (2) plus DSAP, SSAP, control (3) plus SNAP OUI (3).
const LLC_SNAP_SKIP: usize = 8;
const IPV4_HEADER_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The frame ended before a required field.
    Truncated { needed: usize, len: usize },
    /// The innermost ethertype is not IPv4.
    UnsupportedEtherType(u16),
    /// IPv4 ethertype but the header's version nibble is not 4.
    BadVersion(u8),
    /// Header length below the 5-word minimum.
    BadHeaderLength(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated { needed, len } => {
                write!(f, "frame truncated: need {} bytes, have {}", needed, len)
            },
            DecodeError::UnsupportedEtherType(ty) => {
                write!(f, "unsupported ethertype 0x{:04x}", ty)
            },
            DecodeError::BadVersion(v) => write!(f, "IPv4 ethertype with IP version {}", v),
            DecodeError::BadHeaderLength(ihl) => {
                write!(f, "IPv4 header length of {} words is below 5", ihl)
            },
        }
    }
}

impl std::error::Error for DecodeError {}

/// Addresses and size of one IPv4 datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Flow {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    /// IPv4 total length: header plus payload, excluding the frame.
    pub total_length: u16,
    /// VLAN ID of the innermost tag, if the frame was tagged.
    pub vlan: Option<u16>,
}

impl Ipv4Flow {
    /// `"src->dst"`, e.g. `"10.0.0.1->10.0.0.2"`.
    pub fn directed_key(&self) -> String {
        format!("{}->{}", self.src, self.dst)
    }

    /// Direction-independent key `"lo<->hi"` and the weight of this datagram
    /// on the matching side.
    ///
    /// ```
    /// use flowtop::flow::Ipv4Flow;
    /// use flowtop::tracker::Directional;
    ///
    /// let reply = Ipv4Flow {
    ///     src: [10, 0, 0, 9].into(),
    ///     dst: [10, 0, 0, 1].into(),
    ///     total_length: 60,
    ///     vlan: None,
    /// };
    /// let (key, weight) = reply.canonical();
    /// assert_eq!(key, "10.0.0.1<->10.0.0.9");
    /// assert_eq!(weight, Directional::reverse_only(60));
    /// ```
    pub fn canonical(&self) -> (String, Directional) {
        let amount = u64::from(self.total_length);
        if self.src <= self.dst {
            (
                format!("{}<->{}", self.src, self.dst),
                Directional::forward_only(amount),
            )
        } else {
            (
                format!("{}<->{}", self.dst, self.src),
                Directional::reverse_only(amount),
            )
        }
    }
}

#[inline]
fn read_u16(frame: &[u8], at: usize) -> Result<u16, DecodeError> {
    match frame.get(at..at + 2) {
        Some(bytes) => Ok(u16::from_be_bytes([bytes[0], bytes[1]])),
        None => Err(DecodeError::Truncated {
            needed: at + 2,
            len: frame.len(),
        }),
    }
}

/// Decodes the IPv4 header carried by an Ethernet frame.
pub fn decode_ipv4(frame: &[u8]) -> Result<Ipv4Flow, DecodeError> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(DecodeError::Truncated {
            needed: MIN_FRAME_LEN,
            len: frame.len(),
        });
    }

    let mut type_at = ETHERTYPE_OFFSET;
    let mut vlan = None;
    let ethertype = loop {
        let ethertype = read_u16(frame, type_at)?;
        if ethertype <= MAX_8023_LENGTH {
            type_at += LLC_SNAP_SKIP;
        } else if ethertype == ETHERTYPE_VLAN {
            let tci = read_u16(frame, type_at + 2)?;
            vlan = Some(tci & 0x0fff);
            type_at += 4;
        } else {
            break ethertype;
        }
    };
    if ethertype != ETHERTYPE_IPV4 {
        return Err(DecodeError::UnsupportedEtherType(ethertype));
    }

    let ip_at = type_at + 2;
    let header = frame
        .get(ip_at..ip_at + IPV4_HEADER_LEN)
        .ok_or(DecodeError::Truncated {
            needed: ip_at + IPV4_HEADER_LEN,
            len: frame.len(),
        })?;

    let version = header[0] >> 4;
    if version != 4 {
        return Err(DecodeError::BadVersion(version));
    }
    let ihl = header[0] & 0x0f;
    if ihl < 5 {
        return Err(DecodeError::BadHeaderLength(ihl));
    }

    Ok(Ipv4Flow {
        src: Ipv4Addr::new(header[12], header[13], header[14], header[15]),
        dst: Ipv4Addr::new(header[16], header[17], header[18], header[19]),
        total_length: u16::from_be_bytes([header[2], header[3]]),
        vlan,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds an Ethernet frame: MACs, `tags` (raw bytes after the MACs,
    /// ending in an ethertype), then a minimal IPv4 header.
    pub(crate) fn frame(tags: &[u8], src: [u8; 4], dst: [u8; 4], total_length: u16) -> Vec<u8> {
        let mut out = vec![0xaa; 6];
        out.extend_from_slice(&[0xbb; 6]);
        out.extend_from_slice(tags);
        let mut ip = [0u8; 20];
        ip[0] = 0x45;
        ip[2..4].copy_from_slice(&total_length.to_be_bytes());
        ip[9] = 6;
        ip[12..16].copy_from_slice(&src);
        ip[16..20].copy_from_slice(&dst);
        out.extend_from_slice(&ip);
        out
    }

    #[test]
    fn decodes_plain_ipv4() {
        let f = frame(&[0x08, 0x00], [10, 0, 0, 1], [192, 168, 1, 2], 1500);
        let flow = decode_ipv4(&f).unwrap();
        assert_eq!(flow.src, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(flow.dst, Ipv4Addr::new(192, 168, 1, 2));
        assert_eq!(flow.total_length, 1500);
        assert_eq!(flow.vlan, None);
        assert_eq!(flow.directed_key(), "10.0.0.1->192.168.1.2");
    }

    #[test]
    fn decodes_vlan_tagged_frame() {
        let f = frame(&[0x81, 0x00, 0x20, 0x64, 0x08, 0x00], [1, 1, 1, 1], [2, 2, 2, 2], 40);
        let flow = decode_ipv4(&f).unwrap();
        // Priority bits above the 12-bit VID are dropped.
        assert_eq!(flow.vlan, Some(100));
        assert_eq!(flow.total_length, 40);
    }

    #[test]
    fn stacked_vlan_tags_keep_innermost_id() {
        let f = frame(
            &[0x81, 0x00, 0x00, 0x0a, 0x81, 0x00, 0x00, 0x14, 0x08, 0x00],
            [1, 1, 1, 1],
            [2, 2, 2, 2],
            40,
        );
        assert_eq!(decode_ipv4(&f).unwrap().vlan, Some(20));
    }

    #[test]
    fn skips_llc_snap_header() {
        // 802.3 length, DSAP/SSAP/control, zero OUI, then IPv4.
        let tags = [0x00, 0x40, 0xaa, 0xaa, 0x03, 0x00, 0x00, 0x00, 0x08, 0x00];
        let f = frame(&tags, [10, 1, 1, 1], [10, 2, 2, 2], 64);
        let flow = decode_ipv4(&f).unwrap();
        assert_eq!(flow.src, Ipv4Addr::new(10, 1, 1, 1));
        assert_eq!(flow.total_length, 64);
    }

    #[test]
    fn rejects_short_frames() {
        let err = decode_ipv4(&[0u8; 33]).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { needed: 34, len: 33 });
    }

    #[test]
    fn rejects_header_cut_after_vlan_tag() {
        let mut f = frame(&[0x81, 0x00, 0x00, 0x01, 0x08, 0x00], [1; 4], [2; 4], 20);
        f.truncate(36);
        assert!(matches!(
            decode_ipv4(&f),
            Err(DecodeError::Truncated { needed: 38, len: 36 })
        ));
    }

    #[test]
    fn rejects_non_ip_ethertypes() {
        let f = frame(&[0x86, 0xdd], [0; 4], [0; 4], 0);
        assert_eq!(
            decode_ipv4(&f),
            Err(DecodeError::UnsupportedEtherType(0x86dd))
        );
    }

    #[test]
    fn rejects_bad_version_and_header_length() {
        let mut f = frame(&[0x08, 0x00], [0; 4], [0; 4], 20);
        f[14] = 0x65;
        assert_eq!(decode_ipv4(&f), Err(DecodeError::BadVersion(6)));
        f[14] = 0x44;
        assert_eq!(decode_ipv4(&f), Err(DecodeError::BadHeaderLength(4)));
    }

    #[test]
    fn canonical_key_merges_both_directions() {
        let a_to_b = Ipv4Flow {
            src: Ipv4Addr::new(10, 0, 0, 1),
            dst: Ipv4Addr::new(10, 0, 0, 2),
            total_length: 100,
            vlan: None,
        };
        let b_to_a = Ipv4Flow {
            src: a_to_b.dst,
            dst: a_to_b.src,
            total_length: 30,
            vlan: None,
        };

        let (k1, w1) = a_to_b.canonical();
        let (k2, w2) = b_to_a.canonical();
        assert_eq!(k1, k2);
        assert_eq!(k1, "10.0.0.1<->10.0.0.2");
        assert_eq!(w1, Directional::forward_only(100));
        assert_eq!(w2, Directional::reverse_only(30));
    }

    #[test]
    fn decode_error_messages() {
        assert_eq!(
            DecodeError::UnsupportedEtherType(0x0806).to_string(),
            "unsupported ethertype 0x0806"
        );
        assert!(
            DecodeError::Truncated { needed: 34, len: 2 }
                .to_string()
                .contains("need 34")
        );
    }
}
