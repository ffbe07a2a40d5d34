//! Offline capture source backed by libpcap.
//!
//! [`PcapReader`] opens a capture file through [`pcap::Capture`], optionally
//! narrows it with a BPF filter, and lends out one [`CapturedFrame`] at a time.
//! Frames borrow libpcap's buffer, so reading does not allocate per frame.

use std::fmt;
use std::path::Path;

use pcap::{Capture, Linktype, Offline};
use tracing::debug;

/// Frames claiming more captured bytes than this are refused, whatever
/// snap length the file header advertises.
pub const MAX_RECORD_LEN: u32 = 256 * 1024;

/// Link type of Ethernet captures.
pub const LINKTYPE_ETHERNET: Linktype = Linktype::ETHERNET;

#[derive(Debug)]
pub enum CaptureError {
    /// libpcap rejected the file, the filter, or a record.
    Pcap(pcap::Error),
    /// A frame claims more captured bytes than [`MAX_RECORD_LEN`].
    RecordTooLarge { len: u32, limit: u32 },
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Pcap(err) => write!(f, "capture failed: {}", err),
            CaptureError::RecordTooLarge { len, limit } => {
                write!(f, "record of {} bytes exceeds limit of {}", len, limit)
            },
        }
    }
}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptureError::Pcap(err) => Some(err),
            CaptureError::RecordTooLarge { .. } => None,
        }
    }
}

impl From<pcap::Error> for CaptureError {
    fn from(err: pcap::Error) -> Self {
        CaptureError::Pcap(err)
    }
}

/// One captured frame, borrowed from the reader until the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturedFrame<'a> {
    pub timestamp_secs: u64,
    pub timestamp_nanos: u32,
    /// Length of the frame on the wire; `data` may be shorter.
    pub orig_len: u32,
    pub data: &'a [u8],
}

/// Streaming reader over a pcap file.
///
/// ```no_run
/// use flowtop::capture::PcapReader;
///
/// let mut reader = PcapReader::open("trace.pcap")?;
/// reader.set_filter("ip")?;
/// while let Some(frame) = reader.next_frame()? {
///     println!("{} {} bytes", frame.timestamp_secs, frame.data.len());
/// }
/// # Ok::<(), flowtop::capture::CaptureError>(())
/// ```
pub struct PcapReader {
    capture: Capture<Offline>,
}

impl PcapReader {
    /// Opens a capture file and validates its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let capture = Capture::from_file(path)?;
        Ok(Self { capture })
    }

    /// Compiles `expr` as a BPF program and keeps only matching frames.
    pub fn set_filter(&mut self, expr: &str) -> Result<(), CaptureError> {
        self.capture.filter(expr, true)?;
        debug!(filter = expr, "capture filter installed");
        Ok(())
    }

    pub fn link_type(&self) -> Linktype {
        self.capture.get_datalink()
    }

    /// File format version as `(major, minor)`.
    pub fn version(&self) -> (i32, i32) {
        self.capture.version()
    }

    /// Reads the next frame. `Ok(None)` at a clean end of file.
    pub fn next_frame(&mut self) -> Result<Option<CapturedFrame<'_>>, CaptureError> {
        let packet = match self.capture.next_packet() {
            Ok(packet) => packet,
            Err(pcap::Error::NoMorePackets) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let header = packet.header;
        if header.caplen > MAX_RECORD_LEN {
            return Err(CaptureError::RecordTooLarge {
                len: header.caplen,
                limit: MAX_RECORD_LEN,
            });
        }

        let micros = u32::try_from(header.ts.tv_usec).unwrap_or(0);
        Ok(Some(CapturedFrame {
            timestamp_secs: u64::try_from(header.ts.tv_sec).unwrap_or(0),
            timestamp_nanos: micros.saturating_mul(1_000),
            orig_len: header.len,
            data: packet.data,
        }))
    }
}

impl fmt::Debug for PcapReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcapReader")
            .field("link_type", &self.link_type())
            .field("version", &self.version())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use tempfile::TempDir;

    const MAGIC_MICROS: u32 = 0xa1b2_c3d4;

    fn global_header(snaplen: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC_MICROS.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&4u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&snaplen.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        out
    }

    fn record_header(ts: u32, usec: u32, incl_len: u32, orig_len: u32) -> Vec<u8> {
        [ts, usec, incl_len, orig_len]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect()
    }

    fn record(ts: u32, usec: u32, data: &[u8]) -> Vec<u8> {
        let len = data.len() as u32;
        let mut out = record_header(ts, usec, len, len + 4);
        out.extend_from_slice(data);
        out
    }

    fn write_capture(bytes: &[u8]) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("trace.pcap");
        std::fs::write(&path, bytes).expect("Failed to write capture");
        (dir, path)
    }

    #[test]
    fn reads_microsecond_file() {
        let mut bytes = global_header(65535);
        bytes.extend(record(100, 250, b"abc"));
        bytes.extend(record(101, 0, b"de"));
        let (_dir, path) = write_capture(&bytes);

        let mut reader = PcapReader::open(&path).unwrap();
        assert_eq!(reader.link_type(), LINKTYPE_ETHERNET);
        assert_eq!(reader.version(), (2, 4));

        let first = reader.next_frame().unwrap().unwrap();
        assert_eq!(first.timestamp_secs, 100);
        assert_eq!(first.timestamp_nanos, 250_000);
        assert_eq!(first.orig_len, 7);
        assert_eq!(first.data, b"abc");

        let second = reader.next_frame().unwrap().unwrap();
        assert_eq!(second.data, b"de");
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn rejects_unknown_magic() {
        let mut bytes = global_header(65535);
        bytes[..4].copy_from_slice(&0xdead_beefu32.to_le_bytes());
        let (_dir, path) = write_capture(&bytes);
        assert!(matches!(PcapReader::open(&path), Err(CaptureError::Pcap(_))));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        assert!(PcapReader::open(dir.path().join("absent.pcap")).is_err());
    }

    #[test]
    fn truncated_trailing_record_is_an_error() {
        let mut bytes = global_header(65535);
        bytes.extend(record(1, 0, b"complete"));
        let mut tail = record(2, 0, b"cut short");
        tail.truncate(16 + 3);
        bytes.extend(tail);
        let (_dir, path) = write_capture(&bytes);

        let mut reader = PcapReader::open(&path).unwrap();
        assert_eq!(reader.next_frame().unwrap().unwrap().data, b"complete");
        assert!(reader.next_frame().is_err());
    }

    #[test]
    fn hostile_snaplen_does_not_lift_record_limit() {
        let mut bytes = global_header(u32::MAX);
        bytes.extend(record_header(0, 0, 0xC000_0000, 0xC000_0000));
        let (_dir, path) = write_capture(&bytes);

        let mut reader = PcapReader::open(&path).unwrap();
        let err = reader.next_frame().unwrap_err();
        assert!(matches!(
            err,
            CaptureError::Pcap(_) | CaptureError::RecordTooLarge { .. }
        ));
    }

    #[test]
    fn oversized_record_is_refused() {
        let mut bytes = global_header(64);
        bytes.extend(record_header(0, 0, MAX_RECORD_LEN + 1, MAX_RECORD_LEN + 1));
        let (_dir, path) = write_capture(&bytes);

        let mut reader = PcapReader::open(&path).unwrap();
        assert!(reader.next_frame().is_err());
    }

    #[test]
    fn filter_keeps_matching_frames() {
        use crate::flow::tests::frame;

        let ip = frame(&[0x08, 0x00], [10, 0, 0, 1], [10, 0, 0, 2], 84);
        let arp = frame(&[0x08, 0x06], [10, 0, 0, 3], [10, 0, 0, 4], 84);
        let mut bytes = global_header(65535);
        bytes.extend(record(1, 0, &arp));
        bytes.extend(record(2, 0, &ip));
        let (_dir, path) = write_capture(&bytes);

        let mut reader = PcapReader::open(&path).unwrap();
        reader.set_filter("ip").unwrap();
        let only = reader.next_frame().unwrap().unwrap();
        assert_eq!(only.timestamp_secs, 2);
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn invalid_filter_is_an_error() {
        let (_dir, path) = write_capture(&global_header(65535));
        let mut reader = PcapReader::open(&path).unwrap();
        assert!(matches!(
            reader.set_filter("not a ( filter"),
            Err(CaptureError::Pcap(_))
        ));
    }

    #[test]
    fn decodes_captured_frames() {
        use crate::flow::{decode_ipv4, tests::frame};

        let frame = frame(&[0x08, 0x00], [10, 0, 0, 1], [10, 0, 0, 2], 84);
        let mut bytes = global_header(65535);
        bytes.extend(record(1, 0, &frame));
        let (_dir, path) = write_capture(&bytes);

        let mut reader = PcapReader::open(&path).unwrap();
        let captured = reader.next_frame().unwrap().unwrap();
        let flow = decode_ipv4(captured.data).unwrap();
        assert_eq!(flow.directed_key(), "10.0.0.1->10.0.0.2");
    }
}
