//! Live leaderboard of the heaviest IPv4 conversations in a capture file, or
//! of the heaviest keys read from stdin.
//!
//! ```text
//! flowtop pcap trace.pcap --cache 10k --top 10 --interval 5 --filter 'tcp'
//! tail -f access.log | awk '{print $7, $10}' | flowtop lines --top 20
//! ```

use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{Level, debug, info, warn};

use flowtop::capture::{LINKTYPE_ETHERNET, PcapReader};
use flowtop::flow::{Ipv4Flow, decode_ipv4};
use flowtop::tracker::{Directional, TopTracker, TrackedEntry, Weight};

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Parser, Debug)]
#[command(
    name = "flowtop",
    about = "Bounded-memory top-K of the heaviest recently active keys",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Diagnostic log level (written to stderr)
    #[arg(long, value_enum, default_value = "warn", global = true)]
    log_level: LogLevel,
}

#[derive(clap::Args, Debug)]
struct TrackerArgs {
    /// Distinct keys remembered at once; accepts k/m/g suffixes
    #[arg(long, default_value = "1000", value_parser = parse_size)]
    cache: usize,

    /// Leaderboard length
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Report interval (capture seconds for pcap, lines for stdin)
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank IPv4 conversations by bytes in a pcap file
    Pcap {
        file: PathBuf,

        #[command(flatten)]
        tracker: TrackerArgs,

        /// Only count frames matching this BPF expression
        #[arg(short, long, value_name = "BPF")]
        filter: Option<String>,

        /// Rank each direction separately instead of merging A->B with B->A
        #[arg(long)]
        directed: bool,
    },
    /// Rank keys read as `<key> [amount]` lines from stdin
    Lines {
        #[command(flatten)]
        tracker: TrackerArgs,
    },
}

/// Parses a count with an optional binary `k`, `m` or `g` suffix.
fn parse_size(text: &str) -> Result<usize, String> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, suffix) = text.split_at(split);
    if digits.is_empty() {
        return Err(format!("could not parse integer in {:?}", text));
    }
    let base: usize = digits
        .parse()
        .map_err(|err| format!("could not parse integer in {:?}: {}", text, err))?;
    let shift = match suffix {
        "" => 0,
        "k" | "K" => 10,
        "m" | "M" => 20,
        "g" | "G" => 30,
        _ => return Err(format!("unknown suffix on integer in {:?}", text)),
    };
    base.checked_mul(1usize << shift)
        .ok_or_else(|| format!("{:?} is too large", text))
}

fn setup_logging(level: &LogLevel) {
    let max_level = match level {
        LogLevel::Off => None,
        LogLevel::Error => Some(Level::ERROR),
        LogLevel::Warn => Some(Level::WARN),
        LogLevel::Info => Some(Level::INFO),
        LogLevel::Debug => Some(Level::DEBUG),
        LogLevel::Trace => Some(Level::TRACE),
    };
    let Some(max_level) = max_level else {
        return;
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(io::stderr)
        .with_target(true)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("flowtop: tracing subscriber already installed");
    }
}

/// Formats the accumulated weight of one leaderboard row.
trait Columns {
    fn columns(&self, out: &mut String);
}

impl Columns for u64 {
    fn columns(&self, out: &mut String) {
        let _ = write!(out, "{}", self);
    }
}

impl Columns for Directional {
    fn columns(&self, out: &mut String) {
        let _ = write!(
            out,
            "{} (fwd {} / rev {})",
            self.total(),
            self.forward,
            self.reverse
        );
    }
}

fn print_top<W, O>(out: &mut O, label: &str, top: &[TrackedEntry<'_, W>]) -> io::Result<()>
where
    W: Weight + Columns,
    O: Write,
{
    let mut line = String::new();
    writeln!(out, "-- {} --", label)?;
    for (rank, entry) in top.iter().enumerate() {
        line.clear();
        entry.totals.columns(&mut line);
        writeln!(out, "{:>3} {}: {}", rank + 1, entry.key_str(), line)?;
    }
    writeln!(out)?;
    out.flush()
}

/// Frame counters printed once the capture is exhausted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CaptureStats {
    frames: u64,
    skipped: u64,
}

/// First report boundary after `now`, on a multiple of `interval`.
fn next_report_after(now: u64, interval: u64) -> u64 {
    (now - now % interval).saturating_add(interval)
}

fn run_pcap(
    file: PathBuf,
    args: TrackerArgs,
    filter: Option<String>,
    directed: bool,
) -> Result<()> {
    let mut reader = PcapReader::open(&file)
        .with_context(|| format!("cannot open capture {}", file.display()))?;
    if reader.link_type() != LINKTYPE_ETHERNET {
        bail!(
            "{}: link type {:?} is not Ethernet",
            file.display(),
            reader.link_type()
        );
    }
    if let Some(expr) = &filter {
        reader
            .set_filter(expr)
            .with_context(|| format!("invalid capture filter {:?}", expr))?;
    }
    info!(
        file = %file.display(),
        filter = filter.as_deref().unwrap_or(""),
        "reading capture"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let stats = if directed {
        let mut tracker = TopTracker::<u64>::try_new(args.cache, args.top)?;
        feed_capture(&mut reader, &mut tracker, args.interval, &mut out, |flow| {
            (flow.directed_key(), u64::from(flow.total_length))
        })?
    } else {
        let mut tracker = TopTracker::<Directional>::try_new(args.cache, args.top)?;
        feed_capture(
            &mut reader,
            &mut tracker,
            args.interval,
            &mut out,
            Ipv4Flow::canonical,
        )?
    };
    info!(frames = stats.frames, skipped = stats.skipped, "capture done");
    Ok(())
}

/// Feeds every decodable frame to `tracker`, printing the leaderboard each
/// `interval` capture seconds, then the final leaderboard and frame counts.
fn feed_capture<W, F, O>(
    reader: &mut PcapReader,
    tracker: &mut TopTracker<W>,
    interval: u64,
    out: &mut O,
    key_of: F,
) -> Result<CaptureStats>
where
    W: Weight + Columns,
    F: Fn(&Ipv4Flow) -> (String, W),
    O: Write,
{
    let mut next_report = None;
    let mut stats = CaptureStats::default();

    while let Some(frame) = reader.next_frame().context("capture ended unexpectedly")? {
        stats.frames += 1;
        let now = frame.timestamp_secs;

        let due = *next_report.get_or_insert(now.saturating_add(interval));
        if now >= due {
            print_top(out, &format!("t={}", now), &tracker.top_n())?;
            next_report = Some(next_report_after(now, interval));
        }

        let flow = match decode_ipv4(frame.data) {
            Ok(flow) => flow,
            Err(err) => {
                stats.skipped += 1;
                debug!(frame = stats.frames, %err, "skipping frame");
                continue;
            },
        };
        let (key, weight) = key_of(&flow);
        tracker.record_event(key, now, weight)?;
    }

    print_top(out, "final", &tracker.top_n())?;
    writeln!(
        out,
        "{} frames, {} skipped, {} tracked",
        stats.frames,
        stats.skipped,
        tracker.len()
    )?;
    out.flush()?;
    Ok(stats)
}

fn run_lines(args: TrackerArgs) -> Result<()> {
    let mut tracker = TopTracker::<u64>::try_new(args.cache, args.top)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut seen = 0u64;
    for (lineno, line) in stdin.lock().lines().enumerate() {
        let line = line.context("cannot read stdin")?;
        let mut fields = line.split_whitespace();
        let Some(key) = fields.next() else {
            continue;
        };
        let amount = match fields.next() {
            None => 1,
            Some(text) => match text.parse::<u64>() {
                Ok(amount) => amount,
                Err(err) => {
                    warn!(line = lineno + 1, %err, "ignoring line with bad amount");
                    continue;
                },
            },
        };

        seen += 1;
        tracker.record_event(key, seen, amount)?;
        if seen % args.interval == 0 {
            print_top(&mut out, &format!("line {}", lineno + 1), &tracker.top_n())?;
        }
    }

    print_top(&mut out, "final", &tracker.top_n())?;
    info!(events = seen, tracked = tracker.len(), "input done");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level);

    match args.command {
        Command::Pcap {
            file,
            tracker,
            filter,
            directed,
        } => run_pcap(file, tracker, filter, directed),
        Command::Lines { tracker } => run_lines(tracker),
    }
}
