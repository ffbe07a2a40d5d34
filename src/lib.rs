//! flowtop: bounded-memory top-K of the heaviest recently active keys.
//!
//! [`TopTracker`](tracker::TopTracker) is the core. The `flow` module, and
//! `capture` with the `capture` feature, turn pcap files into IPv4
//! conversation events for it.

#[cfg(feature = "capture")]
pub mod capture;
pub mod ds;
pub mod error;
pub mod flow;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
pub mod tracker;
