//! DX cluster client - a Rust library and CLI for the DX cluster telnet protocol.
//!
//! This crate provides:
//! - A spot submission protocol: login handshake, spot command, echoed
//!   confirmation, with a structured error taxonomy
//! - A fixed-format parser for "DX de" announcement lines
//! - An async monitoring client for streaming the live spot feed
//!
//! # Example
//!
//! ```rust
//! use dxcluster_client::parser::parse_dx_line;
//!
//! let line = "DX de SP3OCC:     3702.0  SP100IARU    95th PZK - 100th IARU SSB    28 1442Z JO92";
//! let spot = parse_dx_line(line).expect("Failed to parse spot");
//!
//! assert_eq!(spot.spotter_callsign, "SP3OCC");
//! assert_eq!(spot.time, "1442Z");
//! ```

pub mod client;
pub mod config;
pub mod dialect;
pub mod error;
pub mod expect;
pub mod matcher;
pub mod metrics;
pub mod parser;
pub mod spot;
pub mod stats;
pub mod submit;

pub use client::{
    ClusterConnection, ClusterEvent, ClusterMonitor, ConnectConfig, ConnectionState,
    MonitorConfig,
};
pub use config::Config;
pub use dialect::ClusterDialect;
pub use error::{FailureKind, SubmitError};
pub use expect::{ExpectationOutcome, await_line};
pub use matcher::LinePattern;
pub use parser::{looks_like_spot, parse_dx_line};
pub use spot::DxSpot;
pub use stats::{ClusterStats, StatsSummary};
pub use submit::{SpotSubmitter, SubmissionRequest, SubmissionResult};
