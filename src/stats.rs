//! Statistics tracking for cluster activity.
//!
//! One collector covers both directions of the protocol: spots parsed
//! off the live feed, and the outcomes and round-trip latency of spot
//! submissions.

use hdrhistogram::Histogram;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::spot::DxSpot;
use crate::submit::SubmissionResult;

/// Thread-safe statistics collector for cluster traffic.
#[derive(Debug)]
pub struct ClusterStats {
    /// Total number of feed lines parsed into spots
    pub spots_parsed: AtomicU64,

    /// Total number of spot-shaped lines that failed to parse
    pub parse_failures: AtomicU64,

    /// Total number of lines that were not spots (filtered early)
    pub non_spot_lines: AtomicU64,

    /// Total bytes of raw feed input processed
    pub bytes_processed: AtomicU64,

    /// Submissions the cluster confirmed
    pub submissions_accepted: AtomicU64,

    /// Submissions that ended in a failure result
    pub submissions_rejected: AtomicU64,

    /// Histogram of submission round-trip latencies in milliseconds
    submit_latency: RwLock<Histogram<u64>>,

    /// Rejections per error kind tag
    rejections_by_kind: RwLock<HashMap<String, u64>>,

    /// Parsed spots per band
    spots_by_band: RwLock<HashMap<String, u64>>,

    /// Parsed spots per spotter
    top_spotters: RwLock<HashMap<String, u64>>,

    /// When stats collection started
    start_time: Instant,
}

impl ClusterStats {
    /// Create a new statistics collector.
    pub fn new() -> Self {
        Self {
            spots_parsed: AtomicU64::new(0),
            parse_failures: AtomicU64::new(0),
            non_spot_lines: AtomicU64::new(0),
            bytes_processed: AtomicU64::new(0),
            submissions_accepted: AtomicU64::new(0),
            submissions_rejected: AtomicU64::new(0),
            // Latency histogram: 1 ms to 60 s, 3 significant figures
            submit_latency: RwLock::new(
                Histogram::new_with_bounds(1, 60_000, 3)
                    .expect("Failed to create latency histogram"),
            ),
            rejections_by_kind: RwLock::new(HashMap::new()),
            spots_by_band: RwLock::new(HashMap::new()),
            top_spotters: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record a successfully parsed feed spot.
    pub fn record_spot(&self, spot: &DxSpot) {
        self.spots_parsed.fetch_add(1, Ordering::Relaxed);

        if let Some(band) = spot.band()
            && let Ok(mut map) = self.spots_by_band.write()
        {
            *map.entry(band.to_string()).or_insert(0) += 1;
        }

        if let Ok(mut map) = self.top_spotters.write() {
            *map.entry(spot.spotter_callsign.clone()).or_insert(0) += 1;
        }
    }

    /// Record a spot-shaped line that failed to parse.
    pub fn record_parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a non-spot line.
    pub fn record_non_spot(&self) {
        self.non_spot_lines.fetch_add(1, Ordering::Relaxed);
    }

    /// Record bytes processed.
    pub fn record_bytes(&self, bytes: u64) {
        self.bytes_processed.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record the outcome and round-trip time of one submission.
    pub fn record_submission(&self, result: &SubmissionResult, elapsed: Duration) {
        match result {
            SubmissionResult::Success => {
                self.submissions_accepted.fetch_add(1, Ordering::Relaxed);
            }
            SubmissionResult::Failure(error) => {
                self.submissions_rejected.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut map) = self.rejections_by_kind.write() {
                    *map.entry(error.kind().to_string()).or_insert(0) += 1;
                }
            }
        }

        if let Ok(mut hist) = self.submit_latency.write() {
            let _ = hist.record((elapsed.as_millis() as u64).clamp(1, 60_000));
        }
    }

    /// Get the elapsed time since stats collection started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get the current spots per minute rate.
    pub fn spots_per_minute(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.spots_parsed.load(Ordering::Relaxed) as f64 / elapsed * 60.0
        } else {
            0.0
        }
    }

    /// Generate a summary report.
    pub fn summary(&self) -> StatsSummary {
        let latency = self
            .submit_latency
            .read()
            .map(|h| LatencyPercentiles {
                p50: h.value_at_quantile(0.50),
                p90: h.value_at_quantile(0.90),
                p99: h.value_at_quantile(0.99),
                max: h.max(),
            })
            .ok();

        let rejections_by_kind = self
            .rejections_by_kind
            .read()
            .map(|m| m.clone())
            .unwrap_or_default();

        let spots_by_band = self
            .spots_by_band
            .read()
            .map(|m| m.clone())
            .unwrap_or_default();

        // Get top 10 spotters
        let top_spotters = self
            .top_spotters
            .read()
            .map(|m| {
                let mut vec: Vec<_> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
                vec.sort_by(|a, b| b.1.cmp(&a.1));
                vec.truncate(10);
                vec
            })
            .unwrap_or_default();

        StatsSummary {
            elapsed_secs: self.elapsed().as_secs_f64(),
            spots_parsed: self.spots_parsed.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            non_spot_lines: self.non_spot_lines.load(Ordering::Relaxed),
            bytes_processed: self.bytes_processed.load(Ordering::Relaxed),
            spots_per_minute: self.spots_per_minute(),
            submissions_accepted: self.submissions_accepted.load(Ordering::Relaxed),
            submissions_rejected: self.submissions_rejected.load(Ordering::Relaxed),
            submit_latency_ms: latency,
            rejections_by_kind,
            spots_by_band,
            top_spotters,
        }
    }
}

impl Default for ClusterStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentile values from the latency histogram, in milliseconds.
#[derive(Debug, Clone, Serialize)]
pub struct LatencyPercentiles {
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub max: u64,
}

/// Summary of collected statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    pub elapsed_secs: f64,
    pub spots_parsed: u64,
    pub parse_failures: u64,
    pub non_spot_lines: u64,
    pub bytes_processed: u64,
    pub spots_per_minute: f64,
    pub submissions_accepted: u64,
    pub submissions_rejected: u64,
    pub submit_latency_ms: Option<LatencyPercentiles>,
    pub rejections_by_kind: HashMap<String, u64>,
    pub spots_by_band: HashMap<String, u64>,
    pub top_spotters: Vec<(String, u64)>,
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "═══════════════════════════════════════════════════════")?;
        writeln!(f, "                 CLUSTER STATISTICS")?;
        writeln!(f, "═══════════════════════════════════════════════════════")?;
        writeln!(f)?;
        writeln!(f, "Runtime: {:.1}s", self.elapsed_secs)?;
        writeln!(f, "Spots parsed: {}", self.spots_parsed)?;
        writeln!(f, "Parse failures: {}", self.parse_failures)?;
        writeln!(f, "Non-spot lines: {}", self.non_spot_lines)?;
        writeln!(f, "Bytes processed: {} KB", self.bytes_processed / 1024)?;
        writeln!(f, "Rate: {:.1} spots/min", self.spots_per_minute)?;
        writeln!(f)?;

        if self.submissions_accepted + self.submissions_rejected > 0 {
            writeln!(
                f,
                "Submissions: {} accepted, {} rejected",
                self.submissions_accepted, self.submissions_rejected
            )?;
            if let Some(ref p) = self.submit_latency_ms {
                writeln!(
                    f,
                    "  Latency (ms): P50: {}, P90: {}, P99: {}, Max: {}",
                    p.p50, p.p90, p.p99, p.max
                )?;
            }
            if !self.rejections_by_kind.is_empty() {
                let mut kinds: Vec<_> = self.rejections_by_kind.iter().collect();
                kinds.sort_by(|a, b| b.1.cmp(a.1));
                for (kind, count) in kinds {
                    writeln!(f, "  {}: {}", kind, count)?;
                }
            }
            writeln!(f)?;
        }

        if !self.spots_by_band.is_empty() {
            writeln!(f, "Spots by Band:")?;
            let mut bands: Vec<_> = self.spots_by_band.iter().collect();
            bands.sort_by(|a, b| b.1.cmp(a.1));
            for (band, count) in bands {
                writeln!(f, "  {}: {}", band, count)?;
            }
            writeln!(f)?;
        }

        if !self.top_spotters.is_empty() {
            writeln!(f, "Top 10 Spotters:")?;
            for (i, (spotter, count)) in self.top_spotters.iter().enumerate() {
                writeln!(f, "  {}. {}: {}", i + 1, spotter, count)?;
            }
        }

        Ok(())
    }
}
