//! The spot submission protocol.
//!
//! Drives one full submission against a cluster node: validate, connect
//! (with retries), log in as the spotter, send the spot command, wait
//! for the node to echo the spot back, and close. Every failure along
//! the way is folded into a structured result; nothing propagates as a
//! fault to the caller.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::de::{self, Deserializer, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::client::{ClusterConnection, ConnectConfig};
use crate::dialect::ClusterDialect;
use crate::error::SubmitError;
use crate::expect::{ExpectationOutcome, await_line};
use crate::matcher::LinePattern;
use crate::stats::ClusterStats;

/// A request to announce a spot on the cluster.
///
/// Created per submission attempt and discarded once the protocol
/// completes. Callsigns are only validated for non-emptiness; the
/// cluster is the authority on their format.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmissionRequest {
    /// Callsign of the station reporting the spot.
    pub spotter_callsign: String,

    /// Callsign of the station that was heard.
    pub dx_callsign: String,

    /// Frequency in kHz. Accepted as a JSON number or a numeric string.
    #[serde(deserialize_with = "deserialize_frequency")]
    pub frequency: f64,

    /// Free-text comment, may be empty.
    #[serde(default)]
    pub comment: String,

    /// Use the non-broadcasting test command variant.
    #[serde(default)]
    pub testing: bool,
}

/// Deserialize a frequency given as either a number or a string.
fn deserialize_frequency<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct FrequencyVisitor;

    impl Visitor<'_> for FrequencyVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a frequency in kHz as a number or string")
        }

        fn visit_f64<E>(self, value: f64) -> Result<f64, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_u64<E>(self, value: u64) -> Result<f64, E>
        where
            E: de::Error,
        {
            Ok(value as f64)
        }

        fn visit_i64<E>(self, value: i64) -> Result<f64, E>
        where
            E: de::Error,
        {
            Ok(value as f64)
        }

        fn visit_str<E>(self, value: &str) -> Result<f64, E>
        where
            E: de::Error,
        {
            value
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid frequency: {}", value)))
        }
    }

    deserializer.deserialize_any(FrequencyVisitor)
}

/// Outcome of one submission attempt.
///
/// Serializes to the shape API callers receive: `{"status":"success"}`
/// or `{"status":"failure","type":...,"error_data":...}`.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionResult {
    Success,
    Failure(SubmitError),
}

impl SubmissionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionResult::Success)
    }
}

impl Serialize for SubmissionResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            SubmissionResult::Success => {
                let mut state = serializer.serialize_struct("SubmissionResult", 1)?;
                state.serialize_field("status", "success")?;
                state.end()
            }
            SubmissionResult::Failure(error) => {
                let mut state = serializer.serialize_struct("SubmissionResult", 3)?;
                state.serialize_field("status", "failure")?;
                state.serialize_field("type", error.kind())?;
                state.serialize_field("error_data", &error.to_string())?;
                state.end()
            }
        }
    }
}

/// Submits spots to a cluster node, one connection per request.
#[derive(Clone)]
pub struct SpotSubmitter {
    connect: ConnectConfig,
    dialect: ClusterDialect,
    stats: Option<Arc<ClusterStats>>,
}

impl SpotSubmitter {
    pub fn new(connect: ConnectConfig, dialect: ClusterDialect) -> Self {
        Self {
            connect,
            dialect,
            stats: None,
        }
    }

    /// Record submission outcomes into the given statistics collector.
    pub fn with_stats(mut self, stats: Arc<ClusterStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Run one submission to completion.
    ///
    /// Single-attempt: retries exist only inside the connect step. The
    /// connection never outlives the attempt, whatever happens.
    pub async fn submit(&self, request: &SubmissionRequest) -> SubmissionResult {
        let started = Instant::now();
        let result = self.submit_inner(request).await;

        if let Some(stats) = &self.stats {
            stats.record_submission(&result, started.elapsed());
        }

        match &result {
            SubmissionResult::Success => {
                info!("Spot submitted successfully: {:?}", request);
            }
            SubmissionResult::Failure(e) => {
                warn!("Failed to submit spot {:?}: {}", request, e);
            }
        }
        result
    }

    async fn submit_inner(&self, request: &SubmissionRequest) -> SubmissionResult {
        // Fail fast on empty callsigns, before any network I/O.
        if request.spotter_callsign.is_empty() {
            return SubmissionResult::Failure(SubmitError::InvalidSpotter);
        }
        if request.dx_callsign.is_empty() {
            return SubmissionResult::Failure(SubmitError::InvalidDxCallsign);
        }

        let mut conn = match ClusterConnection::connect(&self.connect).await {
            Ok(conn) => conn,
            Err(e) => return SubmissionResult::Failure(e),
        };

        let outcome = self.run_protocol(&mut conn, request).await;

        // Unconditional close; a close failure never masks the outcome.
        conn.close().await;

        match outcome {
            Ok(()) => SubmissionResult::Success,
            Err(e) => SubmissionResult::Failure(e),
        }
    }

    async fn run_protocol(
        &self,
        conn: &mut ClusterConnection,
        request: &SubmissionRequest,
    ) -> Result<(), SubmitError> {
        let wait = self.dialect.wait_timeout;

        if let Some(greeting) = &self.dialect.greeting {
            let no_failures: [(LinePattern, SubmitError); 0] = [];
            match await_line(conn.reader(), greeting, &no_failures, wait).await {
                ExpectationOutcome::Matched => {}
                _ => return Err(SubmitError::InitialConnectionFailed),
            }
        }

        conn.send_line(&request.spotter_callsign)
            .await
            .map_err(|e| {
                warn!("Failed to send callsign: {}", e);
                SubmitError::OtherError
            })?;

        let login_failures: Vec<(LinePattern, SubmitError)> = self
            .dialect
            .login_failures
            .iter()
            .map(|(pattern, kind)| (pattern.clone(), kind.into_error("")))
            .collect();
        match await_line(conn.reader(), &self.dialect.login_success, &login_failures, wait).await {
            ExpectationOutcome::Matched => {}
            ExpectationOutcome::FailedWithReason(e) => return Err(e),
            ExpectationOutcome::TimedOut => return Err(SubmitError::LoginFailed),
        }

        let frequency = format_khz(request.frequency);
        let command = format!(
            "{} {} {} {}",
            self.dialect.command_keyword(request.testing),
            frequency,
            request.dx_callsign,
            request.comment
        );
        debug!("Writing: {}", command);
        conn.send_line(&command).await.map_err(|e| {
            warn!("Failed to send spot command: {}", e);
            SubmitError::OtherError
        })?;

        let echo = echo_pattern(&request.spotter_callsign, &frequency, &request.dx_callsign);
        let echo_failures: Vec<(LinePattern, SubmitError)> = self
            .dialect
            .echo_failures
            .iter()
            .map(|(pattern, kind)| (pattern.clone(), kind.into_error(&command)))
            .collect();
        match await_line(conn.reader(), &echo, &echo_failures, wait).await {
            ExpectationOutcome::Matched => Ok(()),
            ExpectationOutcome::FailedWithReason(e) => Err(e),
            ExpectationOutcome::TimedOut => Err(SubmitError::EchoTimedOut),
        }
    }
}

/// Format a frequency the way cluster nodes echo it: one decimal place.
fn format_khz(khz: f64) -> String {
    format!("{:.1}", khz)
}

/// Pattern for the node's echo of a just-submitted spot: "DX de", the
/// spotter, the frequency, and the dx call, in that order, tolerant of
/// casing and spacing.
fn echo_pattern(spotter: &str, frequency: &str, dx_callsign: &str) -> LinePattern {
    let pattern = format!(
        r"(?i)DX\s+de\s+{}:\s*{}\s+{}",
        regex::escape(spotter),
        regex::escape(frequency),
        regex::escape(dx_callsign),
    );
    LinePattern::regex(&pattern).expect("escaped callsigns always form a valid pattern")
}
