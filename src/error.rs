//! Error taxonomy for the spot submission protocol.
//!
//! Cluster nodes report problems as free-text lines, so every known
//! failure is classified into one of these kinds. The kind name is the
//! stable `type` tag API callers branch on; the `Display` text is the
//! human-readable `error_data`.

use thiserror::Error;

/// Ways a spot submission can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    /// Spotter callsign was empty, or the cluster rejected it at login.
    #[error("Invalid spotter")]
    InvalidSpotter,

    /// DX callsign was empty, or the cluster rejected it.
    #[error("Invalid dx callsign")]
    InvalidDxCallsign,

    /// No login confirmation before the wait timeout.
    #[error("Login failed")]
    LoginFailed,

    /// The dialect requires a greeting prompt and none arrived in time.
    #[error("Did not receive the cluster greeting")]
    InitialConnectionFailed,

    /// The cluster explicitly rejected the submitted command.
    /// Carries the offending command text for diagnostics.
    #[error("Invalid command: {0}")]
    CommandError(String),

    /// The cluster rejected the frequency value.
    #[error("Invalid frequency")]
    InvalidFrequency,

    /// The cluster reported a generic, unclassified error.
    #[error("Other error")]
    OtherError,

    /// Connection could not be established after exhausting retries.
    #[error("Failed to connect to the cluster")]
    ClusterUnreachable,

    /// The cluster never echoed the spot back within the wait timeout.
    #[error("No spot confirmation received")]
    EchoTimedOut,
}

impl SubmitError {
    /// Stable tag reported as the `type` field of a failure response.
    pub fn kind(&self) -> &'static str {
        match self {
            SubmitError::InvalidSpotter => "InvalidSpotter",
            SubmitError::InvalidDxCallsign => "InvalidDXCallsign",
            SubmitError::LoginFailed => "LoginFailed",
            SubmitError::InitialConnectionFailed => "InitialConnectionFailed",
            SubmitError::CommandError(_) => "CommandError",
            SubmitError::InvalidFrequency => "InvalidFrequency",
            SubmitError::OtherError => "OtherError",
            SubmitError::ClusterUnreachable => "ClusterUnreachable",
            SubmitError::EchoTimedOut => "EchoTimedOut",
        }
    }
}

/// Error tags a dialect's failure tables map server lines onto.
///
/// The tables carry tags rather than full errors because
/// `CommandError` only picks up the offending command text at
/// submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidSpotter,
    InvalidDxCallsign,
    InvalidFrequency,
    CommandError,
    OtherError,
}

impl FailureKind {
    /// Attach submission context, yielding the concrete error.
    pub fn into_error(self, command: &str) -> SubmitError {
        match self {
            FailureKind::InvalidSpotter => SubmitError::InvalidSpotter,
            FailureKind::InvalidDxCallsign => SubmitError::InvalidDxCallsign,
            FailureKind::InvalidFrequency => SubmitError::InvalidFrequency,
            FailureKind::CommandError => SubmitError::CommandError(command.to_string()),
            FailureKind::OtherError => SubmitError::OtherError,
        }
    }
}
