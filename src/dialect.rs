//! Per-node dialect configuration.
//!
//! Cluster software varies: nodes differ in whether they prompt before
//! login, in the wording of their error lines, and in which command
//! keyword announces a spot. The protocol takes all of that as data so
//! a new node only needs a new `ClusterDialect` value, not new code.

use std::time::Duration;

use crate::error::FailureKind;
use crate::matcher::LinePattern;

/// Default timeout for each protocol wait.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// How one cluster node speaks the protocol.
#[derive(Debug, Clone)]
pub struct ClusterDialect {
    /// Prompt to wait for before sending the callsign. `None` sends the
    /// callsign immediately after connecting.
    pub greeting: Option<LinePattern>,

    /// Line confirming a successful login.
    pub login_success: LinePattern,

    /// Ordered table of login rejection lines.
    pub login_failures: Vec<(LinePattern, FailureKind)>,

    /// Command keyword for a live spot announcement.
    pub live_command: String,

    /// Command keyword for a test announcement that is not broadcast.
    pub test_command: String,

    /// Ordered table of spot command rejection lines.
    pub echo_failures: Vec<(LinePattern, FailureKind)>,

    /// Session options sent once after login on a monitoring connection.
    pub setup_commands: Vec<String>,

    /// Overall deadline for each wait on a server response.
    pub wait_timeout: Duration,
}

impl Default for ClusterDialect {
    /// The dialect spoken by DXSpider-style nodes such as dxc.k0xm.net.
    fn default() -> Self {
        Self {
            greeting: None,
            login_success: LinePattern::literal("Hello"),
            login_failures: vec![(
                LinePattern::literal("is not a valid callsign"),
                FailureKind::InvalidSpotter,
            )],
            live_command: "DX".to_string(),
            test_command: "DXTEST".to_string(),
            echo_failures: vec![
                (
                    LinePattern::literal("command error"),
                    FailureKind::CommandError,
                ),
                (LinePattern::literal("Error - DX"), FailureKind::OtherError),
                (
                    LinePattern::literal("Error - invalid frequency"),
                    FailureKind::InvalidFrequency,
                ),
                (
                    LinePattern::literal("Error - Invalid Dx Call"),
                    FailureKind::InvalidDxCallsign,
                ),
            ],
            setup_commands: vec![
                "set/width 130".to_string(),
                "set/dxgrid".to_string(),
                "set/dxitu".to_string(),
                "unset/beep".to_string(),
            ],
            wait_timeout: WAIT_TIMEOUT,
        }
    }
}

impl ClusterDialect {
    /// The command keyword for this submission mode.
    pub fn command_keyword(&self, testing: bool) -> &str {
        if testing {
            &self.test_command
        } else {
            &self.live_command
        }
    }

    /// Require a greeting prompt before the callsign is sent.
    pub fn with_greeting(mut self, pattern: LinePattern) -> Self {
        self.greeting = Some(pattern);
        self
    }

    /// Override the per-wait timeout.
    pub fn with_wait_timeout(mut self, wait: Duration) -> Self {
        self.wait_timeout = wait;
        self
    }
}
