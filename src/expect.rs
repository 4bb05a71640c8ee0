//! Waiting for expected lines from the cluster.
//!
//! Cluster output is free text and partially unpredictable: nodes emit
//! banners, talk messages, and WWV lines in between the responses the
//! protocol actually cares about. Each protocol step therefore races a
//! success pattern against an ordered table of known failure patterns,
//! bounded by a single wall-clock deadline.

use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::matcher::LinePattern;

/// Outcome of waiting for a line pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectationOutcome<T> {
    /// The success pattern matched a line.
    Matched,
    /// A failure table entry matched first.
    FailedWithReason(T),
    /// Neither matched before the deadline.
    TimedOut,
}

/// Read lines until one matches `success` or an entry of `failures`.
///
/// Each line is tested against the success pattern first, then against
/// the failure table in order; the first matching entry wins and ends
/// the wait. Unrelated lines are skipped. One deadline bounds the whole
/// wait, however many lines the server emits.
///
/// Lines are decoded lossily: invalid byte sequences are replaced, not
/// fatal. EOF or a read error before a match is reported as `TimedOut`,
/// since the awaited line can no longer arrive.
pub async fn await_line<R, T>(
    reader: &mut R,
    success: &LinePattern,
    failures: &[(LinePattern, T)],
    wait: Duration,
) -> ExpectationOutcome<T>
where
    R: AsyncBufRead + Unpin,
    T: Clone,
{
    match timeout(wait, await_line_inner(reader, success, failures)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!("Timed out while waiting for: {}", success);
            ExpectationOutcome::TimedOut
        }
    }
}

async fn await_line_inner<R, T>(
    reader: &mut R,
    success: &LinePattern,
    failures: &[(LinePattern, T)],
) -> ExpectationOutcome<T>
where
    R: AsyncBufRead + Unpin,
    T: Clone,
{
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                debug!("Connection closed while waiting for: {}", success);
                return ExpectationOutcome::TimedOut;
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\r', '\n']);
                debug!("Received: {}", line);

                if success.matches(line) {
                    return ExpectationOutcome::Matched;
                }
                for (pattern, reason) in failures {
                    if pattern.matches(line) {
                        return ExpectationOutcome::FailedWithReason(reason.clone());
                    }
                }
            }
            Err(e) => {
                warn!("Read error while waiting for {}: {}", success, e);
                return ExpectationOutcome::TimedOut;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    fn failure_table() -> Vec<(LinePattern, FailureKind)> {
        vec![
            (
                LinePattern::literal("command error"),
                FailureKind::CommandError,
            ),
            (LinePattern::literal("Error - DX"), FailureKind::OtherError),
        ]
    }

    #[tokio::test]
    async fn test_success_on_first_line() {
        let mut reader = &b"Hello 4X5BR-1, this is dxc.example.net\n"[..];
        let outcome = await_line(
            &mut reader,
            &LinePattern::literal("Hello"),
            &failure_table(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(outcome, ExpectationOutcome::Matched);
    }

    #[tokio::test]
    async fn test_noise_lines_are_skipped() {
        let mut reader =
            &b"Welcome to the node\nWWV de W1AW\nHello 4X5BR-1\n"[..];
        let outcome = await_line(
            &mut reader,
            &LinePattern::literal("Hello"),
            &failure_table(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(outcome, ExpectationOutcome::Matched);
    }

    #[tokio::test]
    async fn test_failure_pattern_ends_the_wait() {
        let mut reader = &b"some banner\nDXTEST command error\nHello\n"[..];
        let outcome = await_line(
            &mut reader,
            &LinePattern::literal("Hello"),
            &failure_table(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(
            outcome,
            ExpectationOutcome::FailedWithReason(FailureKind::CommandError)
        );
    }

    #[tokio::test]
    async fn test_failure_table_order_wins() {
        // A line matching two table entries resolves to the first one.
        let table = vec![
            (LinePattern::literal("Error"), FailureKind::OtherError),
            (
                LinePattern::literal("Error - invalid frequency"),
                FailureKind::InvalidFrequency,
            ),
        ];
        let mut reader = &b"Error - invalid frequency\n"[..];
        let outcome = await_line(
            &mut reader,
            &LinePattern::literal("Hello"),
            &table,
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(
            outcome,
            ExpectationOutcome::FailedWithReason(FailureKind::OtherError)
        );
    }

    #[tokio::test]
    async fn test_success_checked_before_failures() {
        // One line matching both resolves as a success.
        let table = vec![(LinePattern::literal("Hello"), FailureKind::OtherError)];
        let mut reader = &b"Hello\n"[..];
        let outcome = await_line(
            &mut reader,
            &LinePattern::literal("Hello"),
            &table,
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(outcome, ExpectationOutcome::Matched);
    }

    #[tokio::test]
    async fn test_eof_reports_timed_out() {
        let mut reader = &b"unrelated line\n"[..];
        let outcome = await_line(
            &mut reader,
            &LinePattern::literal("Hello"),
            &failure_table(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(outcome, ExpectationOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_deadline_bounds_the_whole_wait() {
        // A silent peer: the read never completes and the deadline fires.
        let (_tx, rx) = tokio::io::duplex(64);
        let mut reader = tokio::io::BufReader::new(rx);
        let outcome = await_line(
            &mut reader,
            &LinePattern::literal("Hello"),
            &failure_table(),
            Duration::from_secs(10),
        )
        .await;
        assert_eq!(outcome, ExpectationOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced_not_fatal() {
        let mut reader = &b"\xff\xfe garbage\nHello 4X5BR-1\n"[..];
        let outcome = await_line(
            &mut reader,
            &LinePattern::literal("Hello"),
            &failure_table(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(outcome, ExpectationOutcome::Matched);
    }

    #[tokio::test]
    async fn test_regex_success_pattern() {
        let success = LinePattern::regex(r"DX de\s+W1ABC:\s*14025\.0\s+JA1XYZ").unwrap();
        let mut reader = &b"DX de W1ABC:   14025.0 JA1XYZ  test comment 1442Z\n"[..];
        let outcome = await_line(
            &mut reader,
            &success,
            &failure_table(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(outcome, ExpectationOutcome::Matched);
    }
}
