//! Parser for DX cluster announcement lines.
//!
//! Cluster nodes announce spots as fixed-format lines:
//!
//! ```text
//! DX de SP3OCC:     3702.0  SP100IARU    95th PZK - 100th IARU SSB    28 1442Z JO92
//! ```
//!
//! The decomposition is a single anchored pattern over the trimmed
//! line. Lines that do not have this shape are expected on a live feed
//! (banners, talk messages, WWV) and reported as `None` so the caller
//! can log the raw line and move on.

use regex::Regex;
use std::sync::LazyLock;

use crate::spot::DxSpot;

/// Fields, in order: spotter, frequency, dx call, comment, dx locator,
/// time, spotter locator. The comment capture is non-greedy so the
/// trailing locator/time tokens are not swallowed by free text.
static DX_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^DX de (\S+):\s+(\d+\.\d+)\s+(\S+)\s+(.*?)\s+?(\w+) (\d+Z)\s+(\w+)")
        .expect("DX line pattern is valid")
});

/// Decompose one announcement line into a spot.
///
/// Returns `None` when the line does not have the fixed shape; parsing
/// never fails with an error.
///
/// # Example
///
/// ```
/// use dxcluster_client::parser::parse_dx_line;
///
/// let line = "DX de SP3OCC:     3702.0  SP100IARU    95th PZK - 100th IARU SSB    28 1442Z JO92";
/// let spot = parse_dx_line(line).unwrap();
/// assert_eq!(spot.spotter_callsign, "SP3OCC");
/// assert_eq!(spot.dx_callsign, "SP100IARU");
/// ```
pub fn parse_dx_line(line: &str) -> Option<DxSpot> {
    let caps = DX_LINE.captures(line.trim())?;
    let frequency: f64 = caps[2].parse().ok()?;

    Some(DxSpot {
        spotter_callsign: caps[1].to_string(),
        frequency,
        dx_callsign: caps[3].to_string(),
        comment: caps[4].trim().to_string(),
        dx_locator: caps[5].to_string(),
        time: caps[6].to_string(),
        spotter_locator: caps[7].to_string(),
    })
}

/// Quick prefilter to skip the full decomposition on non-spot lines.
#[inline]
pub fn looks_like_spot(line: &str) -> bool {
    line.trim_start().starts_with("DX de ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_ssb_spot_with_zone_locator() {
        let line = "DX de SP3OCC:     3702.0  SP100IARU    95th PZK - 100th IARU SSB                                                     28 1442Z JO92";
        let spot = parse_dx_line(line).expect("Should parse successfully");

        assert_eq!(spot.spotter_callsign, "SP3OCC");
        assert!((spot.frequency - 3702.0).abs() < 0.01);
        assert_eq!(spot.dx_callsign, "SP100IARU");
        assert_eq!(spot.comment, "95th PZK - 100th IARU SSB");
        assert_eq!(spot.dx_locator, "28");
        assert_eq!(spot.time, "1442Z");
        assert_eq!(spot.spotter_locator, "JO92");
    }

    #[test]
    fn test_parse_short_locator_tokens() {
        let line = "DX de KC1LAA:    28471.0  CX7RM        USB                                                                           14 1442Z  8";
        let spot = parse_dx_line(line).expect("Should parse successfully");

        assert_eq!(spot.spotter_callsign, "KC1LAA");
        assert!((spot.frequency - 28471.0).abs() < 0.01);
        assert_eq!(spot.dx_callsign, "CX7RM");
        assert_eq!(spot.comment, "USB");
        assert_eq!(spot.dx_locator, "14");
        assert_eq!(spot.time, "1442Z");
        assert_eq!(spot.spotter_locator, "8");
    }

    #[test]
    fn test_parse_qsx_comment_and_grid_locators() {
        let line = "DX de DJ5LA:     24891.0  VP2VI        QSX 24892.30  CW                                                            FK78 1442Z JO44";
        let spot = parse_dx_line(line).expect("Should parse successfully");

        assert_eq!(spot.spotter_callsign, "DJ5LA");
        assert!((spot.frequency - 24891.0).abs() < 0.01);
        assert_eq!(spot.dx_callsign, "VP2VI");
        assert_eq!(spot.comment, "QSX 24892.30  CW");
        assert_eq!(spot.dx_locator, "FK78");
        assert_eq!(spot.spotter_locator, "JO44");
    }

    #[test]
    fn test_leading_whitespace_is_trimmed() {
        let line = "  DX de SP3OCC:     3702.0  SP100IARU    SSB    28 1442Z JO92  ";
        let spot = parse_dx_line(line).expect("Should parse successfully");
        assert_eq!(spot.spotter_callsign, "SP3OCC");
    }

    #[test]
    fn test_non_spot_lines_return_none() {
        assert!(parse_dx_line("Welcome to the DXUSA cluster node").is_none());
        assert!(parse_dx_line("WWV de AE5E <18Z> :   SFI=145, A=8, K=2").is_none());
        assert!(parse_dx_line("").is_none());
        // Missing the frequency decimal.
        assert!(parse_dx_line("DX de SP3OCC: not a spot").is_none());
    }

    #[test]
    fn test_prefix_is_case_sensitive() {
        assert!(parse_dx_line("dx de SP3OCC:     3702.0  SP100IARU    SSB    28 1442Z JO92").is_none());
    }

    #[test]
    fn test_looks_like_spot() {
        assert!(looks_like_spot(
            "DX de SP3OCC:     3702.0  SP100IARU    SSB    28 1442Z JO92"
        ));
        assert!(looks_like_spot("  DX de SP3OCC:     3702.0  SP100IARU"));
        assert!(!looks_like_spot("Hello 4X5BR-1"));
        assert!(!looks_like_spot(""));
        assert!(!looks_like_spot("WWV de AE5E"));
    }

    proptest! {
        #[test]
        fn parse_never_panics(line in "\\PC*") {
            let _ = parse_dx_line(&line);
        }

        #[test]
        fn lines_without_prefix_parse_to_none(line in "[A-Za-z0-9 :.]*") {
            prop_assume!(!line.trim_start().starts_with("DX de "));
            prop_assert!(parse_dx_line(&line).is_none());
        }
    }
}
