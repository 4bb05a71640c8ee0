//! Data structures representing DX cluster spots.
//!
//! This module defines the structured form of a "DX de" announcement
//! line as decomposed by the parser.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A spot announced on a DX cluster.
///
/// # Example
///
/// A raw announcement like:
/// ```text
/// DX de SP3OCC:     3702.0  SP100IARU    95th PZK - 100th IARU SSB    28 1442Z JO92
/// ```
///
/// Decomposes into a `DxSpot` with:
/// - `spotter_callsign`: "SP3OCC"
/// - `frequency`: 3702.0
/// - `dx_callsign`: "SP100IARU"
/// - `comment`: "95th PZK - 100th IARU SSB"
/// - `dx_locator`: "28"
/// - `time`: "1442Z"
/// - `spotter_locator`: "JO92"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DxSpot {
    /// Callsign of the station that reported the spot.
    pub spotter_callsign: String,

    /// Frequency in kHz where the station was heard.
    pub frequency: f64,

    /// Callsign of the station that was heard.
    pub dx_callsign: String,

    /// Free-text comment, often the mode or a QSX note.
    pub comment: String,

    /// Grid token the node printed for the dx station. Nodes with
    /// `set/dxitu` active print an ITU zone number here instead of a
    /// Maidenhead square.
    pub dx_locator: String,

    /// Time-of-day token as printed, e.g. "1442Z".
    pub time: String,

    /// Grid token for the spotter.
    pub spotter_locator: String,
}

impl DxSpot {
    /// Returns the amateur radio band for this spot's frequency.
    ///
    /// Returns `None` if the frequency doesn't fall within a recognized band.
    pub fn band(&self) -> Option<&'static str> {
        match self.frequency as u32 {
            135..=138 => Some("2200m"),
            472..=479 => Some("630m"),
            1800..=2000 => Some("160m"),
            3500..=4000 => Some("80m"),
            5330..=5410 => Some("60m"),
            7000..=7300 => Some("40m"),
            10100..=10150 => Some("30m"),
            14000..=14350 => Some("20m"),
            18068..=18168 => Some("17m"),
            21000..=21450 => Some("15m"),
            24890..=24990 => Some("12m"),
            28000..=29700 => Some("10m"),
            50000..=54000 => Some("6m"),
            144000..=148000 => Some("2m"),
            _ => None,
        }
    }

    /// Interpret the `HHMMZ` time token as a UTC time of day.
    ///
    /// Returns `None` when the token is not four digits plus "Z".
    pub fn time_utc(&self) -> Option<NaiveTime> {
        let digits = self.time.strip_suffix('Z')?;
        if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let hour: u32 = digits[0..2].parse().ok()?;
        let minute: u32 = digits[2..4].parse().ok()?;
        NaiveTime::from_hms_opt(hour, minute, 0)
    }
}

impl fmt::Display for DxSpot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DX de {}: {:>8.1} {} {} {} {} {}",
            self.spotter_callsign,
            self.frequency,
            self.dx_callsign,
            self.comment,
            self.dx_locator,
            self.time,
            self.spotter_locator
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_spot(frequency: f64) -> DxSpot {
        DxSpot {
            spotter_callsign: "SP3OCC".to_string(),
            frequency,
            dx_callsign: "SP100IARU".to_string(),
            comment: "SSB".to_string(),
            dx_locator: "28".to_string(),
            time: "1442Z".to_string(),
            spotter_locator: "JO92".to_string(),
        }
    }

    #[test]
    fn test_band_detection() {
        assert_eq!(make_spot(3702.0).band(), Some("80m"));
        assert_eq!(make_spot(14025.0).band(), Some("20m"));
        assert_eq!(make_spot(28471.0).band(), Some("10m"));
    }

    #[test]
    fn test_band_detection_edge_cases() {
        assert_eq!(make_spot(7000.0).band(), Some("40m"));
        assert_eq!(make_spot(7300.0).band(), Some("40m"));
        assert_eq!(make_spot(6999.0).band(), None);
    }

    #[test]
    fn test_time_utc() {
        assert_eq!(
            make_spot(3702.0).time_utc(),
            NaiveTime::from_hms_opt(14, 42, 0)
        );

        let mut spot = make_spot(3702.0);
        spot.time = "0000Z".to_string();
        assert_eq!(spot.time_utc(), NaiveTime::from_hms_opt(0, 0, 0));

        spot.time = "95Z".to_string();
        assert_eq!(spot.time_utc(), None);

        spot.time = "2575Z".to_string();
        assert_eq!(spot.time_utc(), None);

        spot.time = "1442".to_string();
        assert_eq!(spot.time_utc(), None);
    }

    #[test]
    fn test_display() {
        let spot = make_spot(3702.0);
        let rendered = spot.to_string();
        assert!(rendered.starts_with("DX de SP3OCC:"));
        assert!(rendered.contains("3702.0"));
        assert!(rendered.ends_with("28 1442Z JO92"));
    }
}
