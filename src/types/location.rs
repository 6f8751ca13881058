use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
///
/// # Examples
///
/// ```
/// use meteo_insights::LatLon;
///
/// let london = LatLon(51.5074, -0.1278);
/// assert_eq!(london.latitude(), 51.5074);
/// assert_eq!(london.rounded(2), LatLon(51.51, -0.13));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    pub fn latitude(self) -> f64 {
        self.0
    }

    pub fn longitude(self) -> f64 {
        self.1
    }

    /// Rounds both coordinates to `decimals` places.
    pub fn rounded(self, decimals: u32) -> LatLon {
        let factor = 10f64.powi(decimals as i32);
        LatLon(
            (self.0 * factor).round() / factor,
            (self.1 * factor).round() / factor,
        )
    }

    /// Formats the location with fixed precision, used as the location part of cache keys.
    ///
    /// Negative zero is normalised so `-0.001` and `0.001` land on the same key.
    pub(crate) fn key_fragment(self, decimals: u32) -> String {
        let rounded = self.rounded(decimals);
        let precision = decimals as usize;
        format!(
            "{:.*}_{:.*}",
            precision,
            rounded.0 + 0.0,
            precision,
            rounded.1 + 0.0
        )
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.0, self.1)
    }
}
