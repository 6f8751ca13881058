use std::path::PathBuf;

const CACHE_DIR_NAME: &str = "meteo_insights_cache";

/// The per-user cache directory for this crate, e.g. `~/.cache/meteo_insights_cache` on Linux.
pub fn get_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join(CACHE_DIR_NAME))
}

/// Rounds to one decimal place. Applied once to a finished aggregate, never to inputs.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round1() {
        assert_eq!(round1(12.345), 12.3);
        assert_eq!(round1(12.36), 12.4);
        assert_eq!(round1(-2.26), -2.3);
        assert_eq!(round1(0.0), 0.0);
    }

    #[test]
    fn test_cache_dir_name() {
        if let Some(dir) = get_cache_dir() {
            assert!(dir.ends_with(CACHE_DIR_NAME));
        }
    }
}
