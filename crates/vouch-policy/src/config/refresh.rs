//! Anchor refresh periods

use std::time::Duration;
use vouch_core::{Result, TrustError};

/// Period used when a schema asks for a refresh of `0`
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(3600);

/// Parse `<u32><h|m|s>`, e.g. `1h`, `30m`, `45s`.
///
/// A zero count resolves to [`DEFAULT_REFRESH_PERIOD`], never to "no refresh".
pub fn parse_refresh_period(text: &str) -> Result<Duration> {
    let text = text.trim();
    let invalid = || TrustError::config(format!("Bad refresh value: `{text}`"));

    let unit = text.chars().last().ok_or_else(invalid)?;
    let count: u32 = text[..text.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;
    let seconds = match unit.to_ascii_lowercase() {
        'h' => u64::from(count) * 3600,
        'm' => u64::from(count) * 60,
        's' => u64::from(count),
        _ => return Err(invalid()),
    };

    if seconds == 0 {
        Ok(DEFAULT_REFRESH_PERIOD)
    } else {
        Ok(Duration::from_secs(seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units() {
        assert_eq!(parse_refresh_period("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_refresh_period("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_refresh_period("45s").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn test_zero_means_default() {
        assert_eq!(parse_refresh_period("0s").unwrap(), DEFAULT_REFRESH_PERIOD);
        assert_eq!(parse_refresh_period("0h").unwrap(), DEFAULT_REFRESH_PERIOD);
    }

    #[test]
    fn test_malformed() {
        for bad in ["", "h", "10", "10d", "-1s", "1.5h"] {
            assert!(parse_refresh_period(bad).is_err(), "{bad}");
        }
    }
}
