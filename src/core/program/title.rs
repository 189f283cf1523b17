//! Reel Title Generation

use chrono::{DateTime, Datelike, Utc};

/// Derives the overlay title for a reel.
pub struct TitleGenerator;

impl TitleGenerator {
    /// `"Trip to {location} {year}"` when a location is known, otherwise the
    /// generic `"Travel Memories {year}"`. The year is taken from `now`, not
    /// from asset capture dates.
    pub fn generate(location: Option<&str>, now: DateTime<Utc>) -> String {
        let year = now.year();
        match location {
            Some(location) if !location.trim().is_empty() => {
                format!("Trip to {location} {year}")
            }
            _ => format!("Travel Memories {year}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn mid_2025() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_title_with_location() {
        assert_eq!(
            TitleGenerator::generate(Some("48.8582, 2.2945"), mid_2025()),
            "Trip to 48.8582, 2.2945 2025"
        );
    }

    #[test]
    fn test_title_without_location() {
        assert_eq!(
            TitleGenerator::generate(None, mid_2025()),
            "Travel Memories 2025"
        );
    }

    #[test]
    fn test_blank_location_falls_back() {
        assert_eq!(
            TitleGenerator::generate(Some("   "), mid_2025()),
            "Travel Memories 2025"
        );
    }
}
