//! Date helper functions

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;

/// Canonical front-matter date format
pub const ISO_DATE: &str = "%Y-%m-%d";

/// Format a date with a chrono format string, falling back to ISO 8601 when
/// the format string is invalid
///
/// # Examples
/// ```ignore
/// format_date(date, "%B %-d, %Y") // -> "January 6, 2023"
/// ```
pub fn format_date(date: NaiveDate, format: &str) -> String {
    let items: Vec<Item> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        tracing::warn!("Invalid date format {:?}, using {}", format, ISO_DATE);
        return date.format(ISO_DATE).to_string();
    }
    date.format_with_items(items.into_iter()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(date(2023, 1, 6), "%B %-d, %Y"), "January 6, 2023");
        assert_eq!(format_date(date(2022, 11, 30), "%Y-%m-%d"), "2022-11-30");
    }

    #[test]
    fn test_invalid_format_falls_back() {
        assert_eq!(format_date(date(2022, 4, 6), "%Q %Y"), "2022-04-06");
    }
}
