// Utility functions
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static DIGIT_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("static regex"));

static DRIVE_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"id=([-a-zA-Z0-9_]+)", r"/file/d/([-a-zA-Z0-9_]+)", r"open\?id=([-a-zA-Z0-9_]+)"]
        .iter()
        .map(|p| Regex::new(p).expect("static regex"))
        .collect()
});

/// Best-effort date cleanup: the first three digit runs become year-month-day.
///
/// A two-digit year gets a "20" prefix. Anything with fewer than three digit
/// runs comes back trimmed but otherwise untouched.
pub fn clean_date_str(raw: &str) -> String {
    let s = raw.trim();
    let nums: Vec<&str> = DIGIT_RUNS.find_iter(s).map(|m| m.as_str()).take(3).collect();
    if nums.len() < 3 {
        return s.to_string();
    }
    let (Ok(month), Ok(day)) = (nums[1].parse::<u64>(), nums[2].parse::<u64>()) else {
        return s.to_string();
    };
    let year = if nums[0].len() == 2 {
        format!("20{}", nums[0])
    } else {
        nums[0].to_string()
    };
    format!("{}-{:02}-{:02}", year, month, day)
}

/// Lenient integer coercion for stored sheet values; junk and blanks become 0.
pub fn coerce_int(raw: &str) -> i64 {
    let s = raw.trim().replace(',', "");
    if let Ok(v) = s.parse::<i64>() {
        return v;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => v.trunc() as i64,
        _ => 0,
    }
}

/// Money strings like "12,300원" keep only their digits. No digits is 0;
/// more digits than fit in an i64 saturate.
pub fn digits_amount(raw: &str) -> i64 {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or_else(|_| {
        warn!("Amount '{}' is out of range, saturating", raw);
        i64::MAX
    })
}

/// Strict quantity parse for uploaded order lines.
pub fn parse_quantity(raw: &str) -> Option<i64> {
    let s = raw.trim().replace(',', "");
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    // spreadsheet exports sometimes render integers as "3.0"
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Some(v as i64),
        _ => None,
    }
}

/// Extracts the file id from a Google Drive share link.
pub fn drive_file_id(url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    DRIVE_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url).map(|c| c[1].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_is_rebuilt_from_digit_runs() {
        assert_eq!(clean_date_str("2024. 3. 7. 오후 2:15"), "2024-03-07");
        assert_eq!(clean_date_str(" 24/12/01 "), "2024-12-01");
        assert_eq!(clean_date_str("2024-01-05 13:22:11"), "2024-01-05");
    }

    #[test]
    fn cleaning_a_clean_date_is_idempotent() {
        let once = clean_date_str("2023.11.9");
        assert_eq!(once, "2023-11-09");
        assert_eq!(clean_date_str(&once), once);
    }

    #[test]
    fn non_date_passes_through_trimmed() {
        assert_eq!(clean_date_str("  soon "), "soon");
        assert_eq!(clean_date_str("March 5"), "March 5");
        assert_eq!(clean_date_str(""), "");
    }

    #[test]
    fn coercion_defaults_to_zero() {
        assert_eq!(coerce_int("12"), 12);
        assert_eq!(coerce_int(" -3 "), -3);
        assert_eq!(coerce_int("1,200"), 1200);
        assert_eq!(coerce_int("7.9"), 7);
        assert_eq!(coerce_int("n/a"), 0);
        assert_eq!(coerce_int(""), 0);
    }

    #[test]
    fn amount_keeps_digits_only() {
        assert_eq!(digits_amount("12,300원"), 12300);
        assert_eq!(digits_amount("free"), 0);
        assert_eq!(digits_amount("99999999999999999999원"), i64::MAX);
    }

    #[test]
    fn quantity_rejects_junk() {
        assert_eq!(parse_quantity("3"), Some(3));
        assert_eq!(parse_quantity("3.0"), Some(3));
        assert_eq!(parse_quantity("0"), Some(0));
        assert_eq!(parse_quantity("2.5"), None);
        assert_eq!(parse_quantity("two"), None);
        assert_eq!(parse_quantity(" "), None);
    }

    #[test]
    fn drive_ids_from_share_links() {
        assert_eq!(
            drive_file_id("https://drive.google.com/file/d/1AbC_d-9/view").as_deref(),
            Some("1AbC_d-9")
        );
        assert_eq!(
            drive_file_id("https://drive.google.com/open?id=XyZ").as_deref(),
            Some("XyZ")
        );
        assert_eq!(drive_file_id("https://example.com/pic.png"), None);
    }
}
