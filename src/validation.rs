use chrono::{Datelike, NaiveDate, Utc};

pub const MIN_YEAR: i32 = 1900;

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Accepts years between 1900 and the current calendar year.
pub fn parse_year(input: &str) -> Option<i32> {
    let year: i32 = input.trim().parse().ok()?;
    let current = Utc::now().year();
    (MIN_YEAR..=current).contains(&year).then_some(year)
}

pub fn parse_count(input: &str) -> Option<i32> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Some(0);
    }
    trimmed.parse::<i32>().ok().filter(|value| *value >= 0)
}

pub fn parse_optional_date(input: Option<&str>) -> Result<Option<NaiveDate>, chrono::ParseError> {
    match input.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(Some),
        None => Ok(None),
    }
}

pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Sorts ids and removes duplicates.
pub fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("ivanov@university.ru"));
        assert!(is_valid_email("  a.b@c.d  "));
        assert!(!is_valid_email("ivanov"));
        assert!(!is_valid_email("@university.ru"));
        assert!(!is_valid_email("ivanov@localhost"));
        assert!(!is_valid_email("iva nov@university.ru"));
        assert!(!is_valid_email("a@b@c.ru"));
    }

    #[test]
    fn year_range() {
        assert_eq!(parse_year("2023"), Some(2023));
        assert_eq!(parse_year(" 1900 "), Some(1900));
        assert_eq!(parse_year("1899"), None);
        assert_eq!(parse_year("3000"), None);
        assert_eq!(parse_year("abc"), None);
    }

    #[test]
    fn counts_default_to_zero_and_reject_negatives() {
        assert_eq!(parse_count(""), Some(0));
        assert_eq!(parse_count("12"), Some(12));
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count("1.5"), None);
    }

    #[test]
    fn optional_dates() {
        assert_eq!(parse_optional_date(None), Ok(None));
        assert_eq!(parse_optional_date(Some("  ")), Ok(None));
        assert_eq!(
            parse_optional_date(Some("2024-06-30")),
            Ok(NaiveDate::from_ymd_opt(2024, 6, 30))
        );
        assert!(parse_optional_date(Some("30.06.2024")).is_err());
    }

    #[test]
    fn dedup_collapses_repeats() {
        assert_eq!(dedup_ids(&[3, 2, 3, 2]), vec![2, 3]);
        assert!(dedup_ids(&[]).is_empty());
    }
}
