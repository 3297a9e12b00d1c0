//! Cell-level parsing for the performance export: timestamps and signed currency amounts.
//!
//! Both parsers are best-effort. They never fail; malformed input comes back unchanged
//! (timestamps) or as NaN (amounts) so that bad rows stay visible after ingestion.

use models::CellValue;

const CURRENCY_SYMBOLS: [char; 4] = ['$', '€', '£', '¥'];

/// Rewrites a US-style `month/day/year time` timestamp to `year/MM/DD time`.
///
/// Input without a `/` is returned as is, and so is a date that is already year-first
/// or whose year is not four digits, which makes the function idempotent. The time portion is
/// kept verbatim.
pub fn normalize_timestamp(raw: &str) -> String {
    if !raw.contains('/') {
        return raw.to_string();
    }

    let trimmed = raw.trim();
    let (date_part, time_part) = match trimmed.split_once(char::is_whitespace) {
        Some((date, time)) => (date, time.trim_start()),
        None => (trimmed, ""),
    };

    let segments: Vec<&str> = date_part.split('/').collect();
    let [month, day, year] = segments.as_slice() else {
        return raw.to_string();
    };
    if month.len() == 4 || year.len() != 4 {
        return raw.to_string();
    }

    let date = format!("{}/{:0>2}/{:0>2}", year, month, day);
    if time_part.is_empty() {
        date
    } else {
        format!("{} {}", date, time_part)
    }
}

/// Timestamp column value in canonical text form.
///
/// Native spreadsheet date cells are formatted directly; text goes through
/// [`normalize_timestamp`].
pub fn timestamp_cell(cell: &CellValue) -> String {
    match cell {
        CellValue::Text(s) => normalize_timestamp(s),
        other => other.to_text(),
    }
}

/// Parses a P&L cell such as `$12.50`, `$(12.50)` or `(1,204.00)`.
///
/// Falsy cells are 0. Parentheses mean negative. Anything left that is not a number
/// yields NaN rather than 0.
pub fn parse_signed_currency(raw: &CellValue) -> f64 {
    if raw.is_falsy() {
        return 0.0;
    }
    match raw {
        CellValue::Number(n) => *n,
        other => parse_signed_currency_str(&other.to_text()),
    }
}

pub fn parse_signed_currency_str(raw: &str) -> f64 {
    if raw.is_empty() {
        return 0.0;
    }

    let clean: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && !CURRENCY_SYMBOLS.contains(c))
        .collect();
    let is_negative = clean.starts_with('(') && clean.ends_with(')');
    let digits = clean.replace(['(', ')'], "");

    let value = digits.parse::<f64>().unwrap_or(f64::NAN);
    if is_negative {
        -value
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_normalize_us_timestamp() {
        assert_eq!(normalize_timestamp("1/5/2024 09:30:00"), "2024/01/05 09:30:00");
        assert_eq!(normalize_timestamp("12/31/2023 23:59:59"), "2023/12/31 23:59:59");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_timestamp("3/7/2024 14:02:11");
        assert_eq!(normalize_timestamp(&once), once);
        assert_eq!(normalize_timestamp("2024/01/05 09:30:00"), "2024/01/05 09:30:00");
    }

    #[test]
    fn test_normalize_passes_through_without_slash() {
        assert_eq!(normalize_timestamp("2024-01-05 09:30:00"), "2024-01-05 09:30:00");
        assert_eq!(normalize_timestamp(""), "");
        assert_eq!(normalize_timestamp("garbage"), "garbage");
    }

    #[test]
    fn test_normalize_keeps_time_portion_verbatim() {
        assert_eq!(normalize_timestamp("1/5/2024 9:30:00 AM"), "2024/01/05 9:30:00 AM");
        assert_eq!(normalize_timestamp("1/5/2024"), "2024/01/05");
    }

    #[test]
    fn test_normalize_leaves_odd_dates_alone() {
        assert_eq!(normalize_timestamp("1/5 09:30"), "1/5 09:30");
        assert_eq!(normalize_timestamp("1/2/3/4 09:30"), "1/2/3/4 09:30");
        assert_eq!(normalize_timestamp("1/5/24 09:30"), "1/5/24 09:30");
    }

    #[test]
    fn test_timestamp_cell_formats_native_dates() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        assert_eq!(timestamp_cell(&CellValue::DateTime(dt)), "2024/03/01 09:05:00");
        assert_eq!(timestamp_cell(&text("3/1/2024 09:05:00")), "2024/03/01 09:05:00");
        assert_eq!(timestamp_cell(&CellValue::Empty), "");
    }

    #[test]
    fn test_currency_plain_and_prefixed() {
        assert_eq!(parse_signed_currency(&text("$12.50")), 12.5);
        assert_eq!(parse_signed_currency(&text(" $ 7 ")), 7.0);
        assert_eq!(parse_signed_currency(&text("$1,204.25")), 1204.25);
        assert_eq!(parse_signed_currency(&CellValue::Number(-3.5)), -3.5);
    }

    #[test]
    fn test_currency_parentheses_are_negative() {
        assert_eq!(parse_signed_currency(&text("$(12.50)")), -12.5);
        assert_eq!(parse_signed_currency(&text("(100)")), -100.0);
        for n in ["0.25", "17", "1234.5", "0"] {
            let wrapped = format!("({})", n);
            assert_eq!(
                parse_signed_currency_str(&wrapped),
                -parse_signed_currency_str(n)
            );
        }
    }

    #[test]
    fn test_currency_falsy_is_zero() {
        assert_eq!(parse_signed_currency(&CellValue::Empty), 0.0);
        assert_eq!(parse_signed_currency(&text("")), 0.0);
        assert_eq!(parse_signed_currency(&CellValue::Number(0.0)), 0.0);
        assert_eq!(parse_signed_currency(&CellValue::Bool(false)), 0.0);
    }

    #[test]
    fn test_currency_garbage_is_nan() {
        assert!(parse_signed_currency(&text("n/a")).is_nan());
        assert!(parse_signed_currency(&text("()")).is_nan());
        assert!(parse_signed_currency(&text("$abc")).is_nan());
    }
}
