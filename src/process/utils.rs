/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Best-effort numeric coercion: cleaned string → f64, `None` on anything
/// unparseable or empty. Thousands separators are tolerated since the public
/// spreadsheets use them.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = clean_str(raw);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.replace(',', "").parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_str_strips_quotes_and_space() {
        assert_eq!(clean_str("  \"123.4\" "), "123.4");
        assert_eq!(clean_str("plain"), "plain");
        assert_eq!(clean_str("\"quoted\""), "quoted");
    }

    #[test]
    fn parse_number_coerces_or_gives_none() {
        assert_eq!(parse_number("10"), Some(10.0));
        assert_eq!(parse_number(" \"3.5\" "), Some(3.5));
        assert_eq!(parse_number("1,234.5"), Some(1234.5));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("결측"), None);
    }
}
