use std::borrow::Cow;

/// Token the source uses for "no value".
pub const MISSING_TOKEN: &str = "N.A.";

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

/// True for the `N.A.` sentinel or an empty cell, after cleaning.
pub fn is_missing(raw: &str) -> bool {
    let c = clean_str(raw);
    c.is_empty() || c.eq_ignore_ascii_case(MISSING_TOKEN)
}

fn strip_grouping(s: &str) -> Cow<'_, str> {
    if s.contains(',') {
        Cow::Owned(s.replace(',', ""))
    } else {
        Cow::Borrowed(s)
    }
}

/// `"1,439,323,776"` → `1439323776`
pub fn parse_grouped_uint(raw: &str) -> Option<u64> {
    let c = clean_str(raw);
    if c.is_empty() {
        return None;
    }
    strip_grouping(c).parse().ok()
}

/// `"-383,840"` → `-383840`
pub fn parse_grouped_int(raw: &str) -> Option<i64> {
    let c = clean_str(raw);
    if c.is_empty() {
        return None;
    }
    strip_grouping(c).parse().ok()
}

/// `"26,337"` → `26337.0`; rejects NaN and infinities.
pub fn parse_grouped_decimal(raw: &str) -> Option<f64> {
    let c = clean_str(raw);
    if c.is_empty() {
        return None;
    }
    strip_grouping(c)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// `"61 %"`, `"-0.03%"` or a bare `"1.5"` → the number, `%` dropped.
pub fn parse_percent(raw: &str) -> Option<f64> {
    let c = clean_str(raw);
    let body = c.strip_suffix('%').unwrap_or(c).trim_end();
    parse_grouped_decimal(body)
}
