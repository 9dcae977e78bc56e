//! Lenient numeric handling for operator-entered values.
//!
//! Values arrive as free text from report forms. Anything that is not a
//! finite decimal number is treated as "no number" rather than an error.

/// Parse a result value, ignoring surrounding whitespace.
///
/// Returns `None` for blank text, qualitative labels and the textual
/// spellings of NaN and infinity that `f64::from_str` would otherwise accept.
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a value that must be strictly positive to be usable as a formula input.
pub fn parse_positive(value: &str) -> Option<f64> {
    parse_number(value).filter(|v| *v > 0.0)
}

/// Format with a fixed number of decimals, rounding exact ties away from zero.
///
/// Mirrors how report forms have always displayed computed values, so a
/// stored `0.25` at one decimal reads `0.3`, not the banker's `0.2`.
/// Non-finite input formats as an empty string.
pub fn to_fixed(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let value = if value == 0.0 { 0.0 } else { value };

    const GUARD: usize = 40;
    let exact = format!("{:.*}", decimals + GUARD, value.abs());
    let tail = &exact[exact.len() - GUARD..];
    let is_tie = tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0');

    if !is_tie {
        return format!("{:.*}", decimals, value);
    }

    let scale = 10f64.powi(decimals as i32);
    let units = (value.abs() * scale).round() as u64;
    let sign = if value < 0.0 { "-" } else { "" };
    if decimals == 0 {
        return format!("{}{}", sign, units);
    }
    let pow = 10u64.pow(decimals as u32);
    format!("{}{}.{:0width$}", sign, units / pow, units % pow, width = decimals)
}
