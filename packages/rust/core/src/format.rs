//! Number and text formatting shared by prompts and the appendix.

/// Format `value` with comma thousands separators and `decimals` fraction digits.
pub fn with_thousands(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (whole, fraction) = match fixed.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Whole-dollar amount, e.g. `$12,345`.
pub fn currency(amount: f64) -> String {
    let formatted = with_thousands(amount, 0);
    match formatted.strip_prefix('-') {
        Some(rest) => format!("-${rest}"),
        None => format!("${formatted}"),
    }
}

/// First `max_chars` characters of `text`.
pub fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
