// Display formatting helpers shared by every page.
//
// Everything the screen shows as a number goes through here so that missing
// values render as `0` and never as an empty cell.
use num_format::{Locale, ToFormattedString};
use serde_json::Value;

const FILE_SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Format a count with `,` thousands separators.
///
/// - Whole numbers print without a decimal part (`1234567` -> `1,234,567`).
/// - Fractions keep their shortest decimal representation; only the integer
///   part is grouped (`1234.5` -> `1,234.5`).
/// - Non-finite input is treated as zero.
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return "0".to_string();
    }
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    // `{}` on f64 gives the shortest round-trip form, e.g. `1234.5` or `12`.
    let s = format!("{}", abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // `{}` never uses an exponent, so the integer part can be far wider than
    // u64. u128 covers every realistic count; past that the digits are kept
    // ungrouped rather than lost.
    let mut res = match int_part.parse::<u128>() {
        Ok(v) => v.to_formatted_string(&Locale::en),
        Err(_) => int_part.to_string(),
    };
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// `format_number` for an optional metric, defaulting to zero.
pub fn format_count(n: Option<f64>) -> String {
    format_number(n.unwrap_or(0.0))
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Render a percentage the way the server reports it: `35%`, `12.5%`, `0%`.
pub fn format_percent(n: Option<f64>) -> String {
    format!("{}%", plain_number(n.unwrap_or(0.0)))
}

/// Shortest decimal form without grouping.
///
/// - Whole values drop the `.0` (`12.0` -> `12`).
/// - Fractions keep the shortest round-trip digits (`12.5` -> `12.5`).
/// - Non-finite values become `0`, like a missing metric.
pub fn plain_number(n: f64) -> String {
    if !n.is_finite() {
        return "0".to_string();
    }
    // `{:.0}` avoids the trailing `.0`; `{}` already prints fractions minimally.
    if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// Human readable size with 1024-based units, at most two decimals and no
/// trailing zeros: `0 Bytes`, `1 KB`, `1.5 KB`, `48.83 MB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let k = 1024f64;
    let b = bytes as f64;
    // Unit index is log base 1024, clamped so anything past GB stays in GB.
    let i = ((b.ln() / k.ln()).floor() as usize).min(FILE_SIZE_UNITS.len() - 1);
    let scaled = b / k.powi(i as i32);
    // Two decimals at most; `plain_number` drops the zeros that remain.
    let rounded = (scaled * 100.0).round() / 100.0;
    format!("{} {}", plain_number(rounded), FILE_SIZE_UNITS[i])
}

/// Loose truthiness for flags the server may send as `1`, `"1"`, `true` or
/// `"Sí"`. Null, zero, empty strings, `"0"` and `"false"` are false.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => {
            let s = s.trim();
            !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
        }
        Value::Array(_) | Value::Object(_) => true,
    }
}
