//! Conversions from the human-readable quantities printed by the container runtime.
//!
//! Every parser here is total: input it does not understand yields `0`.

/// Prefix letters in order of magnitude, matched case-insensitively.
const PREFIXES: [char; 5] = ['k', 'm', 'g', 't', 'p'];

/// `"12.34%"` -> `12.34`.
pub fn parse_percent(text: &str) -> f64 {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '%')
        .collect();
    match digits.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value,
        _ => 0.0,
    }
}

/// `"512MiB"` -> `512 * 1024^2`. Units are `B`, `kiB`, `MiB`, `GiB`, `TiB`, `PiB`.
pub fn parse_binary_bytes(text: &str) -> u64 {
    let Some((number, unit)) = split_quantity(text) else {
        return 0;
    };
    let Some(order) = binary_order(unit) else {
        return 0;
    };
    scale(number, order)
}

/// `"3kB"` -> `3 * 1024`. Units are `B`, `kB`, `MB`, `GB`, `TB`, `PB`.
///
/// The multiplier is 1024 per step even though the units are nominally decimal.
/// Published series already depend on this scale.
pub fn parse_decimal_bytes(text: &str) -> u64 {
    let Some((number, unit)) = split_quantity(text) else {
        return 0;
    };
    let Some(order) = decimal_order(unit) else {
        return 0;
    };
    scale(number, order)
}

/// `used` as a percentage of `total`, rounded to two decimals. `0` when `total` is `0`.
pub fn ratio_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let ratio = used as f64 * 100.0 / total as f64;
    (ratio * 100.0).round() / 100.0
}

/// Splits `<number><optional space><unit>` into the integral part of the number and the unit.
fn split_quantity(text: &str) -> Option<(u64, &str)> {
    let end = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, rest) = text.split_at(end);
    let integral = number.split('.').next().unwrap_or_default();
    if integral.is_empty() {
        return None;
    }
    let integral = integral.parse::<u64>().ok()?;
    let unit = rest.strip_prefix(' ').unwrap_or(rest);
    Some((integral, unit))
}

fn binary_order(unit: &str) -> Option<u32> {
    let mut chars = unit.chars();
    match (chars.next(), chars.next(), chars.next(), chars.next()) {
        (Some('B' | 'b'), None, None, None) => Some(0),
        (Some(prefix), Some('i'), Some('B' | 'b'), None) => prefix_order(prefix),
        _ => None,
    }
}

fn decimal_order(unit: &str) -> Option<u32> {
    let mut chars = unit.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('B' | 'b'), None, None) => Some(0),
        (Some(prefix), Some('B' | 'b'), None) => prefix_order(prefix),
        _ => None,
    }
}

fn prefix_order(prefix: char) -> Option<u32> {
    let prefix = prefix.to_ascii_lowercase();
    let pos = PREFIXES.iter().position(|p| *p == prefix)?;
    u32::try_from(pos + 1).ok()
}

fn scale(number: u64, order: u32) -> u64 {
    1024_u64
        .checked_pow(order)
        .and_then(|multiplier| number.checked_mul(multiplier))
        .unwrap_or(0)
}
