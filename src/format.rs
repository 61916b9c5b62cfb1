//! Number formatting for fish counts.

/// Suffix tiers, largest first.
const TIERS: &[(f64, &str)] = &[
    (1e18, "E"),
    (1e15, "P"),
    (1e12, "Q"),
    (1e9, "T"),
    (1e6, "M"),
];

/// Format a fish count for display.
///
/// Values from one million up use a suffix with one decimal (`1.5M`, `2T`).
/// Smaller values get thousands separators; integers below 10,000 print no
/// decimals, anything else keeps at most one.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".into();
    }
    if n.is_infinite() {
        return if n > 0.0 { "∞".into() } else { "-∞".into() };
    }
    if n != 0.0 && n.abs() < 1e-6 {
        return format!("{:.1e}", n);
    }

    for &(limit, suffix) in TIERS {
        if n.abs() >= limit {
            let mut s = format!("{:.1}", n / limit);
            if s.ends_with(".0") {
                s.truncate(s.len() - 2);
            }
            return s + suffix;
        }
    }

    let decimals = if n.fract() == 0.0 && n.abs() < 10_000.0 {
        0
    } else {
        1
    };
    let rounded = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match rounded.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.trim_end_matches('0').to_string())),
        None => (rounded, None),
    };

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let mut out = String::new();
    if n < 0.0 && (grouped != "0" || frac_part.as_deref().is_some_and(|f| !f.is_empty())) {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part.filter(|f| !f.is_empty()) {
        out.push('.');
        out.push_str(&frac);
    }
    out
}

/// Milliseconds as seconds with one decimal, e.g. `12.5s`.
pub fn format_seconds(ms: f64) -> String {
    format!("{:.1}s", ms / 1_000.0)
}
