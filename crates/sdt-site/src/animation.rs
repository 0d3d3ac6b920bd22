//! Easing curves and CSS `transition` shorthand parsing.

use serde::{Deserialize, Serialize};

/// Timing function for transitions and smooth scrolling
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Easing {
    /// Linear interpolation
    Linear,
    /// Quadratic ease-in-out
    EaseInOut,
    /// CSS `cubic-bezier(x1, y1, x2, y2)`
    CubicBezier(f64, f64, f64, f64),
}

impl Easing {
    /// Material "standard" curve used by the menu collapse
    pub const STANDARD: Self = Self::CubicBezier(0.4, 0.0, 0.2, 1.0);

    /// Evaluate at progress `t` in `[0, 1]`
    #[must_use]
    pub fn evaluate(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Self::Linear => t,
            Self::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Self::CubicBezier(x1, y1, x2, y2) => {
                if t <= 0.0 || t >= 1.0 {
                    return t;
                }
                let s = solve_bezier_x(t, x1, x2);
                bezier(s, y1, y2)
            }
        }
    }

    /// Parse a CSS timing function keyword or `cubic-bezier(...)`
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        match text {
            "linear" => return Some(Self::Linear),
            "ease" => return Some(Self::CubicBezier(0.25, 0.1, 0.25, 1.0)),
            "ease-in" => return Some(Self::CubicBezier(0.42, 0.0, 1.0, 1.0)),
            "ease-out" => return Some(Self::CubicBezier(0.0, 0.0, 0.58, 1.0)),
            "ease-in-out" => return Some(Self::CubicBezier(0.42, 0.0, 0.58, 1.0)),
            _ => {}
        }
        let inner = text.strip_prefix("cubic-bezier(")?.strip_suffix(')')?;
        let nums: Vec<f64> = inner
            .split(',')
            .map(|n| n.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        match nums.as_slice() {
            &[x1, y1, x2, y2] if (0.0..=1.0).contains(&x1) && (0.0..=1.0).contains(&x2) => {
                Some(Self::CubicBezier(x1, y1, x2, y2))
            }
            _ => None,
        }
    }
}

impl Default for Easing {
    fn default() -> Self {
        Self::CubicBezier(0.25, 0.1, 0.25, 1.0)
    }
}

/// One-dimensional cubic bezier with endpoints 0 and 1
fn bezier(s: f64, p1: f64, p2: f64) -> f64 {
    let ms = 1.0 - s;
    3.0 * ms * ms * s * p1 + 3.0 * ms * s * s * p2 + s * s * s
}

fn bezier_slope(s: f64, p1: f64, p2: f64) -> f64 {
    let ms = 1.0 - s;
    3.0 * ms * ms * p1 + 6.0 * ms * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}

/// Find the curve parameter whose x equals `x` (Newton, then bisection)
fn solve_bezier_x(x: f64, x1: f64, x2: f64) -> f64 {
    let mut s = x;
    for _ in 0..8 {
        let err = bezier(s, x1, x2) - x;
        if err.abs() < 1e-7 {
            return s;
        }
        let slope = bezier_slope(s, x1, x2);
        if slope.abs() < 1e-6 {
            break;
        }
        s -= err / slope;
    }

    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    s = x;
    for _ in 0..50 {
        let v = bezier(s, x1, x2);
        if (v - x).abs() < 1e-7 {
            break;
        }
        if v < x {
            lo = s;
        } else {
            hi = s;
        }
        s = (lo + hi) / 2.0;
    }
    s
}

/// Parse `0.3s` or `300ms` into milliseconds
#[must_use]
pub fn parse_duration_ms(text: &str) -> Option<u64> {
    let text = text.trim();
    let ms = if let Some(v) = text.strip_suffix("ms") {
        v.trim().parse::<f64>().ok()?
    } else if let Some(v) = text.strip_suffix('s') {
        v.trim().parse::<f64>().ok()? * 1000.0
    } else {
        return None;
    };
    if ms.is_finite() && ms >= 0.0 {
        Some(ms.round() as u64)
    } else {
        None
    }
}

/// One entry of a `transition` shorthand
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionSpec {
    /// Animated property, or `all`
    pub property: String,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Timing function
    pub easing: Easing,
}

impl TransitionSpec {
    /// Parse a `transition` shorthand such as
    /// `height 0.3s cubic-bezier(0.4, 0, 0.2, 1), opacity 200ms`.
    ///
    /// Entries without a duration are dropped.
    #[must_use]
    pub fn parse_list(text: &str) -> Vec<Self> {
        split_top_level(text)
            .into_iter()
            .filter_map(|entry| Self::parse_one(&entry))
            .collect()
    }

    fn parse_one(entry: &str) -> Option<Self> {
        let mut property = None;
        let mut duration_ms = None;
        let mut easing = Easing::default();

        for token in tokens(entry) {
            if let Some(ms) = parse_duration_ms(&token) {
                // Second time value is the delay
                if duration_ms.is_none() {
                    duration_ms = Some(ms);
                }
            } else if let Some(e) = Easing::parse(&token) {
                easing = e;
            } else if property.is_none() {
                property = Some(token);
            }
        }

        Some(Self {
            property: property.unwrap_or_else(|| "all".to_string()),
            duration_ms: duration_ms?,
            easing,
        })
    }

    /// Whether a change to `property` is animated by this entry
    #[must_use]
    pub fn applies_to(&self, property: &str) -> bool {
        self.property == "all" || self.property == property
    }
}

fn split_top_level(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    out.push(current);
    out.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Whitespace tokens, keeping parenthesised groups whole
fn tokens(entry: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in entry.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_endpoints() {
        for e in [Easing::Linear, Easing::EaseInOut, Easing::STANDARD, Easing::default()] {
            assert!(e.evaluate(0.0).abs() < 1e-9);
            assert!((e.evaluate(1.0) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_bezier_matches_linear_when_control_points_on_diagonal() {
        let e = Easing::CubicBezier(0.25, 0.25, 0.75, 0.75);
        for i in 0..=10 {
            let t = f64::from(i) / 10.0;
            assert!((e.evaluate(t) - t).abs() < 1e-4);
        }
    }

    #[test]
    fn test_standard_curve_is_front_loaded() {
        // cubic-bezier(0.4, 0, 0.2, 1) is past the midpoint well before t = 0.5
        assert!(Easing::STANDARD.evaluate(0.5) > 0.7);
    }

    #[test]
    fn test_parse_easing() {
        assert_eq!(Easing::parse("linear"), Some(Easing::Linear));
        assert_eq!(
            Easing::parse("cubic-bezier(0.4, 0, 0.2, 1)"),
            Some(Easing::STANDARD)
        );
        assert_eq!(Easing::parse("cubic-bezier(1.4, 0, 0.2, 1)"), None);
        assert_eq!(Easing::parse("steps(4)"), None);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration_ms("0.3s"), Some(300));
        assert_eq!(parse_duration_ms("350ms"), Some(350));
        assert_eq!(parse_duration_ms("fast"), None);
    }

    #[test]
    fn test_parse_transition_list() {
        let specs = TransitionSpec::parse_list("height 0.3s cubic-bezier(0.4, 0, 0.2, 1), opacity 200ms 50ms");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].property, "height");
        assert_eq!(specs[0].duration_ms, 300);
        assert_eq!(specs[0].easing, Easing::STANDARD);
        assert_eq!(specs[1].property, "opacity");
        assert_eq!(specs[1].duration_ms, 200);
        assert!(specs[0].applies_to("height"));
        assert!(!specs[0].applies_to("width"));
        assert!(TransitionSpec::parse_list("height").is_empty());
    }

    proptest! {
        #[test]
        fn prop_standard_curve_monotonic(a in 0.0f64..1.0, b in 0.0f64..1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(Easing::STANDARD.evaluate(lo) <= Easing::STANDARD.evaluate(hi) + 1e-6);
        }
    }
}
