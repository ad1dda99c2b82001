// SPDX: CC0-1.0

//! Vertical asymptote positions inside a world-x interval.
//!
//! Two periodic families are recognised from the expression text (`tan`,
//! `cot`); for a top-level quotient the denominator is scanned for roots.
//! Roots of even order that touch zero without a sign change, and roots
//! closer together than one scan interval, can be missed.

use crate::{function::normalize, Number};
use core::{
    f64::consts::{FRAC_PI_2, PI},
    fmt,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocatorConfig {
    /// Uniform samples of the denominator across the interval.
    pub samples: usize,
    /// A sample this close to zero is a root as-is.
    pub zero: Number,
    pub bisect_iterations: usize,
    pub bisect_tolerance: Number,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            samples: 1000,
            zero: 1e-6,
            bisect_iterations: 20,
            bisect_tolerance: 1e-9,
        }
    }
}

/// `(base, period)` of the poles of a recognised periodic family.
pub fn periodic_poles(text: &str) -> Option<(Number, Number)> {
    let text = normalize(text);
    if text.contains("tan(") {
        Some((FRAC_PI_2, PI))
    } else if text.contains("cot(") {
        Some((0.0, PI))
    } else {
        None
    }
}

/// Every `base + k·period` in `[min, max]`, ascending.
pub fn enumerate_periodic(base: Number, period: Number, min: Number, max: Number) -> Vec<Number> {
    let lo = ((min - base) / period).ceil();
    let hi = ((max - base) / period).floor();
    if !(lo.is_finite() && hi.is_finite()) || lo > hi {
        return Vec::new();
    }
    let (lo, hi) = (lo as i64, hi as i64);
    (lo..=hi)
        .map(|k| base + k as Number * period)
        .filter(|x| (min..=max).contains(x))
        .collect()
}

/// Sorted asymptote positions in `[min, max]`.
///
/// `denominator` is the compiled denominator of a top-level quotient, if
/// the expression is one. Failures while scanning are logged and whatever
/// was found so far is returned.
pub fn locate<D, E>(
    text: &str,
    denominator: Option<D>,
    min: Number,
    max: Number,
    config: &LocatorConfig,
) -> Vec<Number>
where
    D: Fn(Number) -> Result<Number, E>,
    E: fmt::Display,
{
    if !(min.is_finite() && max.is_finite() && min < max) {
        return Vec::new();
    }

    if let Some((base, period)) = periodic_poles(text) {
        return enumerate_periodic(base, period, min, max);
    }

    let Some(denominator) = denominator else {
        return Vec::new();
    };

    let mut roots = Vec::new();
    if let Err(err) = scan_roots(&denominator, min, max, config, &mut roots) {
        log::warn!(
            "asymptote scan of '{text}' stopped after {} root(s): {err}",
            roots.len()
        );
    }
    roots.sort_by(Number::total_cmp);
    roots.dedup_by(|a, b| (*a - *b).abs() < config.zero);
    roots
}

fn scan_roots<D, E>(
    f: &D,
    min: Number,
    max: Number,
    config: &LocatorConfig,
    roots: &mut Vec<Number>,
) -> Result<(), E>
where
    D: Fn(Number) -> Result<Number, E>,
{
    let n = config.samples.max(2);
    let h = (max - min) / (n - 1) as Number;
    let at = |i: usize| if i + 1 == n { max } else { min + i as Number * h };

    let mut a = at(0);
    let mut fa = f(a)?;
    for i in 1..n {
        let b = at(i);
        let fb = f(b)?;
        if fa.abs() < config.zero {
            roots.push(a);
        } else if fb.abs() >= config.zero && fa * fb < 0.0 {
            roots.push(bisect(f, (a, fa), b, config)?);
        }
        a = b;
        fa = fb;
    }
    if fa.abs() < config.zero {
        roots.push(a);
    }
    Ok(())
}

/// Root of `f` in `[a, b]` given a sign change between the ends.
fn bisect<D, E>(
    f: &D,
    (mut a, mut fa): (Number, Number),
    mut b: Number,
    config: &LocatorConfig,
) -> Result<Number, E>
where
    D: Fn(Number) -> Result<Number, E>,
{
    for _ in 0..config.bisect_iterations {
        let mid = 0.5 * (a + b);
        let fm = f(mid)?;
        if fm.abs() < config.bisect_tolerance {
            return Ok(mid);
        }
        if fa * fm < 0.0 {
            b = mid;
        } else {
            a = mid;
            fa = fm;
        }
    }
    Ok(0.5 * (a + b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use core::convert::Infallible;

    fn no_denominator() -> Option<fn(Number) -> Result<Number, Infallible>> {
        None
    }

    #[test]
    fn tangent_poles() {
        let roots = locate("tan(x)", no_denominator(), 0.0, 2.0 * PI, &Default::default());
        assert_eq!(roots.len(), 2);
        assert_abs_diff_eq!(roots[0], FRAC_PI_2, epsilon = 1e-9);
        assert_abs_diff_eq!(roots[1], 3.0 * FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn cotangent_poles_include_origin() {
        for text in ["2COT(x)", "2 cot (x)"] {
            let roots = locate(text, no_denominator(), -1.0, 4.0, &Default::default());
            assert_eq!(roots.len(), 2, "{text}");
            assert_abs_diff_eq!(roots[0], 0.0);
            assert_abs_diff_eq!(roots[1], PI, epsilon = 1e-9);
        }
    }

    #[test]
    fn spaced_tangent_is_recognised() {
        assert_eq!(periodic_poles("tan (x)"), Some((FRAC_PI_2, PI)));
        assert_eq!(periodic_poles("TAN\t( 2x )"), Some((FRAC_PI_2, PI)));
        assert_eq!(periodic_poles("tanh(x)"), None);
    }

    #[test]
    fn reciprocal_has_one_root() {
        let den = |x: Number| Ok::<_, Infallible>(x);
        let roots = locate("1/x", Some(den), -5.0, 5.0, &Default::default());
        assert_eq!(roots.len(), 1);
        // one scan interval over 2^20 bisection steps
        assert_abs_diff_eq!(roots[0], 0.0, epsilon = 1e-7);
    }

    #[test]
    fn exact_zero_sample_is_recorded_once() {
        let den = |x: Number| Ok::<_, Infallible>(x - 1.0);
        let config = LocatorConfig {
            samples: 5,
            ..Default::default()
        };
        // samples at -1, 0, 1, 2, 3
        let roots = locate("1/(x-1)", Some(den), -1.0, 3.0, &config);
        assert_eq!(roots, vec![1.0]);
    }

    #[test]
    fn two_roots_in_quadratic_denominator() {
        let den = |x: Number| Ok::<_, Infallible>(x * x - 4.0);
        let roots = locate("1/(x^2-4)", Some(den), -5.0, 5.0, &Default::default());
        assert_eq!(roots.len(), 2);
        assert_abs_diff_eq!(roots[0], -2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(roots[1], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn failure_keeps_partial_results() {
        let den = |x: Number| if x < 2.5 { Ok(x) } else { Err("boom") };
        let roots = locate("1/x", Some(den), -5.0, 5.0, &Default::default());
        assert_eq!(roots.len(), 1);
    }

    #[test]
    fn not_a_quotient() {
        assert!(locate("x^2", no_denominator(), -5.0, 5.0, &Default::default()).is_empty());
    }

    #[test]
    fn empty_interval() {
        let den = |x: Number| Ok::<_, Infallible>(x);
        assert!(locate("1/x", Some(den), 1.0, 1.0, &Default::default()).is_empty());
    }
}
