// SPDX: CC0-1.0

//! Adaptive sampling of a [`Function`] into screen-space curves.
//!
//! A pass walks from the left to the right edge of the viewport, keeping at
//! most one open [`Segment`]. A segment is flushed when the walk reaches a
//! located asymptote, when a sample is invalid, or when the break heuristics
//! see a jump the locator missed. Flushes caused by any of those mark the
//! segment end as open; the viewport edges never do.

use crate::{
    asymptote::LocatorConfig, cache::Sample, function::normalize, transform::Transform, Color,
    Function, Number, Point, Rect,
};

/// Tuning constants of a sampling pass. The defaults are empirical and tied
/// to the default step sizes and pixel density.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplerConfig {
    /// Pixels beyond the viewport before a sample counts as a blow-up.
    pub guard_band: Number,
    /// Change in derivative between samples that splits a segment.
    pub derivative_jump: Number,
    /// Derivative magnitude above which a large vertical jump splits.
    pub steep_derivative: Number,
    /// That vertical jump, as a fraction of the viewport height.
    pub displacement_fraction: Number,
    /// World-space offset of the curvature probes.
    pub curvature_probe: Number,
    pub curvature_weight: Number,
    /// Screen-space step bounds `(max, min)` in pixels.
    pub steps: (Number, Number),
    pub hard_steps: (Number, Number),
    /// Derivatives up to this magnitude walk at one pixel per step.
    pub steep_threshold: Number,
    pub flat_derivative: Number,
    pub newton_iterations: usize,
    pub newton_tolerance: Number,
    /// Floor of a world-space step, as a fraction of one pixel.
    pub min_step_fraction: Number,
    /// Half-width of the skipped neighbourhood of an asymptote, in pixels.
    pub asymptote_tolerance: Number,
    pub locator: LocatorConfig,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            guard_band: 10000.0,
            derivative_jump: 1200.0,
            steep_derivative: 500.0,
            displacement_fraction: 0.25,
            curvature_probe: 1e-3,
            curvature_weight: 0.01,
            steps: (10.0, 2.0),
            hard_steps: (5.0, 0.5),
            steep_threshold: 10.0,
            flat_derivative: 1e-6,
            newton_iterations: 10,
            newton_tolerance: 1e-6,
            min_step_fraction: 0.1,
            asymptote_tolerance: 0.5,
            locator: LocatorConfig::default(),
        }
    }
}

/// How a function is walked; fixed when the function is compiled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Exact for degree-1 expressions: one segment between the viewport edges.
    TwoPoint,
    /// World-space walk that solves for the next x at a fixed change in y,
    /// skipping located asymptotes.
    TargetY,
    /// Screen-space walk with steps shrinking with slope and curvature.
    Curvature,
}

/// Text that selects [`Strategy::TargetY`].
const POLE_PATTERNS: [&str; 4] = ["/x", "1/x", "tan(", "cot("];

impl Strategy {
    pub fn select(text: &str, linear: bool) -> Self {
        if linear {
            return Self::TwoPoint;
        }
        let s = normalize(text);
        if POLE_PATTERNS.iter().any(|pat| s.contains(pat)) {
            Self::TargetY
        } else {
            Self::Curvature
        }
    }

    pub const fn skips_asymptotes(self) -> bool {
        matches!(self, Self::TargetY)
    }

    pub const fn detects_breaks(self) -> bool {
        matches!(self, Self::Curvature)
    }
}

/// Screen points accumulated during a pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Segment {
    pub points: Vec<Point>,
    pub open_start: bool,
    pub open_end: bool,
}

/// A finished polyline, ready to stroke.
#[derive(Clone, Debug, PartialEq)]
pub struct Curve {
    pub points: Vec<Point>,
    pub color: Color,
    pub stroke_width: Number,
    /// Start cut by a discontinuity rather than the viewport edge.
    pub open_start: bool,
    pub open_end: bool,
}

#[derive(Debug)]
struct Walk {
    done: Vec<Segment>,
    current: Option<Segment>,
    pending_open_start: bool,
    prev_dy: Number,
}

impl Walk {
    fn new() -> Self {
        Self {
            done: Vec::new(),
            current: None,
            pending_open_start: false,
            prev_dy: Number::NAN,
        }
    }

    fn last_point(&self) -> Option<Point> {
        self.current.as_ref()?.points.last().copied()
    }

    fn push(&mut self, p: Point, dy: Number) {
        let pending = &mut self.pending_open_start;
        let seg = self.current.get_or_insert_with(|| Segment {
            open_start: core::mem::take(pending),
            ..Segment::default()
        });
        seg.points.push(p);
        self.prev_dy = dy;
    }

    fn flush(&mut self, open_end: bool) {
        if let Some(mut seg) = self.current.take() {
            if !seg.points.is_empty() {
                seg.open_end = open_end;
                self.done.push(seg);
            }
        }
    }

    fn cut_at_singularity(&mut self) {
        self.flush(true);
        self.pending_open_start = true;
    }

    fn finish(mut self) -> Vec<Segment> {
        self.flush(false);
        self.done
    }
}

/// Whether a sample following `last` should start a new segment.
fn is_break(
    config: &SamplerConfig,
    height: Number,
    (last, prev_dy): (Point, Number),
    valid: bool,
    (p, dy): (Point, Number),
) -> bool {
    !valid
        || (dy - prev_dy).abs() > config.derivative_jump
        || (dy.abs() > config.steep_derivative
            && (p.y - last.y).abs() > height * config.displacement_fraction)
}

struct Sampler<'a> {
    function: &'a Function,
    rect: Rect,
    transform: &'a Transform,
    config: &'a SamplerConfig,
    left: Number,
    right: Number,
    /// World width of one screen pixel.
    base_step: Number,
}

impl Sampler<'_> {
    fn is_valid(&self, y: Number, p: Point) -> bool {
        y.is_finite()
            && p.y >= self.rect.y0 - self.config.guard_band
            && p.y <= self.rect.y1 + self.config.guard_band
    }

    fn run(&self) -> Vec<Segment> {
        let strategy = self.function.strategy();
        let asymptotes = if strategy.skips_asymptotes() {
            self.function
                .asymptotes(self.left, self.right, &self.config.locator)
        } else {
            Vec::new()
        };
        let tolerance = self.base_step * self.config.asymptote_tolerance;
        let world_walk = strategy == Strategy::TargetY;
        let (mut pos, end, skip) = if world_walk {
            (self.left, self.right, tolerance)
        } else {
            (self.rect.x0, self.rect.x1, self.config.asymptote_tolerance)
        };

        let mut walk = Walk::new();
        while pos <= end {
            let x = if world_walk {
                pos
            } else {
                self.transform.screen_to_world(Point::new(pos, 0.0)).x
            };

            if asymptotes.iter().any(|a| (x - a).abs() < tolerance) {
                walk.cut_at_singularity();
                match self.advance(pos, skip, x) {
                    Some(next) => pos = next,
                    None => break,
                }
                continue;
            }

            let s = self.function.evaluate(x);
            let p = self.transform.world_to_screen(Point::new(x, s.y));
            let valid = self.is_valid(s.y, p);
            let broke = strategy.detects_breaks()
                && walk.last_point().is_some_and(|last| {
                    is_break(
                        self.config,
                        self.rect.height(),
                        (last, walk.prev_dy),
                        valid,
                        (p, s.dy),
                    )
                });

            if broke {
                walk.flush(true);
                if valid {
                    walk.push(p, s.dy);
                }
            } else if valid {
                walk.push(p, s.dy);
            } else {
                walk.flush(true);
            }

            let step = if world_walk {
                self.target_y_step(x, s)
            } else {
                self.curvature_step(x, s.dy)
            };
            match self.advance(pos, step, x) {
                Some(next) => pos = next,
                None => break,
            }
        }
        walk.finish()
    }

    /// `pos + step`, or `None` when the walk would stall: a non-positive
    /// step, or one lost to rounding far from the origin.
    fn advance(&self, pos: Number, step: Number, x: Number) -> Option<Number> {
        let next = pos + step;
        if !(step > 0.0) {
            log::warn!("{}: non-positive step {step} at x = {x}", self.function.name());
            None
        } else if !(next > pos) {
            log::warn!("{}: step {step} vanishes at x = {x}", self.function.name());
            None
        } else {
            Some(next)
        }
    }

    /// Screen-space step from slope and a finite-difference curvature.
    fn curvature_step(&self, x: Number, dy: Number) -> Number {
        let h = self.config.curvature_probe;
        let curvature =
            (self.function.evaluate(x + h).dy - self.function.evaluate(x - h).dy) / (2.0 * h);
        let (max, min) = if self.function.is_hard_to_evaluate() {
            self.config.hard_steps
        } else {
            self.config.steps
        };
        let step = max / (1.0 + dy.abs() + self.config.curvature_weight * curvature.abs());
        if step.is_nan() {
            max
        } else {
            step.max(min).min(max)
        }
    }

    /// World-space step that moves y by about one pixel's worth on steep runs.
    fn target_y_step(&self, x: Number, s: Sample) -> Number {
        let base = self.base_step;
        let slope = s.dy.abs();
        let step = if !s.y.is_finite()
            || slope.is_nan()
            || slope < self.config.flat_derivative
            || slope <= self.config.steep_threshold
        {
            base
        } else {
            let target = s.y + s.dy.signum() * base;
            match self.newton(x, target) {
                Some(next) if next - x > 0.0 => next - x,
                _ => base,
            }
        };
        step.max(base * self.config.min_step_fraction)
    }

    /// Solve `f(x) = target` from `x0`.
    fn newton(&self, x0: Number, target: Number) -> Option<Number> {
        let mut x = x0;
        for _ in 0..self.config.newton_iterations {
            let s = self.function.evaluate(x);
            if !(s.dy.abs() >= self.config.flat_derivative) {
                return None;
            }
            let next = x - (s.y - target) / s.dy;
            if (next - x).abs() < self.config.newton_tolerance {
                return next.is_finite().then_some(next);
            }
            x = next;
        }
        None
    }
}

fn two_point(function: &Function, left: Number, right: Number, transform: &Transform) -> Vec<Segment> {
    let [a, b] = [left, right].map(|x| (x, function.evaluate(x).y));
    if !(a.1.is_finite() && b.1.is_finite()) {
        return Vec::new();
    }
    vec![Segment {
        points: [a, b]
            .map(|(x, y)| transform.world_to_screen(Point::new(x, y)))
            .to_vec(),
        ..Segment::default()
    }]
}

/// One sampling pass of `function` over the visible `rect`.
pub fn sample(
    function: &Function,
    rect: Rect,
    transform: &Transform,
    config: &SamplerConfig,
) -> Vec<Curve> {
    let left = transform.screen_to_world(Point::new(rect.x0, 0.0)).x;
    let right = transform.screen_to_world(Point::new(rect.x1, 0.0)).x;
    let base_step = (right - left) / rect.width();
    if !(base_step > 0.0 && base_step.is_finite()) {
        log::debug!("{}: empty viewport {rect:?}", function.name());
        return Vec::new();
    }

    let segments = match function.strategy() {
        Strategy::TwoPoint => two_point(function, left, right, transform),
        Strategy::TargetY | Strategy::Curvature => Sampler {
            function,
            rect,
            transform,
            config,
            left,
            right,
            base_step,
        }
        .run(),
    };

    let total = segments.len();
    let curves: Vec<Curve> = segments
        .into_iter()
        .filter(|seg| seg.points.len() >= 2)
        .map(|seg| Curve {
            points: seg.points,
            color: function.color(),
            stroke_width: function.stroke_width(),
            open_start: seg.open_start,
            open_end: seg.open_end,
        })
        .collect();
    log::debug!(
        "{}: {} curve(s) from {total} segment(s), {} point(s)",
        function.name(),
        curves.len(),
        curves.iter().map(|c| c.points.len()).sum::<usize>()
    );
    curves
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_selection() {
        assert_eq!(Strategy::select("2x+1", true), Strategy::TwoPoint);
        assert_eq!(Strategy::select("1/x", false), Strategy::TargetY);
        assert_eq!(Strategy::select("3 / X", false), Strategy::TargetY);
        assert_eq!(Strategy::select("tan(x)", false), Strategy::TargetY);
        assert_eq!(Strategy::select("cot(2x)", false), Strategy::TargetY);
        assert_eq!(Strategy::select("tanh(x)", false), Strategy::Curvature);
        assert_eq!(Strategy::select("x^2", false), Strategy::Curvature);
    }

    #[test]
    fn walk_flags() {
        let mut walk = Walk::new();
        walk.push(Point::new(0.0, 0.0), 1.0);
        walk.push(Point::new(1.0, 1.0), 1.0);
        walk.cut_at_singularity();
        // a second cut with nothing open changes nothing
        walk.cut_at_singularity();
        walk.push(Point::new(3.0, 3.0), 1.0);
        walk.push(Point::new(4.0, 4.0), 1.0);
        let segs = walk.finish();
        assert_eq!(segs.len(), 2);
        assert!(!segs[0].open_start && segs[0].open_end);
        assert!(segs[1].open_start && !segs[1].open_end);
    }

    #[test]
    fn break_heuristics() {
        let config = SamplerConfig::default();
        let last = (Point::new(0.0, 100.0), 1.0);
        let brk = |valid, p: Point, dy| is_break(&config, 600.0, last, valid, (p, dy));

        assert!(brk(false, Point::new(1.0, 100.0), 1.0));
        assert!(!brk(true, Point::new(1.0, 101.0), 2.0));
        // derivative jump
        assert!(brk(true, Point::new(1.0, 101.0), 1202.0));
        // steep and far
        assert!(brk(true, Point::new(1.0, 300.0), 600.0));
        // steep but close
        assert!(!brk(true, Point::new(1.0, 200.0), 600.0));
        // unknown previous derivative never counts as a jump
        assert!(!is_break(
            &config,
            600.0,
            (Point::new(0.0, 0.0), Number::NAN),
            true,
            (Point::new(1.0, 1.0), 1.0)
        ));
    }
}
