// SPDX: CC0-1.0

use adaptive_curves::{
    render_all, Color, Curve, Function, Point, Rect, SamplerConfig, Strategy, Transform,
};
use approx::assert_relative_eq;
use std::sync::Arc;

fn viewport() -> (Rect, Transform) {
    (
        Rect::new(0.0, 0.0, 800.0, 600.0),
        Transform::with_view(Point::new(400.0, 300.0), 1.0, 1.0),
    )
}

fn curves_of(text: &str) -> Arc<[Curve]> {
    let (rect, transform) = viewport();
    Function::new("f", text, Color::BLUE, 2.0)
        .unwrap()
        .curves(rect, &transform, &SamplerConfig::default())
}

fn assert_within_guard_band(curves: &[Curve]) {
    let (rect, _) = viewport();
    let guard = SamplerConfig::default().guard_band;
    for p in curves.iter().flat_map(|c| &c.points) {
        assert!(p.y.is_finite());
        assert!(p.y >= rect.y0 - guard && p.y <= rect.y1 + guard, "{p:?}");
    }
}

#[test]
fn reciprocal_splits_at_the_pole() {
    let curves = curves_of("1/x");
    assert_eq!(curves.len(), 2);

    let (left, right) = (&curves[0], &curves[1]);
    assert!(!left.open_start && left.open_end);
    assert!(right.open_start && !right.open_end);
    assert!(left.points.iter().all(|p| p.x < 400.0));
    assert!(right.points.iter().all(|p| p.x > 400.0));
    assert_within_guard_band(&curves);
}

#[test]
fn tangent_has_one_branch_per_gap() {
    let (rect, transform) = viewport();
    let config = SamplerConfig::default();
    let f = Function::new("f", "tan(x)", Color::RED, 1.0).unwrap();
    assert_eq!(f.strategy(), Strategy::TargetY);

    let left = transform.screen_to_world(Point::new(rect.x0, 0.0)).x;
    let right = transform.screen_to_world(Point::new(rect.x1, 0.0)).x;
    let poles = f.asymptotes(left, right, &config.locator);
    assert!(!poles.is_empty());

    let curves = f.curves(rect, &transform, &config);
    assert_eq!(curves.len(), poles.len() + 1);
    let last = curves.len() - 1;
    for (i, curve) in curves.iter().enumerate() {
        assert_eq!(curve.open_start, i != 0);
        assert_eq!(curve.open_end, i != last);
        assert_eq!(curve.color, Color::RED);
    }
    assert_within_guard_band(&curves);
}

#[test]
fn lines_are_two_points() {
    let (rect, _) = viewport();
    for text in ["x", "2x+1"] {
        let curves = curves_of(text);
        assert_eq!(curves.len(), 1, "{text}");
        let curve = &curves[0];
        assert_eq!(curve.points.len(), 2, "{text}");
        assert!(!curve.open_start && !curve.open_end);
        assert_relative_eq!(curve.points[0].x, rect.x0, epsilon = 1e-9);
        assert_relative_eq!(curve.points[1].x, rect.x1, epsilon = 1e-9);
    }

    // y = x runs corner to corner of a square grid around the centre
    let curve = &curves_of("x")[0];
    assert_relative_eq!(curve.points[0].y, 700.0, epsilon = 1e-9);
    assert_relative_eq!(curve.points[1].y, -100.0, epsilon = 1e-9);
}

#[test]
fn smooth_function_is_one_closed_curve() {
    for text in ["x^2", "sin(x)", "exp(-x^2)"] {
        let curves = curves_of(text);
        assert_eq!(curves.len(), 1, "{text}");
        assert!(!curves[0].open_start && !curves[0].open_end, "{text}");
        assert!(curves[0].points.len() > 2, "{text}");
        assert!(
            curves[0].points.windows(2).all(|w| w[0].x < w[1].x),
            "{text}"
        );
        assert_within_guard_band(&curves);
    }
}

#[test]
fn absolute_value_keeps_its_kink() {
    let f = Function::new("f", "abs(x)", Color::BLUE, 1.0).unwrap();
    assert!(!f.is_linear());
    assert_eq!(f.strategy(), Strategy::Curvature);

    let curves = curves_of("abs(x)");
    assert_eq!(curves.len(), 1);
    let points = &curves[0].points;
    assert!(points.len() > 2);
    // the vertex sits below both ends on screen
    let lowest = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    assert!(lowest > points[0].y + 100.0);
    assert!(lowest > points[points.len() - 1].y + 100.0);
}

#[test]
fn spaced_tangent_still_cuts_at_poles() {
    let curves = curves_of("tan (x)");
    assert!(curves.len() > 1);
    assert!(curves.iter().skip(1).all(|c| c.open_start));
    assert!(curves.iter().rev().skip(1).all(|c| c.open_end));
}

#[test]
fn far_pan_terminates() {
    let rect = Rect::new(0.0, 0.0, 800.0, 600.0);
    let config = SamplerConfig::default();
    for text in ["1/x", "tan(x)", "x^2"] {
        let f = Function::new("f", text, Color::BLUE, 1.0).unwrap();
        for offset in [Point::new(-1e17, 300.0), Point::new(1e17, 300.0)] {
            let transform = Transform::with_view(offset, 1.0, 1.0);
            let curves = f.curves(rect, &transform, &config);
            assert!(curves.len() <= 1, "{text}");
        }
    }
}

#[test]
fn domain_edge_leaves_open_end() {
    let curves = curves_of("sqrt(-x)");
    assert_eq!(curves.len(), 1);
    assert!(!curves[0].open_start);
    assert!(curves[0].open_end);
    assert!(curves[0].points.iter().all(|p| p.x <= 400.0 + 1e-9));
}

#[test]
fn nothing_to_draw() {
    assert!(curves_of("sqrt(-1-x^2)").is_empty());
    assert!(curves_of("ln(0-1)").is_empty());

    let (_, transform) = viewport();
    let f = Function::new("f", "x^2", Color::BLUE, 1.0).unwrap();
    let empty = Rect::new(10.0, 0.0, 10.0, 600.0);
    assert!(f
        .curves(empty, &transform, &SamplerConfig::default())
        .is_empty());
}

#[test]
fn curve_cache_hits_until_the_view_moves() {
    let (rect, transform) = viewport();
    let config = SamplerConfig::default();
    let f = Function::new("f", "sin(x)", Color::GREEN, 1.0).unwrap();

    let first = f.curves(rect, &transform, &config);
    let again = f.curves(rect, &transform, &config);
    assert!(Arc::ptr_eq(&first, &again));

    for moved in [
        Transform::with_view(Point::new(401.0, 300.0), 1.0, 1.0),
        Transform::with_view(Point::new(400.0, 300.0), 2.0, 1.0),
        Transform::with_view(Point::new(400.0, 300.0), 1.0, 2.0),
    ] {
        let other = f.curves(rect, &moved, &config);
        assert!(!Arc::ptr_eq(&first, &other));
    }

    let resized = f.curves(Rect::new(0.0, 0.0, 640.0, 480.0), &transform, &config);
    assert!(!Arc::ptr_eq(&first, &resized));

    let retuned = SamplerConfig {
        hard_steps: (2.0, 0.25),
        ..config
    };
    let finer = f.curves(rect, &transform, &retuned);
    assert!(!Arc::ptr_eq(&first, &finer));
    assert!(finer[0].points.len() > first[0].points.len());

    f.clear_caches();
    assert!(f.sample_cache().is_empty());
    let fresh = f.curves(rect, &transform, &config);
    assert!(!Arc::ptr_eq(&first, &fresh));
    assert_eq!(*first, *fresh);
}

#[test]
fn render_all_keeps_input_order() {
    let (rect, transform) = viewport();
    let colors = [Color::BLUE, Color::RED, Color::GREEN, Color::rgb(1, 2, 3)];
    let functions: Vec<Function> = ["1/x", "x^3", "2x+1", "cos(x)"]
        .iter()
        .zip(colors)
        .enumerate()
        .map(|(i, (text, color))| Function::new(format!("f{i}"), *text, color, 1.0).unwrap())
        .collect();

    let frames = render_all(&functions, rect, &transform, &SamplerConfig::default());
    assert_eq!(frames.len(), functions.len());
    for ((function, curves), color) in functions.iter().zip(&frames).zip(colors) {
        assert!(!curves.is_empty(), "{}", function.name());
        assert!(curves.iter().all(|c| c.color == color));
        // a second frame is served from the curve cache
        let cached = function.curves(rect, &transform, &SamplerConfig::default());
        assert!(Arc::ptr_eq(curves, &cached));
    }
}
