use super::*;

const RED: Pixel = 0xFFFF_0000;

// =============================================================================
// parse_color
// =============================================================================

#[test]
fn parse_color_accepts_hex() {
    assert_eq!(parse_color("#ff0000"), Some(0xFFFF_0000));
    assert_eq!(parse_color("#000000"), Some(0xFF00_0000));
    assert_eq!(parse_color("#00ff7f"), Some(0xFF00_FF7F));
}

#[test]
fn parse_color_rejects_garbage() {
    assert_eq!(parse_color("red"), None);
    assert_eq!(parse_color("#fff"), None);
    assert_eq!(parse_color("#zzzzzz"), None);
    assert_eq!(parse_color(""), None);
}

// =============================================================================
// Stamping
// =============================================================================

#[test]
fn new_canvas_is_blank() {
    let r = Raster::new(100, 50);
    assert!(r.is_blank());
    assert_eq!(r.pixel(99, 49), Some(0));
    assert_eq!(r.pixel(100, 0), None);
}

#[test]
fn stamp_marks_segment_pixels() {
    let mut r = Raster::new(100, 100);
    r.stamp_segment(10.0, 10.0, 50.0, 50.0, RED, 3.0, ToolKind::Pen);
    assert_eq!(r.pixel(10, 10), Some(RED));
    assert_eq!(r.pixel(30, 30), Some(RED));
    assert_eq!(r.pixel(50, 50), Some(RED));
    // Off-stroke pixel untouched.
    assert_eq!(r.pixel(90, 10), Some(0));
}

#[test]
fn stamping_is_deterministic() {
    let mut a = Raster::new(200, 200);
    let mut b = Raster::new(200, 200);
    for i in 0..20 {
        let f = f64::from(i) * 7.3;
        a.stamp_segment(f, f * 0.5, f + 40.0, f * 0.5 + 13.0, RED, 3.0, ToolKind::Pen);
        b.stamp_segment(f, f * 0.5, f + 40.0, f * 0.5 + 13.0, RED, 3.0, ToolKind::Pen);
    }
    assert_eq!(a, b);
}

#[test]
fn eraser_restores_blank() {
    let mut r = Raster::new(60, 60);
    r.stamp_segment(0.0, 30.0, 59.0, 30.0, RED, 5.0, ToolKind::Pen);
    assert!(!r.is_blank());
    r.stamp_segment(0.0, 30.0, 59.0, 30.0, RED, 9.0, ToolKind::Eraser);
    assert!(r.is_blank());
}

#[test]
fn out_of_bounds_segment_is_clamped_to_canvas() {
    let mut r = Raster::new(20, 20);
    r.stamp_segment(-50.0, -50.0, 100.0, 100.0, RED, 3.0, ToolKind::Pen);
    assert_eq!(r.pixel(10, 10), Some(RED));
}

#[test]
fn absurd_coordinates_stay_bounded_by_canvas_size() {
    // An event with enormous coordinates must not walk 1e12 steps; the
    // endpoints clamp to the canvas and the stamp finishes immediately.
    let mut r = Raster::new(100, 100);
    r.stamp_segment(0.0, 0.0, 1e12, 1e12, RED, 3.0, ToolKind::Pen);
    assert_eq!(r.pixel(99, 99), Some(RED));
    r.stamp_segment(-1e12, 50.0, 1e12, 50.0, RED, 3.0, ToolKind::Pen);
    assert_eq!(r.pixel(50, 50), Some(RED));
}

#[test]
fn oversized_width_is_capped() {
    let mut r = Raster::new(50, 50);
    r.stamp_segment(25.0, 25.0, 25.0, 25.0, RED, 2e5, ToolKind::Pen);
    // The capped radius still covers this whole canvas from its center.
    assert_eq!(r.pixel(0, 0), Some(RED));
    assert_eq!(r.pixel(49, 49), Some(RED));
}

#[test]
fn non_finite_input_is_ignored() {
    let mut r = Raster::new(20, 20);
    r.stamp_segment(f64::NAN, 0.0, 10.0, 10.0, RED, 3.0, ToolKind::Pen);
    r.stamp_segment(0.0, 0.0, f64::INFINITY, 5.0, RED, 3.0, ToolKind::Pen);
    r.stamp_segment(0.0, 0.0, 10.0, 10.0, RED, f64::NAN, ToolKind::Pen);
    assert!(r.is_blank());
}

#[test]
fn zero_length_segment_stamps_a_dot() {
    let mut r = Raster::new(20, 20);
    r.stamp_segment(5.0, 5.0, 5.0, 5.0, RED, 1.0, ToolKind::Pen);
    assert_eq!(r.pixel(5, 5), Some(RED));
}

// =============================================================================
// Snapshot / restore
// =============================================================================

#[test]
fn snapshot_restore_round_trips() {
    let mut r = Raster::new(50, 50);
    r.stamp_segment(0.0, 0.0, 49.0, 49.0, RED, 3.0, ToolKind::Pen);
    let snap = r.snapshot();

    r.clear();
    assert!(r.is_blank());

    r.restore(&snap);
    assert_eq!(r.snapshot(), snap);
    assert_eq!(r.pixel(25, 25), Some(RED));
}

#[test]
fn clear_blanks_everything() {
    let mut r = Raster::new(30, 30);
    r.stamp_segment(0.0, 0.0, 29.0, 29.0, RED, 7.0, ToolKind::Pen);
    r.clear();
    assert!(r.is_blank());
}
