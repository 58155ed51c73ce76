//! Gradient and surface pattern rendering.

use inkpad::{Context, Extend, Filter, Format, ImageSurface, Matrix, Pattern};

fn canvas(width: u32, height: u32) -> ImageSurface {
    ImageSurface::new(Format::ARgb32, width, height).unwrap()
}

#[test]
fn test_linear_gradient_ramps() {
    let mut surface = canvas(64, 8);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        let mut gradient = Pattern::linear(0.0, 0.0, 64.0, 0.0);
        gradient.add_color_stop_rgb(0.0, 0.0, 0.0, 0.0);
        gradient.add_color_stop_rgb(1.0, 1.0, 1.0, 1.0);
        cr.set_source(gradient).unwrap();
        cr.paint().unwrap();
    }
    let left = surface.pixel(2, 4).unwrap().0;
    let mid = surface.pixel(32, 4).unwrap().0;
    let right = surface.pixel(61, 4).unwrap().0;
    assert!(left < mid && mid < right);
    assert!(left < 30);
    assert!(right > 225);
    assert!((mid as i32 - 128).abs() < 20);
}

#[test]
fn test_linear_gradient_pad_extend() {
    let mut surface = canvas(60, 8);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        // The control vector only spans x in 20..40.
        let mut gradient = Pattern::linear(20.0, 0.0, 40.0, 0.0);
        gradient.add_color_stop_rgb(0.0, 1.0, 0.0, 0.0);
        gradient.add_color_stop_rgb(1.0, 0.0, 0.0, 1.0);
        cr.set_source(gradient).unwrap();
        cr.paint().unwrap();
    }
    // Pad extends the terminal colors outward.
    assert_eq!(surface.pixel(2, 4), Some((255, 0, 0, 255)));
    assert_eq!(surface.pixel(57, 4), Some((0, 0, 255, 255)));
}

#[test]
fn test_radial_gradient_center_to_edge() {
    let mut surface = canvas(40, 40);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        let mut gradient = Pattern::radial(20.0, 20.0, 0.0, 20.0, 20.0, 18.0);
        gradient.add_color_stop_rgb(0.0, 1.0, 1.0, 1.0);
        gradient.add_color_stop_rgb(1.0, 0.0, 0.0, 0.0);
        cr.set_source(gradient).unwrap();
        cr.paint().unwrap();
    }
    let center = surface.pixel(20, 20).unwrap().0;
    let edge = surface.pixel(20, 3).unwrap().0;
    assert!(center > 240);
    assert!(edge < center);
}

#[test]
fn test_gradient_without_stops_draws_nothing() {
    let mut surface = canvas(10, 10);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        cr.set_source(Pattern::linear(0.0, 0.0, 10.0, 0.0)).unwrap();
        cr.paint().unwrap();
    }
    assert_eq!(surface.pixel(5, 5), Some((0, 0, 0, 0)));
}

#[test]
fn test_single_stop_acts_solid() {
    let mut surface = canvas(10, 10);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        let mut gradient = Pattern::linear(0.0, 0.0, 10.0, 0.0);
        gradient.add_color_stop_rgb(0.5, 0.0, 1.0, 0.0);
        cr.set_source(gradient).unwrap();
        cr.paint().unwrap();
    }
    assert_eq!(surface.pixel(1, 5), Some((0, 255, 0, 255)));
    assert_eq!(surface.pixel(8, 5), Some((0, 255, 0, 255)));
}

#[test]
fn test_pattern_matrix_shifts_gradient() {
    let mut surface = canvas(64, 8);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        let mut gradient = Pattern::linear(0.0, 0.0, 64.0, 0.0);
        gradient.add_color_stop_rgb(0.0, 0.0, 0.0, 0.0);
        gradient.add_color_stop_rgb(1.0, 1.0, 1.0, 1.0);
        // The pattern matrix maps user to pattern space: translating by
        // +32 samples the ramp 32 units further along.
        gradient.set_matrix(Matrix::translation(32.0, 0.0));
        cr.set_source(gradient).unwrap();
        cr.paint().unwrap();
    }
    // x=0 now reads the middle of the ramp.
    let shifted = surface.pixel(1, 4).unwrap().0;
    assert!((shifted as i32 - 128).abs() < 24);
}

fn checker() -> ImageSurface {
    // 2x2: white / black on the diagonal.
    let data = [
        255u8, 255, 255, 255, /* */ 0, 0, 0, 255, //
        0, 0, 0, 255, /*          */ 255, 255, 255, 255,
    ];
    ImageSurface::from_data(&data, Format::ARgb32, 2, 2, 8).unwrap()
}

#[test]
fn test_surface_pattern_repeat() {
    let tile = checker();
    let mut surface = canvas(8, 8);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        let mut pattern = Pattern::for_surface(&tile);
        pattern.set_extend(Extend::Repeat);
        pattern.set_filter(Filter::Nearest);
        cr.set_source(pattern).unwrap();
        cr.paint().unwrap();
    }
    // The checker repeats with period 2.
    assert_eq!(surface.pixel(0, 0), Some((255, 255, 255, 255)));
    assert_eq!(surface.pixel(1, 0), Some((0, 0, 0, 255)));
    assert_eq!(surface.pixel(4, 4), Some((255, 255, 255, 255)));
    assert_eq!(surface.pixel(5, 4), Some((0, 0, 0, 255)));
}

#[test]
fn test_surface_pattern_extend_none_stops_at_edge() {
    let tile = checker();
    let mut surface = canvas(10, 10);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        let mut pattern = Pattern::for_surface(&tile);
        pattern.set_extend(Extend::None);
        pattern.set_filter(Filter::Nearest);
        cr.set_source(pattern).unwrap();
        cr.paint().unwrap();
    }
    // Painted inside the 2x2 footprint only.
    assert_eq!(surface.pixel(0, 0), Some((255, 255, 255, 255)));
    assert_eq!(surface.pixel(6, 6), Some((0, 0, 0, 0)));
}

#[test]
fn test_surface_pattern_placed_by_set_source_surface() {
    let tile = checker();
    let mut surface = canvas(10, 10);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        cr.set_source_surface(&tile, 4.0, 4.0).unwrap();
        cr.paint().unwrap();
    }
    assert_eq!(surface.pixel(4, 4), Some((255, 255, 255, 255)));
    assert_eq!(surface.pixel(5, 4), Some((0, 0, 0, 255)));
    assert_eq!(surface.pixel(1, 1), Some((0, 0, 0, 0)));
}

#[test]
fn test_pattern_snapshot_is_immutable() {
    let mut tile = canvas(2, 2);
    tile.data_mut().unwrap().copy_from_slice(&[255; 16]);

    let pattern = Pattern::for_surface(&tile);
    // Mutating the original after the pattern was created must not affect
    // the pattern's snapshot.
    tile.data_mut().unwrap().copy_from_slice(&[0; 16]);

    let mut surface = canvas(2, 2);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        cr.set_source(pattern).unwrap();
        cr.paint().unwrap();
    }
    assert_eq!(surface.pixel(0, 0), Some((255, 255, 255, 255)));
}
