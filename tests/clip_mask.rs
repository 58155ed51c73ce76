//! Clipping, masking, and group rendering.

use inkpad::{Content, Context, Format, ImageSurface, Pattern, Status};

fn canvas(width: u32, height: u32) -> ImageSurface {
    ImageSurface::new(Format::ARgb32, width, height).unwrap()
}

#[test]
fn test_clips_intersect() {
    let mut surface = canvas(20, 20);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        cr.rectangle(0.0, 0.0, 12.0, 20.0).unwrap();
        cr.clip().unwrap();
        cr.rectangle(0.0, 0.0, 20.0, 12.0).unwrap();
        cr.clip().unwrap();

        cr.set_source_rgb(1.0, 1.0, 1.0).unwrap();
        cr.paint().unwrap();
    }
    // Only the 12x12 overlap is painted.
    assert_eq!(surface.pixel(5, 5), Some((255, 255, 255, 255)));
    assert_eq!(surface.pixel(15, 5), Some((0, 0, 0, 0)));
    assert_eq!(surface.pixel(5, 15), Some((0, 0, 0, 0)));
}

#[test]
fn test_empty_path_clips_everything() {
    let mut surface = canvas(10, 10);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        cr.clip().unwrap();
        cr.set_source_rgb(1.0, 1.0, 1.0).unwrap();
        cr.paint().unwrap();
    }
    assert_eq!(surface.pixel(5, 5), Some((0, 0, 0, 0)));
}

#[test]
fn test_reset_clip() {
    let mut surface = canvas(20, 20);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        cr.rectangle(0.0, 0.0, 5.0, 5.0).unwrap();
        cr.clip().unwrap();
        cr.reset_clip().unwrap();
        cr.set_source_rgb(1.0, 1.0, 1.0).unwrap();
        cr.paint().unwrap();
    }
    assert_eq!(surface.pixel(15, 15), Some((255, 255, 255, 255)));
}

#[test]
fn test_clip_applies_to_strokes() {
    let mut surface = canvas(20, 20);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        cr.rectangle(0.0, 0.0, 10.0, 20.0).unwrap();
        cr.clip().unwrap();

        cr.set_source_rgb(1.0, 0.0, 0.0).unwrap();
        cr.set_line_width(4.0).unwrap();
        cr.move_to(0.0, 10.0).unwrap();
        cr.line_to(20.0, 10.0).unwrap();
        cr.stroke().unwrap();
    }
    assert_eq!(surface.pixel(5, 10), Some((255, 0, 0, 255)));
    assert_eq!(surface.pixel(15, 10), Some((0, 0, 0, 0)));
}

#[test]
fn test_clip_extents() {
    let mut surface = canvas(20, 20);
    let mut cr = Context::new(&mut surface).unwrap();
    assert_eq!(cr.clip_extents(), (0.0, 0.0, 20.0, 20.0));

    cr.rectangle(2.0, 4.0, 10.0, 8.0).unwrap();
    cr.clip().unwrap();
    assert_eq!(cr.clip_extents(), (2.0, 4.0, 12.0, 12.0));
}

#[test]
fn test_mask_with_gradient_alpha() {
    let mut surface = canvas(64, 8);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        cr.set_source_rgb(1.0, 0.0, 0.0).unwrap();

        let mut fade = Pattern::linear(0.0, 0.0, 64.0, 0.0);
        fade.add_color_stop_rgba(0.0, 0.0, 0.0, 0.0, 0.0);
        fade.add_color_stop_rgba(1.0, 0.0, 0.0, 0.0, 1.0);
        cr.mask(&fade).unwrap();
    }
    let left = surface.pixel(2, 4).unwrap().3;
    let right = surface.pixel(61, 4).unwrap().3;
    assert!(left < 30);
    assert!(right > 225);
    // The color is the red source, scaled by the mask's alpha.
    let (r, g, _, a) = surface.pixel(61, 4).unwrap();
    assert_eq!(g, 0);
    assert_eq!(r, a);
}

#[test]
fn test_mask_surface_alpha_channel() {
    // An A8 stencil with opaque left half.
    let mut stencil_data = vec![0u8; 8 * 8];
    for row in stencil_data.chunks_exact_mut(8) {
        for x in 0..4 {
            row[x] = 255;
        }
    }
    let stencil = ImageSurface::from_data(&stencil_data, Format::A8, 8, 8, 8).unwrap();

    let mut surface = canvas(8, 8);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        cr.set_source_rgb(0.0, 1.0, 0.0).unwrap();
        cr.mask_surface(&stencil, 0.0, 0.0).unwrap();
    }
    assert_eq!(surface.pixel(1, 4), Some((0, 255, 0, 255)));
    assert_eq!(surface.pixel(6, 4), Some((0, 0, 0, 0)));
}

#[test]
fn test_mask_respects_clip() {
    let mut surface = canvas(20, 20);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        cr.rectangle(0.0, 0.0, 10.0, 20.0).unwrap();
        cr.clip().unwrap();

        cr.set_source_rgb(1.0, 1.0, 1.0).unwrap();
        let opaque = Pattern::solid_rgb(0.0, 0.0, 0.0);
        cr.mask(&opaque).unwrap();
    }
    assert_eq!(surface.pixel(5, 10), Some((255, 255, 255, 255)));
    assert_eq!(surface.pixel(15, 10), Some((0, 0, 0, 0)));
}

#[test]
fn test_group_draws_offscreen_until_popped() {
    let mut surface = canvas(20, 20);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        cr.push_group().unwrap();
        cr.set_source_rgb(1.0, 0.0, 0.0).unwrap();
        cr.paint().unwrap();

        // Nothing on the target yet.
        assert_eq!(cr.target().pixel(10, 10), Some((0, 0, 0, 0)));

        let pattern = cr.pop_group().unwrap();
        cr.set_source(pattern).unwrap();
        cr.paint().unwrap();
    }
    assert_eq!(surface.pixel(10, 10), Some((255, 0, 0, 255)));
}

#[test]
fn test_group_with_alpha_content() {
    let mut surface = canvas(20, 20);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        cr.push_group_with_content(Content::Alpha).unwrap();
        cr.set_source_rgb(1.0, 0.0, 0.0).unwrap();
        cr.rectangle(0.0, 0.0, 10.0, 10.0).unwrap();
        cr.fill().unwrap();
        cr.pop_group_to_source().unwrap();
        cr.paint().unwrap();
    }
    // Alpha content drops the red; the coverage paints black.
    assert_eq!(surface.pixel(5, 5), Some((0, 0, 0, 255)));
    assert_eq!(surface.pixel(15, 15), Some((0, 0, 0, 0)));
}

#[test]
fn test_group_pattern_alignment_under_transform() {
    let mut surface = canvas(20, 20);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        cr.translate(5.0, 5.0).unwrap();
        cr.push_group().unwrap();
        // Drawn at user (0,0) = device (5,5).
        cr.set_source_rgb(0.0, 0.0, 1.0).unwrap();
        cr.rectangle(0.0, 0.0, 5.0, 5.0).unwrap();
        cr.fill().unwrap();
        cr.pop_group_to_source().unwrap();
        cr.paint().unwrap();
    }
    assert_eq!(surface.pixel(7, 7), Some((0, 0, 255, 255)));
    assert_eq!(surface.pixel(2, 2), Some((0, 0, 0, 0)));
    assert_eq!(surface.pixel(12, 12), Some((0, 0, 0, 0)));
}

#[test]
fn test_unbalanced_saves_inside_group_are_unwound() {
    let mut surface = canvas(10, 10);
    let mut cr = Context::new(&mut surface).unwrap();
    cr.set_line_width(7.0).unwrap();
    cr.push_group().unwrap();
    cr.save().unwrap();
    cr.set_line_width(1.0).unwrap();
    // pop_group discards the group's unbalanced save.
    let _ = cr.pop_group().unwrap();
    assert_eq!(cr.line_width(), 7.0);
    assert_eq!(cr.status(), Ok(()));
}

#[test]
fn test_clip_survives_into_group() {
    let mut surface = canvas(20, 20);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        cr.rectangle(0.0, 0.0, 10.0, 10.0).unwrap();
        cr.clip().unwrap();

        cr.push_group().unwrap();
        cr.set_source_rgb(1.0, 1.0, 1.0).unwrap();
        cr.paint().unwrap();
        cr.pop_group_to_source().unwrap();
        cr.paint().unwrap();
    }
    assert_eq!(surface.pixel(5, 5), Some((255, 255, 255, 255)));
    assert_eq!(surface.pixel(15, 15), Some((0, 0, 0, 0)));
}

#[test]
fn test_clip_inside_group_ends_with_group() {
    let mut surface = canvas(20, 20);
    {
        let mut cr = Context::new(&mut surface).unwrap();
        cr.push_group().unwrap();
        cr.rectangle(0.0, 0.0, 5.0, 5.0).unwrap();
        cr.clip().unwrap();
        let _ = cr.pop_group().unwrap();

        // The group's clip is gone; painting reaches the whole surface.
        cr.set_source_rgb(1.0, 1.0, 1.0).unwrap();
        cr.paint().unwrap();
    }
    assert_eq!(surface.pixel(15, 15), Some((255, 255, 255, 255)));
    assert_eq!(surface.pixel(2, 2), Some((255, 255, 255, 255)));
}

#[test]
fn test_in_clip_reflects_current_clip() {
    let mut surface = canvas(20, 20);
    let mut cr = Context::new(&mut surface).unwrap();
    assert!(cr.in_clip(15.0, 15.0));
    cr.rectangle(0.0, 0.0, 10.0, 10.0).unwrap();
    cr.clip().unwrap();
    assert!(cr.in_clip(5.0, 5.0));
    assert!(!cr.in_clip(15.0, 15.0));
}

#[test]
fn test_clip_not_representable_after_rotation() {
    let mut surface = canvas(20, 20);
    let mut cr = Context::new(&mut surface).unwrap();
    cr.rectangle(2.0, 2.0, 10.0, 10.0).unwrap();
    cr.clip().unwrap();
    cr.rotate(0.3).unwrap();
    assert_eq!(
        cr.copy_clip_rectangle_list().err(),
        Some(Status::ClipNotRepresentable)
    );
}
