//! Decoded frame layout and RGB conversion tests.

use seekframe::{DecodedFrame, PixelLayout, Plane, SeekFrameError, Size};

const BLACK: u8 = 16;
const WHITE: u8 = 235;
const NEUTRAL: u8 = 128;

fn plane(data: Vec<u8>, stride: usize) -> Plane {
    Plane { data, stride }
}

/// A 2x2 checkerboard with neutral chroma.
fn checkerboard(layout: PixelLayout) -> DecodedFrame {
    let luma = plane(vec![BLACK, WHITE, WHITE, BLACK], 2);
    let planes = match layout {
        PixelLayout::BiPlanar => vec![luma, plane(vec![NEUTRAL, NEUTRAL], 2)],
        PixelLayout::Planar => vec![
            luma,
            plane(vec![NEUTRAL], 1),
            plane(vec![NEUTRAL], 1),
        ],
    };
    DecodedFrame::new(Some(0.5), Size::new(2, 2), layout, planes)
}

#[test]
fn plane_counts() {
    assert_eq!(PixelLayout::BiPlanar.plane_count(), 2);
    assert_eq!(PixelLayout::Planar.plane_count(), 3);
    assert_eq!(PixelLayout::default(), PixelLayout::BiPlanar);
}

#[test]
fn checkerboard_converts_in_both_layouts() {
    for layout in [PixelLayout::BiPlanar, PixelLayout::Planar] {
        let image = checkerboard(layout).to_rgb_image().unwrap();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0], "{layout:?}");
        assert_eq!(image.get_pixel(1, 0).0, [255, 255, 255], "{layout:?}");
        assert_eq!(image.get_pixel(0, 1).0, [255, 255, 255], "{layout:?}");
        assert_eq!(image.get_pixel(1, 1).0, [0, 0, 0], "{layout:?}");
    }
}

#[test]
fn chroma_drives_color() {
    // BT.601 limited-range red.
    let frame = DecodedFrame::new(
        Some(0.0),
        Size::new(2, 2),
        PixelLayout::BiPlanar,
        vec![plane(vec![81; 4], 2), plane(vec![90, 240], 2)],
    );
    let image = frame.to_rgb_image().unwrap();
    for pixel in image.pixels() {
        assert_eq!(pixel.0, [255, 0, 0]);
    }
}

#[test]
fn padded_strides_are_respected() {
    let frame = DecodedFrame::new(
        None,
        Size::new(2, 2),
        PixelLayout::Planar,
        vec![
            plane(vec![WHITE, WHITE, 0, 0, WHITE, WHITE, 0, 0], 4),
            plane(vec![NEUTRAL, 0], 2),
            plane(vec![NEUTRAL, 0], 2),
        ],
    );
    let image = frame.to_rgb_image().unwrap();
    assert!(image.pixels().all(|pixel| pixel.0 == [255, 255, 255]));
}

#[test]
fn mismatched_planes_are_rejected() {
    let missing_plane = DecodedFrame::new(
        Some(0.0),
        Size::new(2, 2),
        PixelLayout::Planar,
        vec![plane(vec![BLACK; 4], 2), plane(vec![NEUTRAL], 1)],
    );
    assert!(matches!(
        missing_plane.to_rgb_image(),
        Err(SeekFrameError::UnsupportedPixelLayout(_))
    ));

    let short_luma = DecodedFrame::new(
        Some(0.0),
        Size::new(4, 4),
        PixelLayout::BiPlanar,
        vec![plane(vec![BLACK; 8], 4), plane(vec![NEUTRAL; 8], 4)],
    );
    let error = short_luma.to_rgb_image().unwrap_err();
    assert!(error.to_string().contains("luma"), "{error}");
}

#[test]
fn presentation_time_filters_non_finite_values() {
    let frame = |time| DecodedFrame::new(time, Size::new(2, 2), PixelLayout::BiPlanar, vec![]);
    assert_eq!(frame(Some(1.5)).presentation_time(), Some(1.5));
    assert_eq!(frame(Some(f64::NAN)).presentation_time(), None);
    assert_eq!(frame(Some(f64::INFINITY)).presentation_time(), None);
    assert_eq!(frame(None).presentation_time(), None);
    assert_eq!(frame(None).size(), Size::new(2, 2));
    assert!(frame(None).planes().is_empty());
}
