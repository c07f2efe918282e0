//! FFmpeg-backed probing and decoding tests.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`.

use std::{path::Path, sync::Arc};

use seekframe::{
    DecoderOptions, FfmpegOpener, FfmpegSource, MediaKind, MediaSource, MetadataCache,
    PixelLayout, SeekingDecoder, Size,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

fn sample_rotated_path() -> &'static str {
    "tests/fixtures/sample_rotated.mp4"
}

fn sample_audio_only_path() -> &'static str {
    "tests/fixtures/sample_audio_only.m4a"
}

fn ffmpeg_cache() -> Arc<MetadataCache> {
    Arc::new(MetadataCache::new(Arc::new(FfmpegOpener::new())))
}

fn decoder(path: &str, options: DecoderOptions) -> SeekingDecoder {
    SeekingDecoder::new(path, ffmpeg_cache(), options)
}

// ── probing ────────────────────────────────────────────────────────

#[test]
fn source_reports_track() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let source = FfmpegSource::open(path).expect("Failed to open fixture");
    assert!(source.is_readable());
    assert!((source.duration() - 5.0).abs() < 0.1, "{}", source.duration());
    assert!(!source.has_alpha_track());

    let track = source.video_track().expect("Fixture has a video track");
    assert_eq!(track.natural_size, Size::new(640, 480));
    assert!((track.nominal_frame_rate - 30.0).abs() < 0.01);
    assert!(track.timescale > 0);
}

#[test]
fn descriptor_from_cache() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let cache = ffmpeg_cache();
    let descriptor = cache
        .get(path, MediaKind::Video)
        .expect("Failed to probe fixture");
    assert!(descriptor.is_video());
    assert_eq!(descriptor.frames_per_second, 30.0);
    assert_eq!(descriptor.display_size(), Size::new(640, 480));
    assert_eq!(descriptor.preview_size, Size::new(640, 480));
    assert!(!descriptor.rotation.swaps_axes());
}

#[test]
fn rotated_descriptor_swaps_display_size() {
    let path = sample_rotated_path();
    if !Path::new(path).exists() {
        return;
    }

    let descriptor = ffmpeg_cache()
        .get(path, MediaKind::Video)
        .expect("Failed to probe fixture");
    assert!(descriptor.rotation.swaps_axes());
    assert_eq!(descriptor.natural_size, Size::new(640, 480));
    assert_eq!(descriptor.display_size(), Size::new(480, 640));
}

#[test]
fn audio_only_is_not_a_video() {
    let path = sample_audio_only_path();
    if !Path::new(path).exists() {
        return;
    }

    let descriptor = ffmpeg_cache()
        .get(path, MediaKind::Video)
        .expect("Existing files are always described");
    assert!(!descriptor.is_video());

    let decoder = decoder(path, DecoderOptions::default());
    decoder.update_output_size(Size::new(320, 240));
    assert!(decoder.decode(1.0).unwrap().is_none());
}

// ── decoding ───────────────────────────────────────────────────────

#[test]
fn decode_returns_matching_frame() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let decoder = decoder(path, DecoderOptions::default());
    decoder.update_output_size(Size::new(320, 240));

    let frame = decoder
        .decode(1.0)
        .expect("Geometry is known")
        .expect("Expected a frame at 1s");
    let time = frame.presentation_time().expect("Frame has a timestamp");
    assert!(time <= 1.0 + 1e-6, "{time}");
    assert!(time >= 1.0 - 2.0 / 30.0, "{time}");
    assert_eq!(frame.size(), Size::new(320, 240));
    assert_eq!(frame.layout(), PixelLayout::BiPlanar);
    assert_eq!(frame.planes().len(), 2);

    let image = frame.to_rgb_image().expect("Failed to convert frame");
    assert_eq!(image.dimensions(), (320, 240));
}

#[test]
fn sequential_scrub_reuses_one_session() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let decoder = decoder(path, DecoderOptions::default());
    let mut previous = f64::NEG_INFINITY;
    for index in 0..60 {
        let frame = decoder
            .decode(f64::from(index) / 30.0)
            .expect("Geometry is known")
            .unwrap_or_else(|| panic!("Expected frame {index}"));
        let time = frame.presentation_time().expect("Frame has a timestamp");
        assert!(time >= previous, "Frame {index} went backwards");
        previous = time;
    }
    assert_eq!(decoder.statistics().sessions_created, 1);
}

#[test]
fn backward_seek_rebuilds() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let decoder = decoder(path, DecoderOptions::default());
    assert!(decoder.decode(3.0).unwrap().is_some());
    let frame = decoder
        .decode(0.5)
        .unwrap()
        .expect("Expected a frame at 0.5s");
    let time = frame.presentation_time().unwrap();
    assert!((time - 0.5).abs() <= 1.0 / 30.0 + 1e-6, "{time}");
    assert_eq!(decoder.statistics().sessions_created, 2);
}

#[test]
fn last_frame_is_reachable() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let decoder = decoder(path, DecoderOptions::default());
    let frame = decoder.decode(decoder.asset_duration() - 0.001).unwrap();
    assert!(frame.is_some(), "Expected the last frame");
}

#[test]
fn planar_output() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let decoder = decoder(
        path,
        DecoderOptions::new().with_pixel_layout(PixelLayout::Planar),
    );
    let frame = decoder.decode(2.0).unwrap().expect("Expected a frame");
    assert_eq!(frame.layout(), PixelLayout::Planar);
    assert_eq!(frame.planes().len(), 3);
    assert_eq!(frame.size(), Size::new(640, 480));
    assert!(frame.to_rgb_image().is_ok());
}

#[test]
fn rotated_output_is_delivered_in_storage_orientation() {
    let path = sample_rotated_path();
    if !Path::new(path).exists() {
        return;
    }

    let decoder = decoder(path, DecoderOptions::default());
    assert_eq!(decoder.output_size(), Size::new(480, 640));
    let frame = decoder.decode(1.0).unwrap().expect("Expected a frame");
    assert_eq!(frame.size(), Size::new(640, 480));
}
