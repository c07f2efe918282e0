//! Benchmarks for frame time matching and seeking decode patterns.
//!
//! Run with: cargo bench
//!
//! The synthetic groups need no fixtures. The FFmpeg groups require files
//! from `tests/fixtures/generate_fixtures.sh` and are skipped otherwise.

use std::{hint::black_box, path::Path, sync::Arc};

use criterion::Criterion;
use ffmpeg_next::util::log::Level as LogLevel;
use seekframe::{
    AffineTransform, DecodedFrame, DecoderOptions, FfmpegOpener, MediaOpener, MediaSource,
    MetadataCache, OutputSettings, PixelLayout, ReaderFault, ReaderStatus, SampleReader,
    SeekFrameError, SeekingDecoder, Size, VideoTrack,
    timing::{ceil_to_frame, floor_to_frame, is_match},
};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";
const SYNTHETIC: &str = "synthetic";
const FPS: f64 = 30.0;
const DURATION: f64 = 60.0;

/// Frames at `k / FPS` with no pixel data.
struct SyntheticSource;

struct SyntheticReader {
    next: u64,
    status: ReaderStatus,
}

impl MediaSource for SyntheticSource {
    fn identifier(&self) -> &str {
        SYNTHETIC
    }

    fn is_readable(&self) -> bool {
        true
    }

    fn duration(&self) -> f64 {
        DURATION
    }

    fn video_track(&self) -> Option<VideoTrack> {
        Some(VideoTrack {
            stream_index: 0,
            natural_size: Size::new(1920, 1080),
            nominal_frame_rate: FPS,
            transform: AffineTransform::IDENTITY,
            timescale: 90_000,
            duration: DURATION,
        })
    }

    fn has_alpha_track(&self) -> bool {
        false
    }

    fn open_reader(
        &self,
        _track: &VideoTrack,
        start_offset: f64,
        _output: &OutputSettings,
    ) -> Result<Box<dyn SampleReader>, SeekFrameError> {
        Ok(Box::new(SyntheticReader {
            next: (start_offset * FPS).ceil() as u64,
            status: ReaderStatus::Reading,
        }))
    }
}

impl SampleReader for SyntheticReader {
    fn next_sample(&mut self) -> Option<DecodedFrame> {
        if self.status != ReaderStatus::Reading {
            return None;
        }
        let time = self.next as f64 / FPS;
        if time >= DURATION {
            self.status = ReaderStatus::Finished;
            return None;
        }
        self.next += 1;
        Some(DecodedFrame::new(
            Some(time),
            Size::new(1920, 1080),
            PixelLayout::BiPlanar,
            Vec::new(),
        ))
    }

    fn status(&self) -> ReaderStatus {
        self.status
    }

    fn fault(&self) -> Option<&ReaderFault> {
        None
    }

    fn cancel(&mut self) {
        self.status = ReaderStatus::Cancelled;
    }
}

struct SyntheticOpener;

impl MediaOpener for SyntheticOpener {
    fn open(&self, _identifier: &str) -> Result<Arc<dyn MediaSource>, SeekFrameError> {
        Ok(Arc::new(SyntheticSource))
    }
}

fn synthetic_decoder() -> SeekingDecoder {
    let cache = Arc::new(MetadataCache::new(Arc::new(SyntheticOpener)));
    SeekingDecoder::new(SYNTHETIC, cache, DecoderOptions::default())
}

fn benchmark_frame_matching(criterion: &mut Criterion) {
    let times: Vec<f64> = (0..6000).map(|step| f64::from(step) * 0.01).collect();

    criterion.bench_function("floor + ceil 6000 times", |bencher| {
        bencher.iter(|| {
            for &time in &times {
                black_box(floor_to_frame(black_box(time), 29.97));
                black_box(ceil_to_frame(black_box(time), 29.97));
            }
        });
    });

    criterion.bench_function("is_match 6000 pairs", |bencher| {
        bencher.iter(|| {
            for &time in &times {
                black_box(is_match(black_box(time), time - 0.01, 1.0 / FPS, DURATION));
            }
        });
    });
}

fn benchmark_synthetic_seeking(criterion: &mut Criterion) {
    criterion.bench_function("synthetic sequential scrub (300 frames)", |bencher| {
        bencher.iter(|| {
            let decoder = synthetic_decoder();
            for index in 0..300 {
                black_box(decoder.decode(f64::from(index) / FPS).unwrap());
            }
        });
    });

    criterion.bench_function("synthetic backward seeks (30 requests)", |bencher| {
        bencher.iter(|| {
            let decoder = synthetic_decoder();
            for index in (0..30).rev() {
                black_box(decoder.decode(f64::from(index) * 1.5).unwrap());
            }
        });
    });

    criterion.bench_function("synthetic repeated request", |bencher| {
        let decoder = synthetic_decoder();
        decoder.decode(10.0).unwrap();
        bencher.iter(|| black_box(decoder.decode(black_box(10.0)).unwrap()));
    });
}

fn benchmark_ffmpeg_seeking(criterion: &mut Criterion) {
    ffmpeg_next::util::log::set_level(LogLevel::Error);

    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }

    let cache = Arc::new(MetadataCache::new(Arc::new(FfmpegOpener::new())));

    criterion.bench_function("decode single frame (mid-video seek)", |bencher| {
        bencher.iter(|| {
            let decoder =
                SeekingDecoder::new(SAMPLE_VIDEO, Arc::clone(&cache), DecoderOptions::default());
            let _frame = decoder.decode(2.5).unwrap();
        });
    });

    criterion.bench_function("decode 30 consecutive frames", |bencher| {
        bencher.iter(|| {
            let decoder =
                SeekingDecoder::new(SAMPLE_VIDEO, Arc::clone(&cache), DecoderOptions::default());
            for index in 0..30 {
                let _frame = decoder.decode(f64::from(index) / FPS).unwrap();
            }
        });
    });

    let mut group = criterion.benchmark_group("pixel layout");
    for layout in [PixelLayout::BiPlanar, PixelLayout::Planar] {
        group.bench_function(format!("{layout:?}"), |bencher| {
            bencher.iter(|| {
                let decoder = SeekingDecoder::new(
                    SAMPLE_VIDEO,
                    Arc::clone(&cache),
                    DecoderOptions::new().with_pixel_layout(layout),
                );
                let _frame = decoder.decode(1.0).unwrap();
            });
        });
    }
    group.finish();
}

criterion::criterion_group!(
    benches,
    benchmark_frame_matching,
    benchmark_synthetic_seeking,
    benchmark_ffmpeg_seeking,
);
criterion::criterion_main!(benches);
