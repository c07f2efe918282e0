use std::{path::Path, sync::Arc};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use seekframe::{
    DecodeEvent, DecodeObserver, DecoderOptions, FfmpegLogLevel, FfmpegOpener, MediaKind,
    MetadataCache, PixelLayout, SeekingDecoder, Size,
};

const CLI_AFTER_HELP: &str = "Examples:\n  seekframe probe input.mp4 --json\n  seekframe frame input.mp4 --at 00:00:12.5 --out frame.png\n  seekframe scrub input.mp4 --times 5,4.96,4.92,10 --progress\n  seekframe completions zsh > _seekframe";

#[derive(Debug, Parser)]
#[command(
    name = "seekframe",
    version,
    about = "Frame-accurate random access to video frames",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Print decoder events as they happen.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar where supported.
    #[arg(long)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<String>,

    /// Decoded frame layout (nv12, i420).
    #[arg(long)]
    pixel_layout: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print source metadata.
    #[command(
        about = "Print source metadata",
        visible_alias = "info",
        after_help = "Examples:\n  seekframe probe input.mp4\n  seekframe probe poster.png --image --json"
    )]
    Probe {
        /// Input media path.
        input: String,

        /// Probe as a still image instead of a video.
        #[arg(long)]
        image: bool,

        /// Preview bound as WIDTHxHEIGHT.
        #[arg(long)]
        preview: Option<String>,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Decode the frame at one timestamp and save it as an image.
    #[command(
        about = "Save the frame at a timestamp",
        after_help = "Examples:\n  seekframe frame input.mp4 --at 3.5 --out frame.png\n  seekframe frame input.mp4 --at 01:02.5 --size 640x360 --out small.jpg"
    )]
    Frame {
        /// Input media path.
        input: String,
        /// Timestamp in seconds or [HH:]MM:SS(.fff).
        #[arg(long)]
        at: String,
        /// Output image path.
        #[arg(long)]
        out: String,
        /// Output size as WIDTHxHEIGHT in display orientation.
        #[arg(long)]
        size: Option<String>,
    },

    /// Decode a sequence of timestamps and report decoder statistics.
    #[command(
        about = "Decode a sequence of timestamps",
        after_help = "Examples:\n  seekframe scrub input.mp4 --times 1,0.5,0.5,7\n  seekframe scrub input.mp4 --start 10 --end 0 --step 0.5 --json"
    )]
    Scrub {
        /// Input media path.
        input: String,
        /// Comma-separated timestamps.
        #[arg(long, conflicts_with_all = ["start", "end"])]
        times: Option<String>,
        /// First timestamp of a stepped range.
        #[arg(long)]
        start: Option<String>,
        /// Last timestamp of a stepped range (may be before --start).
        #[arg(long)]
        end: Option<String>,
        /// Step between range timestamps in seconds.
        #[arg(long, default_value_t = 1.0 / 30.0)]
        step: f64,
        /// Output the results as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_timecode(value: &str) -> Result<f64, Box<dyn std::error::Error>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".into());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        return Ok(seconds.max(0.0));
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(format!("invalid time format: {trimmed}").into());
    }

    let (hours, minutes, seconds) = if parts.len() == 3 {
        (parts[0].parse::<u64>()?, parts[1].parse::<u64>()?, parts[2])
    } else {
        (0_u64, parts[0].parse::<u64>()?, parts[1])
    };

    let seconds = seconds.parse::<f64>()?;
    Ok(((hours as f64 * 3600.0) + (minutes as f64 * 60.0) + seconds).max(0.0))
}

fn parse_times(value: &str) -> Result<Vec<f64>, Box<dyn std::error::Error>> {
    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(parse_timecode)
        .collect()
}

fn stepped_times(start: f64, end: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 {
        return vec![start];
    }
    let count = ((end - start).abs() / step).floor() as usize;
    let direction = if end < start { -1.0 } else { 1.0 };
    (0..=count)
        .map(|index| start + direction * step * index as f64)
        .collect()
}

fn parse_size(value: &str) -> Option<Size> {
    let (width, height) = value.trim().split_once(['x', 'X'])?;
    let size = Size::new(width.parse().ok()?, height.parse().ok()?);
    (size.width > 0 && size.height > 0).then_some(size)
}

fn parse_pixel_layout(value: &str) -> Option<PixelLayout> {
    match value.to_ascii_lowercase().as_str() {
        "nv12" | "biplanar" | "bi-planar" => Some(PixelLayout::BiPlanar),
        "i420" | "yuv420p" | "planar" => Some(PixelLayout::Planar),
        _ => None,
    }
}

fn parse_log_level(value: &str) -> Option<FfmpegLogLevel> {
    match value.to_ascii_lowercase().as_str() {
        "quiet" => Some(FfmpegLogLevel::Quiet),
        "panic" => Some(FfmpegLogLevel::Panic),
        "fatal" => Some(FfmpegLogLevel::Fatal),
        "error" => Some(FfmpegLogLevel::Error),
        "warning" | "warn" => Some(FfmpegLogLevel::Warning),
        "info" => Some(FfmpegLogLevel::Info),
        "verbose" => Some(FfmpegLogLevel::Verbose),
        "debug" => Some(FfmpegLogLevel::Debug),
        "trace" => Some(FfmpegLogLevel::Trace),
        _ => None,
    }
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed = parse_log_level(level).ok_or(format!("unsupported --log-level: {level}"))?;
        seekframe::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

fn decoder_options(global: &GlobalOptions) -> Result<DecoderOptions, Box<dyn std::error::Error>> {
    let mut options = DecoderOptions::new();
    if let Some(layout) = &global.pixel_layout {
        let parsed = parse_pixel_layout(layout)
            .ok_or(format!("unsupported --pixel-layout: {layout}"))?;
        options = options.with_pixel_layout(parsed);
    }
    Ok(options)
}

fn open_decoder(
    input: &str,
    global: &GlobalOptions,
) -> Result<SeekingDecoder, Box<dyn std::error::Error>> {
    let cache = Arc::new(MetadataCache::new(Arc::new(FfmpegOpener::new())));
    let descriptor = cache
        .get(input, MediaKind::Video)
        .ok_or(format!("cannot read {input}"))?;
    if !descriptor.is_video() {
        return Err(format!("{input} has no decodable video track").into());
    }

    let decoder = SeekingDecoder::new(input, cache, decoder_options(global)?);
    if global.verbose {
        decoder.subscribe(Arc::new(EventPrinter));
    }
    Ok(decoder)
}

struct EventPrinter;

impl DecodeObserver for EventPrinter {
    fn on_event(&self, event: &DecodeEvent) {
        match event {
            DecodeEvent::SessionStarted { offset, reason } => {
                eprintln!("{} at {offset:.3}s ({reason})", "session".cyan().bold());
            }
            DecodeEvent::CachedFrameReused { requested } => {
                eprintln!("{} {requested:.3}s", "reused".blue().bold());
            }
            DecodeEvent::FrameProduced {
                requested,
                presentation_time,
            } => {
                eprintln!(
                    "{} {requested:.3}s -> pts {presentation_time:.3}s",
                    "decoded".green().bold()
                );
            }
            DecodeEvent::NoFrame { requested } => {
                eprintln!("{} {requested:.3}s", "missed".yellow().bold());
            }
            _ => {}
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Probe {
            input,
            image,
            preview,
            json,
        } => {
            let mut cache = MetadataCache::new(Arc::new(FfmpegOpener::new()));
            if let Some(bound) = &preview {
                let bound = parse_size(bound).ok_or(format!("invalid --preview: {bound}"))?;
                cache = cache.with_preview_bound(bound);
            }
            let kind = if image {
                MediaKind::Image
            } else {
                MediaKind::Video
            };
            let descriptor = cache
                .get(&input, kind)
                .ok_or(format!("cannot read {input}"))?;

            if json {
                let payload = json!({
                    "identifier": descriptor.identifier,
                    "kind": if image { "image" } else { "video" },
                    "is_video": descriptor.is_video(),
                    "width": descriptor.natural_size.width,
                    "height": descriptor.natural_size.height,
                    "rotation": descriptor.rotation.degrees(),
                    "mirrored": descriptor.mirrored,
                    "fps": descriptor.frames_per_second,
                    "duration_seconds": descriptor.duration,
                    "preview": {
                        "width": descriptor.preview_size.width,
                        "height": descriptor.preview_size.height,
                    },
                    "has_alpha": descriptor.has_alpha,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Source: {}", descriptor.identifier);
                println!(
                    "Size: {} (display {})",
                    descriptor.natural_size,
                    descriptor.display_size()
                );
                println!(
                    "Rotation: {}{}",
                    descriptor.rotation,
                    if descriptor.mirrored { ", mirrored" } else { "" }
                );
                if !image {
                    println!("Frame rate: {:.3} fps", descriptor.frames_per_second);
                    println!("Duration: {:.3}s", descriptor.duration);
                }
                println!("Preview: {}", descriptor.preview_size);
                println!("Alpha: {}", if descriptor.has_alpha { "yes" } else { "no" });
                if !image && !descriptor.is_video() {
                    println!("{}", "not a decodable video".yellow());
                }
            }
        }
        Commands::Frame {
            input,
            at,
            out,
            size,
        } => {
            let out = Path::new(&out);
            ensure_writable_path(out, cli.global.overwrite)?;
            let decoder = open_decoder(&input, &cli.global)?;
            if let Some(size) = &size {
                let size = parse_size(size).ok_or(format!("invalid --size: {size}"))?;
                decoder.update_output_size(size);
            }

            let time = parse_timecode(&at)?;
            let frame = decoder
                .decode(time)?
                .ok_or(format!("no frame at {time:.3}s"))?;
            frame.to_rgb_image()?.save(out)?;
            println!(
                "{} {} (pts {:.3}s)",
                "saved".green().bold(),
                out.display(),
                frame.presentation_time().unwrap_or(time)
            );
        }
        Commands::Scrub {
            input,
            times,
            start,
            end,
            step,
            json,
        } => {
            let targets = match (times, start, end) {
                (Some(times), _, _) => parse_times(&times)?,
                (None, Some(start), Some(end)) => {
                    stepped_times(parse_timecode(&start)?, parse_timecode(&end)?, step)
                }
                _ => return Err("pass --times or both --start and --end".into()),
            };
            if targets.is_empty() {
                return Err("no timestamps to decode".into());
            }

            let decoder = open_decoder(&input, &cli.global)?;
            let progress_bar = if cli.global.progress {
                let pb = ProgressBar::new(targets.len() as u64);
                let style = ProgressStyle::with_template(
                    "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}",
                )?;
                pb.set_style(style.progress_chars("##-"));
                Some(pb)
            } else {
                None
            };

            let mut results = Vec::with_capacity(targets.len());
            for &time in &targets {
                let pts = decoder
                    .decode(time)?
                    .and_then(|frame| frame.presentation_time());
                if let Some(pb) = &progress_bar {
                    pb.set_message(format!("{time:.3}s"));
                    pb.inc(1);
                } else if !json {
                    match pts {
                        Some(pts) => println!("{time:.3}s -> {pts:.3}s"),
                        None => println!("{time:.3}s -> {}", "no frame".yellow()),
                    }
                }
                results.push((time, pts));
            }
            if let Some(pb) = progress_bar {
                pb.finish_with_message("done");
            }

            let statistics = decoder.statistics();
            if json {
                let payload = json!({
                    "frames": results
                        .iter()
                        .map(|(time, pts)| json!({ "requested": time, "presentation_time": pts }))
                        .collect::<Vec<_>>(),
                    "statistics": {
                        "sessions_created": statistics.sessions_created,
                        "samples_pulled": statistics.samples_pulled,
                        "invalid_samples_skipped": statistics.invalid_samples_skipped,
                        "cached_frame_hits": statistics.cached_frame_hits,
                        "frames_produced": statistics.frames_produced,
                        "misses": statistics.misses,
                    },
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!(
                    "{} {} sessions, {} samples pulled, {} reused, {} decoded, {} missed",
                    "stats".cyan().bold(),
                    statistics.sessions_created,
                    statistics.samples_pulled,
                    statistics.cached_frame_hits,
                    statistics.frames_produced,
                    statistics.misses,
                );
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "seekframe", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Cli, parse_log_level, parse_pixel_layout, parse_size, parse_timecode, parse_times,
        stepped_times,
    };
    use clap::Parser;
    use seekframe::{PixelLayout, Size};

    #[test]
    fn parse_timecode_formats() {
        assert_eq!(parse_timecode("75").unwrap(), 75.0);
        assert_eq!(parse_timecode("01:15").unwrap(), 75.0);
        assert_eq!(parse_timecode("00:01:15.5").unwrap(), 75.5);
        assert!(parse_timecode("").is_err());
        assert!(parse_timecode("1:2:3:4").is_err());
    }

    #[test]
    fn parse_times_list() {
        assert_eq!(parse_times("1, 0.5,,2").unwrap(), vec![1.0, 0.5, 2.0]);
        assert!(parse_times("1,abc").is_err());
    }

    #[test]
    fn stepped_times_run_both_directions() {
        assert_eq!(stepped_times(0.0, 1.0, 0.5), vec![0.0, 0.5, 1.0]);
        assert_eq!(stepped_times(1.0, 0.0, 0.5), vec![1.0, 0.5, 0.0]);
        assert_eq!(stepped_times(2.0, 5.0, 0.0), vec![2.0]);
    }

    #[test]
    fn parse_size_values() {
        assert_eq!(parse_size("640x360"), Some(Size::new(640, 360)));
        assert_eq!(parse_size("640X360"), Some(Size::new(640, 360)));
        assert_eq!(parse_size("0x360"), None);
        assert_eq!(parse_size("640"), None);
    }

    #[test]
    fn parse_pixel_layout_aliases() {
        assert_eq!(parse_pixel_layout("NV12"), Some(PixelLayout::BiPlanar));
        assert_eq!(parse_pixel_layout("i420"), Some(PixelLayout::Planar));
        assert_eq!(parse_pixel_layout("yuv420p"), Some(PixelLayout::Planar));
        assert_eq!(parse_pixel_layout("rgb"), None);
    }

    #[test]
    fn parse_log_level_aliases() {
        assert!(parse_log_level("warn").is_some());
        assert!(parse_log_level("QUIET").is_some());
        assert!(parse_log_level("loud").is_none());
    }

    #[test]
    fn scrub_rejects_times_with_range() {
        let parsed = Cli::try_parse_from([
            "seekframe", "scrub", "in.mp4", "--times", "1,2", "--start", "0",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn global_options_parse_before_subcommand() {
        let parsed =
            Cli::try_parse_from(["seekframe", "--verbose", "probe", "in.mp4", "--json"]).unwrap();
        assert!(parsed.global.verbose);
    }
}
