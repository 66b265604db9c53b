use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use clipnarrator_core::narration::domain::narrator::Narrator;
use clipnarrator_core::narration::infrastructure::chat_completion_narrator::{
    ChatCompletionNarrator, NarratorConfig,
};
use clipnarrator_core::narration::infrastructure::jpeg_encoder::JpegFrameEncoder;
use clipnarrator_core::pipeline::narrate_clip_use_case::{
    moment_file_name, ClipNarration, NarrateClipUseCase, NarrationStage, ProgressFn,
};
use clipnarrator_core::sampling::domain::frame_sampler::FrameSampler;
use clipnarrator_core::shared::constants::VIDEO_EXTENSIONS;
use clipnarrator_core::shared::settings::{Settings, SettingsError};
use clipnarrator_core::shared::video_metadata::VideoMetadata;
use clipnarrator_core::video::infrastructure::ffmpeg_source::FfmpegVideoSource;
use clipnarrator_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Narrates a short video clip with a multimodal language model.
#[derive(Parser, Debug)]
#[command(name = "clipnarrator")]
struct Cli {
    /// Input video clip (mp4, mov, avi, mkv, webm).
    input: PathBuf,

    /// Number of frames to sample across the clip [default: 5].
    #[arg(long)]
    frames: Option<usize>,

    /// Never sample more frames than the clip has.
    #[arg(long)]
    clamp_frames: bool,

    /// Save sampled frames to this directory as moment_<n>.jpg.
    #[arg(long)]
    save_frames: Option<PathBuf>,

    /// Width of saved frames in pixels (0 keeps the original size).
    #[arg(long, default_value = "220")]
    preview_width: u32,

    /// Only sample frames; do not call the inference endpoint.
    #[arg(long)]
    extract_only: bool,

    /// Model identifier sent to the endpoint.
    #[arg(long)]
    model: Option<String>,

    /// Chat completion endpoint URL.
    #[arg(long)]
    endpoint: Option<String>,

    /// Instruction sent as the system message.
    #[arg(long)]
    prompt: Option<String>,

    /// Sampling temperature (0.0-2.0).
    #[arg(long)]
    temperature: Option<f64>,

    /// Maximum tokens in the narration.
    #[arg(long)]
    max_tokens: Option<u32>,

    /// JPEG quality for frames sent to the model (1-100).
    #[arg(long)]
    jpeg_quality: Option<u8>,

    /// Downscale frames so their longest edge is at most this many pixels.
    #[arg(long)]
    max_edge: Option<u32>,

    /// Request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Settings file (JSON). Defaults to the user config directory.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write the resolved settings back to the settings file.
    #[arg(long)]
    save_settings: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let settings = resolve_settings(&cli)?;
    validate_settings(&settings)?;
    if cli.save_settings {
        persist_settings(&cli, &settings)?;
        log::info!("Saved settings");
    }

    let sampler = FrameSampler::new(settings.frame_count)?.with_clamp(cli.clamp_frames);
    let encoder = JpegFrameEncoder::new()
        .with_quality(settings.jpeg_quality)
        .with_max_edge(settings.max_edge);
    let narrator = build_narrator(&cli, &settings)?;

    let progress: ProgressFn = Box::new(|stage| match stage {
        NarrationStage::Sampling => eprintln!("Extracting key moments..."),
        NarrationStage::Sampled { decoded, requested } => {
            eprintln!("Extracted {decoded}/{requested} frames")
        }
        NarrationStage::Narrating { frames } => {
            eprintln!("Generating narration from {frames} frames...")
        }
    });

    let mut use_case = NarrateClipUseCase::new(
        Box::new(FfmpegVideoSource::new()),
        sampler,
        Box::new(encoder),
        narrator,
        Some(progress),
    );
    if let Some(dir) = &cli.save_frames {
        let max_width = Some(cli.preview_width).filter(|&w| w > 0);
        use_case = use_case.with_frame_export(Box::new(ImageFileWriter::new()), dir, max_width);
    }

    let result = use_case.execute(&cli.input)?;
    eprintln!("{}", describe_clip(&result.metadata));
    if let Some(dir) = &cli.save_frames {
        log::info!("Saved {} frames to {}", result.frames.len(), dir.display());
    }
    print_result(&result, cli.save_frames.as_deref());
    Ok(())
}

fn build_narrator(
    cli: &Cli,
    settings: &Settings,
) -> Result<Option<Box<dyn Narrator>>, Box<dyn std::error::Error>> {
    if cli.extract_only {
        return Ok(None);
    }
    let config = NarratorConfig::from_settings(settings)?;
    log::info!("Using model {} at {}", config.model, config.endpoint);
    Ok(Some(Box::new(ChatCompletionNarrator::new(config)?)))
}

fn print_result(result: &ClipNarration, saved_to: Option<&Path>) {
    match &result.text {
        Some(text) => {
            println!("### Narration");
            println!();
            println!("{text}");
        }
        None => {
            for (i, frame) in result.frames.iter().enumerate() {
                match saved_to {
                    Some(dir) => println!(
                        "Moment {}: frame {} -> {}",
                        i + 1,
                        frame.index(),
                        dir.join(moment_file_name(i)).display()
                    ),
                    None => println!("Moment {}: frame {}", i + 1, frame.index()),
                }
            }
        }
    }
    if !result.skipped.is_empty() {
        log::warn!("Could not decode frames at {:?}", result.skipped);
    }
}

fn describe_clip(metadata: &VideoMetadata) -> String {
    let mut line = format!(
        "Clip: {}x{}, {} frames at {:.2} fps",
        metadata.width, metadata.height, metadata.total_frames, metadata.fps
    );
    if let Some(secs) = metadata.duration_secs() {
        line.push_str(&format!(" ({secs:.1}s)"));
    }
    line
}

fn persist_settings(cli: &Cli, settings: &Settings) -> Result<(), SettingsError> {
    match &cli.settings {
        Some(path) => settings.save_to(path),
        None => settings.save(),
    }
}

/// Settings file (explicit path or user config), then command-line overrides.
fn resolve_settings(cli: &Cli) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.settings {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load(),
    };

    if let Some(frames) = cli.frames {
        settings.frame_count = frames;
    }
    if let Some(model) = &cli.model {
        settings.model = model.clone();
    }
    if let Some(endpoint) = &cli.endpoint {
        settings.endpoint = endpoint.clone();
    }
    if let Some(prompt) = &cli.prompt {
        settings.system_prompt = prompt.clone();
    }
    if let Some(temperature) = cli.temperature {
        settings.temperature = temperature;
    }
    if let Some(max_tokens) = cli.max_tokens {
        settings.max_tokens = max_tokens;
    }
    if let Some(quality) = cli.jpeg_quality {
        settings.jpeg_quality = quality;
    }
    if cli.max_edge.is_some() {
        settings.max_edge = cli.max_edge;
    }
    if let Some(timeout) = cli.timeout_secs {
        settings.timeout_secs = timeout;
    }
    Ok(settings)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if !is_video(&cli.input) {
        return Err(format!(
            "Unsupported input '{}': expected one of {}",
            cli.input.display(),
            VIDEO_EXTENSIONS.join(", ")
        )
        .into());
    }
    if cli.extract_only {
        let ignored: Vec<&str> = [
            ("--model", cli.model.is_some()),
            ("--endpoint", cli.endpoint.is_some()),
            ("--prompt", cli.prompt.is_some()),
            ("--temperature", cli.temperature.is_some()),
            ("--max-tokens", cli.max_tokens.is_some()),
        ]
        .into_iter()
        .filter_map(|(flag, set)| set.then_some(flag))
        .collect();
        if !ignored.is_empty() {
            return Err(format!(
                "{} has no effect with --extract-only",
                ignored.join(", ")
            )
            .into());
        }
    }
    Ok(())
}

fn validate_settings(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    if settings.frame_count == 0 {
        return Err("Frame count must be at least 1".into());
    }
    if !(0.0..=2.0).contains(&settings.temperature) {
        return Err(format!(
            "Temperature must be between 0.0 and 2.0, got {}",
            settings.temperature
        )
        .into());
    }
    if settings.max_tokens == 0 {
        return Err("Max tokens must be at least 1".into());
    }
    if !(1..=100).contains(&settings.jpeg_quality) {
        return Err(format!(
            "JPEG quality must be between 1 and 100, got {}",
            settings.jpeg_quality
        )
        .into());
    }
    if settings.timeout_secs == 0 {
        return Err("Timeout must be at least 1 second".into());
    }
    Ok(())
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
