use std::path::PathBuf;

use {
    anyhow::{Context, Result, bail},
    clap::{Args, ValueEnum},
    hinata_config::HinataConfig,
    hinata_media::{GenerationDispatcher, GenerationResult, MediaKind, MediaRequest, SizePreset},
};

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Image,
    Video,
}

impl From<KindArg> for MediaKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Image => Self::Image,
            KindArg::Video => Self::Video,
        }
    }
}

#[derive(Args)]
pub struct GenerateArgs {
    #[arg(long, value_enum, default_value = "image")]
    pub kind: KindArg,
    #[arg(short, long)]
    pub prompt: String,
    /// Things the model should avoid.
    #[arg(long)]
    pub negative: Option<String>,
    /// Preset name (square, portrait, landscape, wide) or `WxH`.
    #[arg(long, value_parser = parse_dimensions)]
    pub size: Option<(u32, u32)>,
    /// Video frame count.
    #[arg(long)]
    pub frames: Option<u32>,
    /// Output file. Defaults to `hinata.<ext>`.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Accept a size preset name or an arbitrary `WxH`.
pub fn parse_dimensions(raw: &str) -> Result<(u32, u32), String> {
    if let Ok(preset) = raw.parse::<SizePreset>() {
        return Ok(preset.dimensions());
    }
    let (w, h) = raw
        .trim()
        .to_ascii_lowercase()
        .split_once('x')
        .map(|(w, h)| (w.trim().parse::<u32>(), h.trim().parse::<u32>()))
        .ok_or_else(|| format!("expected a preset or WxH, got `{raw}`"))?;
    match (w, h) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(format!("invalid dimensions `{raw}`")),
    }
}

fn build_request(args: &GenerateArgs) -> MediaRequest {
    let mut request = MediaRequest::new(args.kind.into(), args.prompt.clone());
    if let Some(negative) = &args.negative {
        request = request.with_negative_prompt(negative.clone());
    }
    if let Some((width, height)) = args.size {
        request = request
            .with_parameter("width", width)
            .with_parameter("height", height);
    }
    if let Some(frames) = args.frames {
        request = request.with_parameter("num_frames", frames);
    }
    request
}

pub async fn handle_generate(config: &HinataConfig, args: GenerateArgs) -> Result<()> {
    let dispatcher = GenerationDispatcher::from_config(&config.generation)?;
    let request = build_request(&args);
    let dispatch = dispatcher.dispatch(&request).await;

    for attempt in &dispatch.attempts {
        match &attempt.error {
            None => eprintln!(
                "  {:<10} {} ok ({:.1}s)",
                attempt.tier.to_string(),
                attempt.endpoint,
                attempt.elapsed.as_secs_f32()
            ),
            Some(e) => eprintln!(
                "  {:<10} {} failed: {e}",
                attempt.tier.to_string(),
                attempt.endpoint
            ),
        }
    }

    match dispatch.result {
        GenerationResult::Success(bytes) => {
            let out = args
                .out
                .unwrap_or_else(|| PathBuf::from(format!("hinata.{}", request.kind.extension())));
            std::fs::write(&out, &bytes)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("{}", out.display());
            Ok(())
        },
        GenerationResult::Failure(reason) => bail!("generation failed: {reason}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_accept_presets_and_custom_sizes() {
        assert_eq!(parse_dimensions("portrait").unwrap(), (768, 1024));
        assert_eq!(parse_dimensions("512x512").unwrap(), (512, 512));
        assert_eq!(parse_dimensions("1280X720").unwrap(), (1280, 720));
        assert!(parse_dimensions("0x10").is_err());
        assert!(parse_dimensions("huge").is_err());
    }
}
