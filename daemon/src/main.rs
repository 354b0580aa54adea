//! idgate: command line entry point for the identity verification pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use idgate_capture::ImageFileDevice;
use idgate_delivery::HttpDeliveryChannel;
use idgate_facematch::{FaceMatchOrchestrator, HttpFaceComparator};
use idgate_flow::{ComparisonOutcome, GateConfig, VerificationFlow};
use idgate_preprocess::{compress_with, enhance_with_size, CompressionOptions};
use idgate_types::{
    ArtifactId, DocumentMode, DocumentSide, EncodedImage, FlowVariant, ImageMime, PersonalInfo,
};
use idgate_utils::LogFormat;

#[derive(Parser)]
#[command(name = "idgate", about = "Identity verification capture and gating pipeline")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "IDGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the face comparison service.
    #[arg(long, env = "IDGATE_COMPARATOR_URL")]
    comparator_url: Option<String>,

    /// Seconds to wait for one comparison.
    #[arg(long, env = "IDGATE_COMPARATOR_TIMEOUT_SECS")]
    comparator_timeout_secs: Option<u64>,

    /// Endpoint submissions are posted to.
    #[arg(long, env = "IDGATE_DELIVERY_URL")]
    delivery_url: Option<String>,

    /// Refuse payloads larger than this many bytes before sending.
    #[arg(long, env = "IDGATE_MAX_PAYLOAD_BYTES")]
    max_payload_bytes: Option<usize>,

    /// Log format: "human" or "json".
    #[arg(long, env = "IDGATE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "IDGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Enhance an image for comparison (square grayscale PNG).
    Enhance {
        input: PathBuf,
        output: PathBuf,
        /// Edge length; defaults to the configured size.
        #[arg(long)]
        size: Option<u32>,
    },
    /// Re-encode an image as JPEG under a byte budget.
    Compress {
        input: PathBuf,
        output: PathBuf,
        /// Target size in bytes; defaults to the configured transport target.
        #[arg(long)]
        target_bytes: Option<usize>,
    },
    /// Compare a document photo against a live photo.
    Compare { document: PathBuf, live: PathBuf },
    /// Check that the face comparison service answers.
    Probe,
    /// Run the still-photo flow headlessly and submit the result.
    Verify {
        /// TOML file with the applicant's personal information.
        #[arg(long)]
        applicant: PathBuf,
        /// Front of the identity document.
        #[arg(long)]
        front: PathBuf,
        /// Back of the identity document.
        #[arg(long)]
        back: PathBuf,
        /// Image served as the live camera frame.
        #[arg(long)]
        selfie: PathBuf,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<GateConfig> {
    let mut config = match &cli.config {
        Some(path) => GateConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => GateConfig::default(),
    };
    if let Some(url) = &cli.comparator_url {
        config.comparator_url = url.clone();
    }
    if let Some(secs) = cli.comparator_timeout_secs {
        config.comparator_timeout_secs = secs;
    }
    if let Some(url) = &cli.delivery_url {
        config.delivery_url = url.clone();
    }
    if let Some(limit) = cli.max_payload_bytes {
        config.max_payload_bytes = limit;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

fn read_image(path: &Path) -> anyhow::Result<EncodedImage> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mime = ImageMime::sniff(&bytes)
        .ok_or_else(|| anyhow!("{} is not a PNG or JPEG image", path.display()))?;
    Ok(EncodedImage::new(mime, bytes))
}

fn write_image(path: &Path, image: &EncodedImage) -> anyhow::Result<()> {
    std::fs::write(path, image.bytes()).with_context(|| format!("writing {}", path.display()))
}

/// MIME type a browser would declare for `path`.
fn declared_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

fn comparator(config: &GateConfig) -> HttpFaceComparator {
    HttpFaceComparator::with_timeout(&config.comparator_url, config.comparator_timeout())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    idgate_utils::init_logging(config.log_format, &config.log_level);

    match cli.command {
        Command::Enhance {
            input,
            output,
            size,
        } => {
            let image = read_image(&input)?;
            let enhanced = enhance_with_size(&image, size.unwrap_or(config.enhance_size))?;
            write_image(&output, &enhanced)?;
            tracing::info!(
                "Enhanced {} -> {} ({} bytes)",
                input.display(),
                output.display(),
                enhanced.len()
            );
        }
        Command::Compress {
            input,
            output,
            target_bytes,
        } => {
            let image = read_image(&input)?;
            let target = target_bytes.unwrap_or(config.transport_target_bytes);
            let options = CompressionOptions {
                max_dimension: config.transport_max_dimension,
                ..CompressionOptions::default()
            };
            let compressed = compress_with(&image, target, &options)?;
            write_image(&output, &compressed.image)?;
            if !compressed.reached_target {
                tracing::warn!(
                    "Could not reach {target} bytes; wrote floor quality {}",
                    compressed.quality
                );
            }
            println!(
                "{}x{} at quality {}: {} bytes",
                compressed.width,
                compressed.height,
                compressed.quality,
                compressed.image.len()
            );
        }
        Command::Compare { document, live } => {
            let document = enhance_with_size(&read_image(&document)?, config.enhance_size)?;
            let live = enhance_with_size(&read_image(&live)?, config.enhance_size)?;
            let orchestrator = FaceMatchOrchestrator::new(Arc::new(comparator(&config)))
                .with_timeout(config.comparator_timeout());
            let result = orchestrator
                .compare(ArtifactId::new(0), &document, &live)
                .await
                .map_err(|e| anyhow!("{e}. {}", e.guidance()))?;
            println!(
                "{} (score {}%, method {})",
                if result.is_match() { "MATCH" } else { "NO MATCH" },
                result.score(),
                result.method()
            );
        }
        Command::Probe => {
            let comparator = comparator(&config);
            let message = comparator.probe().await?;
            println!("{}: {message}", comparator.base_url());
        }
        Command::Verify {
            applicant,
            front,
            back,
            selfie,
        } => verify(config, &applicant, &front, &back, &selfie).await?,
    }

    Ok(())
}

async fn verify(
    config: GateConfig,
    applicant: &Path,
    front: &Path,
    back: &Path,
    selfie: &Path,
) -> anyhow::Result<()> {
    if config.variant != FlowVariant::StillPhoto {
        bail!("headless verification supports only the still-photo flow");
    }
    let contents = std::fs::read_to_string(applicant)
        .with_context(|| format!("reading {}", applicant.display()))?;
    let personal: PersonalInfo = toml::from_str(&contents)
        .with_context(|| format!("parsing {}", applicant.display()))?;

    let device = Arc::new(ImageFileDevice::open(selfie)?);
    let channel = Arc::new(
        HttpDeliveryChannel::with_timeout(&config.delivery_url, config.delivery_timeout())
            .with_max_payload(config.max_payload_bytes),
    );
    let config = GateConfig {
        document_mode: DocumentMode::Upload,
        ..config
    };
    let mut flow = VerificationFlow::new(
        config.clone(),
        device,
        Arc::new(comparator(&config)),
        channel,
    )?;

    flow.update_personal_info(personal);
    flow.advance()?;

    for (side, path) in [(DocumentSide::Front, front), (DocumentSide::Back, back)] {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document");
        flow.upload_document(side, file_name, declared_mime(path), bytes)?;
    }
    flow.advance()?;

    flow.start_camera().await?;
    match flow.capture_and_verify().await? {
        ComparisonOutcome::Applied(result) => tracing::info!(
            "Face match {}: {}%",
            if result.is_match() { "passed" } else { "failed" },
            result.score()
        ),
        ComparisonOutcome::Discarded { .. } => bail!("comparison result was discarded"),
    }
    flow.advance()?;

    let receipt = flow.submit().await?;
    println!(
        "Submitted via {} ({} bytes{})",
        receipt.channel,
        receipt.bytes,
        receipt
            .status
            .map(|s| format!(", status {s}"))
            .unwrap_or_default()
    );
    Ok(())
}
