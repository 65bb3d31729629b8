//! sedq-engine - image authenticity analysis
//!
//! Analyzes one image file and prints the composite result as JSON on
//! stdout. Logs go to stderr. Ctrl+C aborts the running analysis and still
//! prints the (ABORTED) composite.

use anyhow::{Context, Result};
use clap::Parser;
use sedq_common::config::ConfigResolver;
use sedq_common::logging::{default_directive, init_logging};
use sedq_engine::config::CONFIG_MODULE_NAME;
use sedq_engine::{AnalysisRequest, CompositeResult, ConfigOverrides, EngineConfig, ForensicEngine};
use std::path::{Path, PathBuf};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Command-line arguments for sedq-engine
#[derive(Parser, Debug)]
#[command(name = "sedq-engine")]
#[command(about = "Image authenticity analysis: residual, noise and classifier fusion")]
#[command(version)]
struct Args {
    /// Image file to analyze
    image: PathBuf,

    /// Engine config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Classifier model file (requires the `onnx` feature)
    #[arg(short, long, env = "SEDQ_MODEL")]
    model: Option<PathBuf>,

    /// JPEG quality used for compression-residual analysis
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    ela_quality: Option<u8>,

    /// Longest side before sensor-noise analysis downsamples
    #[arg(long)]
    noise_resize_cap: Option<u32>,

    /// Directory to write detector artifacts (PNG) into
    #[arg(short, long)]
    artifacts_dir: Option<PathBuf>,

    /// Pretty-print the JSON result
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config first: it carries the default log level
    let resolved = ConfigResolver::new(CONFIG_MODULE_NAME).resolve(args.config.as_deref());
    let config = EngineConfig::load(resolved.as_ref().map(|(path, _)| path.as_path()))
        .context("Failed to load engine configuration")?;

    init_logging(&default_directive(env!("CARGO_PKG_NAME"), &config.logging.level))
        .context("Failed to initialize logging")?;

    info!("Starting sedq-engine v{}", env!("CARGO_PKG_VERSION"));
    match &resolved {
        Some((path, source)) => info!("Config: {} ({})", path.display(), source),
        None => info!("Config: compiled defaults"),
    }

    let model_path = args.model.clone().or_else(|| config.classifier.model_path.clone());
    let mut engine = ForensicEngine::new(config).context("Failed to initialize engine")?;
    if let Some(path) = model_path {
        engine = attach_classifier(engine, &path);
    }
    if !engine.has_classifier() {
        info!("No classifier attached: learned-classifier analysis reports UNAVAILABLE");
    }

    let image_bytes = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Failed to read {}", args.image.display()))?;

    let overrides = ConfigOverrides {
        ela_quality: args.ela_quality,
        noise_resize_cap: args.noise_resize_cap,
        ..Default::default()
    };
    let request = AnalysisRequest::new(image_bytes).with_overrides(overrides);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let composite = engine
        .analyze(request, &cancel)
        .await
        .with_context(|| format!("Analysis of {} failed", args.image.display()))?;

    if let Some(dir) = &args.artifacts_dir {
        write_artifacts(dir, &args.image, &composite)
            .await
            .context("Failed to write artifacts")?;
    }

    let json = if args.pretty {
        serde_json::to_string_pretty(&composite)
    } else {
        serde_json::to_string(&composite)
    }
    .context("Failed to serialize result")?;
    println!("{}", json);

    Ok(())
}

#[cfg(feature = "onnx")]
fn attach_classifier(engine: ForensicEngine, model_path: &Path) -> ForensicEngine {
    use sedq_engine::classifier::OnnxClassifier;
    use std::sync::Arc;

    match OnnxClassifier::load(model_path, &engine.config().classifier) {
        Ok(classifier) => engine.with_classifier(Arc::new(classifier)),
        Err(e) => {
            warn!("Classifier unavailable: {}", e);
            engine
        }
    }
}

#[cfg(not(feature = "onnx"))]
fn attach_classifier(engine: ForensicEngine, model_path: &Path) -> ForensicEngine {
    warn!(
        "Ignoring model {}: built without the `onnx` feature",
        model_path.display()
    );
    engine
}

/// Write each detector artifact as `<image stem>.<detector>.png`
async fn write_artifacts(dir: &Path, image: &Path, composite: &CompositeResult) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    for (kind, result) in composite.detectors.iter() {
        let Some(artifact) = &result.artifact else {
            continue;
        };
        let path = dir.join(format!("{}.{}.png", stem, kind.id()));
        tokio::fs::write(&path, artifact)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {} artifact: {}", kind, path.display());
    }
    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, cancelling analysis");
            cancel.cancel();
        }
        Err(e) => warn!("Failed to install Ctrl+C handler: {}", e),
    }
}
