//! Blackline — PII redaction service for scanned documents.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use blackline_core::{BlacklineConfig, PipelineOptions, ServiceConfig, CONFIG_FILE};
use blackline_runtime::{RasterCompositor, RedactionPipeline, VisionOcrClient};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("BLACKLINE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

/// Detection tiers from config plus the raster compositor.
fn build_pipeline(config: &BlacklineConfig) -> RedactionPipeline {
    let model = blackline_detect::create_model_adapter(&config.service.ner, &config.model_dir());
    RedactionPipeline::new(model).with_compositor(Arc::new(RasterCompositor::default()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "init" => return run_init(),
            "redact" => return run_redact(&args[2..]),
            "--help" | "-h" | "help" => {
                println!("Blackline — PII redaction for scanned documents");
                println!();
                println!("Usage: blackline [command]");
                println!();
                println!("Commands:");
                println!("  (none)                      Start the server");
                println!("  init                        Write a default blackline.json to the data directory");
                println!("  redact <file> [threshold]   Print the redacted text of a file");
                println!("  help                        Show this help message");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'blackline help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = BlacklineConfig::from_env(&data_dir)?;
    let port = config.port;

    let pipeline = build_pipeline(&config);
    let ocr = VisionOcrClient::new(&config.service.ocr)?;
    if !ocr.is_configured() {
        warn!("No Vision API key configured; document uploads will fail until GOOGLE_VISION_API_KEY is set");
    }

    let state = Arc::new(AppState::new(config, pipeline, Arc::new(ocr)));

    // Collaborator clients are blocking: they are created and dropped
    // outside the async runtime.
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let result = runtime.block_on(serve(state.clone(), port));
    drop(runtime);
    result
}

async fn serve(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Blackline server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// `blackline init`: default config file, secrets left to the environment.
fn run_init() -> anyhow::Result<()> {
    let data_dir = resolve_data_dir();
    let path = data_dir.join(CONFIG_FILE);
    if ServiceConfig::init(&path)? {
        println!("Wrote {}", path.display());
    } else {
        println!("{} already exists", path.display());
    }
    Ok(())
}

/// `blackline redact <file> [threshold]`: entity list on stderr, redacted
/// text on stdout.
fn run_redact(args: &[String]) -> anyhow::Result<()> {
    let Some(path) = args.first() else {
        eprintln!("Usage: blackline redact <file> [threshold]");
        std::process::exit(1);
    };

    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    let config = BlacklineConfig::from_env(resolve_data_dir())?;
    let threshold = match args.get(1) {
        Some(raw) => raw
            .parse::<f64>()
            .with_context(|| format!("Invalid threshold: {}", raw))?,
        None => config.service.confidence_threshold,
    };
    let options = PipelineOptions::new(threshold, &config.service.language)?;

    let report = build_pipeline(&config).redact_text(&text, &options)?;

    for e in &report.entities {
        eprintln!(
            "{:>6}..{:<6} {:<16} {:<8} {:.2}",
            e.start,
            e.end,
            format!("{:?}", e.label),
            format!("{:?}", e.risk_level),
            e.confidence
        );
    }
    eprintln!(
        "{} entities ({} pattern, {} model via {})",
        report.model_stats.total_entities,
        report.model_stats.pattern_matches,
        report.model_stats.model_matches,
        report.model_stats.model_backend
    );
    println!("{}", report.redacted_text);
    Ok(())
}
