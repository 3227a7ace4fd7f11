//! 命令行入口：处理整个文件夹，输出一个压缩包

use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use findcash_lib::batch::{scan_dir, AutoApprove, BatchOrchestrator, CancelToken, LogProgress};
use findcash_lib::core::detection::{DetectionMode, DetectionProfile};
use findcash_lib::core::error::CropError;
use findcash_lib::core::export::{ExportPort, NullExporter, ShadowExporter};
use findcash_lib::PipelineConfig;

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Strict,
    Fast,
}

impl From<Mode> for DetectionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Strict => DetectionMode::Strict,
            Mode::Fast => DetectionMode::Fast,
        }
    }
}

#[derive(Parser)]
#[command(name = "findcash")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Detect, deskew and crop banknotes in a folder of photos", long_about = None)]
struct Cli {
    /// Folder containing the source photos
    input: PathBuf,

    /// Output archive path
    #[arg(short, long, default_value = "cropped_results.zip")]
    output: PathBuf,

    /// Detection profile
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Margin kept around the banknote, in pixels
    #[arg(long)]
    padding: Option<f64>,

    /// Collector endpoint for shadow export
    #[arg(long, env = "FINDCASH_ENDPOINT")]
    endpoint: Option<String>,

    /// JSON pipeline configuration; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Class id written into labels
    #[arg(long = "class-id")]
    class_id: Option<u32>,
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig, CropError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(mode) = self.mode {
            config.detection = DetectionProfile::for_mode(mode.into());
        }
        if let Some(padding) = self.padding {
            config.crop.padding = padding;
        }
        if let Some(endpoint) = &self.endpoint {
            config.export.endpoint = Some(endpoint.clone());
        }
        if let Some(class_id) = self.class_id {
            config.class_id = class_id;
        }
        config.yield_between_items = false;
        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<(), CropError> {
    let config = cli.pipeline_config()?;
    let sources = scan_dir(&cli.input)?;
    if sources.is_empty() {
        warn!("⚠️ No images found in {}", cli.input.display());
    }

    let exporter = match ShadowExporter::from_config(&config.export) {
        Ok(exporter) => exporter,
        Err(err) => {
            warn!("⚠️ Shadow export unavailable: {}", err);
            None
        }
    };
    let port: &dyn ExportPort = match &exporter {
        Some(exporter) => exporter,
        None => &NullExporter,
    };

    let orchestrator = BatchOrchestrator::new(&config);
    let outcome = orchestrator.run(
        &sources,
        &mut AutoApprove,
        &mut LogProgress,
        port,
        &CancelToken::new(),
    )?;

    fs::write(&cli.output, &outcome.archive)?;
    info!(
        "💾 {} written: {}/{} cropped, {} skipped",
        cli.output.display(),
        outcome.succeeded,
        outcome.total,
        outcome.skipped
    );

    if let Some(exporter) = exporter {
        let stats = exporter.shutdown();
        info!("📤 Shadow export: {} sent, {} failed", stats.sent, stats.failed);
    }
    Ok(())
}

fn main() -> ExitCode {
    findcash_lib::init_logging();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("❌ {}", err);
            ExitCode::FAILURE
        }
    }
}
