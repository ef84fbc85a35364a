use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wasmframe_core::config::{DEFAULT_LOCATION, DEFAULT_MAX_MODULE_BYTES};
use wasmframe_core::{
    BootConfig, Bootstrapper, DriverStop, FrameContext, FrameDriver, StrategyPreference, source,
};

#[derive(Debug, Clone, Parser)]
#[command(name = "wasmframe", version, about)]
struct Args {
    /// Module to load: an `http(s)://` URL, a `file://` URL or a local path.
    ///
    /// Environment variable: `WASMFRAME_LOCATION`.
    #[arg(env = "WASMFRAME_LOCATION", default_value = DEFAULT_LOCATION)]
    location: String,

    /// `auto`, `streaming` or `buffered`.
    ///
    /// Environment variable: `WASMFRAME_STRATEGY`.
    #[arg(long, env = "WASMFRAME_STRATEGY", default_value_t = StrategyPreference::Auto)]
    strategy: StrategyPreference,

    /// Name of the exported `(f64) -> ()` function called once per frame.
    ///
    /// Environment variable: `WASMFRAME_FRAME_EXPORT`.
    #[arg(long, env = "WASMFRAME_FRAME_EXPORT", default_value = wasmframe_core::abi::guest_exports::FRAME)]
    frame_export: String,

    /// Frame rate the driver emulates.
    ///
    /// Environment variable: `WASMFRAME_FPS`.
    #[arg(long, env = "WASMFRAME_FPS", default_value_t = 60)]
    fps: u32,

    /// Stop after this many frames. Unlimited when unset.
    ///
    /// Environment variable: `WASMFRAME_MAX_FRAMES`.
    #[arg(long, env = "WASMFRAME_MAX_FRAMES")]
    max_frames: Option<u64>,

    /// Reject payloads larger than this many bytes.
    ///
    /// Environment variable: `WASMFRAME_MAX_MODULE_BYTES`.
    #[arg(long, env = "WASMFRAME_MAX_MODULE_BYTES", default_value_t = DEFAULT_MAX_MODULE_BYTES)]
    max_module_bytes: u64,

    /// Don't link WASI preview1 imports.
    ///
    /// Environment variable: `WASMFRAME_NO_WASI`.
    #[arg(long, env = "WASMFRAME_NO_WASI")]
    no_wasi: bool,

    /// Log filter (tracing-subscriber EnvFilter syntax).
    ///
    /// Environment variable: `WASMFRAME_LOG_LEVEL`.
    #[arg(long, env = "WASMFRAME_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn boot_config(&self) -> BootConfig {
        BootConfig {
            strategy: self.strategy,
            frame_export: self.frame_export.clone(),
            max_module_bytes: self.max_module_bytes,
            wasi: !self.no_wasi,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let (filter, rejected) = log_filter(&args.log_level);
    tracing_subscriber::fmt().with_env_filter(filter).init();
    if let Some(err) = rejected {
        tracing::warn!(log_level = %args.log_level, "invalid log filter, using `info`: {err}");
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Parse `--log-level`, falling back to `info`. The parse error is handed back so it can be
/// reported once the subscriber is up.
fn log_filter(directives: &str) -> (EnvFilter, Option<String>) {
    match EnvFilter::try_new(directives) {
        Ok(filter) => (filter, None),
        Err(err) => (EnvFilter::new("info"), Some(err.to_string())),
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let bootstrapper =
        Bootstrapper::new(args.boot_config()).context("failed to set up the wasm runtime")?;
    let source = source::from_location(&args.location)?;

    let mut ctx = FrameContext::new();
    ctx.init(&bootstrapper, source.as_ref())
        .await
        .with_context(|| format!("failed to load {}", args.location))?;

    let driver = FrameDriver::new(args.fps).with_max_frames(args.max_frames);
    tokio::select! {
        result = driver.run(&mut ctx) => {
            let (stop, delivered) = result.context("frame failed")?;
            match stop {
                DriverStop::Idle => tracing::info!(delivered, "guest stopped requesting frames"),
                DriverStop::FrameLimit => tracing::info!(delivered, "frame limit reached"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }
    Ok(())
}
