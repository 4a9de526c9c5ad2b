use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use connect_cam::agent::{parse_camera_index, parse_interval, Agent};
use connect_cam::capture::FfmpegCapture;
use connect_cam::config::{CliOverrides, Config, Settings};
use connect_cam::connect::{ConnectClient, Credentials, CONNECT_TOKEN_ENV};
use connect_cam::devices::{print_devices, DeviceSource, V4l2Devices, DEFAULT_DEVICE_DIR};

/// connect-cam: Prusa Connect snapshot agent
#[derive(Parser)]
#[command(name = "connect-cam")]
#[command(version, about = "Upload periodic camera snapshots to Prusa Connect")]
#[command(long_about = "Discovers a local V4L2 camera, registers it with Prusa Connect \
    and uploads a JPEG snapshot at a fixed interval until stopped.")]
#[command(after_help = "EXAMPLES:
    # First camera, one snapshot every 30 seconds
    connect-cam <TOKEN>

    # Second camera, one snapshot every 10 seconds
    connect-cam <TOKEN> 1 10

    # Token from the environment (or .env); use flags for index and interval,
    # since the first positional is always the token
    PRUSA_CONNECT_TOKEN=<TOKEN> connect-cam --camera 1 --interval 10

    # Show the cameras that would be considered
    connect-cam --list-devices

REQUIREMENTS:
    ffmpeg with V4L2 support must be on PATH.")]
struct Cli {
    /// Camera token from Prusa Connect (falls back to PRUSA_CONNECT_TOKEN)
    token: Option<String>,

    /// Zero-based index of the camera to use (default: first found)
    #[arg(value_parser = parse_camera_index, allow_negative_numbers = true)]
    camera_index: Option<usize>,

    /// Seconds between snapshots (default: 30, minimum: 1)
    #[arg(value_parser = parse_interval, allow_negative_numbers = true)]
    interval: Option<u64>,

    /// Camera index, for use without the TOKEN positional
    #[arg(
        long = "camera",
        value_name = "INDEX",
        value_parser = parse_camera_index,
        conflicts_with = "camera_index"
    )]
    camera_flag: Option<usize>,

    /// Seconds between snapshots, for use without the TOKEN positional
    #[arg(
        long = "interval",
        value_name = "SECS",
        value_parser = parse_interval,
        allow_negative_numbers = true,
        conflicts_with = "interval"
    )]
    interval_flag: Option<u64>,

    /// Path to a config file (default: ~/.config/connect-cam/config.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Override the Prusa Connect base URL
    #[arg(long)]
    base_url: Option<String>,

    /// List available video devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Load the config file. An explicit `--config` path must exist and parse;
/// problems with the default file only produce a warning.
fn load_config(path: Option<&PathBuf>) -> Result<Config, String> {
    match path {
        Some(path) => Config::load_from_explicit(path).map_err(|e| e.to_string()),
        None => Ok(Config::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config file: {}", e);
            log::warn!("Using default settings.");
            Config::default()
        })),
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = load_config(cli.config.as_ref())?;

    if cli.list_devices {
        let dir = config
            .camera
            .device_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DEVICE_DIR));
        let devices = V4l2Devices::new(dir).list_devices().await;
        print_devices(&devices);
        return Ok(());
    }

    let overrides = CliOverrides {
        token: cli.token,
        camera_index: cli.camera_index.or(cli.camera_flag),
        interval: cli.interval.or(cli.interval_flag),
        base_url: cli.base_url,
    };
    let settings = Settings::resolve(overrides, std::env::var(CONNECT_TOKEN_ENV).ok(), config)
        .map_err(|e| e.to_string())?;

    let credentials = Credentials::with_fingerprint(settings.token, settings.fingerprint)
        .map_err(|e| e.to_string())?;
    let client =
        ConnectClient::with_base_url(credentials, settings.base_url).map_err(|e| e.to_string())?;
    let capture = FfmpegCapture::new()
        .with_program(settings.ffmpeg)
        .with_input_format(settings.input_format)
        .with_quality(settings.quality);

    let agent = Agent::new(V4l2Devices::new(settings.device_dir), capture, client)
        .with_camera_name(settings.camera_name)
        .with_resolution(settings.resolution);

    let running = agent
        .start(settings.camera_index)
        .await
        .map_err(|e| e.to_string())?;

    log::info!("Upload interval: {}s", settings.interval_secs);

    let period = Duration::from_secs(settings.interval_secs);
    tokio::select! {
        _ = running.run(period, None, |result| println!("{}", result)) => {}
        _ = tokio::signal::ctrl_c() => {
            log::info!("Interrupted, shutting down");
        }
    }

    Ok(())
}

fn main() {
    // Load .env file, don't override existing env vars
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: Failed to create async runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run(cli)) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
