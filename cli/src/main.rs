use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use floodcast::capture::capture_filename;
use floodcast::capture::CaptureKind;
use floodcast::mask::datauri::{DataUrl, ImageFormat, encode_png_data_url};
use floodcast::mask::threshold::{DEFAULT_TOLERANCE, KeyColor, coverage, threshold_mask};
use floodcast::message::{CameraPose, DepthMessage};
use floodcast::shutdown::Shutdown;
use floodcast::watcher::Watcher;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered HTTP {status}: {message}")]
    ServerError { status: u16, message: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("server answered HTTP {status} with an unreadable body: {source}")]
    BadResponse { status: u16, source: serde_json::Error },
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("mask error: {0}")]
    Mask(#[from] floodcast::mask::MaskError),
    #[error("unsupported image extension for {0}")]
    UnsupportedExtension(PathBuf),
    #[error("invalid key color {0:?}; expected r,g,b")]
    InvalidKey(String),
    #[error("watcher error: {0}")]
    Watch(#[from] floodcast::watcher::WatchError),
}

#[derive(Parser, Debug)]
#[command(name = "floodcast-cli", about = "Flood capture relay CLI")]
struct Cli {
    #[arg(long, env = "FLOODCAST_BASE_URL", default_value = "http://127.0.0.1:8000")]
    base_url: String,

    /// Relay route for depth and camera payloads.
    #[arg(long, env = "CAMERA_METADATA_ROUTE", default_value = "/api/coords")]
    relay_route: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct CliContext {
    base_url: String,
    relay_route: String,
    client: reqwest::Client,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check `/health`.
    Ping,
    /// Print connected/ready counts.
    Clients,
    /// Block until enough SSE clients are connected.
    WaitClients(WaitArgs),
    /// Block until enough viewers reported ready.
    WaitReady(WaitArgs),
    /// Relay a depth message.
    SendDepth(SendDepthArgs),
    /// Relay a single camera pose.
    SendCamera(SendCameraArgs),
    /// Upload a PNG or JPEG file through `/save-mask`.
    SaveMask(SaveMaskArgs),
    /// Threshold a rendered frame into a black/white mask.
    Threshold(ThresholdArgs),
    /// Follow the event stream and print saved masks as JSON lines.
    Watch,
    /// Ask the relay to shut down.
    Shutdown,
}

#[derive(Args, Debug)]
struct WaitArgs {
    #[arg(long, default_value_t = 1)]
    min: usize,

    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[derive(Args, Debug)]
struct SendDepthArgs {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    lng: f64,

    #[arg(long, allow_hyphen_values = true)]
    depth: f64,
}

#[derive(Args, Debug)]
struct SendCameraArgs {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    lng: f64,

    #[arg(long, allow_hyphen_values = true)]
    heading: Option<f64>,

    #[arg(long)]
    fov: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pitch: Option<f64>,

    /// Capture id; a fresh one is generated when omitted.
    #[arg(long)]
    uuid: Option<String>,
}

#[derive(Args, Debug)]
struct SaveMaskArgs {
    file: PathBuf,

    /// Stored filename; defaults to the input file's name.
    #[arg(long)]
    filename: Option<String>,
}

#[derive(Args, Debug)]
struct ThresholdArgs {
    input: PathBuf,

    output: PathBuf,

    #[arg(long, default_value = "0,0,255")]
    key: String,

    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: u8,

    /// Also upload the mask under this capture id as an overwater mask.
    #[arg(long)]
    upload_uuid: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let base_url = cli.base_url.trim_end_matches('/').to_owned();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(CliError::InvalidBaseUrl(base_url));
    }
    let ctx = CliContext { base_url, relay_route: cli.relay_route, client: reqwest::Client::new() };

    match cli.command {
        Command::Ping => run_ping(&ctx).await,
        Command::Clients => print_json(&api_request(&ctx, reqwest::Method::GET, "/clients", None).await?),
        Command::WaitClients(args) => run_wait(&ctx, "/wait-clients", args).await,
        Command::WaitReady(args) => run_wait(&ctx, "/wait", args).await,
        Command::SendDepth(args) => {
            let msg = DepthMessage::new(args.lat, args.lng, args.depth);
            relay(&ctx, serde_json::to_value(msg)?).await
        }
        Command::SendCamera(args) => {
            let pose = CameraPose {
                lat: args.lat,
                lng: args.lng,
                heading: args.heading,
                fov: args.fov,
                pitch: args.pitch,
                uuid: Some(args.uuid.unwrap_or_else(|| Uuid::new_v4().to_string())),
            };
            relay(&ctx, serde_json::to_value(vec![pose])?).await
        }
        Command::SaveMask(args) => run_save_mask(&ctx, args).await,
        Command::Threshold(args) => run_threshold(&ctx, args).await,
        Command::Watch => run_watch(&ctx).await,
        Command::Shutdown => print_json(&api_request(&ctx, reqwest::Method::POST, "/shutdown", None).await?),
    }
}

async fn run_ping(ctx: &CliContext) -> Result<(), CliError> {
    let response = ctx.client.get(format!("{}/health", ctx.base_url)).send().await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() || body.trim() != "OK" {
        return Err(CliError::ServerError { status: status.as_u16(), message: format!("health check failed: {body:?}") });
    }
    println!("ok");
    Ok(())
}

async fn run_wait(ctx: &CliContext, path: &str, args: WaitArgs) -> Result<(), CliError> {
    let body = wait_body(&args);
    print_json(&api_request(ctx, reqwest::Method::POST, path, Some(body)).await?)
}

fn wait_body(args: &WaitArgs) -> Value {
    let mut body = serde_json::json!({ "min": args.min });
    if let Some(timeout_ms) = args.timeout_ms {
        body["timeoutMs"] = Value::from(timeout_ms);
    }
    body
}

async fn relay(ctx: &CliContext, payload: Value) -> Result<(), CliError> {
    let route = ctx.relay_route.clone();
    print_json(&api_request(ctx, reqwest::Method::POST, &route, Some(payload)).await?)
}

async fn run_save_mask(ctx: &CliContext, args: SaveMaskArgs) -> Result<(), CliError> {
    let bytes = tokio::fs::read(&args.file).await.map_err(|source| CliError::Read { path: args.file.clone(), source })?;
    let format = format_for(&args.file)?;
    let filename = args
        .filename
        .or_else(|| args.file.file_name().and_then(|n| n.to_str()).map(str::to_owned))
        .unwrap_or_else(|| format!("{}.{}", Uuid::new_v4(), format.extension()));

    let data_url = DataUrl { format, bytes }.to_url();
    let body = serde_json::json!({ "dataUrl": data_url, "filename": filename });
    print_json(&api_request(ctx, reqwest::Method::POST, "/save-mask", Some(body)).await?)
}

async fn run_threshold(ctx: &CliContext, args: ThresholdArgs) -> Result<(), CliError> {
    let key = parse_key(&args.key)?;
    let frame = image::open(&args.input)?.to_rgba8();
    let mask = threshold_mask(&frame, key, args.tolerance);
    mask.save(&args.output)?;
    eprintln!(
        "mask written: {} ({}x{}, coverage {:.4})",
        args.output.display(),
        mask.width(),
        mask.height(),
        coverage(&mask)
    );

    if let Some(uuid) = args.upload_uuid {
        let body = serde_json::json!({
            "dataUrl": encode_png_data_url(&mask)?,
            "filename": capture_filename(&uuid, CaptureKind::Overwater),
        });
        print_json(&api_request(ctx, reqwest::Method::POST, "/save-mask", Some(body)).await?)?;
    }
    Ok(())
}

async fn run_watch(ctx: &CliContext) -> Result<(), CliError> {
    let watcher = Watcher::new(&ctx.base_url)?;
    let stop = Shutdown::new();
    tokio::spawn(stop.clone().listen_for_signals());

    eprintln!("watching {}", watcher.events_url());
    watcher
        .run(stop, |mask| match serde_json::to_string(&mask) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "cannot render mask event"),
        })
        .await;
    Ok(())
}

async fn api_request(
    ctx: &CliContext,
    method: reqwest::Method,
    path: &str,
    body: Option<Value>,
) -> Result<Value, CliError> {
    let url = format!("{}{}", ctx.base_url, path);
    let request = ctx.client.request(method, &url);
    let request = if let Some(json) = body { request.json(&json) } else { request };

    let response = request.timeout(Duration::from_secs(300)).send().await?;
    let status = response.status();
    let body = response.bytes().await?;
    decode_response(status, &body)
}

/// Success bodies must be JSON; error bodies are reported as best we can.
fn decode_response(status: reqwest::StatusCode, body: &[u8]) -> Result<Value, CliError> {
    if status.is_success() {
        return serde_json::from_slice(body).map_err(|source| CliError::BadResponse { status: status.as_u16(), source });
    }
    let message = match serde_json::from_slice::<Value>(body) {
        Ok(value) => value.get("error").and_then(Value::as_str).map_or_else(|| value.to_string(), str::to_owned),
        Err(_) => String::from_utf8_lossy(body).trim().to_owned(),
    };
    Err(CliError::ServerError { status: status.as_u16(), message })
}

fn format_for(path: &Path) -> Result<ImageFormat, CliError> {
    let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => Ok(ImageFormat::Png),
        Some("jpg" | "jpeg") => Ok(ImageFormat::Jpeg),
        _ => Err(CliError::UnsupportedExtension(path.to_path_buf())),
    }
}

fn parse_key(raw: &str) -> Result<KeyColor, CliError> {
    let bad = || CliError::InvalidKey(raw.to_owned());
    let parts: Vec<u8> = raw
        .split(',')
        .map(|p| p.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|_| bad())?;
    match parts.as_slice() {
        [r, g, b] => Ok(KeyColor { r: *r, g: *g, b: *b }),
        _ => Err(bad()),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
