mod tracing_init;

#[cfg(test)]
use clap::CommandFactory;
#[cfg(test)]
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use colored::Colorize;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::{Value, json};
use std::{env, process};

use privacy_dash::access_log::AccessLogEntry;
use privacy_dash::config::{DEFAULT_SEED_ENTRIES, DashConfig};
use privacy_dash::device::{
    AccelSample, BatteryEvent, BatteryMonitor, BatterySnapshot, ChargeState, DeviceInfo, EventHub,
    SensorFeed,
};
use privacy_dash::error::DashError;
use privacy_dash::permission::{GrantState, PermissionStatus, PermissionType};
use privacy_dash::state::ApplicationState;
use privacy_dash::status::{FixedProbe, Platform};
use privacy_dash::view::{self, PermissionDetail, StatusTile, format_clock};

#[derive(Parser, Debug)]
#[command(name = "privacy-dash", about = "Privacy and device signals dashboard", version)]
struct Cli {
    /// Emit machine-readable JSON output
    #[arg(short = 'j', long, global = true)]
    json: bool,

    /// Seed for the simulated history (reproducible output)
    #[arg(long, global = true, env = "PRIVACY_DASH_SEED")]
    seed: Option<u64>,

    /// Number of simulated access-log entries
    #[arg(long, global = true, env = "PRIVACY_DASH_ENTRIES", default_value_t = DEFAULT_SEED_ENTRIES)]
    entries: usize,

    /// Platform to emulate: ios, android or other
    #[arg(long, global = true, env = "PRIVACY_DASH_PLATFORM", default_value = "ios")]
    platform: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show a status tile per permission
    Dashboard,
    /// Show the access log, newest first
    Log {
        /// Only entries for this permission (e.g. camera, mic)
        #[arg(long)]
        permission: Option<String>,
    },
    /// Show the detail screen for one permission
    Detail {
        /// Permission name (e.g. camera, location)
        permission: String,
    },
    /// Prompt for one permission and show the resulting status
    Request {
        /// Permission name (e.g. calendar, location)
        permission: String,
    },
    /// List all tracked permission types
    Types,
    /// Show device, battery and motion sensor cards
    Device,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Dashboard => "dashboard",
            Commands::Log { .. } => "log",
            Commands::Detail { .. } => "detail",
            Commands::Request { .. } => "request",
            Commands::Types => "types",
            Commands::Device => "device",
        }
    }
}

fn error_kind(error: &DashError) -> &'static str {
    match error {
        DashError::UnknownPermission(_) => "UnknownPermission",
        DashError::UnknownPlatform(_) => "UnknownPlatform",
        DashError::Json(_) => "Json",
        DashError::Probe(_) => "Probe",
    }
}

fn emit_json_success(command: &'static str, data: Value) {
    println!(
        "{}",
        json!({ "ok": true, "command": command, "data": data, "error": null })
    );
}

fn emit_json_error(command: &'static str, kind: &'static str, message: String) {
    println!(
        "{}",
        json!({
            "ok": false,
            "command": command,
            "data": null,
            "error": { "kind": kind, "message": message },
        })
    );
}

fn fail(command: &'static str, json_mode: bool, error: DashError) -> ! {
    if json_mode {
        emit_json_error(command, error_kind(&error), error.to_string());
    } else {
        eprintln!("{}: {}", "Error".red().bold(), error);
    }
    process::exit(1);
}

fn to_data<T: Serialize>(value: &T) -> Result<Value, DashError> {
    Ok(serde_json::to_value(value)?)
}

fn wants_json_from_args() -> bool {
    env::args().any(|arg| arg == "--json" || arg == "-j")
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Fixed answers standing in for the OS permission APIs.
fn demo_probe(platform: Platform) -> FixedProbe {
    FixedProbe::new(platform)
        .with(PermissionType::Camera, GrantState::Granted)
        .with(PermissionType::Microphone, GrantState::Granted)
        .with(PermissionType::Location, GrantState::Granted)
        .with(PermissionType::Contacts, GrantState::Denied)
        .with(PermissionType::Calendar, GrantState::Undetermined)
        .with(PermissionType::Photos, GrantState::Restricted)
        .with(PermissionType::Tracking, GrantState::Denied)
        .answering(PermissionType::Calendar, GrantState::Granted)
        .services_enabled(true)
}

fn grant_colored(grant: GrantState) -> String {
    let plain = grant.to_string();
    match grant {
        GrantState::Granted => plain.green().to_string(),
        GrantState::Denied => plain.red().to_string(),
        GrantState::Restricted => plain.yellow().to_string(),
        GrantState::Undetermined => plain.dimmed().to_string(),
    }
}

fn print_tiles(tiles: &[StatusTile]) {
    let hdr_perm = "PERMISSION";
    let hdr_status = "STATUS";
    let hdr_24h = "24H";
    let hdr_apps = "APPS";

    let perm_w = tiles
        .iter()
        .map(|t| t.label.len())
        .max()
        .unwrap_or(0)
        .max(hdr_perm.len());
    let status_w = tiles
        .iter()
        .map(|t| t.grant.to_string().len())
        .max()
        .unwrap_or(0)
        .max(hdr_status.len());

    println!(
        "{:<pw$}  {:<sw$}  {:>4}  {:>4}  ACTIVITY",
        hdr_perm,
        hdr_status,
        hdr_24h,
        hdr_apps,
        pw = perm_w,
        sw = status_w,
    );
    println!(
        "{}  {}  {}  {}  {}",
        "─".repeat(perm_w),
        "─".repeat(status_w),
        "─".repeat(4),
        "─".repeat(4),
        "─".repeat(20),
    );

    for tile in tiles {
        let status_plain = tile.grant.to_string();
        let status_pad = status_w.saturating_sub(status_plain.len());
        let status_cell = format!("{}{}", grant_colored(tile.grant), " ".repeat(status_pad));

        let label = if tile.is_granted {
            format!("{:<pw$}", tile.label, pw = perm_w)
        } else {
            format!("{:<pw$}", tile.label, pw = perm_w).dimmed().to_string()
        };

        let activity = match (&tile.current_app, tile.live) {
            (Some(app), true) => format!("{} {}", "● LIVE".red().bold(), app),
            _ => "idle".dimmed().to_string(),
        };

        println!(
            "{}  {}  {:>4}  {:>4}  {}",
            label, status_cell, tile.count_24h, tile.access_count, activity
        );
    }
}

fn print_log(entries: &[AccessLogEntry]) {
    if entries.is_empty() {
        println!("{}", "No recent activity.".dimmed());
        return;
    }

    let app_w = entries
        .iter()
        .map(|e| e.app_name.len())
        .max()
        .unwrap_or(0)
        .max("APP".len());
    let perm_w = entries
        .iter()
        .map(|e| e.permission.label().len())
        .max()
        .unwrap_or(0)
        .max("PERMISSION".len());

    println!(
        "{:<5}  {:<pw$}  {:<aw$}  DURATION",
        "TIME",
        "PERMISSION",
        "APP",
        pw = perm_w,
        aw = app_w,
    );
    println!(
        "{}  {}  {}  {}",
        "─".repeat(5),
        "─".repeat(perm_w),
        "─".repeat(app_w),
        "─".repeat(8),
    );

    for entry in entries {
        println!(
            "{:<5}  {:<pw$}  {:<aw$}  {}s",
            format_clock(entry.timestamp, &chrono::Local),
            entry.permission.label(),
            entry.app_name,
            entry.duration_sec,
            pw = perm_w,
            aw = app_w,
        );
    }

    println!("\n{} entries total", entries.len());
}

fn print_detail(detail: &PermissionDetail) {
    println!("{}", detail.label.bold());
    println!("  Status: {}", grant_colored(detail.status.grant));
    if let Some(enabled) = detail.status.service_enabled {
        println!("  Location services: {}", if enabled { "on" } else { "off" });
    }
    let line = detail.status_line();
    if detail.metric.in_use {
        println!("  {} {}", "● LIVE".red().bold(), line);
    } else {
        println!("  {}", line.dimmed());
    }
    println!("  Accesses (24h): {}", detail.metric.count_24h);

    println!("\n{}", "24h History".bold());
    if detail.history.is_empty() {
        println!("  {}", "No recent activity recorded.".dimmed());
    }
    for entry in &detail.history {
        println!(
            "  {}  {}  {}",
            format_clock(entry.timestamp, &chrono::Local).dimmed(),
            entry.app_name,
            format!("{}s", entry.duration_sec).dimmed()
        );
    }

    println!("\n{} ({})", "Apps with Access".bold(), detail.metric.access_count);
    if detail.metric.access_list.is_empty() {
        println!("  {}", "None".dimmed());
    } else {
        println!("  {}", detail.metric.access_list.join(", "));
    }
}

#[derive(Serialize)]
struct DeviceCards {
    device: DeviceInfo,
    battery: BatterySnapshot,
    sensor: privacy_dash::device::SensorReading,
    sensor_interval_ms: u64,
}

/// Drives the battery and accelerometer feeds the way platform callbacks
/// would, then reads the merged state back.
fn sample_device(config: &DashConfig, rng: &mut StdRng) -> DeviceCards {
    let device = DeviceInfo {
        model_name: Some("Simulator".to_string()),
        os_name: Some(config.platform.to_string()),
        os_version: None,
        brand: Some(env::consts::ARCH.to_string()),
        manufacturer: Some("Simulated".to_string()),
        design_name: None,
        product_name: Some(env::consts::OS.to_string()),
        total_memory: Some(rng.random_range(2..=12) * 1024 * 1024 * 1024),
        is_device: false,
    };

    let battery_events = EventHub::new();
    let monitor = BatteryMonitor::attach(BatterySnapshot::default(), &battery_events);
    battery_events.publish(&BatteryEvent::Level(rng.random_range(0.05..=1.0)));
    battery_events.publish(&BatteryEvent::State(if rng.random_bool(0.3) {
        ChargeState::Charging
    } else {
        ChargeState::Unplugged
    }));
    battery_events.publish(&BatteryEvent::LowPowerMode(rng.random_bool(0.2)));
    let battery = monitor.snapshot();
    monitor.detach();

    let feed = SensorFeed::new(true, config.sensor_interval);
    feed.push(AccelSample {
        x: rng.random_range(-0.2..0.2),
        y: rng.random_range(-0.2..0.2),
        z: rng.random_range(0.9..1.1),
    });

    DeviceCards {
        device,
        battery,
        sensor: feed.reading(),
        sensor_interval_ms: feed.interval().as_millis() as u64,
    }
}

fn print_device(cards: &DeviceCards) {
    println!("{}  {}", "Device".bold(), cards.device.display_name().dimmed());
    println!("  {}", cards.device.hardware_label());
    println!("  {}  {}", cards.device.product_label(), cards.device.kind_label().dimmed());
    println!("  {}", cards.device.os_label());
    println!("  RAM: {}", cards.device.memory_label());

    let battery = &cards.battery;
    let pct = format!("{}%", battery.percentage());
    let pct = if battery.is_charging() {
        pct.green().to_string()
    } else if battery.is_low() {
        pct.red().to_string()
    } else {
        pct
    };
    println!("\n{}  {}", "Battery".bold(), battery.charge_label().dimmed());
    println!("  {}  {}", pct, battery.mode_label().dimmed());

    println!("\n{}  {}", "Accelerometer".bold(), "Motion Sensors".dimmed());
    if cards.sensor.available {
        let axes = cards
            .sensor
            .sample
            .axes()
            .iter()
            .map(|(axis, value)| format!("{} {}", axis.dimmed(), value))
            .collect::<Vec<_>>()
            .join("   ");
        println!("  {}", axes);
    } else {
        println!("  {}", "Sensor not available".dimmed());
    }
}

fn print_request(permission: PermissionType, previous: &PermissionStatus, status: &PermissionStatus) {
    println!("{}", permission.label().bold());
    println!(
        "  {} {} {}",
        grant_colored(previous.grant),
        "→".dimmed(),
        grant_colored(status.grant)
    );
    if let Some(enabled) = status.service_enabled {
        println!("  Location services: {}", if enabled { "on" } else { "off" });
    }
}

fn print_types(platform: Platform) {
    println!("{:<12}  {:<12}  AVAILABLE", "KEY", "LABEL");
    println!("{:<12}  {:<12}  {}", "─".repeat(12), "─".repeat(12), "─".repeat(9));
    for permission in PermissionType::ALL {
        let available = if platform.supports(permission) {
            "yes".green()
        } else {
            "no (iOS only)".dimmed()
        };
        println!(
            "{:<12}  {:<12}  {}",
            permission.key().dimmed(),
            permission.label(),
            available
        );
    }
}

fn config_from_cli(cli: &Cli) -> Result<DashConfig, DashError> {
    Ok(DashConfig {
        seed_entries: cli.entries,
        platform: cli.platform.parse()?,
        rng_seed: cli.seed,
        ..DashConfig::default()
    })
}

async fn run(cli: Cli) -> Result<(), DashError> {
    let command = cli.command.name();
    let json_mode = cli.json;
    let config = config_from_cli(&cli)?;
    let now = now_ms();

    match cli.command {
        Commands::Types => {
            if json_mode {
                let types: Vec<Value> = PermissionType::ALL
                    .into_iter()
                    .map(|p| {
                        json!({
                            "key": p.key(),
                            "label": p.label(),
                            "available": config.platform.supports(p),
                        })
                    })
                    .collect();
                emit_json_success(command, json!({ "types": types }));
            } else {
                print_types(config.platform);
            }
        }
        Commands::Device => {
            let mut rng = match config.rng_seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_rng(&mut rand::rng()),
            };
            let cards = sample_device(&config, &mut rng);
            if json_mode {
                emit_json_success(command, to_data(&cards)?);
            } else {
                print_device(&cards);
            }
        }
        Commands::Dashboard => {
            let state = ApplicationState::bootstrap(&config, demo_probe(config.platform), now).await;
            let tiles = state.tiles(now);
            if json_mode {
                let data = to_data(&tiles)?;
                emit_json_success(command, json!({ "tiles": data }));
            } else {
                print_tiles(&tiles);
            }
        }
        Commands::Log { permission } => {
            let filter = permission
                .as_deref()
                .map(str::parse::<PermissionType>)
                .transpose()?;
            let state = ApplicationState::bootstrap(&config, demo_probe(config.platform), now).await;
            let mut entries = state.log();
            if let Some(p) = filter {
                entries.retain(|e| e.permission == p);
            }
            if json_mode {
                let data = to_data(&entries)?;
                emit_json_success(command, json!({ "count": entries.len(), "entries": data }));
            } else {
                print_log(&entries);
            }
        }
        Commands::Detail { permission } => {
            let permission: PermissionType = permission.parse()?;
            let state = ApplicationState::bootstrap(&config, demo_probe(config.platform), now).await;
            let detail = state.detail(permission, now);
            if json_mode {
                emit_json_success(command, to_data(&detail)?);
            } else {
                print_detail(&detail);
            }
        }
        Commands::Request { permission } => {
            let permission: PermissionType = permission.parse()?;
            let mut state = ApplicationState::bootstrap(&config, demo_probe(config.platform), now).await;
            let previous = state.statuses()[permission].clone();
            let status = state.request_permission(permission).await?;
            if json_mode {
                emit_json_success(
                    command,
                    json!({
                        "permission": permission,
                        "previous": to_data(&previous)?,
                        "status": to_data(&status)?,
                        "is_granted": view::is_granted(permission, &status),
                    }),
                );
            } else {
                print_request(permission, &previous, &status);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_init::init_tracing();

    let json_requested = wants_json_from_args();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if json_requested {
                emit_json_error("parse", "ParseError", err.to_string());
                process::exit(1);
            }
            err.exit();
        }
    };

    let command = cli.command.name();
    let json_mode = cli.json;
    if let Err(e) = run(cli).await {
        fail(command, json_mode, e);
    }
}
