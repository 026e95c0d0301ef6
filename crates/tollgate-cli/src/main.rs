//! `tollgate` - gate controller command line.
//!
//! - `tollgate check-config` loads and validates a configuration file
//! - `tollgate simulate` runs the controller against mock hardware and prints
//!   every gate event as a JSON line on stdout
//!
//! The configuration file comes from `--config`, else `TOLLGATE_CONFIG`, else
//! the built-in defaults. Logs go to stderr, filtered by `RUST_LOG`
//! (default `info`).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tollgate_controller::{GateConfig, GateRuntime, Peripherals};
use tollgate_core::{SensorId, TagId};
use tollgate_hardware::mock::{MockFingerprint, MockOutputPin, MockTagStream, UltrasonicRig};
use tollgate_storage::MemoryStore;
use tollgate_traffic::{DistanceSensor, RangeSensor, SignalHead, SignalLines};

const CONFIG_ENV: &str = "TOLLGATE_CONFIG";

/// Vehicle gate controller
#[derive(Parser, Debug)]
#[command(name = "tollgate", version, about)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate the configuration, then print the effective values
    CheckConfig,

    /// Run a scripted scenario against mock hardware
    Simulate {
        /// Fingerprint slot used for the enrollment
        #[arg(long, default_value_t = 1)]
        slot: i64,

        /// Tag id (hex) the mock reader sends
        #[arg(long, default_value = "01020304")]
        tag: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::CheckConfig => {
            let text = toml::to_string_pretty(&config).context("rendering configuration")?;
            println!("{text}");
            info!("Configuration OK");
            Ok(())
        }
        Commands::Simulate { slot, tag } => simulate(&config, slot, &tag).await,
    }
}

fn load_config(path: Option<PathBuf>) -> Result<GateConfig> {
    let path = path.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

    match path {
        Some(path) => GateConfig::load(&path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => {
            info!("No configuration file given, using defaults");
            Ok(GateConfig::default())
        }
    }
}

fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let tag = TagId::parse(text).with_context(|| format!("invalid tag id {text:?}"))?;
    let hex = tag.as_str();
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).context("invalid hex digit"))
        .collect()
}

fn range_sensor(name: &str, rig: &UltrasonicRig, config: &GateConfig) -> Box<dyn DistanceSensor> {
    let (trigger, echo, delay) = rig.parts();
    Box::new(
        RangeSensor::new(SensorId::new(name), trigger, echo, delay)
            .with_timeout(config.runtime.echo_timeout()),
    )
}

async fn pause(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

async fn simulate(config: &GateConfig, slot: i64, tag: &str) -> Result<()> {
    let frame = decode_hex(tag)?;
    if frame.len() != config.rfid.frame_width.bytes() {
        bail!(
            "tag {tag} is {} bytes but frame_width is {}",
            frame.len(),
            config.rfid.frame_width.bytes()
        );
    }

    let lane = UltrasonicRig::new();
    let crossing = UltrasonicRig::new();
    let (tag_reader, tags) = MockTagStream::new();
    let (fingerprint, finger) = MockFingerprint::with_name("Simulated sensor".to_string());
    let lines = SignalLines {
        red: MockOutputPin::new(),
        amber: MockOutputPin::new(),
        green: MockOutputPin::new(),
        ped_go: MockOutputPin::new(),
        ped_stop: MockOutputPin::new(),
        buzzer: MockOutputPin::new(),
    };

    let peripherals = Peripherals {
        vehicle_sensors: vec![range_sensor("lane", &lane, config)],
        pedestrian_sensors: vec![range_sensor("crossing", &crossing, config)],
        signals: Box::new(SignalHead::new(lines, config.outputs.polarity)),
        tag_reader: Box::new(tag_reader),
        fingerprint: Box::new(fingerprint),
    };

    let runtime = GateRuntime::start(config, peripherals, Box::new(MemoryStore::new()));
    let handle = runtime.handle();

    let mut events = handle.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => warn!(error = %e, "Could not render event"),
                },
                Err(RecvError::Lagged(missed)) => warn!(missed, "Event printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let tick = config.runtime.tick_ms;

    info!("Vehicle approaching, pedestrian waiting");
    lane.set_distance(1.0);
    crossing.set_distance(1.2);
    pause(tick * 3).await;

    info!(tag, "Vehicle tag in range");
    for _ in 0..config.rfid.confirmations {
        tags.send_bytes(&frame)?;
        pause(config.rfid.quiet_gap_ms + tick).await;
    }
    pause(config.rfid.quiet_gap_ms + tick).await;

    info!(slot, "Enrolling fingerprint");
    handle.start_enrollment(slot).await?;
    let template = vec![0x5A; 32];
    pause(tick * 2).await;
    finger.place_finger_default_quality(template.clone())?;
    pause(tick * 3).await;
    finger.lift_finger()?;
    pause(tick * 3).await;
    finger.place_finger_default_quality(template)?;
    pause(tick * 3).await;
    finger.lift_finger()?;

    handle.save_owner(slot, "Simulated driver", "resident").await?;
    let slots = handle.list_slots().await?;
    println!("{}", serde_json::to_string(&slots)?);

    info!("Vehicle leaving");
    lane.set_no_echo();
    crossing.set_no_echo();
    pause(tick * 2).await;

    let controller = runtime.stop().await.context("gate runtime failed")?;
    let stats = controller.rfid_stats();
    info!(
        frames = stats.decoder.frames,
        vehicles = stats.passes,
        "Simulation finished"
    );

    // The printer exits once every event sender is gone
    drop(controller);
    drop(handle);
    printer.await.context("event printer failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("01020304").unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(decode_hex("0a0b0c0d").unwrap(), vec![10, 11, 12, 13]);
        assert!(decode_hex("xyz").is_err());
    }

    #[test]
    fn test_cli_parses_simulate() {
        let cli = Cli::try_parse_from([
            "tollgate", "--config", "gate.toml", "simulate", "--slot", "4",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("gate.toml")));
        assert!(matches!(cli.command, Commands::Simulate { slot: 4, .. }));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["tollgate"]).is_err());
    }
}
