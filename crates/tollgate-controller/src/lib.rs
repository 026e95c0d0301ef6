//! Gate controller: configuration, the per-tick loop and the command surface.
//!
//! [`GateController`] owns every pipeline and advances them once per tick.
//! [`GateRuntime`] runs it on tokio and hands out [`GateHandle`]s for
//! commands and event subscriptions.
//!
//! # Examples
//!
//! ```no_run
//! use tollgate_controller::{GateConfig, GateRuntime, Peripherals};
//! use tollgate_hardware::mock::{MockFingerprint, MockOutputPin, MockTagStream};
//! use tollgate_storage::MemoryStore;
//! use tollgate_traffic::{Polarity, SignalHead, SignalLines};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (tag_reader, _tags) = MockTagStream::new();
//!     let (fingerprint, _finger) = MockFingerprint::new();
//!     let lines = SignalLines {
//!         red: MockOutputPin::new(),
//!         amber: MockOutputPin::new(),
//!         green: MockOutputPin::new(),
//!         ped_go: MockOutputPin::new(),
//!         ped_stop: MockOutputPin::new(),
//!         buzzer: MockOutputPin::new(),
//!     };
//!     let peripherals = Peripherals {
//!         vehicle_sensors: Vec::new(),
//!         pedestrian_sensors: Vec::new(),
//!         signals: Box::new(SignalHead::new(lines, Polarity::ActiveLow)),
//!         tag_reader: Box::new(tag_reader),
//!         fingerprint: Box::new(fingerprint),
//!     };
//!
//!     let runtime = GateRuntime::start(
//!         &GateConfig::default(),
//!         peripherals,
//!         Box::new(MemoryStore::new()),
//!     );
//!     let handle = runtime.handle();
//!     handle.start_enrollment(1).await.unwrap();
//!     runtime.stop().await.unwrap();
//! }
//! ```

pub mod commands;
pub mod config;
pub mod controller;
pub mod runtime;
pub mod sink;

pub use commands::{Command, CommandError, CommandReply, SlotEntry};
pub use config::{GateConfig, OutputsConfig, RfidConfig, RuntimeConfig};
pub use controller::{GateController, Peripherals, TickSummary};
pub use runtime::{GateHandle, GateRuntime};
pub use sink::BroadcastSink;
