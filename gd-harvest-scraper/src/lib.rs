//! Harvesting engine for the gameday archive: proxied session pool, circuit
//! rotation, day discovery, game fetch workers, persistence, and the
//! orchestrator that ties them together.

pub mod circuit;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod harvest;
pub mod log;
pub mod store;
pub mod worker;

pub use circuit::{CircuitControl, ProxyCircuit, Rotator, TorControl, default_socks_ports};
pub use client::{HttpSession, SessionPool, Transport};
pub use config::{ConfigSource, ConfigSources, HarvestConfig, RetryPolicy, write_default_config};
pub use discovery::{discover_day, parse_listing};
pub use error::{FetchError, HarvestError, RotationError, StoreError};
pub use harvest::{HarvestEvent, Harvester};
pub use log::{FailureReport, HarvestLog, LogEntry, LogSummary};
pub use store::{GameStore, normalize_xml};
pub use worker::fetch_game;
