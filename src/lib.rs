//! ouman-bridge: Ouman heating controller to MQTT bridge
//!
//! Reads the measurements of an Ouman controller (EH-203, EH-201) over a
//! serial line and republishes a configured subset of them to an MQTT broker,
//! one topic per value, for Home Assistant to pick up. One invocation is one
//! connect-publish-disconnect cycle; periodic polling is left to cron or a
//! systemd timer.
//!
//! ## Modules
//!
//! * `cli`: Command line flags (`--serial`, `--ouman`, `--debug`, ...).
//!
//! * `config`: INI configuration loading and validation via the
//!   `validator` crate, plus console logger settings.
//!
//! * `core`: Runtime components:
//!   - Serial query client and per-model query tables
//!   - Measurement collection and key normalization
//!   - MQTT publishing through the `ouman-bridge-mqtt` crate
//!   - The run orchestration
//!
//! * `logger`: Logging initialization using `tracing`, with compact, pretty
//!   and JSON console formats.

pub mod cli;
pub mod config;
pub mod core;
pub mod logger;
