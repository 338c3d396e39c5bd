//! One bridge run: configuration, device checks, collection, publishing.
//!
//! Every step is fatal on failure. The order matters: an unknown model is
//! reported before the serial path is looked at, and nothing touches the
//! serial device until both checks pass.

use std::path::{Path, PathBuf};

use ouman_bridge_mqtt::{SessionReport, TransferError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::{
    collector::MeasurementCollector,
    device::{DeviceClient, DeviceError, DeviceModel, Models, DEFAULT_READ_TIMEOUT},
    measurement::MeasurementMap,
    publisher::{MeasurementPublisher, MqttPublisher},
};
use crate::{
    cli::Args,
    config::{AppConfig, ConfigError},
};

/// Anything that ends a run early.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Given ouman device not found: {model}. Valid devices are: {}", .valid.join(", "))]
    UnknownModel {
        model: String,
        valid: Vec<&'static str>,
    },

    #[error("Given serial device: {} not found", .0.display())]
    SerialPathNotFound(PathBuf),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("MQTT publish failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("Collector task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl AppError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Everything a run needs once the preflight checks pass.
#[derive(Debug)]
pub struct Plan {
    pub config: AppConfig,
    pub model: &'static DeviceModel,
    pub serial: PathBuf,
}

/// Loads configuration and checks the model and the serial path, in that
/// order. Each configuration problem is logged on its own line.
pub fn prepare(args: &Args) -> Result<Plan, AppError> {
    let config_path = AppConfig::resolve_path(args.config.clone());
    let config = AppConfig::load(&config_path).map_err(|e| {
        for issue in e.issues() {
            error!("{}", issue);
        }
        e
    })?;

    let model = Models::get(&args.ouman).map_err(|_| AppError::UnknownModel {
        model: args.ouman.clone(),
        valid: Models::list(),
    })?;

    if !args.serial.exists() {
        return Err(AppError::SerialPathNotFound(args.serial.clone()));
    }

    Ok(Plan {
        config,
        model,
        serial: args.serial.clone(),
    })
}

/// Polls the device on a blocking worker thread.
pub async fn collect(serial: &Path, model: &'static DeviceModel) -> Result<MeasurementMap, AppError> {
    let path = serial.to_string_lossy().into_owned();
    let measurements = tokio::task::spawn_blocking(move || {
        let client = DeviceClient::open(&path, model, DEFAULT_READ_TIMEOUT)?;
        Ok::<_, DeviceError>(MeasurementCollector::new(client, model).collect())
    })
    .await??;

    if let Ok(json) = serde_json::to_string(&measurements) {
        debug!("Measurements: {}", json);
    }
    Ok(measurements)
}

/// Hands the measurements to `publisher` and logs how the session went.
pub async fn publish(
    publisher: &dyn MeasurementPublisher,
    plan: &Plan,
    measurements: &MeasurementMap,
) -> Result<SessionReport, AppError> {
    let report = publisher
        .publish(&plan.config.publish, measurements)
        .await?;

    if report.outcome.is_accepted() {
        info!(
            "Published {}/{} value(s) to {}:{}",
            report.sent, report.requested, plan.config.mqtt.host, plan.config.mqtt.port
        );
    } else {
        warn!(
            "Broker {}:{} refused the connection: {}",
            plan.config.mqtt.host,
            plan.config.mqtt.port,
            report.outcome.describe()
        );
    }
    Ok(report)
}

/// Runs the whole pipeline once.
pub async fn run(args: &Args) -> Result<SessionReport, AppError> {
    let plan = prepare(args)?;

    info!(
        "Starting to read data from OUMAN {} ({}) on {}",
        plan.model.name,
        plan.model.description,
        plan.serial.display()
    );
    let measurements = collect(&plan.serial, plan.model).await?;

    let publisher = MqttPublisher::new(plan.config.mqtt.clone());
    publish(&publisher, &plan, &measurements).await
}
