mod args;

use std::{process::ExitCode, time::Duration};

use anyhow::{Context as _, Result};
use args::Args;
use chrono::Utc;
use clap::Parser as _;
use linux_embedded_hal::I2cdev;
use luminosity_logger::{
    bigquery::{Client, MEASUREMENT_COLUMNS, TableReference, insert_measurement},
    sensor::{Tsl2561Sensor, measure},
    tsl2561::Tsl2561,
};
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

// Slack on top of the nominal integration time before the channels are read.
const CONVERSION_MARGIN: Duration = Duration::from_millis(20);

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenv::dotenv();
    setup_tracing();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

fn setup_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

async fn run(args: Args) -> Result<()> {
    let reference = TableReference::new(args.project_id, args.dataset_id, args.table_id);

    let client = Client::new()
        .await
        .context("failed to create BigQuery client")?;

    let table = client
        .get_table(&reference)
        .await
        .with_context(|| format!("failed to get table {reference}"))?;
    table.ensure_columns(&MEASUREMENT_COLUMNS)?;

    info!(table = %reference, "resolved table");

    let i2c = I2cdev::new(&args.i2c_bus)
        .with_context(|| format!("failed to open I2C bus: {:?}", args.i2c_bus))?;

    let mut device = Tsl2561::new(i2c, args.address).context("failed to set up TSL2561")?;
    device.configure(args.gain, args.integration_time)?;

    info!(
        sensor_id = %args.sensor_id,
        address = device.address(),
        gain = %device.gain(),
        integration_time = %device.integration_time(),
        "configured sensor"
    );

    sleep(args.integration_time.duration() + CONVERSION_MARGIN).await;

    let mut sensor = Tsl2561Sensor {
        device,
        sensor_id: args.sensor_id,
    };

    let requested_at = Utc::now().with_timezone(&args.timezone);
    let measured = measure(&mut sensor, requested_at);

    if let Err(e) = sensor.device.disable() {
        warn!("failed to power off TSL2561: {e:#}");
    }

    let measurement = measured?;

    info!(
        lux = measurement.lux,
        broadband = measurement.broadband,
        infrared = measurement.infrared,
        requested_at = %measurement.requested_at,
        "took measurement"
    );

    insert_measurement(&client, &table, &measurement)
        .await
        .context("failed to insert measurement")?;

    info!(table = %reference, "inserted measurement");

    Ok(())
}
