use std::path::PathBuf;

use anyhow::{Context as _, Result};
use chrono_tz::Tz;
use clap::Parser;
use luminosity_logger::tsl2561::{Gain, IntegrationTime};

#[derive(Debug, Parser)]
pub struct Args {
    #[arg(long, env = "TSL2561_SENSOR_ID")]
    pub sensor_id: String,

    /// 0 for 1x, 1 for 16x
    #[arg(long, env = "TSL2561_GAIN", default_value = "0")]
    pub gain: Gain,

    /// 0 for 13.7ms, 1 for 101ms, 2 for 402ms
    #[arg(long, env = "TSL2561_INTERGRATION_TIME", default_value = "2")]
    pub integration_time: IntegrationTime,

    #[arg(long, env = "TSL2561_I2C_BUS", default_value = "/dev/i2c-1")]
    pub i2c_bus: PathBuf,

    #[arg(long, env = "TSL2561_ADDRESS", default_value = "0x39", value_parser = parse_address)]
    pub address: u8,

    #[arg(long, env = "GBQ_PROJECT_ID")]
    pub project_id: String,

    #[arg(long, env = "GBQ_DATASET_ID")]
    pub dataset_id: String,

    #[arg(long, env = "GBQ_TABLE_ID")]
    pub table_id: String,

    #[arg(long, env = "TZ", default_value = "UTC")]
    pub timezone: Tz,
}

fn parse_address(s: &str) -> Result<u8> {
    let address = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };

    address.with_context(|| format!("invalid I2C address: {s}"))
}
