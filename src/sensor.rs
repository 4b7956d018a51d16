use anyhow::{Context as _, Result};
use chrono::DateTime;
use chrono_tz::Tz;
use embedded_hal::i2c::I2c;

use crate::{
    measurement::Measurement,
    tsl2561::{Luminosity, Tsl2561},
};

pub trait LightSensor {
    fn sensor_id(&self) -> &str;

    fn read(&mut self) -> Result<Luminosity>;
}

/// A TSL2561 labelled with the id its rows are stored under.
#[derive(Debug)]
pub struct Tsl2561Sensor<I> {
    pub device: Tsl2561<I>,
    pub sensor_id: String,
}

impl<I: I2c> LightSensor for Tsl2561Sensor<I> {
    fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    fn read(&mut self) -> Result<Luminosity> {
        self.device.luminosity()
    }
}

pub fn measure<S: LightSensor>(sensor: &mut S, requested_at: DateTime<Tz>) -> Result<Measurement> {
    let luminosity = sensor
        .read()
        .with_context(|| format!("failed to read sensor {}", sensor.sensor_id()))?;

    Ok(Measurement::new(&luminosity, sensor.sensor_id(), requested_at))
}
