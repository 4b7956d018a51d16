use chrono::DateTime;
use chrono_tz::Tz;

use crate::tsl2561::Luminosity;

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub lux: i64,

    pub broadband: i64,

    pub infrared: i64,

    pub sensor_id: String,

    pub requested_at: DateTime<Tz>,
}

impl Measurement {
    /// Lux is truncated toward zero.
    pub fn new(
        luminosity: &Luminosity,
        sensor_id: impl Into<String>,
        requested_at: DateTime<Tz>,
    ) -> Self {
        Self {
            lux: luminosity.lux.trunc() as i64,
            broadband: luminosity.broadband.into(),
            infrared: luminosity.infrared.into(),
            sensor_id: sensor_id.into(),
            requested_at,
        }
    }
}
