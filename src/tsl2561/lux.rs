use anyhow::{Result, bail};

use crate::tsl2561::{Gain, IntegrationTime};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Luminosity {
    pub lux: f64,

    /// Channel 0, visible and infrared.
    pub broadband: u16,

    /// Channel 1, infrared only.
    pub infrared: u16,
}

/// Computes illuminance from raw channel counts using the datasheet's
/// floating point approximation for T, FN and CL packages.
///
/// The coefficients assume 16x gain and 402ms integration, so the result is
/// scaled to the settings the counts were taken with.
pub fn compute_lux(
    broadband: u16,
    infrared: u16,
    gain: Gain,
    integration_time: IntegrationTime,
) -> Result<f64> {
    let threshold = integration_time.clip_threshold();
    if broadband > threshold || infrared > threshold {
        bail!(
            "sensor saturated: broadband={broadband}, infrared={infrared}, threshold={threshold} at {integration_time}"
        );
    }

    // Data registers hold 0 until the first integration after power-on completes.
    if broadband == 0 {
        bail!("no valid conversion: broadband channel is 0");
    }

    let ch0 = broadband as f64;
    let ch1 = infrared as f64;
    let ratio = ch1 / ch0;

    let lux = if ratio <= 0.50 {
        0.0304 * ch0 - 0.062 * ch0 * ratio.powf(1.4)
    } else if ratio <= 0.61 {
        0.0224 * ch0 - 0.031 * ch1
    } else if ratio <= 0.80 {
        0.0128 * ch0 - 0.0153 * ch1
    } else if ratio <= 1.30 {
        0.00146 * ch0 - 0.00112 * ch1
    } else {
        0.0
    };

    Ok(lux * gain.lux_scale() * integration_time.lux_scale())
}
