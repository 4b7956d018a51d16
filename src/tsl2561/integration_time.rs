use std::{fmt, str::FromStr, time::Duration};

use anyhow::{Error, bail};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegrationTime {
    Ms13,
    Ms101,
    #[default]
    Ms402,
}

impl IntegrationTime {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationTime::Ms13 => "13.7ms",
            IntegrationTime::Ms101 => "101ms",
            IntegrationTime::Ms402 => "402ms",
        }
    }

    /// Value of the INTEG bits in the TIMING register.
    pub fn raw(&self) -> u8 {
        match self {
            IntegrationTime::Ms13 => 0,
            IntegrationTime::Ms101 => 1,
            IntegrationTime::Ms402 => 2,
        }
    }

    /// `0b11` selects manual integration, which this driver never enables.
    pub fn from_raw(v: u8) -> Option<Self> {
        match v & 0x03 {
            0 => Some(IntegrationTime::Ms13),
            1 => Some(IntegrationTime::Ms101),
            2 => Some(IntegrationTime::Ms402),
            _ => None,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            IntegrationTime::Ms13 => Duration::from_micros(13_700),
            IntegrationTime::Ms101 => Duration::from_millis(101),
            IntegrationTime::Ms402 => Duration::from_millis(402),
        }
    }

    /// Channel counts above this are treated as saturated.
    pub(crate) fn clip_threshold(&self) -> u16 {
        match self {
            IntegrationTime::Ms13 => 4900,
            IntegrationTime::Ms101 => 37000,
            IntegrationTime::Ms402 => 65000,
        }
    }

    pub(crate) fn lux_scale(&self) -> f64 {
        match self {
            IntegrationTime::Ms13 => 1.0 / 0.034,
            IntegrationTime::Ms101 => 1.0 / 0.252,
            IntegrationTime::Ms402 => 1.0,
        }
    }
}

impl fmt::Display for IntegrationTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntegrationTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "13ms" | "13.7ms" => Ok(IntegrationTime::Ms13),
            "1" | "101ms" => Ok(IntegrationTime::Ms101),
            "2" | "402ms" => Ok(IntegrationTime::Ms402),
            _ => bail!(
                "unknown integration time: {} (expected 0 for 13.7ms, 1 for 101ms or 2 for 402ms)",
                s
            ),
        }
    }
}
