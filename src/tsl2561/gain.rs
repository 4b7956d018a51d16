use std::{fmt, str::FromStr};

use anyhow::{Error, bail};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gain {
    #[default]
    Low,
    High,
}

impl Gain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gain::Low => "1x",
            Gain::High => "16x",
        }
    }

    /// Value of the GAIN bit in the TIMING register.
    pub fn raw(&self) -> u8 {
        match self {
            Gain::Low => 0,
            Gain::High => 1,
        }
    }

    pub fn from_raw(v: u8) -> Self {
        if v & 0x01 == 0 { Gain::Low } else { Gain::High }
    }

    /// Factor bringing a reading up to the 16x reference gain of the lux formula.
    pub(crate) fn lux_scale(&self) -> f64 {
        match self {
            Gain::Low => 16.0,
            Gain::High => 1.0,
        }
    }
}

impl fmt::Display for Gain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "low" | "1x" => Ok(Gain::Low),
            "1" | "high" | "16x" => Ok(Gain::High),
            _ => bail!("unknown gain: {} (expected 0 for 1x or 1 for 16x)", s),
        }
    }
}
