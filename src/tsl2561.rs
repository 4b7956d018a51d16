mod driver;
mod gain;
mod integration_time;
mod lux;

pub use driver::*;
pub use gain::*;
pub use integration_time::*;
pub use lux::*;

#[cfg(test)]
pub(crate) use driver::tests::FakeBus;
