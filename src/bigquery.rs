mod client;
mod insert;
mod table;

pub use client::*;
pub use insert::*;
pub use table::*;
