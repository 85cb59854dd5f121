#![forbid(unsafe_code)]

pub mod app;
pub mod config;
mod error;
pub mod net;
pub mod serial;
pub mod simulation;
pub mod telemetry;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
