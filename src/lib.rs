#![forbid(unsafe_code)]

pub mod config;
pub mod driver;
pub mod errors;
pub mod mode;
pub mod models;
pub mod session;
pub mod stream;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
