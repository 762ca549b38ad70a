pub mod client;
pub mod constants;
pub mod session;
pub mod types;

pub use client::{config::ClientConfig, error::ClientError, AutoShortClient};
