pub mod client;

pub use client::{ClientService, SessionCache};
