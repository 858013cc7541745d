pub mod client;

pub use client::{HttpBackend, LoginError};
