//! HTTP client module.

mod client;

pub use client::{HttpClient, USER_AGENT, describe_status};
