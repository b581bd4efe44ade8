//! Remote course backend: catalog and authoritative progress over HTTP.

mod client;
mod dto;

pub use client::ApiClient;
