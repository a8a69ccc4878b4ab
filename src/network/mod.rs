// src/network/mod.rs
pub mod client;
pub mod http_version;
pub mod proxy_config;

pub use client::{default_client, ClientConfig, ClientFactory, DefaultClientFactory, HttpClient, SharedClient};
pub use http_version::HttpVersion;
pub use proxy_config::ProxyConfig;
