use std::sync::Arc;

use rusty_req_pool::{ClientConfig, Requests, SharedClient};
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn test_client() -> SharedClient {
    Arc::new(
        ClientConfig::default()
            .user_agent("rusty-req-pool-test/1.0")
            .build()
            .expect("test client"),
    )
}

pub fn requests() -> Requests {
    init_tracing();
    Requests::with_client(test_client())
}

/// Serves `body` at `route` for GET requests.
pub async fn serve(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}
