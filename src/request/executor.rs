use std::time::{Instant, SystemTime};

use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;

use crate::error::TransportError;
use crate::request::{RequestBody, RequestOptions, Response};

/// Routes `params` the way form-less APIs expect: query string for
/// body-less methods, JSON body otherwise.
fn apply_params(builder: RequestBuilder, method: &Method, params: &Value) -> RequestBuilder {
    match *method {
        Method::GET | Method::HEAD | Method::OPTIONS | Method::DELETE => match params.as_object() {
            Some(obj) => {
                let query_pairs: Vec<(String, String)> = obj
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_string().trim_matches('"').to_string()))
                    .collect();
                builder.query(&query_pairs)
            }
            None => builder,
        },
        _ => builder.json(params),
    }
}

pub(crate) fn build_request(client: &Client, method: &Method, url: &str, options: &RequestOptions) -> RequestBuilder {
    let mut builder = client.request(method.clone(), url);

    if !options.headers.is_empty() {
        builder = builder.headers(options.headers.clone());
    }
    if !options.query.is_empty() {
        builder = builder.query(&options.query);
    }
    if let Some(params) = &options.params {
        builder = apply_params(builder, method, params);
    }
    builder = match &options.body {
        Some(RequestBody::Json(value)) => builder.json(value),
        Some(RequestBody::Form(fields)) => builder.form(fields),
        Some(RequestBody::Bytes(bytes)) => builder.body(bytes.clone()),
        None => builder,
    };

    builder
}

pub(crate) async fn execute_request(
    client: &Client,
    method: &Method,
    url: &str,
    options: &RequestOptions,
) -> Result<Response, TransportError> {
    let started_at = SystemTime::now();
    let start = Instant::now();
    let builder = build_request(client, method, url, options);
    let stream = options.is_stream();

    let exchange = async {
        let res = builder
            .send()
            .await
            .map_err(|source| TransportError::Http { url: url.to_string(), source })?;
        if stream {
            Ok::<_, TransportError>(Response::deferred(res))
        } else {
            Response::buffered(res).await
        }
    };

    let response = match options.timeout {
        Some(timeout) => tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| TransportError::Timeout { url: url.to_string(), timeout })??,
        None => exchange.await?,
    };

    Ok(response.with_timing(started_at, start.elapsed()))
}
