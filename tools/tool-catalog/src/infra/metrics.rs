use axum::{
    Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
};
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, TextEncoder, register_int_counter,
    register_int_counter_vec, register_int_gauge,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

pub static HANDSHAKES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "catalog_handshakes_total",
        "Handshakes by negotiated protocol revision",
        &["revision"]
    )
    .unwrap()
});

pub static TOOL_LIST_QUERIES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("catalog_tool_list_total", "tools/list queries served").unwrap()
});

pub static TOOL_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "catalog_tool_calls_total",
        "tools/call requests by outcome",
        &["outcome"]
    )
    .unwrap()
});

pub static REGISTERED_TOOLS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("catalog_registered_tools", "Tools in the registry").unwrap()
});

#[derive(Clone, Debug)]
pub struct MetricsServerConfig {
    pub addr: SocketAddr,
    pub auth_token: Option<String>,
}

#[derive(Clone)]
struct MetricsState {
    auth_token: Option<String>,
}

pub async fn spawn_metrics_server(config: MetricsServerConfig) {
    let MetricsServerConfig { addr, auth_token } = config;
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(MetricsState { auth_token });

    tokio::spawn(async move {
        info!(%addr, "metrics server starting");
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(err) = axum::serve(listener, app.into_make_service()).await {
                    error!(%addr, %err, "metrics server terminated");
                }
            }
            Err(err) => {
                error!(%addr, %err, "failed to bind metrics listener");
            }
        }
    });
}

async fn metrics_handler(
    State(state): State<MetricsState>,
    headers: HeaderMap,
) -> axum::response::Response {
    if let Some(token) = &state.auth_token {
        if !is_authorized(headers.get(http::header::AUTHORIZATION), token) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }
    match render() {
        Ok((body, content_type)) => {
            let content_type = HeaderValue::from_str(&content_type)
                .unwrap_or(HeaderValue::from_static("text/plain"));
            ([(http::header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(err) => {
            error!(%err, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

/// Text exposition of every registered metric plus its content type.
pub fn render() -> Result<(Vec<u8>, String), prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buf)?;
    Ok((buf, encoder.format_type().to_string()))
}

fn is_authorized(header: Option<&HeaderValue>, token: &str) -> bool {
    match header.and_then(|value| value.to_str().ok()) {
        Some(value) => value
            .strip_prefix("Bearer ")
            .is_some_and(|presented| presented.trim() == token),
        None => false,
    }
}

pub fn record_handshake(revision: &str) {
    HANDSHAKES.with_label_values(&[revision]).inc();
}

pub fn record_tool_list() {
    TOOL_LIST_QUERIES.inc();
}

pub fn record_tool_call(outcome: &str) {
    TOOL_CALLS.with_label_values(&[outcome]).inc();
}

pub fn set_registered_tools(count: usize) {
    REGISTERED_TOOLS.set(count as i64);
}
