// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! The Prometheus mirror server application and interface.
//!
//! The mirror is an [Axum](https://docs.rs/axum/latest/axum/) web application. Each request carries the
//! connection details of a Prometheus compatible backend (optionally an AWS managed workspace) along with a
//! store agnostic query. Queries are translated to PromQL by CoreMirror, and the backend response is returned
//! as points, field names or field values.

mod schema;
mod utils;

use std::env;
use std::result::Result;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{routing::get, routing::post, Json, Router};
use hyper::StatusCode;
use log::{debug, error, info};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use coremirror::model::query::{MirrorRequest, TestConnectionRequest};
use coremirror::utils::environment::load_env;
use coremirror::CoreMirror;

use crate::schema::{
  ErrorResponse, FieldNamesResponse, FieldValuesResponse, MetricsResponse, TestConnectionResponse,
};
use crate::utils::error::MirrorError;
use crate::utils::settings::Settings;
use crate::utils::shutdown::shutdown_signal;

/// Header carrying the configured api key, set on every response.
const API_KEY_HEADER: &str = "x-mirror-api-key";

/// Represents application state.
struct AppState {
  coremirror: CoreMirror,
  settings: Settings,
}

/// Axum application for the mirror server.
async fn app(config_dir_path: &str) -> (Router, Arc<AppState>) {
  // Read the settings from the config directory.
  let settings = match Settings::new(config_dir_path) {
    Ok(settings) => settings,
    Err(err) => panic!("Unable to read settings from {} with err {}", config_dir_path, err),
  };

  let shared_state = Arc::new(AppState {
    coremirror: CoreMirror::new(),
    settings,
  });

  let router: Router = Router::new()
    // GET methods
    .route("/", get(root))
    //---
    // POST methods
    .route("/api/connection", post(check_connection))
    .route("/api/metric", post(fetch_metric))
    .route("/api/field/name", post(fetch_field_names))
    .route("/api/field/value", post(fetch_field_values))
    // ---
    // Every response, including errors, carries the api key.
    .layer(middleware::from_fn_with_state(
      shared_state.clone(),
      add_api_key_header,
    ))
    // State that is passed to each request.
    .with_state(shared_state.clone())
    // ---
    // Layer for tracing in debug mode.
    .layer(TraceLayer::new_for_http());

  (router, shared_state)
}

async fn run_server(config_dir_path: &str) {
  // Create app.
  let (app, shared_state) = app(config_dir_path).await;

  // Start server.
  let port = shared_state.settings.get_server_settings().get_port();
  let host: &str = shared_state.settings.get_server_settings().get_host();
  let connection_string = &format!("{}:{}", host, port);
  let listener = TcpListener::bind(connection_string)
    .await
    .unwrap_or_else(|_| panic!("Could not listen using {}", connection_string));

  info!(
    "Starting Prometheus mirror on {}. Use Ctrl-C or SIGTERM to gracefully exit...",
    connection_string
  );

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .unwrap();

  info!("Completed Prometheus mirror shutdown");
}

/// Program entry point.
fn main() {
  // Load environment variables from ".env" and ".env-creds" file.
  load_env();

  // If log level isn't set, set it to info.
  if env::var("RUST_LOG").is_err() {
    env::set_var("RUST_LOG", "info")
  }

  // Set up logging.
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  // Config directory path is relative to the current directory, and set in environment variable
  // "MIRROR_CONFIG_DIR_PATH". Defaults to "config" if not set.
  let config_dir_path = env::var("MIRROR_CONFIG_DIR_PATH").unwrap_or_else(|_| "config".to_owned());

  let num_threads = match Settings::new(&config_dir_path) {
    Ok(settings) => settings.get_server_settings().get_workers(),
    Err(err) => panic!("Unable to read settings from {} with err {}", config_dir_path, err),
  };
  info!("Using {} worker threads", num_threads);

  let runtime = tokio::runtime::Builder::new_multi_thread()
    .worker_threads(num_threads)
    .enable_all() // Enables both I/O and time drivers
    .build()
    .unwrap();

  runtime.block_on(async {
    run_server(&config_dir_path).await;
  });
}

/// Set the api key header on the response.
async fn add_api_key_header(
  State(state): State<Arc<AppState>>,
  request: Request,
  next: Next,
) -> Response {
  let mut response = next.run(request).await;
  let api_key = state.settings.get_server_settings().get_api_key();
  match HeaderValue::from_str(api_key) {
    Ok(value) => {
      response.headers_mut().insert(API_KEY_HEADER, value);
    }
    Err(err) => error!("Could not set the api key header: {}", err),
  }
  response
}

/// Ping to check if the server is up.
async fn root() -> Json<Value> {
  Json(json!({"app": "Prometheus Mirror"}))
}

/// Probe the backend of the given connection.
async fn check_connection(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<TestConnectionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TestConnectionResponse>), ErrorResponse> {
  let Json(request) = payload.map_err(|rejection| ErrorResponse::validation(&rejection))?;

  let (status, body) = state
    .coremirror
    .test_connection(&request.connection_details)
    .await
    .map_err(|err| ErrorResponse::internal(&err.to_string()))?;
  debug!("Connection probe returned status {}", status);

  if status == StatusCode::OK.as_u16() {
    return Ok((StatusCode::OK, Json(TestConnectionResponse::ok())));
  }

  let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
  Ok((status, Json(TestConnectionResponse::failure(body))))
}

/// Fetch the points of a metric.
async fn fetch_metric(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<MirrorRequest>, JsonRejection>,
) -> Result<Json<MetricsResponse>, ErrorResponse> {
  let Json(request) = payload.map_err(|rejection| ErrorResponse::validation(&rejection))?;

  let telemetry = state
    .coremirror
    .fetch_metric(&request.connection_details, &request.query)
    .await
    .map_err(|err| ErrorResponse::for_metric(&err, &request.query))?;

  Ok(Json(MetricsResponse::from(telemetry)))
}

/// List the field names usable in conditions.
async fn fetch_field_names(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<MirrorRequest>, JsonRejection>,
) -> Result<Json<FieldNamesResponse>, ErrorResponse> {
  let Json(request) = payload.map_err(|rejection| ErrorResponse::validation(&rejection))?;

  let (is_partial, names) = state
    .coremirror
    .field_names(&request.connection_details, request.query.get_limit())
    .await
    .map_err(|err| ErrorResponse::internal(&err.to_string()))?;

  Ok(Json(FieldNamesResponse::new(is_partial, names)))
}

/// List a page of values of the field named in the query.
async fn fetch_field_values(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<MirrorRequest>, JsonRejection>,
) -> Result<Json<FieldValuesResponse>, ErrorResponse> {
  let Json(request) = payload.map_err(|rejection| ErrorResponse::validation(&rejection))?;
  let query = &request.query;

  let field = query.get_field().ok_or_else(|| {
    ErrorResponse::internal(&MirrorError::InvalidInput("Field name required".to_owned()).to_string())
  })?;

  let (is_partial, values) = state
    .coremirror
    .field_values(
      &request.connection_details,
      &field.field_name,
      query.get_prefix(),
      query.get_offset(),
      query.get_limit(),
    )
    .await
    .map_err(|err| ErrorResponse::internal(&err.to_string()))?;

  Ok(Json(FieldValuesResponse::new(is_partial, values)))
}
