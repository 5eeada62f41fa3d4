//! In-process stand-in for the three inference services.
//!
//! Every stage is served from one axum router on an ephemeral port. Responses
//! are canned, and each request is recorded for assertions.

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use binderflow_common::settings::ServicesConfig;
use binderflow_pipeline::NimClient;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const GENERATE_PATH: &str = "/biology/ipd/rfdiffusion/generate";
pub const DESIGN_PATH: &str = "/biology/ipd/proteinmpnn/predict";
pub const VALIDATE_PATH: &str = "/protein-structure/alphafold2/multimer/predict-structure-from-sequences";
pub const HEALTH_PATH: &str = "/v1/health/ready";

pub const BACKBONE: &str = "ATOM      1  N   GLY B   1      1.000   2.000   3.000  1.00  0.00           N";
pub const DESIGN_BLOB: &str = ">input, score=1.91, designed_chains=['B']\nGGGGGGGGGGGGGGG\n>T=1\nAAAA\n>T=2\nCCCC\n";
pub const API_KEY: &str = "nvapi-test-key";

#[derive(Debug, Clone)]
pub struct Canned {
    pub status: StatusCode,
    pub body: String,
}

impl Canned {
    pub fn ok(body: Value) -> Self {
        Self { status: StatusCode::OK, body: body.to_string() }
    }

    pub fn raw(status: StatusCode, body: &str) -> Self {
        Self { status, body: body.to_string() }
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: &'static str,
    pub body: Value,
    pub authorization: Option<String>,
    pub poll_seconds: Option<String>,
}

pub struct MockNim {
    pub generate: Canned,
    pub design: Canned,
    pub validate: Canned,
    pub health: Canned,
    /// Held before answering the health route.
    pub health_delay: Duration,
    pub calls: Mutex<Vec<Recorded>>,
}

impl Default for MockNim {
    fn default() -> Self {
        Self {
            generate: Canned::ok(json!({ "output_pdb": BACKBONE })),
            design: Canned::ok(json!({
                "mfasta": DESIGN_BLOB,
                "probs": [[[0.1, 0.9], [0.4, 0.6]], [[0.2, 0.8]]],
                "scores": [0.89, 0.91]
            })),
            validate: Canned::ok(json!(["ATOM complex model 1"])),
            health: Canned::ok(json!({ "status": "ready" })),
            health_delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockNim {
    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<&'static str> {
        self.calls().iter().map(|c| c.path).collect()
    }

    fn record(&self, path: &'static str, headers: &HeaderMap, body: Value) {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(String::from);
        self.calls.lock().unwrap().push(Recorded {
            path,
            body,
            authorization: header("authorization"),
            poll_seconds: header("poll-seconds"),
        });
    }
}

type Shared = Arc<MockNim>;

async fn generate(State(mock): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, String) {
    mock.record(GENERATE_PATH, &headers, body);
    (mock.generate.status, mock.generate.body.clone())
}

async fn design(State(mock): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, String) {
    mock.record(DESIGN_PATH, &headers, body);
    (mock.design.status, mock.design.body.clone())
}

async fn validate(State(mock): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, String) {
    mock.record(VALIDATE_PATH, &headers, body);
    (mock.validate.status, mock.validate.body.clone())
}

async fn health(State(mock): State<Shared>) -> (StatusCode, String) {
    tokio::time::sleep(mock.health_delay).await;
    (mock.health.status, mock.health.body.clone())
}

/// Serves `mock` on 127.0.0.1 and returns the bound port.
pub async fn serve(mock: Shared) -> u16 {
    let app = Router::new()
        .route(GENERATE_PATH, post(generate))
        .route(DESIGN_PATH, post(design))
        .route(VALIDATE_PATH, post(validate))
        .route(HEALTH_PATH, get(health))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    port
}

/// A port nothing is listening on.
pub async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub fn services(port: u16) -> ServicesConfig {
    let mut services = ServicesConfig::default();
    services.host = "http://127.0.0.1".to_string();
    services.structure_generation.port = port;
    services.sequence_design.port = port;
    services.structure_validation.port = port;
    services
}

pub fn client(port: u16) -> NimClient {
    NimClient::from_services(&services(port), SecretString::from(API_KEY.to_string())).unwrap()
}
