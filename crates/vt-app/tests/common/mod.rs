#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const LAMP_SCENE: &str = r##"{"kind":"group","children":[{"kind":"cylinder","radius":0.3,"height":0.1},{"kind":"cone","radius":0.4,"height":0.5,"material":{"color":"#f5deb3"}}]}"##;

#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, Value),
    Raw(u16, &'static str),
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Json(code, body) => (status(code), Json(body)).into_response(),
            Reply::Raw(code, body) => (status(code), body).into_response(),
        }
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap()
}

pub fn pending() -> Reply {
    Reply::Json(200, json!({ "status": "pending" }))
}

/// Success in the nested `result.metadata` shape the backend uses
pub fn success(scene: &str) -> Reply {
    Reply::Json(
        200,
        json!({
            "status": "success",
            "result": {
                "metadata": scene,
                "model": "scene-model-1",
                "usage": { "input_tokens": 120, "output_tokens": 800, "total_tokens": 920 }
            }
        }),
    )
}

pub fn failed(error: &str) -> Reply {
    Reply::Json(200, json!({ "status": "failed", "error": error }))
}

/// How the fake answers for one product; statuses are replayed in order and the last one repeats
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub submit: Option<Reply>,
    pub statuses: Vec<Reply>,
}

#[derive(Default)]
struct FakeState {
    scripts: HashMap<String, Script>,
    status_calls: HashMap<String, u32>,
    deleted: Vec<String>,
    submissions: Vec<Value>,
}

type Shared = Arc<Mutex<FakeState>>;

pub fn job_id_for(product_id: &str) -> String {
    format!("job-{product_id}")
}

pub struct FakeBackend {
    pub base_url: String,
    state: Shared,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::default();

        let app = Router::new()
            .route("/api/health", get(health))
            .route("/api/generate-product-3d", post(create_job))
            .route("/api/task-result/{id}", get(job_result))
            .route("/api/task/{id}", delete(cancel_job))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn script(&self, product_id: &str, script: Script) {
        self.state.lock().unwrap().scripts.insert(product_id.to_string(), script);
    }

    pub fn status_calls(&self, job_id: &str) -> u32 {
        self.state.lock().unwrap().status_calls.get(job_id).copied().unwrap_or(0)
    }

    pub fn total_status_calls(&self) -> u32 {
        self.state.lock().unwrap().status_calls.values().sum()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn submissions(&self) -> Vec<Value> {
        self.state.lock().unwrap().submissions.clone()
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn create_job(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let product_id = body["product_data"]["id"].as_str().unwrap_or_default().to_string();
    let mut state = state.lock().unwrap();
    state.submissions.push(body);

    match state.scripts.get(&product_id).and_then(|s| s.submit.clone()) {
        Some(reply) => reply,
        None => Reply::Json(
            200,
            json!({ "task_id": job_id_for(&product_id), "status": "pending", "message": "queued" }),
        ),
    }
}

async fn job_result(State(state): State<Shared>, Path(id): Path<String>) -> Reply {
    let mut state = state.lock().unwrap();
    let calls = state.status_calls.entry(id.clone()).or_insert(0);
    *calls += 1;
    let n = *calls as usize;

    let product_id = id.strip_prefix("job-").unwrap_or(&id);
    state
        .scripts
        .get(product_id)
        .and_then(|s| s.statuses.get(n - 1).or(s.statuses.last()).cloned())
        .unwrap_or_else(pending)
}

async fn cancel_job(State(state): State<Shared>, Path(id): Path<String>) -> impl IntoResponse {
    state.lock().unwrap().deleted.push(id);
    Json(json!({ "status": "cancelled" }))
}
