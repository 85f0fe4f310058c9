//! Small HTTP server that end-to-end tests run declarative requests against.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// A stored JSON document.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: Uuid,
    pub data: Value,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Record>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/status/{code}", any(status))
        .route("/echo", get(echo))
        .route("/records", post(create_record))
        .route("/records/{id}", get(get_record))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Reply with an empty body and the requested status.
async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Reflect the query string and headers back as JSON.
async fn echo(Query(query): Query<HashMap<String, String>>, headers: HeaderMap) -> Json<Value> {
    let headers: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();
    Json(json!({ "query": query, "headers": headers }))
}

async fn create_record(State(db): State<Db>, Json(data): Json<Value>) -> (StatusCode, Json<Record>) {
    let record = Record {
        id: Uuid::new_v4(),
        data,
    };
    db.write().await.insert(record.id, record.clone());
    (StatusCode::CREATED, Json(record))
}

async fn get_record(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Record>, StatusCode> {
    let records = db.read().await;
    records.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}
