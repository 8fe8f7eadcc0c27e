//! In-process stand-in for the media backend and its object storage.

#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use media_console::{
    HttpGateway, Session,
    services::asset_service::AssetService,
};
use serde_json::{Value, json};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;

pub const TOKEN: &str = "good-token";
pub const BUCKET: &str = "media-test";

/// One request as the fake backend saw it.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

/// One object written to the fake storage.
#[derive(Clone, Debug)]
pub struct StoredObject {
    pub key: String,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
    pub len: usize,
}

#[derive(Default)]
pub struct FakeState {
    pub base_url: String,
    pub requests: Mutex<Vec<Recorded>>,
    pub stored: Mutex<Vec<StoredObject>>,
    pub registered: Mutex<Vec<Value>>,
    /// Storage answers 403 for keys ending in this file name.
    pub reject_storage_for: Mutex<Option<String>>,
}

impl FakeState {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn stored(&self) -> Vec<StoredObject> {
        self.stored.lock().unwrap().clone()
    }

    pub fn registered(&self) -> Vec<Value> {
        self.registered.lock().unwrap().clone()
    }
}

pub struct FakeApi {
    pub base_url: String,
    pub state: Arc<FakeState>,
}

impl FakeApi {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let state = Arc::new(FakeState {
            base_url: base_url.clone(),
            ..FakeState::default()
        });

        let api = Router::new()
            .route("/api/assets", get(list_assets).post(register_asset))
            .route("/api/assets/upload-url", post(upload_url))
            .route("/api/assets/{id}", get(get_asset).delete(delete_asset))
            .route("/api/assets/{id}/signed-url", get(signed_url))
            .route("/api/assets/{id}/stats", get(asset_stats))
            .route("/api/assets/{id}/make-private", put(make_private))
            .route("/api/assets/{id}/make-public", put(make_public))
            .route("/api/assets/{id}/invalidate-cache", post(invalidate_cache))
            .route("/api/assets/{id}/restore", put(restore_asset))
            .layer(middleware::from_fn_with_state(state.clone(), require_token));

        let app = Router::new()
            .merge(api)
            .route("/storage/{*key}", put(store_object))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, state }
    }

    pub fn session(&self, token: &str) -> Arc<Session> {
        Arc::new(Session::new(Some(token.to_string())))
    }

    pub fn service(&self, session: Arc<Session>) -> AssetService {
        AssetService::new(HttpGateway::new(&self.base_url, session, None).unwrap())
    }

    pub fn reject_storage_for(&self, file_name: &str) {
        *self.state.reject_storage_for.lock().unwrap() = Some(file_name.to_string());
    }
}

pub fn asset_json(base: &str, id: &str, key: &str, is_private: bool) -> Value {
    let name = key.rsplit('/').next().unwrap_or(key);
    json!({
        "_id": id,
        "ownerId": "owner-1",
        "name": name,
        "type": "image",
        "mimeType": "image/png",
        "sizeBytes": 1024,
        "s3Bucket": BUCKET,
        "s3Key": key,
        "cloudfrontUrl": format!("{}/cdn/{}", base, key),
        "isPrivate": is_private,
        "isDeleted": false,
        "createdAt": "2025-01-04T10:00:00Z",
        "updatedAt": "2025-01-04T10:00:00Z"
    })
}

async fn require_token(State(state): State<Arc<FakeState>>, req: Request, next: Next) -> Response {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.lock().unwrap().push(Recorded {
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
        query: req.uri().query().map(str::to_string),
        authorization: authorization.clone(),
    });

    let expected = format!("Bearer {}", TOKEN);
    if authorization.as_deref() != Some(expected.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Invalid token" })),
        )
            .into_response();
    }
    next.run(req).await
}

async fn upload_url(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    let file_name = body["customFileName"]
        .as_str()
        .or_else(|| body["fileName"].as_str())
        .unwrap_or_default();
    if body["fileSize"].as_u64().unwrap_or_default() > 50 * 1024 * 1024 {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(json!({ "message": "File too large" })),
        )
            .into_response();
    }
    let key = match body["folder"].as_str() {
        Some(folder) => format!("{}/{}", folder, file_name),
        None => file_name.to_string(),
    };
    Json(json!({
        "success": true,
        "data": {
            "uploadUrl": format!("{}/storage/{}?X-Amz-Signature=secret-sig", state.base_url, key),
            "s3Key": key,
            "s3Bucket": BUCKET,
        }
    }))
    .into_response()
}

async fn store_object(
    State(state): State<Arc<FakeState>>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let rejected = state.reject_storage_for.lock().unwrap().clone();
    if rejected.is_some_and(|name| key.ends_with(&name)) {
        return (StatusCode::FORBIDDEN, "<Error><Code>AccessDenied</Code></Error>").into_response();
    }
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.stored.lock().unwrap().push(StoredObject {
        key,
        content_type: header_str(header::CONTENT_TYPE),
        authorization: header_str(header::AUTHORIZATION),
        len: body.len(),
    });
    StatusCode::OK.into_response()
}

async fn register_asset(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    let mut registered = state.registered.lock().unwrap();
    let id = format!("asset-{}", registered.len() + 1);
    let key = body["s3Key"].as_str().unwrap_or_default();
    let mut asset = asset_json(&state.base_url, &id, key, false);
    asset["name"] = body["fileName"].clone();
    asset["mimeType"] = body["fileType"].clone();
    asset["sizeBytes"] = body["fileSize"].clone();
    if let Some((folder, _)) = key.rsplit_once('/') {
        asset["folder"] = json!(folder);
    }
    registered.push(body);
    (StatusCode::CREATED, Json(json!({ "success": true, "data": asset }))).into_response()
}

async fn get_asset(State(state): State<Arc<FakeState>>, Path(id): Path<String>) -> Response {
    match id.as_str() {
        "missing" => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "Asset not found", "error": "E_NOT_FOUND" })),
        )
            .into_response(),
        "broken" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "database offline" })),
        )
            .into_response(),
        "teapot" => (StatusCode::IM_A_TEAPOT, "short and stout").into_response(),
        _ => {
            let is_private = id.starts_with("priv");
            let key = if is_private {
                format!("private/{}.png", id)
            } else {
                format!("banners/{}.png", id)
            };
            Json(json!({ "success": true, "data": asset_json(&state.base_url, &id, &key, is_private) }))
                .into_response()
        }
    }
}

async fn list_assets(
    State(state): State<Arc<FakeState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let page: u32 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: u32 = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(20);
    let base = &state.base_url;
    Json(json!({
        "success": true,
        "data": {
            "assets": [
                asset_json(base, "a1", "banners/a1.png", false),
                asset_json(base, "priv-2", "private/priv-2.png", true),
            ],
            "total": 2,
            "page": page,
            "limit": limit,
        }
    }))
    .into_response()
}

async fn signed_url(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let expires_in: i64 = params
        .get("expiresIn")
        .and_then(|e| e.parse().ok())
        .unwrap_or(3600);
    let expires_at = chrono::Utc::now() + chrono::Duration::seconds(expires_in);
    let transformations: HashMap<&String, &String> = params
        .iter()
        .filter(|(k, _)| k.as_str() != "expiresIn")
        .collect();
    let transformations = if transformations.is_empty() {
        Value::Null
    } else {
        json!(transformations)
    };
    Json(json!({
        "success": true,
        "data": {
            "signedUrl": format!("{}/cdn/private/{}.png?Signature=sig-{}", state.base_url, id, expires_in),
            "expiresAt": expires_at.to_rfc3339(),
            "expiresInSeconds": expires_in,
            "transformations": transformations,
        }
    }))
    .into_response()
}

fn relocated(state: &FakeState, id: &str, key: String, is_private: bool, folder: Option<&String>) -> Response {
    let message = if is_private {
        "Asset is now private"
    } else {
        "Asset is now public"
    };
    Json(json!({
        "success": true,
        "message": message,
        "asset": {
            "id": id,
            "name": format!("{}.png", id),
            "isPrivate": is_private,
            "newS3Key": key,
            "cloudfrontUrl": format!("{}/cdn/{}", state.base_url, key),
            "folder": folder,
        }
    }))
    .into_response()
}

async fn make_private(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let folder = params.get("folder");
    let key = match folder {
        Some(folder) => format!("private/{}/{}.png", folder, id),
        None => format!("private/{}.png", id),
    };
    relocated(&state, &id, key, true, folder)
}

async fn make_public(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let folder = params.get("folder");
    let key = match folder {
        Some(folder) => format!("{}/{}.png", folder, id),
        None => format!("{}.png", id),
    };
    relocated(&state, &id, key, false, folder)
}

async fn invalidate_cache(Path(id): Path<String>) -> Response {
    Json(json!({
        "success": true,
        "message": "Cache invalidation started",
        "invalidation": {
            "id": "I2J0EXAMPLE",
            "status": "InProgress",
            "paths": [format!("/banners/{}.png", id)],
        }
    }))
    .into_response()
}

async fn delete_asset(Path(id): Path<String>) -> Response {
    Json(json!({
        "success": true,
        "message": format!("Asset {} deleted", id),
        "data": { "_id": id, "isDeleted": true },
    }))
    .into_response()
}

async fn asset_stats(Path(id): Path<String>) -> Response {
    Json(json!({
        "success": true,
        "data": {
            "stats": {
                "assetId": id,
                "assetName": format!("{}.png", id),
                "totalRequests": 1200,
                "totalBytes": 3221225472u64,
                "totalGB": 3.0,
                "cacheHits": 1080,
                "cacheMisses": 120,
                "cacheHitRatio": "90.00%",
                "estimatedCostUSD": 0.255,
            }
        }
    }))
    .into_response()
}

async fn restore_asset(Path(id): Path<String>) -> Response {
    Json(json!({ "success": true, "message": format!("Asset {} restored", id) })).into_response()
}
