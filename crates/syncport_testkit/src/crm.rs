//! In-process fake CRM.
//!
//! Speaks the same two endpoints the REST destination uses for the `user`
//! object: `POST /users/create_or_update` and `POST /users/retrieve`. Every
//! call must carry the configured `apiKey` in its JSON body.

use crate::server::TestServer;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use syncport_destination::{RestConfig, RestDestination, SecretSource};

#[derive(Debug, Default)]
struct CrmState {
    api_key: String,
    users: Mutex<Vec<Map<String, Value>>>,
    banned: Mutex<HashSet<String>>,
    creates: AtomicUsize,
    retrieves: AtomicUsize,
}

impl CrmState {
    fn authorize(&self, body: &Value) -> Result<(), Response> {
        match body.get("apiKey").and_then(Value::as_str) {
            Some(key) if key == self.api_key => Ok(()),
            _ => Err((StatusCode::UNAUTHORIZED, "invalid api key").into_response()),
        }
    }
}

/// A running fake CRM.
#[derive(Debug, Clone)]
pub struct FakeCrm {
    server: TestServer,
    state: Arc<CrmState>,
}

impl FakeCrm {
    /// Starts a fake CRM that accepts `api_key`.
    pub async fn spawn(api_key: &str) -> Self {
        let state = Arc::new(CrmState {
            api_key: api_key.to_string(),
            ..CrmState::default()
        });

        let router = Router::new()
            .route("/", get(|| async { "fake crm" }))
            .route("/users/create_or_update", post(create_or_update))
            .route("/users/retrieve", post(retrieve))
            .with_state(Arc::clone(&state));

        Self {
            server: TestServer::spawn(router).await,
            state,
        }
    }

    /// Base URL to configure the REST destination with.
    pub fn base_url(&self) -> String {
        self.server.url()
    }

    /// REST configuration pointing at this CRM with the right key.
    pub fn config(&self) -> RestConfig {
        RestConfig::new()
            .with_base_url(self.base_url())
            .with_api_key(SecretSource::Value(self.state.api_key.clone()))
    }

    /// A REST destination pointing at this CRM.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    pub fn destination(&self) -> RestDestination {
        RestDestination::with_crm_objects(self.config()).expect("Failed to build REST destination")
    }

    /// Stores a user directly.
    ///
    /// # Panics
    ///
    /// Panics if `user` is not a JSON object.
    pub fn seed_user(&self, user: Value) {
        let Value::Object(user) = user else {
            panic!("user must be a JSON object");
        };
        self.state.users.lock().push(user);
    }

    /// Makes create-or-update fail for this user id.
    pub fn ban(&self, user_id: &str) {
        self.state.banned.lock().insert(user_id.to_string());
    }

    /// Returns the stored user with this id.
    pub fn user(&self, user_id: &str) -> Option<Value> {
        self.state
            .users
            .lock()
            .iter()
            .find(|u| u.get("userID").and_then(Value::as_str) == Some(user_id))
            .cloned()
            .map(Value::Object)
    }

    /// Number of stored users.
    pub fn user_count(&self) -> usize {
        self.state.users.lock().len()
    }

    /// Number of create-or-update calls received.
    pub fn create_calls(&self) -> usize {
        self.state.creates.load(Ordering::SeqCst)
    }

    /// Number of retrieve calls received.
    pub fn retrieve_calls(&self) -> usize {
        self.state.retrieves.load(Ordering::SeqCst)
    }
}

async fn create_or_update(State(state): State<Arc<CrmState>>, Json(body): Json<Value>) -> Response {
    state.creates.fetch_add(1, Ordering::SeqCst);
    if let Err(response) = state.authorize(&body) {
        return response;
    }

    let Some(user_id) = body.get("userID").and_then(Value::as_str).map(str::to_string) else {
        return (StatusCode::BAD_REQUEST, "userID is required").into_response();
    };
    if state.banned.lock().contains(&user_id) {
        return (StatusCode::UNPROCESSABLE_ENTITY, "user is banned").into_response();
    }

    let mut fields = match body {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    fields.remove("apiKey");

    let mut users = state.users.lock();
    match users
        .iter_mut()
        .find(|u| u.get("userID").and_then(Value::as_str) == Some(user_id.as_str()))
    {
        Some(existing) => {
            for (key, value) in fields {
                existing.insert(key, value);
            }
        }
        None => {
            if fields.get("name").map_or(true, Value::is_null) {
                return (StatusCode::BAD_REQUEST, "name is required").into_response();
            }
            users.push(fields);
        }
    }

    Json(json!({ "id": user_id })).into_response()
}

async fn retrieve(State(state): State<Arc<CrmState>>, Json(body): Json<Value>) -> Response {
    state.retrieves.fetch_add(1, Ordering::SeqCst);
    if let Err(response) = state.authorize(&body) {
        return response;
    }

    let keys = ["userID", "email"];
    let users = state.users.lock();
    let found = users.iter().find(|user| {
        keys.iter().any(|key| match body.get(*key) {
            Some(wanted) if !wanted.is_null() => user.get(*key) == Some(wanted),
            _ => false,
        })
    });

    match found {
        Some(user) => Json(Value::Object(user.clone())).into_response(),
        None => (StatusCode::NOT_FOUND, "user not found").into_response(),
    }
}
