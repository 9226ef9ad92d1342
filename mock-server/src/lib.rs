//! In-memory stand-in for the hosted auth + data backend.
//!
//! Speaks enough of the backend's dialect for the client to be exercised end
//! to end: password/refresh token grants and sign-up under `/auth/v1`, and
//! filtered table endpoints under `/rest/v1` for `profiles`, `inventory`, and
//! `action_logs`. `MockSchema` chooses which inventory columns the simulated
//! deployment carries; a payload key or selected column outside that set is
//! answered with the deployment's missing-column phrasing
//! (`Could not find the '<col>' column of '<table>' in the schema cache`),
//! which is what the client's fallback chains key on.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Shape of the simulated deployment.
#[derive(Debug, Clone)]
pub struct MockSchema {
    /// Name the inventory quantity column goes by: `quantity` or `qty`.
    pub quantity_column: &'static str,
    pub has_category: bool,
    /// Whether `date_added` / `date_updated` exist on the inventory table.
    pub has_item_dates: bool,
    /// Sign-up issues tokens immediately instead of awaiting e-mail
    /// verification.
    pub autoconfirm: bool,
}

impl MockSchema {
    /// Current schema revision: every optional column present.
    pub fn modern() -> Self {
        Self {
            quantity_column: "quantity",
            has_category: true,
            has_item_dates: true,
            autoconfirm: false,
        }
    }

    /// Old deployment: `qty`, no category, no item date columns.
    pub fn legacy() -> Self {
        Self {
            quantity_column: "qty",
            has_category: false,
            has_item_dates: false,
            autoconfirm: false,
        }
    }

    pub fn with_autoconfirm(mut self, autoconfirm: bool) -> Self {
        self.autoconfirm = autoconfirm;
        self
    }

    fn inventory_columns(&self) -> HashSet<&'static str> {
        let mut columns: HashSet<&'static str> =
            ["id", "user_id", "item_name", "price", "created_at", "updated_at"]
                .into_iter()
                .collect();
        columns.insert(self.quantity_column);
        if self.has_category {
            columns.insert("category");
        }
        if self.has_item_dates {
            columns.insert("date_added");
            columns.insert("date_updated");
        }
        columns
    }
}

const ACTION_LOG_COLUMNS: [&str; 5] = ["id", "user_id", "action_type", "details", "created_at"];

struct StoredUser {
    id: String,
    email: String,
    password: String,
}

#[derive(Default)]
struct Backend {
    users: HashMap<String, StoredUser>,
    access_tokens: HashMap<String, String>,
    refresh_tokens: HashMap<String, String>,
    profiles: HashMap<String, Value>,
    inventory: Vec<Value>,
    action_logs: Vec<Value>,
    seq: u64,
}

#[derive(Clone)]
struct AppState {
    db: Arc<RwLock<Backend>>,
    schema: MockSchema,
}

type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;

pub fn app(schema: MockSchema) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Backend::default())),
        schema,
    };
    Router::new()
        .route("/auth/v1/signup", post(signup))
        .route("/auth/v1/token", post(token))
        .route(
            "/rest/v1/inventory",
            get(list_inventory)
                .post(insert_inventory)
                .patch(update_inventory)
                .delete(delete_inventory),
        )
        .route("/rest/v1/profiles", post(upsert_profiles))
        .route(
            "/rest/v1/action_logs",
            get(list_action_logs).post(insert_action_logs),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener, schema: MockSchema) -> Result<(), std::io::Error> {
    axum::serve(listener, app(schema)).await
}

// --- auth ---

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn signup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<Credentials>,
) -> ApiResult<Json<Value>> {
    require_api_key(&headers)?;
    let mut db = state.db.write().await;
    if db.users.contains_key(&input.email) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error_code":"user_already_exists","msg":"User already registered"})),
        ));
    }
    let user = StoredUser {
        id: Uuid::new_v4().to_string(),
        email: input.email.clone(),
        password: input.password,
    };
    let (user_id, email) = (user.id.clone(), user.email.clone());
    db.users.insert(input.email, user);

    if state.schema.autoconfirm {
        Ok(Json(issue_session(&mut db, &user_id, &email)))
    } else {
        Ok(Json(json!({
            "user": {"id": user_id, "email": email},
            "confirmation_sent_at": "2024-01-01T00:00:00Z",
        })))
    }
}

async fn token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    Json(input): Json<Value>,
) -> ApiResult<Json<Value>> {
    require_api_key(&headers)?;
    let mut db = state.db.write().await;
    match params.get("grant_type").map(String::as_str) {
        Some("password") => {
            let email = input["email"].as_str().unwrap_or_default();
            let password = input["password"].as_str().unwrap_or_default();
            let user = match db.users.get(email) {
                Some(user) if user.password == password => (user.id.clone(), user.email.clone()),
                _ => return Err(invalid_grant("Invalid login credentials")),
            };
            Ok(Json(issue_session(&mut db, &user.0, &user.1)))
        }
        Some("refresh_token") => {
            let presented = input["refresh_token"].as_str().unwrap_or_default().to_string();
            // Rotation: a refresh token is good for exactly one exchange.
            let Some(user_id) = db.refresh_tokens.remove(&presented) else {
                return Err(invalid_grant("Invalid Refresh Token"));
            };
            let email = db
                .users
                .values()
                .find(|user| user.id == user_id)
                .map(|user| user.email.clone())
                .unwrap_or_default();
            Ok(Json(issue_session(&mut db, &user_id, &email)))
        }
        _ => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error":"unsupported_grant_type"})),
        )),
    }
}

fn issue_session(db: &mut Backend, user_id: &str, email: &str) -> Value {
    let access = format!("at-{}", Uuid::new_v4());
    let refresh = format!("rt-{}", Uuid::new_v4());
    db.access_tokens.insert(access.clone(), user_id.to_string());
    db.refresh_tokens.insert(refresh.clone(), user_id.to_string());
    json!({
        "access_token": access,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": refresh,
        "user": {"id": user_id, "email": email},
    })
}

// --- inventory ---

async fn insert_inventory(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user_id = authorized_user(&state, &headers).await?;
    let rows = as_rows(&input);
    let columns = state.schema.inventory_columns();
    for row in &rows {
        for key in row.keys() {
            if !columns.contains(key.as_str()) {
                return Err(missing_column_error("inventory", key));
            }
        }
    }

    let mut db = state.db.write().await;
    let mut stored = Vec::new();
    for mut row in rows {
        db.seq += 1;
        let stamp = timestamp(db.seq);
        row.insert("id".to_string(), json!(db.seq));
        row.entry("user_id".to_string()).or_insert_with(|| json!(user_id));
        row.insert("created_at".to_string(), json!(stamp));
        row.insert("updated_at".to_string(), json!(stamp));
        let value = Value::Object(row);
        db.inventory.push(value.clone());
        stored.push(value);
    }
    Ok((StatusCode::CREATED, Json(Value::Array(stored))))
}

async fn list_inventory(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let _user = authorized_user(&state, &headers).await?;
    let columns = state.schema.inventory_columns();
    let selected = selected_columns(&params);
    for column in &selected {
        if !columns.contains(column.as_str()) {
            return Err(missing_column_error("inventory", column));
        }
    }
    let filter_user = eq_param(&params, "user_id");

    let db = state.db.read().await;
    let mut rows: Vec<Value> = db
        .inventory
        .iter()
        .filter(|row| row_matches(row, &filter_user, &None))
        .map(|row| project(row, &selected))
        .collect();
    if params.get("order").map(String::as_str) == Some("created_at.desc") {
        rows.reverse();
    }
    Ok(Json(Value::Array(rows)))
}

async fn update_inventory(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    Json(input): Json<Value>,
) -> ApiResult<Json<Value>> {
    let _user = authorized_user(&state, &headers).await?;
    let Some(patch) = input.as_object() else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"message":"PATCH body must be a JSON object"})),
        ));
    };
    let columns = state.schema.inventory_columns();
    for key in patch.keys() {
        if !columns.contains(key.as_str()) {
            return Err(missing_column_error("inventory", key));
        }
    }
    let filter_user = eq_param(&params, "user_id");
    let filter_name = eq_param(&params, "item_name");

    let mut db = state.db.write().await;
    db.seq += 1;
    let stamp = timestamp(db.seq);
    let mut updated = Vec::new();
    for row in db.inventory.iter_mut() {
        if !row_matches(row, &filter_user, &filter_name) {
            continue;
        }
        if let Some(object) = row.as_object_mut() {
            for (key, value) in patch {
                object.insert(key.clone(), value.clone());
            }
            object.insert("updated_at".to_string(), json!(stamp));
        }
        updated.push(row.clone());
    }
    Ok(Json(Value::Array(updated)))
}

async fn delete_inventory(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let _user = authorized_user(&state, &headers).await?;
    let filter_user = eq_param(&params, "user_id");
    let filter_name = eq_param(&params, "item_name");

    let mut db = state.db.write().await;
    let (removed, kept): (Vec<Value>, Vec<Value>) = db
        .inventory
        .drain(..)
        .partition(|row| row_matches(row, &filter_user, &filter_name));
    db.inventory = kept;
    Ok(Json(Value::Array(removed)))
}

// --- profiles ---

async fn upsert_profiles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let _user = authorized_user(&state, &headers).await?;
    let merge = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("resolution=merge-duplicates"));

    let mut db = state.db.write().await;
    for row in as_rows(&input) {
        let Some(user_id) = row.get("user_id").and_then(Value::as_str) else {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({"message":"null value in column \"user_id\" violates not-null constraint"})),
            ));
        };
        if db.profiles.contains_key(user_id) && !merge {
            return Err((
                StatusCode::CONFLICT,
                Json(json!({
                    "code": "23505",
                    "message": "duplicate key value violates unique constraint \"profiles_user_id_key\"",
                })),
            ));
        }
        db.profiles.insert(user_id.to_string(), Value::Object(row));
    }
    Ok((StatusCode::CREATED, Json(input)))
}

// --- action logs ---

async fn insert_action_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user_id = authorized_user(&state, &headers).await?;
    let rows = as_rows(&input);
    for row in &rows {
        for key in row.keys() {
            if !ACTION_LOG_COLUMNS.contains(&key.as_str()) {
                return Err(missing_column_error("action_logs", key));
            }
        }
    }

    let mut db = state.db.write().await;
    let mut stored = Vec::new();
    for mut row in rows {
        db.seq += 1;
        row.insert("id".to_string(), json!(db.seq));
        row.entry("user_id".to_string()).or_insert_with(|| json!(user_id));
        row.insert("created_at".to_string(), json!(timestamp(db.seq)));
        let value = Value::Object(row);
        db.action_logs.push(value.clone());
        stored.push(value);
    }
    Ok((StatusCode::CREATED, Json(Value::Array(stored))))
}

async fn list_action_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let _user = authorized_user(&state, &headers).await?;
    let selected = selected_columns(&params);
    for column in &selected {
        if !ACTION_LOG_COLUMNS.contains(&column.as_str()) {
            return Err(missing_column_error("action_logs", column));
        }
    }
    let filter_user = eq_param(&params, "user_id");

    let db = state.db.read().await;
    let mut rows: Vec<Value> = db
        .action_logs
        .iter()
        .filter(|row| row_matches(row, &filter_user, &None))
        .map(|row| project(row, &selected))
        .collect();
    if params.get("order").map(String::as_str) == Some("created_at.desc") {
        rows.reverse();
    }
    Ok(Json(Value::Array(rows)))
}

// --- shared helpers ---

fn require_api_key(headers: &HeaderMap) -> ApiResult<()> {
    let present = headers
        .get("apikey")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| !v.is_empty());
    if present {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"message":"No API key found in request"})),
        ))
    }
}

async fn authorized_user(state: &AppState, headers: &HeaderMap) -> ApiResult<String> {
    require_api_key(headers)?;
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message":"This endpoint requires a Bearer token"})),
            )
        })?;
    state
        .db
        .read()
        .await
        .access_tokens
        .get(token)
        .cloned()
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message":"JWT is invalid"})),
            )
        })
}

fn invalid_grant(description: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error":"invalid_grant","error_description":description})),
    )
}

fn missing_column_error(table: &str, column: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "code": "PGRST204",
            "message": format!("Could not find the '{column}' column of '{table}' in the schema cache"),
        })),
    )
}

/// Body rows as maps: accepts a JSON array of objects or one bare object.
fn as_rows(input: &Value) -> Vec<Map<String, Value>> {
    match input {
        Value::Array(items) => items.iter().filter_map(|v| v.as_object().cloned()).collect(),
        Value::Object(object) => vec![object.clone()],
        _ => Vec::new(),
    }
}

fn selected_columns(params: &HashMap<String, String>) -> Vec<String> {
    match params.get("select").map(String::as_str) {
        None | Some("*") | Some("") => Vec::new(),
        Some(list) => list.split(',').map(str::to_string).collect(),
    }
}

/// `eq.<value>` filter value for `name`, if present.
fn eq_param(params: &HashMap<String, String>, name: &str) -> Option<String> {
    params
        .get(name)
        .and_then(|v| v.strip_prefix("eq."))
        .map(str::to_string)
}

fn row_matches(row: &Value, user: &Option<String>, name: &Option<String>) -> bool {
    let field_eq = |key: &str, expected: &Option<String>| match expected {
        Some(value) => row.get(key).and_then(Value::as_str) == Some(value.as_str()),
        None => true,
    };
    field_eq("user_id", user) && field_eq("item_name", name)
}

/// Monotonic fake timestamp; zero-padded so lexicographic order follows
/// insertion order.
fn timestamp(seq: u64) -> String {
    format!("2024-01-01T00:00:00.{seq:06}Z")
}

/// Empty selection means `*`.
fn project(row: &Value, selected: &[String]) -> Value {
    if selected.is_empty() {
        return row.clone();
    }
    let mut out = Map::new();
    if let Some(object) = row.as_object() {
        for column in selected {
            if let Some(value) = object.get(column) {
                out.insert(column.clone(), value.clone());
            }
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modern_schema_has_every_optional_column() {
        let columns = MockSchema::modern().inventory_columns();
        assert!(columns.contains("quantity"));
        assert!(columns.contains("category"));
        assert!(columns.contains("date_added"));
        assert!(!columns.contains("qty"));
    }

    #[test]
    fn legacy_schema_is_qty_only() {
        let columns = MockSchema::legacy().inventory_columns();
        assert!(columns.contains("qty"));
        assert!(!columns.contains("quantity"));
        assert!(!columns.contains("category"));
        assert!(!columns.contains("date_updated"));
    }

    #[test]
    fn as_rows_accepts_array_and_bare_object() {
        let array = json!([{"a":1},{"b":2}]);
        assert_eq!(as_rows(&array).len(), 2);
        let object = json!({"a":1});
        assert_eq!(as_rows(&object).len(), 1);
        assert!(as_rows(&json!("scalar")).is_empty());
    }

    #[test]
    fn eq_param_requires_eq_prefix() {
        let mut params = HashMap::new();
        params.insert("user_id".to_string(), "eq.u1".to_string());
        params.insert("order".to_string(), "created_at.desc".to_string());
        assert_eq!(eq_param(&params, "user_id").as_deref(), Some("u1"));
        assert_eq!(eq_param(&params, "order"), None);
        assert_eq!(eq_param(&params, "item_name"), None);
    }

    #[test]
    fn timestamps_sort_with_insertion_order() {
        assert!(timestamp(2) > timestamp(1));
        assert!(timestamp(100) > timestamp(99));
    }
}
