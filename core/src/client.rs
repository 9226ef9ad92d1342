//! Backend client: auth exchanges and schema-tolerant table operations.
//!
//! # Design
//! `SupabaseClient` holds the endpoint, the API key, and a transport; it
//! carries no per-call state. Every operation is a blocking call that
//! performs at most the handful of sequential round-trips of its fallback
//! chain.
//!
//! The remote tables are not guaranteed to carry every column this client
//! knows about (a quantity column may be `quantity` or `qty`; `category` and
//! the item date columns may be missing entirely). Writes and reads therefore
//! walk an ordered chain of candidate shapes, most-complete first, advancing
//! only on the backend's missing-column complaint and re-raising anything
//! else untouched. The chains are const tables so they can be inspected and
//! tested apart from any HTTP traffic; nothing is remembered between calls —
//! every operation starts again at the most-complete shape.

use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, UreqTransport};
use crate::session::{parse_session, Session};
use crate::store::SessionStore;
use crate::types::{ActionLogRecord, InventoryRecord, ItemPatch, NewItem, Registration};

/// One candidate write shape: which optional columns are included and which
/// name the quantity column is written under.
#[derive(Debug, Clone, Copy)]
struct WriteShape {
    category: bool,
    dates: bool,
    quantity_column: &'static str,
}

/// Shared ordering for the insert and update chains, most-complete first.
/// For inserts `dates` covers `date_added` + `date_updated`; for updates it
/// covers `date_updated` alone.
const WRITE_SHAPES: [WriteShape; 6] = [
    WriteShape { category: true, dates: true, quantity_column: "quantity" },
    WriteShape { category: true, dates: true, quantity_column: "qty" },
    WriteShape { category: false, dates: true, quantity_column: "quantity" },
    WriteShape { category: false, dates: true, quantity_column: "qty" },
    WriteShape { category: false, dates: false, quantity_column: "quantity" },
    WriteShape { category: false, dates: false, quantity_column: "qty" },
];

/// One candidate column list for the inventory read.
struct SelectAttempt {
    columns: &'static [&'static str],
    /// Missing-column complaints that advance to the next attempt; empty
    /// means any failure propagates.
    recover_on: &'static [&'static str],
}

const INVENTORY_SELECTS: [SelectAttempt; 3] = [
    SelectAttempt {
        columns: &[
            "item_name",
            "category",
            "quantity",
            "price",
            "date_added",
            "date_updated",
            "created_at",
            "updated_at",
        ],
        recover_on: &["category", "date_added", "date_updated"],
    },
    SelectAttempt {
        columns: &["item_name", "quantity", "price", "created_at", "updated_at"],
        recover_on: &["quantity"],
    },
    SelectAttempt {
        columns: &["item_name", "qty", "price", "created_at", "updated_at"],
        recover_on: &[],
    },
];

const ACTION_LOG_SELECT: &str = "action_type,details,created_at";

/// Blocking client for the hosted auth + data backend.
pub struct SupabaseClient {
    base_url: String,
    api_key: String,
    transport: Box<dyn HttpTransport>,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Client over the production transport. Fails when `api_key` is blank —
    /// an unconfigured endpoint must not be called.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ApiError> {
        Self::with_transport(base_url, api_key, Box::new(UreqTransport::new()))
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(&config.base_url, &config.api_key)
    }

    /// Client over a caller-supplied transport; used by tests to script
    /// responses.
    pub fn with_transport(
        base_url: &str,
        api_key: &str,
        transport: Box<dyn HttpTransport>,
    ) -> Result<Self, ApiError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ApiError::Validation(
                "backend API key is not configured".to_string(),
            ));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            transport,
        })
    }

    // --- auth ---

    pub fn sign_up(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        require_credentials(email, password)?;
        let body = credentials_body(email, password);
        let response = self.send(HttpMethod::Post, "/auth/v1/signup", Some(body), None, false)?;
        parse_session(&response.body, false)
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        require_credentials(email, password)?;
        let body = credentials_body(email, password);
        let response = self.send(
            HttpMethod::Post,
            "/auth/v1/token?grant_type=password",
            Some(body),
            None,
            false,
        )?;
        parse_session(&response.body, true)
    }

    /// Exchange a refresh token for a replacement session.
    pub fn refresh_session(&self, refresh_token: &str) -> Result<Session, ApiError> {
        if refresh_token.trim().is_empty() {
            return Err(ApiError::Validation(
                "refresh token must not be empty".to_string(),
            ));
        }
        let body = object([("refresh_token", Value::from(refresh_token))]);
        let response = self.send(
            HttpMethod::Post,
            "/auth/v1/token?grant_type=refresh_token",
            Some(body.to_string()),
            None,
            false,
        )?;
        parse_session(&response.body, true)
    }

    /// Startup path: refresh the persisted session, if any, and persist the
    /// replacement.
    ///
    /// `Ok(None)` means no usable record was on disk. A failed refresh
    /// propagates and leaves the stale record in place for the caller to
    /// clear or retry. A failed persist of the fresh session is logged but
    /// does not fail the restore — the returned session is valid either way.
    pub fn restore_session(&self, store: &SessionStore) -> Result<Option<Session>, ApiError> {
        let Some(stored) = store.load() else {
            return Ok(None);
        };
        let refreshed = self.refresh_session(&stored.refresh_token)?;
        if let Err(err) = store.save(&refreshed) {
            tracing::warn!("failed to persist refreshed session: {err}");
        }
        Ok(Some(refreshed))
    }

    /// Sign up and, when the backend confirms immediately, create the
    /// profile row under the fresh session. With e-mail verification pending
    /// the unauthenticated session is returned as-is and no profile is
    /// written.
    pub fn register(&self, registration: &Registration) -> Result<Session, ApiError> {
        registration.validate()?;
        let session = self.sign_up(&registration.email, &registration.password)?;
        if !session.is_authenticated() {
            return Ok(session);
        }
        self.upsert_profile(&session, registration)?;
        Ok(session)
    }

    // --- profiles ---

    pub fn upsert_profile(
        &self,
        session: &Session,
        registration: &Registration,
    ) -> Result<(), ApiError> {
        require_authenticated(session)?;
        let row = object([
            ("user_id", Value::from(session.user_id.as_str())),
            ("username", Value::from(registration.username.as_str())),
            ("full_name", Value::from(registration.name.as_str())),
            ("age", Value::from(registration.age)),
            ("address", Value::from(registration.address.as_str())),
            ("email", Value::from(registration.email.as_str())),
            ("phone_number", Value::from(registration.phone.as_str())),
        ]);
        self.send(
            HttpMethod::Post,
            "/rest/v1/profiles?on_conflict=user_id",
            Some(Value::Array(vec![row]).to_string()),
            Some(&session.access_token),
            true,
        )?;
        Ok(())
    }

    // --- inventory ---

    pub fn insert_inventory_item(&self, session: &Session, item: &NewItem) -> Result<(), ApiError> {
        require_authenticated(session)?;
        let payloads = WRITE_SHAPES
            .iter()
            .map(|shape| insert_payload(shape, &session.user_id, item))
            .collect();
        self.write_with_fallback(
            HttpMethod::Post,
            "/rest/v1/inventory".to_string(),
            payloads,
            &session.access_token,
        )
    }

    /// Update the row identified by `original_name`; the patch may carry a
    /// different `item_name`, renaming the row in place.
    pub fn update_inventory_item_by_name(
        &self,
        session: &Session,
        original_name: &str,
        patch: &ItemPatch,
    ) -> Result<(), ApiError> {
        require_authenticated(session)?;
        let path = format!(
            "/rest/v1/inventory?user_id=eq.{}&item_name=eq.{}",
            encode_query_value(&session.user_id),
            encode_query_value(original_name),
        );
        let payloads = WRITE_SHAPES
            .iter()
            .map(|shape| update_payload(shape, patch))
            .collect();
        self.write_with_fallback(HttpMethod::Patch, path, payloads, &session.access_token)
    }

    /// Direct filtered delete; no fallback chain.
    pub fn delete_inventory_item_by_name(
        &self,
        session: &Session,
        item_name: &str,
    ) -> Result<(), ApiError> {
        require_authenticated(session)?;
        let path = format!(
            "/rest/v1/inventory?user_id=eq.{}&item_name=eq.{}",
            encode_query_value(&session.user_id),
            encode_query_value(item_name),
        );
        self.send(HttpMethod::Delete, &path, None, Some(&session.access_token), false)?;
        Ok(())
    }

    /// List the caller's inventory, newest first, degrading the selected
    /// column list until the remote schema accepts it.
    pub fn fetch_inventory(&self, session: &Session) -> Result<Vec<InventoryRecord>, ApiError> {
        require_authenticated(session)?;
        for attempt in &INVENTORY_SELECTS {
            let path = format!(
                "/rest/v1/inventory?select={}&user_id=eq.{}&order=created_at.desc",
                attempt.columns.join(","),
                encode_query_value(&session.user_id),
            );
            match self.send(HttpMethod::Get, &path, None, Some(&session.access_token), false) {
                Ok(response) => return InventoryRecord::parse_rows(&response.body),
                Err(err) if attempt.recover_on.iter().any(|col| err.is_missing_column(col)) => {
                    tracing::debug!("inventory select rejected, narrowing columns: {err}");
                }
                Err(err) => return Err(err),
            }
        }
        // The final attempt has no recoverable columns, so the loop always
        // returns before getting here.
        Err(ApiError::Validation("no select shapes to try".to_string()))
    }

    // --- action log ---

    pub fn log_action(
        &self,
        session: &Session,
        action_type: &str,
        details: &str,
    ) -> Result<(), ApiError> {
        require_authenticated(session)?;
        let row = object([
            ("user_id", Value::from(session.user_id.as_str())),
            ("action_type", Value::from(action_type)),
            ("details", Value::from(details)),
        ]);
        self.send(
            HttpMethod::Post,
            "/rest/v1/action_logs",
            Some(Value::Array(vec![row]).to_string()),
            Some(&session.access_token),
            false,
        )?;
        Ok(())
    }

    pub fn fetch_action_logs(&self, session: &Session) -> Result<Vec<ActionLogRecord>, ApiError> {
        require_authenticated(session)?;
        let path = format!(
            "/rest/v1/action_logs?select={ACTION_LOG_SELECT}&user_id=eq.{}&order=created_at.desc",
            encode_query_value(&session.user_id),
        );
        let response = self.send(HttpMethod::Get, &path, None, Some(&session.access_token), false)?;
        Ok(ActionLogRecord::parse_rows(&response.body))
    }

    // --- plumbing ---

    /// Try each payload in order, advancing only past schema mismatches.
    /// Exhaustion surfaces the last mismatch so the diagnostic names a real
    /// missing column.
    fn write_with_fallback(
        &self,
        method: HttpMethod,
        path: String,
        payloads: Vec<String>,
        bearer: &str,
    ) -> Result<(), ApiError> {
        let mut last_mismatch = None;
        for (attempt, payload) in payloads.into_iter().enumerate() {
            match self.send(method, &path, Some(payload), Some(bearer), false) {
                Ok(_) => return Ok(()),
                Err(err) if err.is_schema_mismatch() => {
                    tracing::debug!(attempt, "payload rejected by remote schema: {err}");
                    last_mismatch = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        match last_mismatch {
            Some(err) => Err(err),
            None => Err(ApiError::Validation("no payload shapes to try".to_string())),
        }
    }

    /// Build, execute, and classify one request. Success is any status in
    /// `[200, 300)`; everything else becomes `ApiError::Request` carrying the
    /// raw body.
    fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<String>,
        bearer: Option<&str>,
        upsert: bool,
    ) -> Result<HttpResponse, ApiError> {
        let mut headers = vec![
            ("apikey".to_string(), self.api_key.clone()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        if let Some(token) = bearer {
            if !token.is_empty() {
                headers.push(("Authorization".to_string(), format!("Bearer {token}")));
            }
        }
        let prefer = if upsert {
            "return=representation,resolution=merge-duplicates"
        } else {
            "return=representation"
        };
        headers.push(("Prefer".to_string(), prefer.to_string()));

        let request = HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers,
            body,
        };
        let response = self
            .transport
            .execute(&request)
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        if !(200..300).contains(&response.status) {
            return Err(ApiError::Request {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }
}

fn require_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "email and password must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn require_authenticated(session: &Session) -> Result<(), ApiError> {
    if !session.is_authenticated() {
        return Err(ApiError::Validation(
            "session is not authenticated".to_string(),
        ));
    }
    Ok(())
}

fn credentials_body(email: &str, password: &str) -> String {
    object([
        ("email", Value::from(email)),
        ("password", Value::from(password)),
    ])
    .to_string()
}

fn object<const N: usize>(fields: [(&str, Value); N]) -> Value {
    let mut map = Map::new();
    for (key, value) in fields {
        map.insert(key.to_string(), value);
    }
    Value::Object(map)
}

/// Single-element array body for an inventory insert under `shape`.
fn insert_payload(shape: &WriteShape, user_id: &str, item: &NewItem) -> String {
    let mut row = Map::new();
    row.insert("user_id".to_string(), Value::from(user_id));
    row.insert("item_name".to_string(), Value::from(item.item_name.as_str()));
    if shape.category {
        row.insert("category".to_string(), Value::from(item.category.as_str()));
    }
    row.insert(shape.quantity_column.to_string(), Value::from(item.quantity));
    row.insert("price".to_string(), Value::from(item.price));
    if shape.dates {
        row.insert("date_added".to_string(), Value::from(item.date_added.as_str()));
        row.insert("date_updated".to_string(), Value::from(item.date_updated.as_str()));
    }
    Value::Array(vec![Value::Object(row)]).to_string()
}

/// Object body for an inventory update under `shape`.
fn update_payload(shape: &WriteShape, patch: &ItemPatch) -> String {
    let mut row = Map::new();
    row.insert("item_name".to_string(), Value::from(patch.item_name.as_str()));
    if shape.category {
        row.insert("category".to_string(), Value::from(patch.category.as_str()));
    }
    row.insert(shape.quantity_column.to_string(), Value::from(patch.quantity));
    row.insert("price".to_string(), Value::from(patch.price));
    if shape.dates {
        row.insert("date_updated".to_string(), Value::from(patch.date_updated.as_str()));
    }
    Value::Object(row).to_string()
}

/// Percent-encode a query value; RFC 3986 unreserved bytes pass through.
fn encode_query_value(value: &str) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}
