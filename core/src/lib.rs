//! Synchronous client core for the hosted auth + inventory backend.
//!
//! # Overview
//! Talks HTTPS/JSON to the backend (password-grant and refresh-grant auth,
//! filtered REST tables) while tolerating column-name drift in the remote
//! schema and managing the short-lived credential lifecycle. Presentation is
//! someone else's job: callers pass plain values in and render outcomes.
//!
//! # Design
//! - `SupabaseClient` is stateless per call; requests and responses are plain
//!   data executed through the `HttpTransport` seam, so every operation is
//!   testable with scripted responses and runs for real over `UreqTransport`.
//! - Response bodies are read with the scanner in `json`, not a full parser —
//!   the backend's bodies are flat or lightly nested and only a handful of
//!   known scalar fields matter.
//! - Write and read operations walk declarative fallback chains to survive
//!   remote tables whose optional columns are absent or renamed.
//! - The only long-lived state is the persisted session record behind
//!   `SessionStore`, replaced wholesale after every successful auth exchange.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod json;
pub mod session;
pub mod store;
pub mod types;

pub use client::SupabaseClient;
pub use config::Config;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError, UreqTransport};
pub use session::{parse_session, Session};
pub use store::SessionStore;
pub use types::{ActionLogRecord, InventoryRecord, ItemPatch, NewItem, Registration};
