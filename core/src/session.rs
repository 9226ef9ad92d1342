//! Authenticated session value and its derivation from auth responses.

use crate::error::ApiError;
use crate::json;

/// Tokens and identity from one auth exchange.
///
/// Replaced wholesale on refresh, never mutated field-by-field. After a
/// sign-up that still awaits e-mail verification both tokens are empty
/// strings; such a session identifies the user but must not be used against
/// authenticated endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub email: String,
}

impl Session {
    /// Whether this session can call authenticated data endpoints.
    pub fn is_authenticated(&self) -> bool {
        !self.access_token.is_empty() && !self.user_id.is_empty()
    }
}

/// Derive a `Session` from an auth response body.
///
/// `user_id` is always mandatory. Tokens are mandatory when `require_tokens`
/// (sign-in, refresh); for sign-up they may be absent and are coerced to
/// empty strings. The email is taken from the first `email` field in the
/// body, which for auth responses sits inside the nested user object.
pub fn parse_session(body: &str, require_tokens: bool) -> Result<Session, ApiError> {
    let access_token = json::extract_string(body, "access_token");
    let refresh_token = json::extract_string(body, "refresh_token");
    let user_id = json::extract_user_id(body);
    let email = json::extract_string(body, "email");

    let Some(user_id) = user_id else {
        return Err(ApiError::Parse(format!(
            "missing required session fields in response: {body}"
        )));
    };
    if require_tokens && (access_token.is_none() || refresh_token.is_none()) {
        return Err(ApiError::Parse(format!(
            "missing tokens in auth response: {body}"
        )));
    }

    Ok(Session {
        access_token: access_token.unwrap_or_default().to_string(),
        refresh_token: refresh_token.unwrap_or_default().to_string(),
        user_id: user_id.to_string(),
        email: email.unwrap_or_default().to_string(),
    })
}
