//! Signed session tokens carried in the `awesession` cookie.
//!
//! A token is `{user_id}-{expires}-{signature}` where `expires` is epoch
//! seconds and `signature` is the SHA-1 hex digest of
//! `{user_id}-{passwd}-{expires}-{secret}`. Nothing is stored server side:
//! the signature binds the token to the user's current password digest and
//! the server secret, so changing either invalidates every outstanding token.
//! Tokens are authenticated, not encrypted, and carry no profile data.

use chrono::Utc;
use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::db::{models::User, Store, StoreError};

pub const COOKIE_NAME: &str = "awesession";

/// Lifetime of a login or registration cookie.
pub const SESSION_MAX_AGE_SECS: i64 = 86400;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("empty token")]
    Empty,
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("unknown user")]
    UnknownUser,
    #[error("signature mismatch")]
    BadSignature,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Lowercase hex SHA-1 of `input`.
pub fn sha1_hex(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn signature(user_id: &str, passwd: &str, expires: i64, secret: &str) -> String {
    sha1_hex(&format!("{user_id}-{passwd}-{expires}-{secret}"))
}

/// Token for `user` valid for `max_age` seconds from now. `user.passwd`
/// must be the stored digest, not the masked placeholder.
pub fn encode(user: &User, max_age: i64, secret: &str) -> String {
    encode_until(user, Utc::now().timestamp() + max_age, secret)
}

pub fn encode_until(user: &User, expires: i64, secret: &str) -> String {
    format!(
        "{}-{}-{}",
        user.id,
        expires,
        signature(&user.id, &user.passwd, expires, secret)
    )
}

/// The three fields of a token, before any verification.
#[derive(Debug, PartialEq, Eq)]
struct Parts<'a> {
    user_id: &'a str,
    expires: i64,
    signature: &'a str,
}

fn split(token: &str) -> Result<Parts<'_>, SessionError> {
    if token.is_empty() {
        return Err(SessionError::Empty);
    }
    let fields: Vec<&str> = token.split('-').collect();
    let &[user_id, expires, signature] = fields.as_slice() else {
        return Err(SessionError::Malformed);
    };
    let expires = expires.parse().map_err(|_| SessionError::Malformed)?;
    Ok(Parts {
        user_id,
        expires,
        signature,
    })
}

/// Verifies `token` and loads its user, password masked.
pub async fn verify(token: &str, store: &dyn Store, secret: &str) -> Result<User, SessionError> {
    let parts = split(token)?;

    if parts.expires < Utc::now().timestamp() {
        return Err(SessionError::Expired);
    }

    let user = store
        .find_user(parts.user_id)
        .await?
        .ok_or(SessionError::UnknownUser)?;

    if signature(parts.user_id, &user.passwd, parts.expires, secret) != parts.signature {
        return Err(SessionError::BadSignature);
    }

    Ok(user.masked())
}

/// Resolves a cookie value to its user. Every failure means "anonymous".
pub async fn decode(token: &str, store: &dyn Store, secret: &str) -> Option<User> {
    match verify(token, store, secret).await {
        Ok(user) => Some(user),
        Err(SessionError::BadSignature) => {
            tracing::info!("invalid session signature");
            None
        }
        Err(SessionError::Store(e)) => {
            tracing::error!(error = %e, "session lookup failed");
            None
        }
        Err(e) => {
            tracing::debug!(reason = %e, "session rejected");
            None
        }
    }
}
