use axum::http::{header, HeaderMap, StatusCode};
use sha2::{Digest, Sha256};

use crate::error::{api_error, ApiError};

/// Caller privilege. Admin can do everything staff can.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Staff,
    Admin,
}

/// Configured bearer tokens, kept only as SHA-256 digests.
pub struct AccessTokens {
    admin: [u8; 32],
    staff: Option<[u8; 32]>,
}

fn digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

impl AccessTokens {
    pub fn new(admin_token: &str, staff_token: Option<&str>) -> Self {
        Self {
            admin: digest(admin_token),
            staff: staff_token.map(digest),
        }
    }

    pub fn role_for(&self, token: &str) -> Option<Role> {
        let presented = digest(token);
        if presented == self.admin {
            Some(Role::Admin)
        } else if self.staff == Some(presented) {
            Some(Role::Staff)
        } else {
            None
        }
    }

    /// Resolves the `Authorization: Bearer <token>` header and checks it
    /// grants at least `needed`.
    pub fn require(&self, headers: &HeaderMap, needed: Role) -> Result<Role, ApiError> {
        let token = bearer_token(headers).ok_or_else(|| {
            api_error(StatusCode::UNAUTHORIZED, "Missing Authorization header")
        })?;
        let role = self
            .role_for(token)
            .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Invalid access token"))?;
        if role < needed {
            return Err(api_error(StatusCode::FORBIDDEN, "Access denied"));
        }
        Ok(role)
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
