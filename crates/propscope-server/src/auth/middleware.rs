use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use propscope_core::config::AuthMode;

use crate::state::AppState;

use super::api_keys::hash_api_key;

/// Auth context injected into request extensions after successful auth.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// `None` when auth is disabled.
    pub api_key_id: Option<String>,
    /// Caller may view every existing website.
    pub all_websites: bool,
}

impl AuthContext {
    pub fn open() -> Self {
        Self {
            api_key_id: None,
            all_websites: true,
        }
    }
}

/// Require a valid Bearer API key (skipped when `PROPSCOPE_AUTH=none`).
///
/// Website-level permission is checked later by the handler, once the
/// website id is known.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if state.config.auth_mode == AuthMode::None {
        request.extensions_mut().insert(AuthContext::open());
        return next.run(request).await;
    }

    let Some(token) = bearer_token(&request) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let key_hash = hash_api_key(&token);
    match state.metadata.lookup_api_key(&key_hash).await {
        Ok(Some(key_record)) => {
            let key_id = key_record.id.clone();
            request.extensions_mut().insert(AuthContext {
                api_key_id: Some(key_record.id),
                all_websites: key_record.all_websites,
            });
            let resp = next.run(request).await;
            // Fire-and-forget: update last_used_at.
            let metadata = Arc::clone(&state.metadata);
            tokio::spawn(async move {
                if let Err(e) = metadata.touch_api_key(&key_id).await {
                    tracing::warn!(error = %e, key_id, "Failed to record API key use");
                }
            });
            resp
        }
        Ok(None) => StatusCode::UNAUTHORIZED.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "API key lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
