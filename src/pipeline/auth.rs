//! Basic-auth authenticator middleware.
//!
//! # Responsibilities
//! - Decode the `Authorization: Basic` header to `username:secret`
//! - Resolve the credential through the cached store
//! - Write exactly one `Credential` into the request context
//!
//! # Design Decisions
//! - A permission shadows a same-named user
//! - An expired permission is treated as absent; if no user backs the name
//!   the caller sees the dedicated expiry error
//! - Secret verification is constant-time (bcrypt / byte compare)

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose;
use base64::Engine as _;

use crate::http::server::AppState;
use crate::model::credential::epoch_secs;
use crate::model::Credential;
use crate::pipeline::PipelineError;

pub async fn basic_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let decoded = decode_basic_header(&req);
    match decoded {
        Ok((username, secret)) => match authenticate(&state, &username, &secret).await {
            Ok(credential) => {
                tracing::debug!(username = credential.username(), "authenticated");
                req.extensions_mut().insert(credential);
                next.run(req).await
            }
            Err(err) => err.into_response(),
        },
        Err(err) => err.into_response(),
    }
}

async fn authenticate(
    state: &AppState,
    username: &str,
    secret: &str,
) -> Result<Credential, PipelineError> {
    let (user, permission) = state
        .inner
        .credentials
        .lookup(&username)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, username = %username, "credential lookup failed");
            PipelineError::StoreUnavailable
        })?;

    let now = epoch_secs();
    let mut permission_expired = false;
    let resolved = match permission {
        Some(p) if !p.is_expired(now) => Some(Credential::Permission(p)),
        Some(_) => {
            permission_expired = true;
            user.map(Credential::User)
        }
        None => user.map(Credential::User),
    };

    let credential = resolved.ok_or(if permission_expired {
        PipelineError::CredentialsExpired
    } else {
        PipelineError::UnknownCredentials
    })?;

    if !credential.verify_secret(&secret) {
        return Err(PipelineError::UnknownCredentials);
    }
    Ok(credential)
}

fn decode_basic_header(req: &Request) -> Result<(String, String), PipelineError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(PipelineError::InvalidAuth)?;

    let encoded = header
        .strip_prefix("Basic ")
        .ok_or(PipelineError::InvalidAuth)?;

    let decoded = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| PipelineError::InvalidAuth)?;
    let decoded = String::from_utf8(decoded).map_err(|_| PipelineError::InvalidAuth)?;

    let (username, secret) = decoded.split_once(':').ok_or(PipelineError::InvalidAuth)?;
    if username.is_empty() {
        return Err(PipelineError::InvalidAuth);
    }
    Ok((username.to_string(), secret.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: &str) -> Request {
        axum::http::Request::builder()
            .uri("/twitter/_search")
            .header(AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_decode_basic_header() {
        // user:pass
        let req = request_with_auth("Basic dXNlcjpwYXNz");
        let (username, secret) = decode_basic_header(&req).unwrap();
        assert_eq!(username, "user");
        assert_eq!(secret, "pass");
    }

    #[test]
    fn test_malformed_headers_rejected() {
        for value in ["Bearer abc", "Basic !!!not-base64!!!", "Basic dXNlcg=="] {
            let req = request_with_auth(value);
            assert!(matches!(
                decode_basic_header(&req),
                Err(PipelineError::InvalidAuth)
            ));
        }

        let no_header = axum::http::Request::builder()
            .uri("/")
            .body(Body::empty())
            .unwrap();
        assert!(matches!(
            decode_basic_header(&no_header),
            Err(PipelineError::InvalidAuth)
        ));
    }
}
