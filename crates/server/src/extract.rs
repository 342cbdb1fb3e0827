// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Request extractors.
//!
//! Callers identify themselves with headers. Authentication happens in
//! front of this service; the headers only attribute audited changes.
//!
//! | Header | Meaning | Default |
//! |---|---|---|
//! | `X-Actor-Id` | who made the change | required |
//! | `X-Actor-Type` | kind of actor | `operator` |
//! | `X-Request-Id` | correlation id stored as the audit cause | `unassigned` |

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use parkops_audit::{Actor, Cause};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::HttpError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_TYPE_HEADER: &str = "x-actor-type";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const DEFAULT_ACTOR_TYPE: &str = "operator";
const DEFAULT_REQUEST_ID: &str = "unassigned";

/// The actor and cause attributed to an audited request.
///
/// The cause description is the request line, e.g. `POST /sessions/4/close`.
pub struct RequestActor(pub Actor, pub Cause);

fn header_value(parts: &Parts, name: &str) -> Result<Option<String>, HttpError> {
    let Some(raw) = parts.headers.get(name) else {
        return Ok(None);
    };
    let value: &str = raw.to_str().map_err(|_| {
        warn!(header = name, "Header is not valid ASCII");
        HttpError::bad_request(format!("Header '{name}' must be ASCII text"))
    })?;
    let trimmed: &str = value.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

impl<S> FromRequestParts<S> for RequestActor
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor_id: String = header_value(parts, ACTOR_ID_HEADER)?.ok_or_else(|| {
            debug!("Missing actor header");
            HttpError::bad_request(format!("Header '{ACTOR_ID_HEADER}' is required"))
        })?;
        let actor_type: String = header_value(parts, ACTOR_TYPE_HEADER)?
            .unwrap_or_else(|| String::from(DEFAULT_ACTOR_TYPE));
        let request_id: String = header_value(parts, REQUEST_ID_HEADER)?
            .unwrap_or_else(|| String::from(DEFAULT_REQUEST_ID));
        let description: String = format!("{} {}", parts.method, parts.uri.path());

        Ok(Self(
            Actor::new(actor_id, actor_type),
            Cause::new(request_id, description),
        ))
    }
}

/// JSON body extractor whose rejections use the error body of this service.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| HttpError::bad_request(rejection.body_text()))?;
        Ok(Self(value))
    }
}
