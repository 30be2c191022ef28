//! Request extractors.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize};
use tracker_core::ClientContext;

use crate::response::ApiError;

/// JSON body whose rejections render as API validation errors.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|e: JsonRejection| ApiError::bad_request("body", e.body_text()))
    }
}

/// Client IP address.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // First hop of X-Forwarded-For, then X-Real-IP
        let forwarded = parts
            .headers
            .get("X-Forwarded-For")
            .and_then(|h| h.to_str().ok())
            .and_then(|xff| xff.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        let ip = forwarded.or_else(|| {
            parts
                .headers
                .get("X-Real-IP")
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
        });

        Ok(ClientIp(ip.map(String::from)))
    }
}

/// User agent and client IP of the originating request.
#[derive(Debug, Clone)]
pub struct RequestContext(pub ClientContext);

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ClientIp(ip) = ClientIp::from_request_parts(parts, state).await?;
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(String::from);

        Ok(RequestContext(ClientContext::new(user_agent, ip)))
    }
}

/// `?timestamp=` identifying an event together with its id.
#[derive(Debug, Deserialize)]
pub struct TimestampParam {
    pub timestamp: Option<String>,
}

impl TimestampParam {
    pub fn parse(&self) -> Result<DateTime<Utc>, ApiError> {
        let raw = self
            .timestamp
            .as_deref()
            .ok_or_else(|| ApiError::bad_request("timestamp", "query parameter is required"))?;

        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| ApiError::bad_request("timestamp", format!("invalid timestamp: {}", e)))
    }
}

/// `?limit=` for listings.
#[derive(Debug, Deserialize)]
pub struct LimitParam {
    pub limit: Option<String>,
}

impl LimitParam {
    pub fn parse(&self) -> Result<Option<usize>, ApiError> {
        self.limit
            .as_deref()
            .map(|raw| {
                raw.parse::<usize>()
                    .map_err(|_| ApiError::bad_request("limit", format!("invalid limit '{}'", raw)))
            })
            .transpose()
    }
}
