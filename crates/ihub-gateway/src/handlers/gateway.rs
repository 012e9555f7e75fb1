//! Gateway pipeline endpoint.
//!
//! `ANY /{module}/{endpoint...}` runs the request through the pipeline:
//!
//! ```text
//! trace ─▶ identity ─▶ classify ─▶ decide ─▶ build target ─┬─▶ submit (202)
//!                                                            └─▶ forward
//! ```
//!
//! Any stage failing answers with the error envelope and stops the pipeline.
//! The whole pipeline runs under the configured request deadline.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use ihub_auth::{AuthError, CallerIdentity, IdentityClient, ValidationClient, AUTH_INFO_HEADER};
use ihub_core::{GroupId, TraceId};
use ihub_store::PolicyStore;

use crate::approval::{self, InterceptedRequest};
use crate::classify::{self, RouteRequest, CLUSTER_NAME_QUERY};
use crate::context::RequestContext;
use crate::error::{Envelope, GatewayError, Result};
use crate::forward;
use crate::state::GatewayState;
use crate::target::UrlBuilder;

/// Header carrying the request's trace id.
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Header carrying the caller's group id.
pub const GROUP_ID_HEADER: &str = "x-group-id";

/// Run a request through the gateway pipeline.
///
/// # Errors
///
/// Returns the error of the first stage that fails.
pub async fn proxy<S, V>(
    State(state): State<Arc<GatewayState<S, V>>>,
    path: std::result::Result<Path<(String, String)>, PathRejection>,
    query: std::result::Result<Query<HashMap<String, String>>, QueryRejection>,
    request: Request,
) -> Result<Response>
where
    S: PolicyStore + 'static,
    V: ValidationClient + 'static,
{
    let Path((module, endpoint)) =
        path.map_err(|rejection| GatewayError::InvalidRequest(rejection.body_text()))?;
    let Query(params) =
        query.map_err(|rejection| GatewayError::InvalidRequest(rejection.body_text()))?;

    let deadline = state.config.request_timeout();
    tokio::time::timeout(deadline, pipeline(&state, module, endpoint, &params, request))
        .await
        .map_err(|_| {
            tracing::warn!(timeout_secs = deadline.as_secs(), "Request deadline exceeded");
            GatewayError::RequestTimeout(deadline.as_secs())
        })?
}

async fn pipeline<S, V>(
    state: &GatewayState<S, V>,
    module: String,
    endpoint: String,
    params: &HashMap<String, String>,
    request: Request,
) -> Result<Response>
where
    S: PolicyStore + 'static,
    V: ValidationClient + 'static,
{
    let (parts, body) = request.into_parts();
    let mut headers = parts.headers;
    let tables = state.tables.snapshot();

    let trace_id = trace_id(&headers);
    headers.insert(TRACE_ID_HEADER, header_value(trace_id.as_str())?);

    let endpoint = tables.transform_endpoint(&endpoint).to_string();

    let identity = match &state.identity {
        Some(client) => Some(identify(client, &mut headers).await?),
        None => None,
    };

    let classification = classify::classify(
        state.store.as_ref(),
        &tables,
        &RouteRequest {
            module: &module,
            headers: &headers,
            cluster_name_query: params.get(CLUSTER_NAME_QUERY).map(String::as_str),
        },
    )?;

    let mut ctx = RequestContext::new(
        trace_id,
        state.config.runmode,
        classification,
        module,
        endpoint,
    );
    tracing::info!(
        trace_id = %ctx.trace_id,
        destination = %ctx.destination,
        cluster = ctx.cluster.as_ref().map_or("", |c| c.name.as_str()),
        module = %ctx.module,
        endpoint = %ctx.endpoint,
        "Request classified"
    );

    let group = caller_group(&headers, identity.as_ref());
    approval::decide(&state.resolver, &tables, &mut ctx, group).await?;

    let target = UrlBuilder::new(&tables, state.config.cluster_port).build(
        ctx.destination,
        ctx.cluster_domain(),
        &ctx.module,
        &ctx.endpoint,
        ctx.runmode,
    )?;

    if ctx.need_approve {
        let body = axum::body::to_bytes(body, state.config.max_body_bytes)
            .await
            .map_err(|e| {
                if forward::exceeds_body_limit(&e) {
                    GatewayError::PayloadTooLarge
                } else {
                    GatewayError::Internal(format!("failed to read request body: {e}"))
                }
            })?;

        let record_id = approval::submit(
            state.store.as_ref(),
            state.validator.as_ref(),
            &tables,
            &ctx,
            &target,
            InterceptedRequest {
                method: parts.method,
                headers,
                query: parts.uri.query().map(ToString::to_string),
                body,
            },
        )
        .await?;

        return Ok((
            StatusCode::ACCEPTED,
            Json(Envelope::ok("approval pending", record_id.to_string())),
        )
            .into_response());
    }

    let url = target.url_with_query(parts.uri.query());
    tracing::debug!(trace_id = %ctx.trace_id, url = %url, "Forwarding request");
    forward::forward(&state.http, parts.method, &url, &headers, body).await
}

/// Fallback for paths that do not name a module and an endpoint.
pub async fn not_found() -> GatewayError {
    GatewayError::RouteNotFound
}

/// Trace id from `X-Trace-ID`, or a fresh one.
fn trace_id(headers: &HeaderMap) -> TraceId {
    headers
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(TraceId::generate)
}

/// Caller's group: `X-Group-ID`, else the identity service's answer.
fn caller_group(headers: &HeaderMap, identity: Option<&CallerIdentity>) -> Option<GroupId> {
    headers
        .get(GROUP_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .or_else(|| identity.and_then(CallerIdentity::group))
}

/// Authenticate the caller and attach `X-Auth-Info` to the forwarded headers.
async fn identify(client: &IdentityClient, headers: &mut HeaderMap) -> Result<CallerIdentity> {
    let identity = client
        .identify(forward::outbound_headers(headers))
        .await
        .map_err(|e| match e {
            AuthError::IdentityRejected(status) => GatewayError::IdentityRejected(status),
            other => {
                tracing::error!(
                    error = %other,
                    retriable = other.is_retriable(),
                    "Identity service failed"
                );
                GatewayError::UpstreamUnavailable(other.to_string())
            }
        })?;

    headers.insert(AUTH_INFO_HEADER, header_value(&identity.encoded())?);
    Ok(identity)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| GatewayError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_id_is_taken_or_generated() {
        let mut headers = HeaderMap::new();
        headers.insert(TRACE_ID_HEADER, HeaderValue::from_static("abc-123"));
        assert_eq!(trace_id(&headers).as_str(), "abc-123");

        let generated = trace_id(&HeaderMap::new());
        assert!(!generated.as_str().is_empty());
        assert_ne!(generated, trace_id(&HeaderMap::new()));
    }

    #[test]
    fn group_header_wins_over_identity() {
        let identity = CallerIdentity {
            account: "ann".into(),
            group_id: "12".into(),
            group_name: "ops".into(),
            role_type: 1,
            user_id: "u-7".into(),
            user_type: 2,
        };

        let mut headers = HeaderMap::new();
        assert_eq!(caller_group(&headers, Some(&identity)), Some(GroupId::new(12)));

        headers.insert(GROUP_ID_HEADER, HeaderValue::from_static("30"));
        assert_eq!(caller_group(&headers, Some(&identity)), Some(GroupId::new(30)));

        assert_eq!(caller_group(&HeaderMap::new(), None), None);
    }
}
