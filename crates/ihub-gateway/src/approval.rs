//! Approval decision and submission.
//!
//! [`decide`] settles whether a request is diverted into the approval
//! workflow. Only endpoints on one of the approvable allow-lists reach the
//! authority resolver, and only on the gateway local to the traffic.
//! [`submit`] replays a diverted request against its validation resource
//! and records the pending approval.

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method};
use chrono::Utc;
use uuid::Uuid;

use ihub_auth::{ValidationClient, ValidationRequest};
use ihub_core::{ApproverRole, Destination, GroupId, RoleSelector, Runmode};
use ihub_policy::{ApprovalQuery, AuthorityResolver, PolicyTables};
use ihub_store::{ApprovalRecord, ApprovalStatus, PolicyStore};

use crate::context::RequestContext;
use crate::error::{GatewayError, Result};
use crate::forward;
use crate::target::Target;

/// Decide whether the request described by `ctx` needs approval.
///
/// Sets `ctx.need_approve`, and `ctx.approve_role` when the resolver was
/// consulted. `group` is the caller's group, required for endpoints on the
/// group-scoped list.
///
/// # Errors
///
/// Returns `TopologyViolation` for outer-service traffic at an in-cluster
/// gateway, `MissingContext` when the cluster or group is unknown, and the
/// resolver's errors.
pub async fn decide<R>(
    resolver: &R,
    tables: &PolicyTables,
    ctx: &mut RequestContext,
    group: Option<GroupId>,
) -> Result<()>
where
    R: AuthorityResolver + ?Sized,
{
    ctx.need_approve = false;

    if ctx.destination == Destination::Out && ctx.runmode == Runmode::In {
        return Err(GatewayError::TopologyViolation(ctx.module.clone()));
    }

    if !ctx.runmode.is_local(ctx.destination) {
        tracing::debug!(
            trace_id = %ctx.trace_id,
            module = %ctx.module,
            "Passing through to in-cluster gateway"
        );
        return Ok(());
    }

    let Some(role) = tables.approver_for(&ctx.module, &ctx.endpoint) else {
        return Ok(());
    };

    let cluster_id = ctx.cluster_id().ok_or(GatewayError::MissingContext("cluster"))?;
    let selector = match role {
        ApproverRole::ClusterAdmin => RoleSelector::ClusterAdmin,
        ApproverRole::GroupAdmin => {
            RoleSelector::Group(group.ok_or(GatewayError::MissingContext("group id"))?)
        }
    };

    let query = ApprovalQuery {
        cluster_id,
        module: ctx.module.clone(),
        endpoint: ctx.endpoint.clone(),
        selector,
    };
    ctx.need_approve = resolver.needs_approval(tables, &query).await?;
    ctx.approve_role = Some(selector.approver_role());

    tracing::info!(
        trace_id = %ctx.trace_id,
        cluster = %cluster_id,
        module = %ctx.module,
        endpoint = %ctx.endpoint,
        role = ?role,
        need_approve = ctx.need_approve,
        "Approval decided"
    );
    Ok(())
}

/// A request held back for approval.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    /// Request method.
    pub method: Method,
    /// Request headers, as they would be forwarded.
    pub headers: HeaderMap,
    /// Raw query string.
    pub query: Option<String>,
    /// Buffered request body.
    pub body: Bytes,
}

/// Validate a diverted request and record it as pending approval.
///
/// Returns the id of the new approval record.
///
/// # Errors
///
/// Returns `MissingContext` if `ctx` was not decided for approval,
/// `ApprovalRejected`/`IncompleteApprovalResponse`/`UpstreamUnavailable`
/// for validation failures and `PolicyStoreUnavailable` if the record
/// cannot be written.
pub async fn submit<S, V>(
    store: &S,
    validator: &V,
    tables: &PolicyTables,
    ctx: &RequestContext,
    target: &Target,
    request: InterceptedRequest,
) -> Result<Uuid>
where
    S: PolicyStore + ?Sized,
    V: ValidationClient + ?Sized,
{
    let cluster_id = ctx.cluster_id().ok_or(GatewayError::MissingContext("cluster"))?;
    let approve_role = ctx
        .approve_role
        .ok_or(GatewayError::MissingContext("approve role"))?;

    let mut headers = forward::outbound_headers(&request.headers);
    headers.remove(header::CONTENT_LENGTH);

    let grant = validator
        .validate(ValidationRequest {
            url: target.validation_url(&ctx.module, &ctx.endpoint),
            method: request.method.clone(),
            headers,
            body: request.body.to_vec(),
        })
        .await?;

    let record = ApprovalRecord {
        record_id: Uuid::new_v4(),
        resource_info: grant.resource_info.to_string(),
        resource_detail: grant.detail.to_string(),
        headers: grant.user_info().to_string(),
        request_body: String::from_utf8_lossy(&request.body).into_owned(),
        user_id: grant.user_id,
        user_role: grant.user_role,
        group_id: grant.group_id,
        approve_type: grant.approve_type,
        module_name: tables.module_name(&ctx.module).to_string(),
        operate_name: tables.operate_name(&ctx.endpoint).to_string(),
        url: target.url_with_query(request.query.as_deref()),
        method: request.method.to_string(),
        cluster_id,
        approve_role,
        status: ApprovalStatus::Approving,
        create_time: Utc::now(),
    };

    let record_id = store.insert_approval_record(&record)?;
    tracing::info!(
        trace_id = %ctx.trace_id,
        record_id = %record_id,
        cluster = %cluster_id,
        module = %record.module_name,
        operate = %record.operate_name,
        "Approval record created"
    );
    Ok(record_id)
}
