//! API route handlers.
//!
//! Each handler turns its request into one bridge intent and waits for the
//! single reply.

use axum::extract::{Path, State};
use axum::Json;
use pacgate_core::{DomainsReport, Intent, Reply, StatusReport};
use tracing::{debug, info};

use crate::error::{ApiError, Result};
use crate::models::{
    AddDomainRequest, AddDomainResponse, DefaultsResponse, RemoveDomainResponse,
    RulesUpdateResponse, SignInRequest,
};
use crate::state::AppState;

fn unexpected(reply: Reply) -> ApiError {
    ApiError::Internal(format!("unexpected bridge reply: {:?}", reply))
}

async fn status_of(state: &AppState, intent: Intent) -> Result<Json<StatusReport>> {
    match state.bridge.send(intent).await? {
        Reply::Status(report) => Ok(Json(report)),
        other => Err(unexpected(other)),
    }
}

/// POST /api/connect - Apply the proxy (subscription permitting).
pub async fn connect(State(state): State<AppState>) -> Result<Json<StatusReport>> {
    info!("Connect requested");
    status_of(&state, Intent::Connect).await
}

/// POST /api/disconnect - Restore direct connections.
pub async fn disconnect(State(state): State<AppState>) -> Result<Json<StatusReport>> {
    info!("Disconnect requested");
    status_of(&state, Intent::Disconnect).await
}

/// POST /api/rules/update - Re-apply the PAC if connected.
pub async fn update_rules(State(state): State<AppState>) -> Result<Json<RulesUpdateResponse>> {
    match state.bridge.send(Intent::UpdateRules).await? {
        Reply::Refreshed(refreshed) => Ok(Json(RulesUpdateResponse { refreshed })),
        other => Err(unexpected(other)),
    }
}

/// GET /api/defaults - The built-in domain list.
pub async fn get_defaults(State(state): State<AppState>) -> Result<Json<DefaultsResponse>> {
    match state.bridge.send(Intent::GetDefaults).await? {
        Reply::Defaults(domains) => Ok(Json(DefaultsResponse { domains })),
        other => Err(unexpected(other)),
    }
}

/// GET /api/domains - Default and custom lists.
pub async fn get_domains(State(state): State<AppState>) -> Result<Json<DomainsReport>> {
    match state.bridge.send(Intent::GetDomains).await? {
        Reply::Domains(report) => Ok(Json(report)),
        other => Err(unexpected(other)),
    }
}

/// POST /api/domains - Add a custom domain.
pub async fn add_domain(
    State(state): State<AppState>,
    Json(req): Json<AddDomainRequest>,
) -> Result<Json<AddDomainResponse>> {
    debug!(input = %req.domain, "Adding domain");
    match state.bridge.send(Intent::AddDomain(req.domain)).await? {
        Reply::Added(domain) => Ok(Json(AddDomainResponse { domain })),
        other => Err(unexpected(other)),
    }
}

/// DELETE /api/domains/{domain} - Remove a custom domain.
pub async fn remove_domain(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<RemoveDomainResponse>> {
    debug!(input = %domain, "Removing domain");
    match state.bridge.send(Intent::RemoveDomain(domain)).await? {
        Reply::Removed(removed) => Ok(Json(RemoveDomainResponse { removed })),
        other => Err(unexpected(other)),
    }
}

/// GET /api/status - Everything the popup renders.
pub async fn get_status(State(state): State<AppState>) -> Result<Json<StatusReport>> {
    status_of(&state, Intent::GetStatus).await
}

/// POST /api/subscription/refresh - Re-check the subscription with the backend.
pub async fn refresh_subscription(State(state): State<AppState>) -> Result<Json<StatusReport>> {
    status_of(&state, Intent::RefreshSubscription).await
}

/// POST /api/session - Sign in against the backend.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<StatusReport>> {
    status_of(
        &state,
        Intent::SignIn {
            email: req.email,
            password: req.password,
        },
    )
    .await
}

/// POST /api/signout - Disconnect and forget the user.
pub async fn sign_out(State(state): State<AppState>) -> Result<Json<StatusReport>> {
    status_of(&state, Intent::SignOut).await
}
