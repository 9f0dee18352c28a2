//! The restart webhook.
//!
//! Authentication happens in [`require_bearer`] before this handler runs. The
//! handler reads the body, decodes the restart request, runs the restart and
//! answers with a single response: success text, or the error's status code.
//!
//! [`require_bearer`]: crate::middleware::require_bearer

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
};

use crate::error::AppError;
use crate::restart::RestartRequest;
use crate::state::AppState;

/// Confirmation text echoing the restarted Deployment.
pub fn restarted_message(request: &RestartRequest) -> String {
    format!(
        "Received namespace: {}, deployment name: {}. Deployment restarted",
        request.namespace, request.deployment_name
    )
}

/// `POST /`: restart the Deployment named in the JSON body.
pub async fn restart(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<String, AppError> {
    let body = body.map_err(|e| AppError::UnreadableBody(e.body_text()))?;
    // A `null` body decodes to empty names, same as an empty object.
    let request: RestartRequest =
        serde_json::from_slice::<Option<RestartRequest>>(&body)?.unwrap_or_default();

    tracing::info!(
        namespace = %request.namespace,
        deployment = %request.deployment_name,
        "Restart requested"
    );

    state.restarter.restart(&request).await?;

    Ok(restarted_message(&request))
}

/// Any method other than POST on `/`.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
