use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
};
use tracing::{debug, info, warn};

use crate::{error::AppError, models::Entry, state::AppState};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn submit(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Result<&'static str, AppError> {
    if method != Method::POST {
        return Err(AppError::invalid_method());
    }

    let Some(entry) = Entry::decode(&body) else {
        debug!("undecodable submission body ({} bytes)", body.len());
        return Err(AppError::malformed_input());
    };

    match state.admission.submit(&entry).await {
        Ok(admission) => {
            info!(
                id = %entry.id,
                user_id = %entry.user_id,
                bytes = entry.payload.len(),
                used = admission.quota.used,
                limit = admission.quota.limit,
                requests = admission.requests_in_window,
                "data processed and quotas updated"
            );
            debug!(id = %entry.id, data = %entry.payload, "submission payload");
            Ok("Data processed successfully")
        }
        Err(err) => {
            warn!(id = %entry.id, user_id = %entry.user_id, "submission rejected: {err}");
            Err(err.into())
        }
    }
}
