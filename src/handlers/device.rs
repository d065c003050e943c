// src/handlers/device.rs
//
// Endpoints polled by ZKTeco terminals. Devices cannot send bearer tokens,
// so access is limited by serial number instead.

use crate::{
    errors::{AppError, AppResult},
    models::DeviceQuery,
    services::device::{handshake_options, parse_attlog, store_punches},
    state::AppState,
};
use axum::extract::{Query, State};
use tracing::info;

fn check_serial(state: &AppState, serial: &str) -> AppResult<()> {
    if state.config.accepts_device(serial) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("Unknown device {serial}")))
    }
}

/// Device handshake: returns the push options
pub async fn device_handshake(
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
) -> AppResult<String> {
    check_serial(&state, &query.serial)?;
    info!(serial = %query.serial, "device handshake");
    Ok(handshake_options(&query.serial, state.config.device_timezone))
}

/// Device upload. Only ATTLOG tables carry punches; anything else is acknowledged.
pub async fn device_upload(
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
    body: String,
) -> AppResult<String> {
    check_serial(&state, &query.serial)?;

    if !query
        .table
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case("ATTLOG"))
    {
        return Ok("OK".to_string());
    }

    let punches = parse_attlog(&query.serial, &body);
    let company = state.config.device_company(&query.serial);
    let stored = store_punches(&state.db, &punches, company).await?;
    info!(
        serial = %query.serial,
        received = punches.len(),
        stored,
        "device punches uploaded"
    );
    Ok(format!("OK: {}", punches.len()))
}

/// Command poll; no commands are ever queued for devices
pub async fn device_poll() -> &'static str {
    "OK"
}
