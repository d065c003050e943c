// src/models/mod.rs

mod attendance;
mod auth;
mod cashbook;
mod employee;
mod geography;
mod leave;
mod lifecycle;
mod organization;
mod payroll;
mod production;
mod report;

pub use attendance::*;
pub use auth::*;
pub use cashbook::*;
pub use employee::*;
pub use geography::*;
pub use leave::*;
pub use lifecycle::*;
pub use organization::*;
pub use payroll::*;
pub use production::*;
pub use report::*;

use serde::Serialize;
use utoipa::ToSchema;

/// Body returned by deletes and other operations without a natural resource
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
