use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// ─── Company ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub name_bangla: Option<String>,
    pub address: Option<String>,
    pub address_bangla: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompanyRequest {
    pub name: String,
    pub name_bangla: Option<String>,
    pub address: Option<String>,
    pub address_bangla: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

// ─── Hierarchy units ──────────────────────────────────────────────────────────

/// A bilingual named row hanging off a single parent: departments, sections
/// and every level of the address hierarchy share this shape.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct NamedUnit {
    pub id: Uuid,
    /// Company for departments, department for sections, country for
    /// divisions and so on. `None` only for countries.
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub name_bangla: Option<String>,
    pub code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NamedUnitRequest {
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub name_bangla: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ParentFilter {
    /// Only rows under this parent
    pub parent_id: Option<Uuid>,
}

// ─── Designation & Line ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Designation {
    pub id: Uuid,
    pub section_id: Uuid,
    /// Denormalized for reporting; optional override of the section's company
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub name: String,
    pub name_bangla: Option<String>,
    pub grade: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DesignationRequest {
    pub section_id: Uuid,
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub name: String,
    pub name_bangla: Option<String>,
    pub grade: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Line {
    pub id: Uuid,
    pub section_id: Uuid,
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub name: String,
    pub name_bangla: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LineRequest {
    pub section_id: Uuid,
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub name: String,
    pub name_bangla: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SectionFilter {
    pub section_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
}
