use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// ─── Production order ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Production {
    pub id: Uuid,
    pub company_id: Option<Uuid>,
    pub buyer: String,
    pub style_no: String,
    pub order_no: String,
    pub item: Option<String>,
    pub order_quantity: i32,
    /// Standard minute value of one garment
    pub smv: Option<Decimal>,
    #[schema(value_type = Option<String>, format = "date")]
    pub shipment_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ProductionColor {
    pub id: Uuid,
    pub production_id: Uuid,
    pub color: String,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductionDetail {
    #[serde(flatten)]
    pub production: Production,
    pub colors: Vec<ProductionColor>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ColorInput {
    pub color: String,
    pub quantity: i32,
}

/// Create / full-update payload; `colors` replaces the stored breakdown
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductionRequest {
    pub company_id: Option<Uuid>,
    pub buyer: String,
    pub style_no: String,
    pub order_no: String,
    pub item: Option<String>,
    pub order_quantity: i32,
    pub smv: Option<Decimal>,
    #[schema(value_type = Option<String>, format = "date")]
    pub shipment_date: Option<NaiveDate>,
    #[serde(default)]
    pub colors: Vec<ColorInput>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ProductionFilter {
    pub company_id: Option<Uuid>,
    pub buyer: Option<String>,
}

// ─── Line assignment ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ProductionAssignment {
    pub id: Uuid,
    pub production_id: Uuid,
    pub line_id: Uuid,
    pub assigned_quantity: i32,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignmentRequest {
    pub production_id: Uuid,
    pub line_id: Uuid,
    pub assigned_quantity: i32,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AssignmentFilter {
    pub production_id: Option<Uuid>,
    pub line_id: Option<Uuid>,
}

// ─── Hourly output ────────────────────────────────────────────────────────────

pub const PRODUCTION_HOURS: usize = 12;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DailyProductionRecord {
    pub id: Uuid,
    pub assignment_id: Uuid,
    #[schema(value_type = String, format = "date")]
    pub production_date: NaiveDate,
    pub hour1: i32,
    pub hour2: i32,
    pub hour3: i32,
    pub hour4: i32,
    pub hour5: i32,
    pub hour6: i32,
    pub hour7: i32,
    pub hour8: i32,
    pub hour9: i32,
    pub hour10: i32,
    pub hour11: i32,
    pub hour12: i32,
    /// Sum of the twelve hourly buckets
    pub total_completed: i32,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyProductionRecord {
    pub fn hourly(&self) -> [i32; PRODUCTION_HOURS] {
        [
            self.hour1,
            self.hour2,
            self.hour3,
            self.hour4,
            self.hour5,
            self.hour6,
            self.hour7,
            self.hour8,
            self.hour9,
            self.hour10,
            self.hour11,
            self.hour12,
        ]
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DailyProductionRequest {
    pub assignment_id: Uuid,
    #[schema(value_type = String, format = "date")]
    pub production_date: NaiveDate,
    /// Output per working hour, at most twelve entries; missing hours count as zero
    pub hourly: Vec<i32>,
    pub remarks: Option<String>,
}

// ─── Target ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ProductionTarget {
    pub id: Uuid,
    pub assignment_id: Uuid,
    #[schema(value_type = String, format = "date")]
    pub target_date: NaiveDate,
    pub hourly_target: i32,
    pub working_hours: Decimal,
    pub daily_target: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductionTargetRequest {
    pub assignment_id: Uuid,
    #[schema(value_type = String, format = "date")]
    pub target_date: NaiveDate,
    pub hourly_target: i32,
    pub working_hours: Decimal,
    /// Derived from hourly target × working hours when omitted
    pub daily_target: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DailyEfficiency {
    #[schema(value_type = String, format = "date")]
    pub production_date: NaiveDate,
    pub completed: i32,
    pub target: Option<i32>,
    /// completed / target × 100, two decimals
    pub achievement_percent: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentSummary {
    pub assignment_id: Uuid,
    pub assigned_quantity: i32,
    pub total_completed: i64,
    pub remaining: i64,
    pub days: Vec<DailyEfficiency>,
}
