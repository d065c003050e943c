use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{AddressIds, ResolvedAddress};

// ─── Employee ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Employee {
    pub id: Uuid,
    /// Human-facing employee ID printed on the card, unique per company name
    pub employee_code: String,
    /// Card / PIN enrolled on the biometric devices, unique per company name
    pub proximity: Option<String>,
    pub company_name: Option<String>,

    // Placement
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub designation_id: Option<Uuid>,
    pub line_id: Option<Uuid>,
    pub shift_id: Option<Uuid>,
    pub employee_type: Option<String>,
    pub grade: Option<String>,
    #[schema(value_type = String, format = "date")]
    pub joining_date: NaiveDate,

    // Identity
    pub name: String,
    pub name_bangla: Option<String>,
    pub father_name: Option<String>,
    pub father_name_bangla: Option<String>,
    pub mother_name: Option<String>,
    pub mother_name_bangla: Option<String>,
    pub spouse_name: Option<String>,
    #[schema(value_type = Option<String>, format = "date")]
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub religion: Option<String>,
    pub marital_status: Option<String>,
    pub blood_group: Option<String>,
    pub nid: Option<String>,
    pub birth_certificate: Option<String>,
    pub nationality: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,

    // Salary
    pub gross_salary: Decimal,
    pub basic_salary: Decimal,
    pub house_rent: Decimal,
    pub medical_allowance: Decimal,
    pub food_allowance: Decimal,
    pub conveyance: Decimal,
    pub attendance_bonus: Decimal,
    pub ot_eligible: bool,

    // Payment
    pub payment_mode: Option<String>,
    pub bank_name: Option<String>,
    pub bank_branch: Option<String>,
    pub bank_account_number: Option<String>,

    // Emergency contact
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relation: Option<String>,

    // Addresses
    pub present_country_id: Option<Uuid>,
    pub present_division_id: Option<Uuid>,
    pub present_district_id: Option<Uuid>,
    pub present_thana_id: Option<Uuid>,
    pub present_post_office_id: Option<Uuid>,
    pub present_village: Option<String>,
    pub permanent_country_id: Option<Uuid>,
    pub permanent_division_id: Option<Uuid>,
    pub permanent_district_id: Option<Uuid>,
    pub permanent_thana_id: Option<Uuid>,
    pub permanent_post_office_id: Option<Uuid>,
    pub permanent_village: Option<String>,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn present_address_ids(&self) -> AddressIds {
        AddressIds {
            country_id: self.present_country_id,
            division_id: self.present_division_id,
            district_id: self.present_district_id,
            thana_id: self.present_thana_id,
            post_office_id: self.present_post_office_id,
        }
    }

    pub fn permanent_address_ids(&self) -> AddressIds {
        AddressIds {
            country_id: self.permanent_country_id,
            division_id: self.permanent_division_id,
            district_id: self.permanent_district_id,
            thana_id: self.permanent_thana_id,
            post_office_id: self.permanent_post_office_id,
        }
    }
}

/// Create / full-update payload. Salary components left out are derived from
/// `gross_salary` with the standard wage structure.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EmployeeRequest {
    pub employee_code: String,
    pub proximity: Option<String>,
    pub company_name: Option<String>,

    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub designation_id: Option<Uuid>,
    pub line_id: Option<Uuid>,
    pub shift_id: Option<Uuid>,
    pub employee_type: Option<String>,
    pub grade: Option<String>,
    #[schema(value_type = String, format = "date", example = "2024-01-01")]
    pub joining_date: NaiveDate,

    pub name: String,
    pub name_bangla: Option<String>,
    pub father_name: Option<String>,
    pub father_name_bangla: Option<String>,
    pub mother_name: Option<String>,
    pub mother_name_bangla: Option<String>,
    pub spouse_name: Option<String>,
    #[schema(value_type = Option<String>, format = "date")]
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub religion: Option<String>,
    pub marital_status: Option<String>,
    pub blood_group: Option<String>,
    pub nid: Option<String>,
    pub birth_certificate: Option<String>,
    pub nationality: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,

    pub gross_salary: Decimal,
    pub basic_salary: Option<Decimal>,
    pub house_rent: Option<Decimal>,
    pub medical_allowance: Option<Decimal>,
    pub food_allowance: Option<Decimal>,
    pub conveyance: Option<Decimal>,
    pub attendance_bonus: Option<Decimal>,
    pub ot_eligible: Option<bool>,

    pub payment_mode: Option<String>,
    pub bank_name: Option<String>,
    pub bank_branch: Option<String>,
    pub bank_account_number: Option<String>,

    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relation: Option<String>,

    pub present_country_id: Option<Uuid>,
    pub present_division_id: Option<Uuid>,
    pub present_district_id: Option<Uuid>,
    pub present_thana_id: Option<Uuid>,
    pub present_post_office_id: Option<Uuid>,
    pub present_village: Option<String>,
    pub permanent_country_id: Option<Uuid>,
    pub permanent_division_id: Option<Uuid>,
    pub permanent_district_id: Option<Uuid>,
    pub permanent_thana_id: Option<Uuid>,
    pub permanent_post_office_id: Option<Uuid>,
    pub permanent_village: Option<String>,

    /// Defaults to true on create and keeps the stored value on update
    pub is_active: Option<bool>,
}

impl EmployeeRequest {
    pub fn present_address_ids(&self) -> AddressIds {
        AddressIds {
            country_id: self.present_country_id,
            division_id: self.present_division_id,
            district_id: self.present_district_id,
            thana_id: self.present_thana_id,
            post_office_id: self.present_post_office_id,
        }
    }

    pub fn permanent_address_ids(&self) -> AddressIds {
        AddressIds {
            country_id: self.permanent_country_id,
            division_id: self.permanent_division_id,
            district_id: self.permanent_district_id,
            thana_id: self.permanent_thana_id,
            post_office_id: self.permanent_post_office_id,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkEmployeeRequest {
    pub employees: Vec<EmployeeRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkImportResponse {
    pub inserted: usize,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct EmployeeFilter {
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub line_id: Option<Uuid>,
    pub is_active: Option<bool>,
    /// Matches employee code, proximity or name (case-insensitive)
    pub search: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeeAddresses {
    pub present: ResolvedAddress,
    pub permanent: ResolvedAddress,
}

// ─── Salary structure ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SalaryStructure {
    pub gross_salary: Decimal,
    pub basic_salary: Decimal,
    pub house_rent: Decimal,
    pub medical_allowance: Decimal,
    pub food_allowance: Decimal,
    pub conveyance: Decimal,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SalaryStructureQuery {
    pub gross: Decimal,
}
