use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::NamedUnit;

/// Present or permanent address resolved through the geography tables
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ResolvedAddress {
    pub country: Option<NamedUnit>,
    pub division: Option<NamedUnit>,
    pub district: Option<NamedUnit>,
    pub thana: Option<NamedUnit>,
    pub post_office: Option<NamedUnit>,
    pub village: Option<String>,
}

/// Geography ids carried by an employee for one address
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressIds {
    pub country_id: Option<Uuid>,
    pub division_id: Option<Uuid>,
    pub district_id: Option<Uuid>,
    pub thana_id: Option<Uuid>,
    pub post_office_id: Option<Uuid>,
}
