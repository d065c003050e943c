// src/handlers/units.rs
//
// Shared storage for the single-parent bilingual tables. The public
// organization and geography handlers are thin wrappers over these.

use crate::{
    errors::{AppError, AppResult},
    models::{MessageResponse, NamedUnit, NamedUnitRequest},
};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Department,
    Section,
    Country,
    Division,
    District,
    Thana,
    PostOffice,
}

impl UnitKind {
    fn table(self) -> &'static str {
        match self {
            UnitKind::Department => "departments",
            UnitKind::Section => "sections",
            UnitKind::Country => "countries",
            UnitKind::Division => "divisions",
            UnitKind::District => "districts",
            UnitKind::Thana => "thanas",
            UnitKind::PostOffice => "post_offices",
        }
    }

    fn parent_column(self) -> Option<&'static str> {
        match self {
            UnitKind::Department => Some("company_id"),
            UnitKind::Section => Some("department_id"),
            UnitKind::Country => None,
            UnitKind::Division => Some("country_id"),
            UnitKind::District => Some("division_id"),
            UnitKind::Thana | UnitKind::PostOffice => Some("district_id"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UnitKind::Department => "Department",
            UnitKind::Section => "Section",
            UnitKind::Country => "Country",
            UnitKind::Division => "Division",
            UnitKind::District => "District",
            UnitKind::Thana => "Thana",
            UnitKind::PostOffice => "Post office",
        }
    }

    fn projection(self) -> String {
        let parent = self.parent_column().unwrap_or("NULL::uuid");
        format!("id, {parent} AS parent_id, name, name_bangla, code, created_at, updated_at")
    }

    /// The parent id to store, rejecting a missing one where the level needs it
    fn parent_of(self, body: &NamedUnitRequest) -> AppResult<Option<Uuid>> {
        match (self.parent_column(), body.parent_id) {
            (None, _) => Ok(None),
            (Some(_), Some(parent)) => Ok(Some(parent)),
            (Some(column), None) => Err(AppError::Validation(format!(
                "{} needs a parent_id ({column})",
                self.label()
            ))),
        }
    }
}

fn validate_name(body: &NamedUnitRequest) -> AppResult<()> {
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    Ok(())
}

pub async fn list_units(
    db: &PgPool,
    kind: UnitKind,
    parent_id: Option<Uuid>,
) -> AppResult<Vec<NamedUnit>> {
    let units = match kind.parent_column() {
        Some(parent) => {
            let sql = format!(
                "SELECT {} FROM {} WHERE ($1::uuid IS NULL OR {parent} = $1) ORDER BY name",
                kind.projection(),
                kind.table()
            );
            sqlx::query_as::<_, NamedUnit>(&sql)
                .bind(parent_id)
                .fetch_all(db)
                .await?
        }
        None => {
            let sql = format!(
                "SELECT {} FROM {} ORDER BY name",
                kind.projection(),
                kind.table()
            );
            sqlx::query_as::<_, NamedUnit>(&sql).fetch_all(db).await?
        }
    };
    Ok(units)
}

pub async fn find_unit(db: &PgPool, kind: UnitKind, id: Uuid) -> AppResult<Option<NamedUnit>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = $1",
        kind.projection(),
        kind.table()
    );
    let unit = sqlx::query_as::<_, NamedUnit>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(unit)
}

pub async fn get_unit(db: &PgPool, kind: UnitKind, id: Uuid) -> AppResult<NamedUnit> {
    find_unit(db, kind, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", kind.label(), id)))
}

pub async fn create_unit(
    db: &PgPool,
    kind: UnitKind,
    body: &NamedUnitRequest,
) -> AppResult<NamedUnit> {
    validate_name(body)?;
    let parent_id = kind.parent_of(body)?;

    let (columns, values) = match kind.parent_column() {
        Some(parent) => (format!("id, {parent}, name, name_bangla, code"), "$1, $2, $3, $4, $5"),
        None => ("id, name, name_bangla, code".to_string(), "$1, $2, $3, $4"),
    };
    let sql = format!(
        r#"INSERT INTO {} ({columns}, created_at, updated_at)
           VALUES ({values}, NOW(), NOW())
           RETURNING {}"#,
        kind.table(),
        kind.projection()
    );

    let mut query = sqlx::query_as::<_, NamedUnit>(&sql).bind(Uuid::new_v4());
    if let Some(parent_id) = parent_id {
        query = query.bind(parent_id);
    }
    let unit = query
        .bind(body.name.trim())
        .bind(body.name_bangla.as_deref())
        .bind(body.code.as_deref())
        .fetch_one(db)
        .await?;
    Ok(unit)
}

pub async fn update_unit(
    db: &PgPool,
    kind: UnitKind,
    id: Uuid,
    body: &NamedUnitRequest,
) -> AppResult<NamedUnit> {
    validate_name(body)?;
    let parent_id = kind.parent_of(body)?;

    let (parent_set, first) = match kind.parent_column() {
        Some(parent) => (format!("{parent} = $2, "), 3),
        None => (String::new(), 2),
    };
    let sql = format!(
        r#"UPDATE {} SET {parent_set}name = ${}, name_bangla = ${}, code = ${}, updated_at = NOW()
           WHERE id = $1
           RETURNING {}"#,
        kind.table(),
        first,
        first + 1,
        first + 2,
        kind.projection()
    );

    let mut query = sqlx::query_as::<_, NamedUnit>(&sql).bind(id);
    if let Some(parent_id) = parent_id {
        query = query.bind(parent_id);
    }
    query
        .bind(body.name.trim())
        .bind(body.name_bangla.as_deref())
        .bind(body.code.as_deref())
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", kind.label(), id)))
}

/// Rows still referenced by children or employees surface as 400 through the
/// foreign-key mapping in `AppError`.
pub async fn delete_unit(db: &PgPool, kind: UnitKind, id: Uuid) -> AppResult<MessageResponse> {
    let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
    let result = sqlx::query(&sql).bind(id).execute(db).await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "{} {} not found",
            kind.label(),
            id
        )));
    }
    Ok(MessageResponse::new(format!("{} deleted", kind.label())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(parent_id: Option<Uuid>) -> NamedUnitRequest {
        NamedUnitRequest {
            parent_id,
            name: "Gazipur".to_string(),
            name_bangla: None,
            code: None,
        }
    }

    #[test]
    fn countries_have_no_parent_column() {
        assert_eq!(
            UnitKind::Country.projection(),
            "id, NULL::uuid AS parent_id, name, name_bangla, code, created_at, updated_at"
        );
        assert!(UnitKind::Thana.projection().contains("district_id AS parent_id"));
        assert_eq!(UnitKind::PostOffice.parent_column(), Some("district_id"));
    }

    #[test]
    fn child_levels_need_a_parent() {
        assert!(matches!(
            UnitKind::District.parent_of(&request(None)),
            Err(AppError::Validation(msg)) if msg.contains("division_id")
        ));
        let parent = Uuid::new_v4();
        assert_eq!(
            UnitKind::District.parent_of(&request(Some(parent))).unwrap(),
            Some(parent)
        );
        // a stray parent on a country is ignored
        assert_eq!(UnitKind::Country.parent_of(&request(Some(parent))).unwrap(), None);
    }
}
