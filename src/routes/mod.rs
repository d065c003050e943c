// src/routes/mod.rs

use crate::{
    handlers::{
        attendance::{
            create_holiday, create_manual_attendance, create_shift, delete_holiday, delete_shift,
            get_shift, import_punches, list_attendance, list_holidays, list_punches, list_rosters,
            list_shifts, plan_roster, process_attendance, update_attendance, update_shift,
        },
        cashbook::{
            approve_fund_transfer, complete_fund_transfer, create_branch, create_fund_transfer,
            create_transaction, delete_transaction, get_branch_balance, get_fund_transfer,
            list_branches, list_fund_transfers, list_opening_balances, list_transactions,
            reject_fund_transfer, upsert_opening_balance,
        },
        device::{device_handshake, device_poll, device_upload},
        employee::{
            bulk_create_employees, create_employee, delete_employee, get_employee,
            get_employee_addresses, list_employees, preview_salary_structure, update_employee,
        },
        general::{health_handler, root_handler},
        geography::{
            create_country, create_district, create_division, create_post_office, create_thana,
            delete_country, delete_district, delete_division, delete_post_office, delete_thana,
            list_countries, list_districts, list_divisions, list_post_offices, list_thanas,
            update_country, update_district, update_division, update_post_office, update_thana,
        },
        leave::{
            approve_leave, cancel_leave, create_leave_application, create_leave_type,
            delete_leave_type, get_leave_application, get_leave_balances, get_leave_type,
            list_leave_applications, list_leave_types, reject_leave, update_leave_type,
        },
        lifecycle::{
            create_separation, create_transfer, list_separations, list_transfers,
            settle_separation,
        },
        organization::{
            create_company, create_department, create_designation, create_line, create_section,
            delete_company, delete_department, delete_designation, delete_line, delete_section,
            get_company, list_companies, list_departments, list_designations, list_lines,
            list_sections, update_company, update_department, update_designation, update_line,
            update_section,
        },
        payroll::{
            create_advance, create_bonus, create_increment, get_payroll_run, list_advances,
            list_bonuses, list_daily_sheets, list_increments, list_monthly_sheets,
            list_payroll_runs, run_daily_payroll, run_monthly_payroll,
        },
        production::{
            assignment_summary, create_assignment, create_production, delete_assignment,
            delete_production, get_assignment, get_production, list_assignments,
            list_daily_records, list_productions, update_production, upsert_daily_record,
            upsert_target,
        },
        report::{attendance_summary, dashboard},
        users::{login, me, register_user},
    },
    openapi::ApiDoc,
    state::AppState,
};
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // ─── Auth ─────────────────────────────────────────────
        .route("/auth/register", post(register_user))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        // ─── Organization ─────────────────────────────────────
        .route("/companies", post(create_company).get(list_companies))
        .route(
            "/companies/{company_id}",
            get(get_company).put(update_company).delete(delete_company),
        )
        .route("/departments", post(create_department).get(list_departments))
        .route(
            "/departments/{id}",
            put(update_department).delete(delete_department),
        )
        .route("/sections", post(create_section).get(list_sections))
        .route("/sections/{id}", put(update_section).delete(delete_section))
        .route(
            "/designations",
            post(create_designation).get(list_designations),
        )
        .route(
            "/designations/{id}",
            put(update_designation).delete(delete_designation),
        )
        .route("/lines", post(create_line).get(list_lines))
        .route("/lines/{id}", put(update_line).delete(delete_line))
        // ─── Geography ────────────────────────────────────────
        .route("/countries", post(create_country).get(list_countries))
        .route("/countries/{id}", put(update_country).delete(delete_country))
        .route("/divisions", post(create_division).get(list_divisions))
        .route(
            "/divisions/{id}",
            put(update_division).delete(delete_division),
        )
        .route("/districts", post(create_district).get(list_districts))
        .route(
            "/districts/{id}",
            put(update_district).delete(delete_district),
        )
        .route("/thanas", post(create_thana).get(list_thanas))
        .route("/thanas/{id}", put(update_thana).delete(delete_thana))
        .route(
            "/post-offices",
            post(create_post_office).get(list_post_offices),
        )
        .route(
            "/post-offices/{id}",
            put(update_post_office).delete(delete_post_office),
        )
        // ─── Employees ────────────────────────────────────────
        .route("/employees", post(create_employee).get(list_employees))
        .route("/employees/bulk", post(bulk_create_employees))
        .route("/employees/salary-structure", get(preview_salary_structure))
        .route(
            "/employees/{employee_id}",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
        .route(
            "/employees/{employee_id}/addresses",
            get(get_employee_addresses),
        )
        .route(
            "/employees/{employee_id}/transfers",
            post(create_transfer).get(list_transfers),
        )
        .route(
            "/employees/{employee_id}/separations",
            post(create_separation).get(list_separations),
        )
        .route(
            "/employees/{employee_id}/increments",
            post(create_increment).get(list_increments),
        )
        .route(
            "/employees/{employee_id}/leave-balances",
            get(get_leave_balances),
        )
        .route(
            "/separations/{separation_id}/settle",
            post(settle_separation),
        )
        // ─── Attendance ───────────────────────────────────────
        .route("/shifts", post(create_shift).get(list_shifts))
        .route(
            "/shifts/{shift_id}",
            get(get_shift).put(update_shift).delete(delete_shift),
        )
        .route("/holidays", post(create_holiday).get(list_holidays))
        .route("/holidays/{holiday_id}", delete(delete_holiday))
        .route("/rosters", post(plan_roster).get(list_rosters))
        .route(
            "/attendance",
            post(create_manual_attendance).get(list_attendance),
        )
        .route("/attendance/{attendance_id}", put(update_attendance))
        .route("/attendance/process", post(process_attendance))
        .route("/attendance/logs", get(list_punches))
        .route("/attendance/logs/import", post(import_punches))
        // ─── Leave ────────────────────────────────────────────
        .route(
            "/leave-types",
            post(create_leave_type).get(list_leave_types),
        )
        .route(
            "/leave-types/{leave_type_id}",
            get(get_leave_type)
                .put(update_leave_type)
                .delete(delete_leave_type),
        )
        .route(
            "/leave-applications",
            post(create_leave_application).get(list_leave_applications),
        )
        .route(
            "/leave-applications/{application_id}",
            get(get_leave_application),
        )
        .route(
            "/leave-applications/{application_id}/approve",
            post(approve_leave),
        )
        .route(
            "/leave-applications/{application_id}/reject",
            post(reject_leave),
        )
        .route(
            "/leave-applications/{application_id}/cancel",
            post(cancel_leave),
        )
        // ─── Payroll ──────────────────────────────────────────
        .route("/advances", post(create_advance).get(list_advances))
        .route("/bonuses", post(create_bonus).get(list_bonuses))
        .route("/payroll/monthly/run", post(run_monthly_payroll))
        .route("/payroll/daily/run", post(run_daily_payroll))
        .route("/payroll/runs", get(list_payroll_runs))
        .route("/payroll/runs/{run_id}", get(get_payroll_run))
        .route("/payroll/monthly/{salary_month}", get(list_monthly_sheets))
        .route("/payroll/daily/{work_date}", get(list_daily_sheets))
        // ─── Production ───────────────────────────────────────
        .route(
            "/productions",
            post(create_production).get(list_productions),
        )
        .route(
            "/productions/{production_id}",
            get(get_production)
                .put(update_production)
                .delete(delete_production),
        )
        .route(
            "/production-assignments",
            post(create_assignment).get(list_assignments),
        )
        .route(
            "/production-assignments/{assignment_id}",
            get(get_assignment).delete(delete_assignment),
        )
        .route(
            "/production-assignments/{assignment_id}/records",
            get(list_daily_records),
        )
        .route(
            "/production-assignments/{assignment_id}/summary",
            get(assignment_summary),
        )
        .route("/production-records", post(upsert_daily_record))
        .route("/production-targets", post(upsert_target))
        // ─── Cashbook ─────────────────────────────────────────
        .route(
            "/cashbook/branches",
            post(create_branch).get(list_branches),
        )
        .route(
            "/cashbook/branches/{branch_id}/balance",
            get(get_branch_balance),
        )
        .route(
            "/cashbook/transactions",
            post(create_transaction).get(list_transactions),
        )
        .route(
            "/cashbook/transactions/{transaction_id}",
            delete(delete_transaction),
        )
        .route(
            "/cashbook/opening-balances",
            post(upsert_opening_balance).get(list_opening_balances),
        )
        .route(
            "/cashbook/fund-transfers",
            post(create_fund_transfer).get(list_fund_transfers),
        )
        .route(
            "/cashbook/fund-transfers/{transfer_id}",
            get(get_fund_transfer),
        )
        .route(
            "/cashbook/fund-transfers/{transfer_id}/approve",
            post(approve_fund_transfer),
        )
        .route(
            "/cashbook/fund-transfers/{transfer_id}/complete",
            post(complete_fund_transfer),
        )
        .route(
            "/cashbook/fund-transfers/{transfer_id}/reject",
            post(reject_fund_transfer),
        )
        // ─── Reports ──────────────────────────────────────────
        .route("/reports/dashboard", get(dashboard))
        .route("/reports/attendance-summary", get(attendance_summary))
}

/// Routes polled by biometric terminals; they live outside `/api/v1`
/// because device firmware hard-codes the `/iclock` prefix.
pub fn device_routes() -> Router<AppState> {
    Router::new()
        .route("/iclock/cdata", get(device_handshake).post(device_upload))
        .route("/iclock/getrequest", get(device_poll))
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .merge(device_routes())
        .nest("/api/v1", api_routes())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = test_config();
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        app(AppState::new(db.clone(), db, config))
    }

    #[tokio::test]
    async fn api_requires_a_bearer_token() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/employees")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/cashbook/branches")
                    .header("Authorization", "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn known_device_gets_handshake_options() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/iclock/cdata?SN=CKJ1234567&options=all")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.starts_with("GET OPTION FROM: CKJ1234567"));
        assert!(text.contains("TimeZone=6"));
    }

    #[tokio::test]
    async fn unknown_device_is_refused() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/iclock/cdata?SN=STRANGER")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn non_punch_uploads_are_acknowledged() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/iclock/cdata?SN=CKJ1234567&table=OPERLOG")
                    .body(Body::from("OPLOG 4\t0\t2024-05-01 08:00:00"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
