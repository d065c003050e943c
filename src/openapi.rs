// src/openapi.rs

use crate::models::{
    AdvanceSalary, AdvanceSalaryRequest, AssignmentRequest, AssignmentSummary, Attendance,
    AttendanceLog, AttendanceStatus, AttendanceSummaryRow, AuthResponse, Bonus, BonusRequest,
    BonusType, Branch, BranchBalance, BranchRequest, BulkEmployeeRequest, BulkImportResponse,
    CashTransaction, CashTransactionRequest, CashTransactionType, ColorInput, Company,
    CompanyRequest, DailyEfficiency, DailyProductionRecord, DailyProductionRequest,
    DailySalarySheet, Dashboard, DepartmentHeadcount, Designation, DesignationRequest, Employee,
    EmployeeAddresses, EmployeeRequest, EmployeeShiftRoster, FundTransfer, FundTransferRequest,
    FundTransferStatus, Holiday, HolidayRequest, ImportPunchesRequest, ImportPunchesResponse,
    LeaveApplication, LeaveApplicationRequest, LeaveBalance, LeaveDecisionRequest, LeaveStatus,
    LeaveType, LeaveTypeRequest, Line, LineRequest, LoginRequest, ManualAttendanceRequest,
    MessageResponse, MonthlySalarySheet, NamedUnit, NamedUnitRequest, OpeningBalance,
    OpeningBalanceRequest, PayrollRun, PayrollRunType, PayrollStatus, ProcessAttendanceRequest,
    ProcessAttendanceResponse, Production, ProductionAssignment, ProductionColor, ProductionDetail,
    ProductionRequest, ProductionTarget, ProductionTargetRequest, PunchInput,
    RegisterUserRequest, RejectTransferRequest, ResolvedAddress, RosterRequest, RosterResponse,
    RunDailyPayrollRequest, RunMonthlyPayrollRequest, SalaryIncrement, SalaryIncrementRequest,
    SalaryStructure, Separation, SeparationRequest, SeparationType, SettleSeparationRequest,
    Shift, ShiftRequest, StatusCount, Transfer, TransferRequest, UserPublic, UserRole,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Factory ERP API",
        version = "1.0.0",
        description = "HR, attendance, payroll, production and cashbook backend for a garment \
            factory. Biometric terminals push punches to the /iclock endpoints, which are not \
            part of this document.",
        license(name = "MIT")
    ),
    paths(
        // Auth
        crate::handlers::users::register_user,
        crate::handlers::users::login,
        crate::handlers::users::me,
        // Organization
        crate::handlers::organization::create_company,
        crate::handlers::organization::list_companies,
        crate::handlers::organization::get_company,
        crate::handlers::organization::update_company,
        crate::handlers::organization::delete_company,
        crate::handlers::organization::list_departments,
        crate::handlers::organization::create_department,
        crate::handlers::organization::update_department,
        crate::handlers::organization::delete_department,
        crate::handlers::organization::list_sections,
        crate::handlers::organization::create_section,
        crate::handlers::organization::update_section,
        crate::handlers::organization::delete_section,
        crate::handlers::organization::list_designations,
        crate::handlers::organization::create_designation,
        crate::handlers::organization::update_designation,
        crate::handlers::organization::delete_designation,
        crate::handlers::organization::list_lines,
        crate::handlers::organization::create_line,
        crate::handlers::organization::update_line,
        crate::handlers::organization::delete_line,
        // Geography
        crate::handlers::geography::list_countries,
        crate::handlers::geography::create_country,
        crate::handlers::geography::update_country,
        crate::handlers::geography::delete_country,
        crate::handlers::geography::list_divisions,
        crate::handlers::geography::create_division,
        crate::handlers::geography::update_division,
        crate::handlers::geography::delete_division,
        crate::handlers::geography::list_districts,
        crate::handlers::geography::create_district,
        crate::handlers::geography::update_district,
        crate::handlers::geography::delete_district,
        crate::handlers::geography::list_thanas,
        crate::handlers::geography::create_thana,
        crate::handlers::geography::update_thana,
        crate::handlers::geography::delete_thana,
        crate::handlers::geography::list_post_offices,
        crate::handlers::geography::create_post_office,
        crate::handlers::geography::update_post_office,
        crate::handlers::geography::delete_post_office,
        // Employees
        crate::handlers::employee::create_employee,
        crate::handlers::employee::bulk_create_employees,
        crate::handlers::employee::list_employees,
        crate::handlers::employee::get_employee,
        crate::handlers::employee::update_employee,
        crate::handlers::employee::delete_employee,
        crate::handlers::employee::get_employee_addresses,
        crate::handlers::employee::preview_salary_structure,
        // Lifecycle
        crate::handlers::lifecycle::create_transfer,
        crate::handlers::lifecycle::list_transfers,
        crate::handlers::lifecycle::create_separation,
        crate::handlers::lifecycle::list_separations,
        crate::handlers::lifecycle::settle_separation,
        // Attendance
        crate::handlers::attendance::create_shift,
        crate::handlers::attendance::list_shifts,
        crate::handlers::attendance::get_shift,
        crate::handlers::attendance::update_shift,
        crate::handlers::attendance::delete_shift,
        crate::handlers::attendance::create_holiday,
        crate::handlers::attendance::list_holidays,
        crate::handlers::attendance::delete_holiday,
        crate::handlers::attendance::plan_roster,
        crate::handlers::attendance::list_rosters,
        crate::handlers::attendance::import_punches,
        crate::handlers::attendance::list_punches,
        crate::handlers::attendance::create_manual_attendance,
        crate::handlers::attendance::update_attendance,
        crate::handlers::attendance::list_attendance,
        crate::handlers::attendance::process_attendance,
        // Leave
        crate::handlers::leave::create_leave_type,
        crate::handlers::leave::list_leave_types,
        crate::handlers::leave::get_leave_type,
        crate::handlers::leave::update_leave_type,
        crate::handlers::leave::delete_leave_type,
        crate::handlers::leave::create_leave_application,
        crate::handlers::leave::list_leave_applications,
        crate::handlers::leave::get_leave_application,
        crate::handlers::leave::approve_leave,
        crate::handlers::leave::reject_leave,
        crate::handlers::leave::cancel_leave,
        crate::handlers::leave::get_leave_balances,
        // Payroll
        crate::handlers::payroll::create_advance,
        crate::handlers::payroll::list_advances,
        crate::handlers::payroll::create_increment,
        crate::handlers::payroll::list_increments,
        crate::handlers::payroll::create_bonus,
        crate::handlers::payroll::list_bonuses,
        crate::handlers::payroll::run_monthly_payroll,
        crate::handlers::payroll::run_daily_payroll,
        crate::handlers::payroll::list_payroll_runs,
        crate::handlers::payroll::get_payroll_run,
        crate::handlers::payroll::list_monthly_sheets,
        crate::handlers::payroll::list_daily_sheets,
        // Production
        crate::handlers::production::create_production,
        crate::handlers::production::list_productions,
        crate::handlers::production::get_production,
        crate::handlers::production::update_production,
        crate::handlers::production::delete_production,
        crate::handlers::production::create_assignment,
        crate::handlers::production::list_assignments,
        crate::handlers::production::get_assignment,
        crate::handlers::production::delete_assignment,
        crate::handlers::production::upsert_daily_record,
        crate::handlers::production::list_daily_records,
        crate::handlers::production::upsert_target,
        crate::handlers::production::assignment_summary,
        // Cashbook
        crate::handlers::cashbook::create_branch,
        crate::handlers::cashbook::list_branches,
        crate::handlers::cashbook::get_branch_balance,
        crate::handlers::cashbook::create_transaction,
        crate::handlers::cashbook::list_transactions,
        crate::handlers::cashbook::delete_transaction,
        crate::handlers::cashbook::upsert_opening_balance,
        crate::handlers::cashbook::list_opening_balances,
        crate::handlers::cashbook::create_fund_transfer,
        crate::handlers::cashbook::list_fund_transfers,
        crate::handlers::cashbook::get_fund_transfer,
        crate::handlers::cashbook::approve_fund_transfer,
        crate::handlers::cashbook::complete_fund_transfer,
        crate::handlers::cashbook::reject_fund_transfer,
        // Reports
        crate::handlers::report::dashboard,
        crate::handlers::report::attendance_summary,
    ),
    components(
        schemas(
            RegisterUserRequest, LoginRequest, AuthResponse, UserPublic, UserRole,
            MessageResponse,
            Company, CompanyRequest, NamedUnit, NamedUnitRequest,
            Designation, DesignationRequest, Line, LineRequest, ResolvedAddress,
            Employee, EmployeeRequest, BulkEmployeeRequest, BulkImportResponse,
            EmployeeAddresses, SalaryStructure,
            Transfer, TransferRequest, Separation, SeparationRequest, SeparationType,
            SettleSeparationRequest,
            Shift, ShiftRequest, Holiday, HolidayRequest, EmployeeShiftRoster, RosterRequest,
            RosterResponse, AttendanceLog, PunchInput, ImportPunchesRequest,
            ImportPunchesResponse, Attendance, AttendanceStatus, ManualAttendanceRequest,
            ProcessAttendanceRequest, ProcessAttendanceResponse,
            LeaveType, LeaveTypeRequest, LeaveApplication, LeaveApplicationRequest,
            LeaveDecisionRequest, LeaveStatus, LeaveBalance,
            AdvanceSalary, AdvanceSalaryRequest, SalaryIncrement, SalaryIncrementRequest,
            Bonus, BonusRequest, BonusType, MonthlySalarySheet, DailySalarySheet,
            PayrollRun, PayrollRunType, PayrollStatus, RunMonthlyPayrollRequest,
            RunDailyPayrollRequest,
            Production, ProductionColor, ProductionDetail, ColorInput, ProductionRequest,
            ProductionAssignment, AssignmentRequest, DailyProductionRecord,
            DailyProductionRequest, ProductionTarget, ProductionTargetRequest,
            DailyEfficiency, AssignmentSummary,
            Branch, BranchRequest, CashTransaction, CashTransactionRequest,
            CashTransactionType, OpeningBalance, OpeningBalanceRequest, BranchBalance,
            FundTransfer, FundTransferRequest, FundTransferStatus, RejectTransferRequest,
            Dashboard, DepartmentHeadcount, StatusCount, AttendanceSummaryRow,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Register users and obtain tokens"),
        (name = "Organization", description = "Companies, departments, sections, designations and lines"),
        (name = "Geography", description = "Country to post office address hierarchy"),
        (name = "Employees", description = "Worker records and salary structure"),
        (name = "Lifecycle", description = "Transfers and separations"),
        (name = "Attendance", description = "Shifts, rosters, holidays, punches and daily attendance"),
        (name = "Leave", description = "Leave types, applications and balances"),
        (name = "Payroll", description = "Advances, increments, bonuses and salary sheets"),
        (name = "Production", description = "Orders, line assignments and hourly output"),
        (name = "Cashbook", description = "Branch cash, opening balances and fund transfers"),
        (name = "Reports", description = "Dashboard and attendance summaries"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_declares_bearer_auth() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(doc.paths.paths.contains_key("/api/v1/payroll/monthly/run"));
    }
}
