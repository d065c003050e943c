pub mod attendance;
pub mod cashbook;
pub mod device;
pub mod employee;
pub mod general;
pub mod geography;
pub mod leave;
pub mod lifecycle;
pub mod organization;
pub mod payroll;
pub mod production;
pub mod report;
mod units;
pub mod users;
