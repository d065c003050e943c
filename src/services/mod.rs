pub mod attendance;
pub mod cashbook;
pub mod device;
pub mod leave;
pub mod payroll;
pub mod period;
pub mod production;
