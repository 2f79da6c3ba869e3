pub mod dashboard;
pub mod reports;
pub mod uploads;
pub mod visits;
