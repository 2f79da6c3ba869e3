pub mod dashboard_service;
pub mod duplication;
pub mod import;
pub mod overlap;
pub mod report_service;
pub mod upload_service;
pub mod visit_service;

pub use dashboard_service::DashboardService;
pub use duplication::DuplicationService;
pub use report_service::ReportService;
pub use upload_service::UploadController;
pub use visit_service::VisitService;
