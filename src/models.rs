pub mod dashboard;
pub mod month;
pub mod upload;
pub mod visit;

pub use month::YearMonth;
pub use upload::{OverlapMap, PendingUpload, UploadState};
pub use visit::{Activity, Visit, VisitDraft, VisitFilter, VisitPatch};
