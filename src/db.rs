pub mod memory_store;
pub mod visit_repo;
pub mod visit_store;

pub use memory_store::InMemoryVisitStore;
pub use visit_repo::PgVisitStore;
pub use visit_store::VisitStore;
