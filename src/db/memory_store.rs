// src/db/memory_store.rs

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::visit_store::VisitStore,
    models::{OverlapMap, Visit, VisitDraft, VisitFilter, VisitPatch, YearMonth},
};

/// Armazenamento em memória para desenvolvimento (`STORE_BACKEND=memory`) e testes.
/// Mesma semântica do Postgres, inclusive a ordenação por data e executivo.
#[derive(Default)]
pub struct InMemoryVisitStore {
    visits: RwLock<Vec<Visit>>,
}

impl InMemoryVisitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_visits(visits: Vec<Visit>) -> Self {
        Self {
            visits: RwLock::new(visits),
        }
    }
}

fn sorted(mut visits: Vec<Visit>) -> Vec<Visit> {
    visits.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.executive.cmp(&b.executive)));
    visits
}

#[async_trait]
impl VisitStore for InMemoryVisitStore {
    async fn list(&self, filter: &VisitFilter) -> Result<Vec<Visit>, AppError> {
        let visits = self.visits.read().await;
        Ok(sorted(
            visits.iter().filter(|v| filter.matches(v)).cloned().collect(),
        ))
    }

    async fn list_all(&self) -> Result<Vec<Visit>, AppError> {
        let visits = self.visits.read().await;
        Ok(sorted(visits.clone()))
    }

    async fn insert_one(&self, draft: &VisitDraft) -> Result<Visit, AppError> {
        let visit = Visit::from_draft(Uuid::new_v4(), draft.clone());
        self.visits.write().await.push(visit.clone());
        Ok(visit)
    }

    async fn insert_batch(&self, drafts: &[VisitDraft]) -> Result<(), AppError> {
        let mut visits = self.visits.write().await;
        visits.extend(
            drafts
                .iter()
                .cloned()
                .map(|draft| Visit::from_draft(Uuid::new_v4(), draft)),
        );
        Ok(())
    }

    async fn update_one(&self, id: Uuid, patch: &VisitPatch) -> Result<(), AppError> {
        let mut visits = self.visits.write().await;
        let visit = visits
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or(AppError::VisitNotFound(id))?;
        patch.apply_to(visit);
        Ok(())
    }

    async fn delete_one(&self, id: Uuid) -> Result<(), AppError> {
        let mut visits = self.visits.write().await;
        let before = visits.len();
        visits.retain(|v| v.id != id);
        if visits.len() == before {
            return Err(AppError::VisitNotFound(id));
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), AppError> {
        self.visits.write().await.clear();
        Ok(())
    }

    async fn delete_where(&self, month_to_executives: &OverlapMap) -> Result<u64, AppError> {
        let mut visits = self.visits.write().await;
        let before = visits.len();
        visits.retain(|v| {
            !month_to_executives
                .get(&YearMonth::of(v.date))
                .is_some_and(|executives| executives.contains(&v.executive))
        });
        Ok((before - visits.len()) as u64)
    }
}
