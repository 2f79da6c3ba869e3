// src/services/visit_service.rs

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::VisitStore,
    models::{Visit, VisitDraft, VisitFilter, VisitPatch},
};

// CRUD das visitas individuais (formulário manual e edição)
#[derive(Clone)]
pub struct VisitService {
    store: Arc<dyn VisitStore>,
}

impl VisitService {
    pub fn new(store: Arc<dyn VisitStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, filter: &VisitFilter) -> Result<Vec<Visit>, AppError> {
        if filter.is_empty() {
            return self.store.list_all().await;
        }
        self.store.list(filter).await
    }

    pub async fn create(&self, draft: VisitDraft) -> Result<Visit, AppError> {
        draft.validate()?;
        let visit = self.store.insert_one(&draft).await?;
        tracing::info!("✅ Visita {} criada para {}", visit.id, visit.executive);
        Ok(visit)
    }

    pub async fn update(&self, id: Uuid, patch: VisitPatch) -> Result<(), AppError> {
        patch.validate()?;
        // Patch vazio ainda passa pelo armazenamento: é ele quem diz se o id existe
        self.store.update_one(id, &patch).await?;
        tracing::info!("✏️ Visita {} atualizada", id);
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.store.delete_one(id).await?;
        tracing::info!("🗑️ Visita {} removida", id);
        Ok(())
    }

    pub async fn delete_all(&self) -> Result<(), AppError> {
        self.store.delete_all().await?;
        tracing::warn!("🗑️ Todas as visitas foram removidas");
        Ok(())
    }
}
