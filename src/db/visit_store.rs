// src/db/visit_store.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{OverlapMap, Visit, VisitDraft, VisitFilter, VisitPatch},
};

/// O armazenamento de visitas. Toda a persistência passa por aqui:
/// os serviços recebem um `Arc<dyn VisitStore>` construído no `AppState`.
///
/// Qualquer operação pode falhar com `AppError::Store` carregando a mensagem
/// do backend; `update_one` e `delete_one` devolvem `VisitNotFound` para ids desconhecidos.
#[async_trait]
pub trait VisitStore: Send + Sync {
    async fn list(&self, filter: &VisitFilter) -> Result<Vec<Visit>, AppError>;

    /// Sem filtro nenhum. Usado pela duplicação e pela reconciliação de uploads.
    async fn list_all(&self) -> Result<Vec<Visit>, AppError>;

    async fn insert_one(&self, draft: &VisitDraft) -> Result<Visit, AppError>;

    async fn insert_batch(&self, drafts: &[VisitDraft]) -> Result<(), AppError>;

    async fn update_one(&self, id: Uuid, patch: &VisitPatch) -> Result<(), AppError>;

    async fn delete_one(&self, id: Uuid) -> Result<(), AppError>;

    async fn delete_all(&self) -> Result<(), AppError>;

    /// Remove as visitas de cada (mês, executivo) do mapa. Retorna quantas foram removidas.
    async fn delete_where(&self, month_to_executives: &OverlapMap) -> Result<u64, AppError>;
}
