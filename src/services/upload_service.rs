// src/services/upload_service.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::VisitStore,
    models::{
        upload::{overlap_pairs, PendingUploadView, ReplaceOutcome, UploadOutcome},
        OverlapMap, PendingUpload, UploadState, VisitDraft, YearMonth,
    },
    services::overlap::find_overlaps,
};

fn transition(from: UploadState, to: UploadState) -> Result<UploadState, AppError> {
    if from.can_transition_to(to) {
        Ok(to)
    } else {
        Err(AppError::InvalidUploadState { from, to })
    }
}

/// Orquestra o upload de lotes: reconciliação, confirmação e gravação.
///
/// Lotes que colidem com dados existentes ficam num registro em memória até o
/// usuário confirmar (`confirm`) ou descartar (`cancel`). O replace é
/// excluir-e-inserir em duas chamadas ao armazenamento, sem atomicidade entre elas.
#[derive(Clone)]
pub struct UploadController {
    store: Arc<dyn VisitStore>,
    pending: Arc<Mutex<HashMap<Uuid, PendingUpload>>>,
    ttl: Duration,
}

impl UploadController {
    pub fn new(store: Arc<dyn VisitStore>, ttl: Duration) -> Self {
        Self {
            store,
            pending: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    // Nunca segurar este lock atravessando um `.await`
    fn registry(&self) -> Result<MutexGuard<'_, HashMap<Uuid, PendingUpload>>, AppError> {
        let mut registry = self
            .pending
            .lock()
            .map_err(|_| anyhow::anyhow!("registro de uploads pendentes envenenado"))?;

        let cutoff = Utc::now() - self.ttl;
        registry.retain(|id, pending| {
            let alive = pending.created_at > cutoff;
            if !alive {
                tracing::info!("🧹 Upload pendente {} expirou e foi descartado", id);
            }
            alive
        });
        Ok(registry)
    }

    /// Recebe um lote já validado pela importação (ou vindo do front).
    pub async fn submit(&self, drafts: Vec<VisitDraft>) -> Result<UploadOutcome, AppError> {
        if drafts.is_empty() {
            return Err(AppError::EmptyUpload);
        }
        for draft in &drafts {
            draft.validate()?;
        }

        let existing = self.store.list_all().await?;
        let overlaps = find_overlaps(&drafts, &existing);

        if overlaps.is_empty() {
            if let Err(err) = self.store.insert_batch(&drafts).await {
                tracing::warn!("Upload: inserção do lote falhou: {}", err);
                return Err(err);
            }

            let total_visits = self.total_visits().await;
            tracing::info!("📥 {} visitas importadas (total: {:?})", drafts.len(), total_visits);

            return Ok(UploadOutcome::Inserted {
                inserted: drafts.len(),
                total_visits,
            });
        }

        let incoming = drafts.len();
        let pending = PendingUpload {
            id: Uuid::new_v4(),
            drafts,
            overlaps,
            created_at: Utc::now(),
            state: UploadState::OverlapDetected,
        };
        let outcome = UploadOutcome::OverlapDetected {
            pending_id: pending.id,
            incoming,
            overlaps: pending.overlaps.clone(),
        };

        tracing::info!(
            "⚠️ Upload {} colide com {} pares (mês, executivo); aguardando confirmação",
            pending.id,
            overlap_pairs(&pending.overlaps)
        );
        self.registry()?.insert(pending.id, pending);

        Ok(outcome)
    }

    pub fn pending(&self, id: Uuid) -> Result<PendingUploadView, AppError> {
        self.registry()?
            .get(&id)
            .map(PendingUploadView::from)
            .ok_or(AppError::PendingUploadNotFound(id))
    }

    /// Retira o lote do registro para processá-lo. Um segundo `confirm` para o
    /// mesmo id, enquanto o primeiro roda, não encontra nada.
    fn take_for(&self, id: Uuid, next: UploadState) -> Result<PendingUpload, AppError> {
        let mut registry = self.registry()?;
        let current = registry
            .get(&id)
            .map(|pending| pending.state)
            .ok_or(AppError::PendingUploadNotFound(id))?;
        transition(current, next)?;
        registry
            .remove(&id)
            .ok_or(AppError::PendingUploadNotFound(id))
    }

    fn restore(&self, pending: PendingUpload) -> Result<(), AppError> {
        self.registry()?.insert(pending.id, pending);
        Ok(())
    }

    /// Usuário confirmou: apaga os pares em conflito e insere o lote.
    pub async fn confirm(&self, id: Uuid) -> Result<ReplaceOutcome, AppError> {
        let pending = self.take_for(id, UploadState::Replacing)?;

        // Task própria: se o cliente desconectar no meio, o replace vai até o fim
        // e, se falhar, o lote volta ao registro do mesmo jeito.
        let controller = self.clone();
        tokio::spawn(async move { controller.replace(pending).await })
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de substituição do upload {}: {}", id, e))?
    }

    async fn replace(&self, mut pending: PendingUpload) -> Result<ReplaceOutcome, AppError> {
        let id = pending.id;
        pending.state = UploadState::Replacing;

        let deleted = match self.store.delete_where(&pending.overlaps).await {
            Ok(deleted) => deleted,
            Err(err) => {
                tracing::warn!("Upload {}: exclusão falhou, nada foi alterado: {}", id, err);
                pending.state = transition(pending.state, UploadState::Failed)?;
                self.restore(pending)?;
                return Err(err);
            }
        };

        if let Err(err) = self.store.insert_batch(&pending.drafts).await {
            // A exclusão já foi feita. Não supomos nada: relemos o que sobrou.
            let remaining = self.count_in(&pending.overlaps).await;
            tracing::error!(
                "Upload {}: {} visitas removidas mas a inserção falhou ({}); restantes: {:?}",
                id,
                deleted,
                err,
                remaining
            );
            pending.state = transition(pending.state, UploadState::Failed)?;
            self.restore(pending)?;
            return Err(AppError::ReplaceIncomplete {
                deleted,
                remaining,
                message: err.to_string(),
            });
        }

        transition(pending.state, UploadState::Idle)?;
        let total_visits = self.total_visits().await;

        tracing::info!(
            "🔁 Upload {}: {} visitas substituídas por {} (total: {:?})",
            id,
            deleted,
            pending.drafts.len(),
            total_visits
        );

        Ok(ReplaceOutcome {
            deleted,
            inserted: pending.drafts.len(),
            replaced: pending.overlaps,
            total_visits,
        })
    }

    /// Usuário desistiu: descarta o lote, sem tocar no armazenamento.
    pub fn cancel(&self, id: Uuid) -> Result<(), AppError> {
        self.take_for(id, UploadState::Idle)?;
        tracing::info!("Upload {} cancelado", id);
        Ok(())
    }

    // A gravação já aconteceu: uma releitura que falha não desfaz o resultado
    async fn total_visits(&self) -> Option<usize> {
        match self.store.list_all().await {
            Ok(visits) => Some(visits.len()),
            Err(err) => {
                tracing::warn!("Releitura do total de visitas falhou: {}", err);
                None
            }
        }
    }

    async fn count_in(&self, overlaps: &OverlapMap) -> Option<usize> {
        let visits = self.store.list_all().await.ok()?;
        Some(
            visits
                .iter()
                .filter(|visit| {
                    overlaps
                        .get(&YearMonth::of(visit.date))
                        .is_some_and(|executives| executives.contains(&visit.executive))
                })
                .count(),
        )
    }
}
