// src/services/duplication.rs

use std::sync::Arc;

use chrono::Datelike;

use crate::{
    common::error::AppError,
    db::VisitStore,
    models::{upload::DuplicationOutcome, Visit, VisitDraft, YearMonth},
};

/// Copia as visitas de `source` para `target`, mantendo o dia do mês
/// (limitado ao último dia do mês de destino: 31/01 vira 28/02 ou 29/02).
///
/// Todos os campos são preservados, menos a data; o `id` fica de fora porque
/// o armazenamento gera um novo na inserção. Não escreve em lugar nenhum.
/// `all_visits` deve ser o conjunto completo, não a visão filtrada da tela.
pub fn duplicate(source: YearMonth, target: YearMonth, all_visits: &[Visit]) -> Vec<VisitDraft> {
    all_visits
        .iter()
        .filter(|visit| source.contains(visit.date))
        .map(|visit| {
            let mut draft = visit.to_draft();
            draft.date = target.with_day_clamped(visit.date.day());
            draft
        })
        .collect()
}

#[derive(Clone)]
pub struct DuplicationService {
    store: Arc<dyn VisitStore>,
}

impl DuplicationService {
    pub fn new(store: Arc<dyn VisitStore>) -> Self {
        Self { store }
    }

    pub async fn duplicate_month(
        &self,
        source: YearMonth,
        target: YearMonth,
    ) -> Result<DuplicationOutcome, AppError> {
        // Duplicar um mês sobre ele mesmo só criaria cópias com ids novos
        if source == target {
            tracing::warn!("Duplicação recusada: origem e destino iguais ({})", source);
            return Err(AppError::SameMonthDuplication(source));
        }

        let all_visits = self.store.list_all().await?;
        let drafts = duplicate(source, target, &all_visits);

        if drafts.is_empty() {
            tracing::warn!("Duplicação recusada: nenhuma visita em {}", source);
            return Err(AppError::NoSourceData(source));
        }

        self.store.insert_batch(&drafts).await?;

        tracing::info!(
            "📅 {} visitas duplicadas de {} para {}",
            drafts.len(),
            source,
            target
        );

        Ok(DuplicationOutcome {
            source_month: source,
            target_month: target,
            created: drafts.len(),
        })
    }
}
