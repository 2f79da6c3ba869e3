// src/models/upload.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{month::YearMonth, visit::VisitDraft};

/// Mês -> executivos cujos dados naquele mês seriam sobrescritos.
pub type OverlapMap = BTreeMap<YearMonth, BTreeSet<String>>;

/// Quantidade de pares (mês, executivo) no mapa.
pub fn overlap_pairs(overlaps: &OverlapMap) -> usize {
    overlaps.values().map(BTreeSet::len).sum()
}

// --- Máquina de estados do upload ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum UploadState {
    Idle,
    Uploading,
    Ready,
    OverlapDetected,
    Replacing,
    Failed,
}

impl UploadState {
    pub fn can_transition_to(self, next: UploadState) -> bool {
        use UploadState::*;
        matches!(
            (self, next),
            (Idle, Uploading)
                | (Uploading, Ready)
                | (Uploading, OverlapDetected)
                | (Uploading, Failed)
                | (Ready, Idle)
                | (OverlapDetected, Idle)
                | (OverlapDetected, Replacing)
                | (Replacing, Idle)
                | (Replacing, Failed)
                // Um replace que falhou mantém o lote pendente: pode ser repetido ou descartado.
                | (Failed, Replacing)
                | (Failed, Idle)
        )
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadState::Idle => "idle",
            UploadState::Uploading => "uploading",
            UploadState::Ready => "ready",
            UploadState::OverlapDetected => "overlapDetected",
            UploadState::Replacing => "replacing",
            UploadState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Lote aguardando confirmação do usuário para sobrescrever dados existentes.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub id: Uuid,
    pub drafts: Vec<VisitDraft>,
    pub overlaps: OverlapMap,
    pub created_at: DateTime<Utc>,
    pub state: UploadState,
}

// --- Respostas ---

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum UploadOutcome {
    /// Nenhuma colisão: o lote foi inserido direto.
    /// `total_visits` é `None` quando a releitura depois da gravação falhou.
    #[serde(rename_all = "camelCase")]
    Inserted {
        inserted: usize,
        total_visits: Option<usize>,
    },
    /// Há dados para os mesmos (mês, executivo): precisa de confirmação.
    #[serde(rename_all = "camelCase")]
    OverlapDetected {
        pending_id: Uuid,
        incoming: usize,
        #[schema(value_type = Object)]
        overlaps: OverlapMap,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceOutcome {
    pub deleted: u64,
    pub inserted: usize,
    #[schema(value_type = Object)]
    pub replaced: OverlapMap,
    pub total_visits: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingUploadView {
    pub id: Uuid,
    pub state: UploadState,
    pub incoming: usize,
    #[schema(value_type = Object)]
    pub overlaps: OverlapMap,
    pub created_at: DateTime<Utc>,
}

impl From<&PendingUpload> for PendingUploadView {
    fn from(pending: &PendingUpload) -> Self {
        Self {
            id: pending.id,
            state: pending.state,
            incoming: pending.drafts.len(),
            overlaps: pending.overlaps.clone(),
            created_at: pending.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuplicationOutcome {
    #[schema(value_type = String, example = "2024-08")]
    pub source_month: YearMonth,
    #[schema(value_type = String, example = "2024-09")]
    pub target_month: YearMonth,
    pub created: usize,
}
