#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use visits_backend::{
    common::error::AppError,
    db::{InMemoryVisitStore, VisitStore},
    models::{Activity, OverlapMap, Visit, VisitDraft, VisitFilter, VisitPatch},
};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn draft(day: NaiveDate, executive: &str) -> VisitDraft {
    VisitDraft {
        date: day,
        executive: executive.to_string(),
        agent: Some("Carlos".into()),
        chain: "Éxito".into(),
        pdv_detail: "Éxito Unicentro".into(),
        city: "Bogotá".into(),
        zone: "Norte".into(),
        activity: Activity::Visit,
        channel: "Moderno".into(),
        budget: Decimal::new(150_000, 0),
        expected_attendance: Some(40),
        material_delivery_date: None,
        delivery_place: None,
        objective: Some("Exhibición".into()),
        sample_count: Some(25),
        material_pop: None,
        other_materials: None,
    }
}

pub fn visit(day: NaiveDate, executive: &str) -> Visit {
    Visit::from_draft(Uuid::new_v4(), draft(day, executive))
}

pub fn memory_store(visits: Vec<Visit>) -> Arc<InMemoryVisitStore> {
    Arc::new(InMemoryVisitStore::with_visits(visits))
}

/// Envolve o armazenamento em memória com falhas e atrasos sob demanda.
pub struct FlakyStore {
    pub inner: InMemoryVisitStore,
    pub fail_inserts: AtomicBool,
    pub fail_deletes: AtomicBool,
    // Quantas leituras completas ainda funcionam antes de falhar
    pub list_all_budget: AtomicUsize,
    pub read_delay_ms: AtomicU64,
    pub insert_delay_ms: AtomicU64,
}

impl FlakyStore {
    pub fn new(visits: Vec<Visit>) -> Self {
        Self {
            inner: InMemoryVisitStore::with_visits(visits),
            fail_inserts: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            list_all_budget: AtomicUsize::new(usize::MAX),
            read_delay_ms: AtomicU64::new(0),
            insert_delay_ms: AtomicU64::new(0),
        }
    }

    pub fn fail_list_all_after(&self, successful_reads: usize) {
        self.list_all_budget.store(successful_reads, Ordering::SeqCst);
    }

    pub fn set_read_delay(&self, delay: Duration) {
        self.read_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_insert_delay(&self, delay: Duration) {
        self.insert_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    async fn pause(delay_ms: &AtomicU64) {
        let ms = delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl VisitStore for FlakyStore {
    async fn list(&self, filter: &VisitFilter) -> Result<Vec<Visit>, AppError> {
        Self::pause(&self.read_delay_ms).await;
        self.inner.list(filter).await
    }

    async fn list_all(&self) -> Result<Vec<Visit>, AppError> {
        Self::pause(&self.read_delay_ms).await;
        let allowed = self
            .list_all_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(AppError::Store("server closed the connection unexpectedly".into()));
        }
        self.inner.list_all().await
    }

    async fn insert_one(&self, draft: &VisitDraft) -> Result<Visit, AppError> {
        self.inner.insert_one(draft).await
    }

    async fn insert_batch(&self, drafts: &[VisitDraft]) -> Result<(), AppError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Store("connection reset by peer".into()));
        }
        Self::pause(&self.insert_delay_ms).await;
        self.inner.insert_batch(drafts).await
    }

    async fn update_one(&self, id: Uuid, patch: &VisitPatch) -> Result<(), AppError> {
        self.inner.update_one(id, patch).await
    }

    async fn delete_one(&self, id: Uuid) -> Result<(), AppError> {
        self.inner.delete_one(id).await
    }

    async fn delete_all(&self) -> Result<(), AppError> {
        self.inner.delete_all().await
    }

    async fn delete_where(&self, month_to_executives: &OverlapMap) -> Result<u64, AppError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::Store("permission denied for table visits".into()));
        }
        self.inner.delete_where(month_to_executives).await
    }
}
