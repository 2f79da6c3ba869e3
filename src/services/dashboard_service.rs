// src/services/dashboard_service.rs

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    db::VisitStore,
    models::{
        dashboard::{BreakdownEntry, DashboardSummary, DashboardView},
        Visit, VisitFilter, YearMonth,
    },
};

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn VisitStore>,
    timeout: Duration,
}

impl DashboardService {
    pub fn new(store: Arc<dyn VisitStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// KPIs da visão filtrada + meses com histórico.
    /// As duas leituras saem juntas e a dupla corre contra o timeout configurado.
    pub async fn load(&self, filter: &VisitFilter) -> Result<DashboardView, AppError> {
        let reads = async { tokio::try_join!(self.store.list(filter), self.store.list_all()) };

        let (visits, history) = tokio::time::timeout(self.timeout, reads)
            .await
            .map_err(|_| {
                tracing::warn!("⏱️ Leitura do dashboard excedeu {:?}", self.timeout);
                AppError::StoreTimeout(self.timeout.as_secs())
            })??;

        Ok(DashboardView {
            summary: summarize(&visits),
            months: history_months(&history),
        })
    }
}

/// Meses distintos com visitas, do mais recente para o mais antigo.
pub fn history_months(visits: &[Visit]) -> Vec<YearMonth> {
    let months: BTreeSet<YearMonth> = visits.iter().map(Visit::year_month).collect();
    months.into_iter().rev().collect()
}

pub fn summarize(visits: &[Visit]) -> DashboardSummary {
    let total_budget: Decimal = visits.iter().map(|v| v.budget).sum();
    let average_budget = if visits.is_empty() {
        Decimal::ZERO
    } else {
        (total_budget / Decimal::from(visits.len())).round_dp(2)
    };

    let executives: BTreeSet<&str> = visits.iter().map(|v| v.executive.as_str()).collect();
    let chains: BTreeSet<&str> = visits.iter().map(|v| v.chain.as_str()).collect();

    DashboardSummary {
        total_visits: visits.len(),
        total_budget,
        average_budget,
        expected_attendance: visits
            .iter()
            .filter_map(|v| v.expected_attendance)
            .map(i64::from)
            .sum(),
        samples: visits.iter().filter_map(|v| v.sample_count).map(i64::from).sum(),
        executives: executives.len(),
        chains: chains.len(),
        by_activity: breakdown(visits, |v| v.activity.to_string()),
        by_executive: breakdown(visits, |v| v.executive.clone()),
        by_channel: breakdown(visits, |v| v.channel.clone()),
        by_city: breakdown(visits, |v| v.city.clone()),
        by_month: {
            // Meses ficam em ordem cronológica, não por volume
            let mut months = breakdown(visits, |v| v.year_month().to_string());
            months.sort_by(|a, b| a.key.cmp(&b.key));
            months
        },
    }
}

fn breakdown<F>(visits: &[Visit], key_of: F) -> Vec<BreakdownEntry>
where
    F: Fn(&Visit) -> String,
{
    let mut groups: HashMap<String, (usize, Decimal)> = HashMap::new();
    for visit in visits {
        let entry = groups.entry(key_of(visit)).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += visit.budget;
    }

    let mut entries: Vec<BreakdownEntry> = groups
        .into_iter()
        .map(|(key, (visits, budget))| BreakdownEntry { key, visits, budget })
        .collect();
    entries.sort_by(|a, b| b.visits.cmp(&a.visits).then_with(|| a.key.cmp(&b.key)));
    entries
}
