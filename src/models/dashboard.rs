// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::month::YearMonth;

// 1. Os Cards do Topo
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_visits: usize,
    pub total_budget: Decimal,
    pub average_budget: Decimal,
    pub expected_attendance: i64,
    pub samples: i64,
    pub executives: usize,
    pub chains: usize,

    // 2. Agrupamentos para os gráficos
    pub by_activity: Vec<BreakdownEntry>,
    pub by_executive: Vec<BreakdownEntry>,
    pub by_channel: Vec<BreakdownEntry>,
    pub by_city: Vec<BreakdownEntry>,
    pub by_month: Vec<BreakdownEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownEntry {
    pub key: String,
    pub visits: usize,
    pub budget: Decimal,
}

// 3. Resposta completa: KPIs filtrados + meses com histórico (seletor do front)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub summary: DashboardSummary,
    #[schema(value_type = Vec<String>)]
    pub months: Vec<YearMonth>,
}
