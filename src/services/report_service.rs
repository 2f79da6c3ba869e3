// src/services/report_service.rs

use std::path::PathBuf;
use std::sync::Arc;

use genpdf::{elements, style, Element};
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    db::VisitStore,
    models::{Visit, VisitFilter},
};

/// Uma linha da tabela do relatório.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub date: String,
    pub executive: String,
    pub chain: String,
    pub pdv: String,
    pub city: String,
    pub activity: String,
    pub budget: Decimal,
}

pub fn report_rows(visits: &[Visit]) -> Vec<ReportRow> {
    let mut ordered: Vec<&Visit> = visits.iter().collect();
    ordered.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.executive.cmp(&b.executive)));
    ordered
        .into_iter()
        .map(|visit| ReportRow {
            date: visit.date.format("%d/%m/%Y").to_string(),
            executive: visit.executive.clone(),
            chain: visit.chain.clone(),
            pdv: visit.pdv_detail.clone(),
            city: visit.city.clone(),
            activity: visit.activity.to_string(),
            budget: visit.budget,
        })
        .collect()
}

/// Texto do cabeçalho com os filtros ativos.
pub fn filter_summary(filter: &VisitFilter) -> String {
    let mut parts = Vec::new();
    if let Some(month) = &filter.month {
        parts.push(format!("Mes: {month}"));
    }
    if let Some(executive) = &filter.executive {
        parts.push(format!("Ejecutivo: {executive}"));
    }
    if let Some(agent) = &filter.agent {
        parts.push(format!("Asesor: {agent}"));
    }
    if parts.is_empty() {
        "Todas las visitas".to_string()
    } else {
        parts.join(" | ")
    }
}

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn VisitStore>,
    fonts_dir: PathBuf,
    font_family: String,
}

impl ReportService {
    pub fn new(store: Arc<dyn VisitStore>, fonts_dir: PathBuf, font_family: String) -> Self {
        Self {
            store,
            fonts_dir,
            font_family,
        }
    }

    pub async fn generate_visits_pdf(&self, filter: &VisitFilter) -> Result<Vec<u8>, AppError> {
        let visits = self.store.list(filter).await?;
        let rows = report_rows(&visits);
        let subtitle = filter_summary(filter);
        let fonts_dir = self.fonts_dir.clone();
        let font_family = self.font_family.clone();

        // Renderizar PDF é CPU puro: fora do executor assíncrono
        let pdf = tokio::task::spawn_blocking(move || render_pdf(&fonts_dir, &font_family, &subtitle, &rows))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task do relatório: {}", e))??;

        tracing::info!("📄 Relatório gerado com {} visitas ({} bytes)", visits.len(), pdf.len());
        Ok(pdf)
    }
}

fn render_pdf(
    fonts_dir: &std::path::Path,
    font_family: &str,
    subtitle: &str,
    rows: &[ReportRow],
) -> Result<Vec<u8>, AppError> {
    let font_family = genpdf::fonts::from_files(fonts_dir, font_family, None).map_err(|_| {
        AppError::Report(format!("Fonte '{}' não encontrada em {}", font_family, fonts_dir.display()))
    })?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title("Reporte de visitas");
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    // --- CABEÇALHO ---
    doc.push(
        elements::Paragraph::new("REPORTE DE VISITAS")
            .styled(style::Style::new().bold().with_font_size(18)),
    );
    doc.push(elements::Paragraph::new(subtitle).styled(style::Style::new().with_font_size(10)));
    doc.push(elements::Break::new(1.5));

    // --- TABELA ---
    // Pesos: Fecha (2), Ejecutivo (3), Cadena (2), PDV (3), Ciudad (2), Actividad (2), Presupuesto (2)
    let mut table = elements::TableLayout::new(vec![2, 3, 2, 3, 2, 2, 2]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

    let bold = style::Style::new().bold().with_font_size(9);
    let table_error = |e: genpdf::error::Error| AppError::Report(e.to_string());

    table
        .row()
        .element(elements::Paragraph::new("Fecha").styled(bold))
        .element(elements::Paragraph::new("Ejecutivo").styled(bold))
        .element(elements::Paragraph::new("Cadena").styled(bold))
        .element(elements::Paragraph::new("PDV").styled(bold))
        .element(elements::Paragraph::new("Ciudad").styled(bold))
        .element(elements::Paragraph::new("Actividad").styled(bold))
        .element(elements::Paragraph::new("Presupuesto").styled(bold))
        .push()
        .map_err(table_error)?;

    let cell = style::Style::new().with_font_size(8);
    for row in rows {
        table
            .row()
            .element(elements::Paragraph::new(row.date.as_str()).styled(cell))
            .element(elements::Paragraph::new(row.executive.as_str()).styled(cell))
            .element(elements::Paragraph::new(row.chain.as_str()).styled(cell))
            .element(elements::Paragraph::new(row.pdv.as_str()).styled(cell))
            .element(elements::Paragraph::new(row.city.as_str()).styled(cell))
            .element(elements::Paragraph::new(row.activity.as_str()).styled(cell))
            .element(elements::Paragraph::new(format!("$ {:.2}", row.budget)).styled(cell))
            .push()
            .map_err(table_error)?;
    }

    doc.push(table);
    doc.push(elements::Break::new(2));

    // --- TOTAIS ---
    let total: Decimal = rows.iter().map(|row| row.budget).sum();
    let mut total_paragraph = elements::Paragraph::new(format!(
        "{} visitas | Presupuesto total: $ {:.2}",
        rows.len(),
        total
    ));
    total_paragraph.set_alignment(genpdf::Alignment::Right);
    doc.push(total_paragraph.styled(style::Style::new().bold().with_font_size(12)));

    // Renderiza para Buffer (Memória)
    let mut buffer = Vec::new();
    doc.render(&mut buffer)
        .map_err(|e| AppError::Report(e.to_string()))?;

    Ok(buffer)
}
