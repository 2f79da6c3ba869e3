// src/services/import.rs

use std::io::Cursor;
use std::str::FromStr;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Days, NaiveDate};
use rust_decimal::{prelude::FromPrimitive, Decimal};
use sqlx::types::Json;
use thiserror::Error;
use validator::Validate;

use crate::models::{visit::MaterialPop, Activity, VisitDraft};

// Erros de importação: param no primeiro problema, nada é importado pela metade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("arquivo ilegível: {0}")]
    Workbook(String),

    #[error("a planilha está vazia")]
    EmptySheet,

    #[error("falta a coluna '{0}'")]
    MissingColumn(String),

    #[error("linha {row}, coluna '{column}': {reason}")]
    InvalidRow {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("a planilha não tem visitas")]
    NoRows,
}

// ---
// Cabeçalhos da planilha
// ---
const COL_DATE: &str = "Fecha";
const COL_EXECUTIVE: &str = "Ejecutivo";
const COL_CHAIN: &str = "Cadena";
const COL_PDV: &str = "Detalle PDV";
const COL_CITY: &str = "Ciudad";
const COL_ZONE: &str = "Zona";
const COL_ACTIVITY: &str = "Actividad";
const COL_CHANNEL: &str = "Canal";
const COL_BUDGET: &str = "Presupuesto";

const COL_AGENT: &str = "Asesor";
const COL_ATTENDANCE: &str = "Asistencia Esperada";
const COL_DELIVERY_DATE: &str = "Fecha Entrega Material";
const COL_DELIVERY_PLACE: &str = "Lugar Entrega";
const COL_OBJECTIVE: &str = "Objetivo";
const COL_SAMPLES: &str = "Cantidad Muestras";
const COL_OTHER_MATERIALS: &str = "Otros Materiales";

// Colunas "POP <material>" viram entradas do mapa de material POP
const POP_PREFIX: &str = "pop ";

pub const REQUIRED_COLUMNS: [&str; 9] = [
    COL_DATE,
    COL_EXECUTIVE,
    COL_CHAIN,
    COL_PDV,
    COL_CITY,
    COL_ZONE,
    COL_ACTIVITY,
    COL_CHANNEL,
    COL_BUDGET,
];

/// Célula já desacoplada do `calamine`, para o parser poder ser testado sem arquivos.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Int(n) => Cell::Number(*n as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(datetime) => Cell::Date(datetime.date()),
                None => Cell::Number(dt.as_f64()),
            },
            Data::Error(e) => Cell::Text(format!("#{e}")),
        }
    }
}

impl Cell {
    fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// Lê a primeira aba de um xlsx/xls/ods. Primeira linha = cabeçalho.
pub fn parse_workbook(bytes: Vec<u8>) -> Result<Vec<VisitDraft>, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ImportError::Workbook(e.to_string()))?;

    let sheet = workbook
        .sheet_names()
        .into_iter()
        .next()
        .ok_or(ImportError::EmptySheet)?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| ImportError::Workbook(e.to_string()))?;

    parse_rows(range.rows().map(|row| row.iter().map(Cell::from).collect()))
}

/// Converte as linhas (cabeçalho primeiro) em visitas validadas.
pub fn parse_rows<I>(mut rows: I) -> Result<Vec<VisitDraft>, ImportError>
where
    I: Iterator<Item = Vec<Cell>>,
{
    let header = rows.next().ok_or(ImportError::EmptySheet)?;
    let columns = ColumnMap::from_header(&header)?;

    let mut drafts = Vec::new();
    // Linha 1 é o cabeçalho; os dados começam na linha 2 da planilha
    for (index, row) in rows.enumerate() {
        if row.iter().all(Cell::is_blank) {
            continue;
        }
        let reader = RowReader {
            number: index + 2,
            cells: &row,
        };
        drafts.push(columns.read(&reader)?);
    }

    if drafts.is_empty() {
        return Err(ImportError::NoRows);
    }
    Ok(drafts)
}

fn normalize_header(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' => 'u',
            other => other,
        })
        .collect()
}

struct ColumnMap {
    date: usize,
    executive: usize,
    chain: usize,
    pdv: usize,
    city: usize,
    zone: usize,
    activity: usize,
    channel: usize,
    budget: usize,
    agent: Option<usize>,
    attendance: Option<usize>,
    delivery_date: Option<usize>,
    delivery_place: Option<usize>,
    objective: Option<usize>,
    samples: Option<usize>,
    other_materials: Option<usize>,
    pop: Vec<(String, usize)>,
}

impl ColumnMap {
    fn from_header(header: &[Cell]) -> Result<Self, ImportError> {
        let names: Vec<(String, String)> = header
            .iter()
            .map(|cell| match cell {
                Cell::Text(s) => (s.trim().to_string(), normalize_header(s)),
                _ => (String::new(), String::new()),
            })
            .collect();

        let find = |label: &str| {
            let wanted = normalize_header(label);
            names.iter().position(|(_, normalized)| *normalized == wanted)
        };
        let require = |label: &str| find(label).ok_or_else(|| ImportError::MissingColumn(label.to_string()));

        let pop = names
            .iter()
            .enumerate()
            .filter(|(_, (_, normalized))| normalized.starts_with(POP_PREFIX))
            .map(|(index, (original, _))| {
                let material = original
                    .split_once(char::is_whitespace)
                    .map(|(_, rest)| rest.trim().to_string())
                    .unwrap_or_default();
                (material, index)
            })
            .filter(|(material, _)| !material.is_empty())
            .collect();

        Ok(Self {
            date: require(COL_DATE)?,
            executive: require(COL_EXECUTIVE)?,
            chain: require(COL_CHAIN)?,
            pdv: require(COL_PDV)?,
            city: require(COL_CITY)?,
            zone: require(COL_ZONE)?,
            activity: require(COL_ACTIVITY)?,
            channel: require(COL_CHANNEL)?,
            budget: require(COL_BUDGET)?,
            agent: find(COL_AGENT),
            attendance: find(COL_ATTENDANCE),
            delivery_date: find(COL_DELIVERY_DATE),
            delivery_place: find(COL_DELIVERY_PLACE),
            objective: find(COL_OBJECTIVE),
            samples: find(COL_SAMPLES),
            other_materials: find(COL_OTHER_MATERIALS),
            pop,
        })
    }

    fn read(&self, row: &RowReader<'_>) -> Result<VisitDraft, ImportError> {
        let mut material_pop = MaterialPop::new();
        for (material, index) in &self.pop {
            let column = format!("POP {material}");
            if let Some(quantity) = row.optional_count(Some(*index), &column)? {
                if quantity > 0 {
                    material_pop.insert(material.clone(), quantity);
                }
            }
        }

        let draft = VisitDraft {
            date: row.date(self.date, COL_DATE)?,
            executive: row.text(self.executive, COL_EXECUTIVE)?,
            agent: row.optional_text(self.agent),
            chain: row.text(self.chain, COL_CHAIN)?,
            pdv_detail: row.text(self.pdv, COL_PDV)?,
            city: row.text(self.city, COL_CITY)?,
            zone: row.text(self.zone, COL_ZONE)?,
            activity: row.activity(self.activity, COL_ACTIVITY)?,
            channel: row.text(self.channel, COL_CHANNEL)?,
            budget: row.budget(self.budget, COL_BUDGET)?,
            expected_attendance: row.optional_count(self.attendance, COL_ATTENDANCE)?,
            material_delivery_date: row.optional_date(self.delivery_date, COL_DELIVERY_DATE)?,
            delivery_place: row.optional_text(self.delivery_place),
            objective: row.optional_text(self.objective),
            sample_count: row.optional_count(self.samples, COL_SAMPLES)?,
            material_pop: (!material_pop.is_empty()).then(|| Json(material_pop)),
            other_materials: row.optional_text(self.other_materials),
        };

        // Última barreira: as mesmas regras do formulário manual
        draft.validate().map_err(|errors| {
            let (field, reason) = errors
                .field_errors()
                .into_iter()
                .next()
                .map(|(field, errs)| {
                    let reason = errs
                        .first()
                        .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                        .unwrap_or_else(|| "valor inválido".to_string());
                    (field.to_string(), reason)
                })
                .unwrap_or_else(|| ("?".to_string(), "valor inválido".to_string()));
            row.error(&field, reason)
        })?;

        Ok(draft)
    }
}

struct RowReader<'a> {
    number: usize,
    cells: &'a [Cell],
}

impl RowReader<'_> {
    fn cell(&self, index: usize) -> &Cell {
        self.cells.get(index).unwrap_or(&Cell::Empty)
    }

    fn error(&self, column: &str, reason: impl Into<String>) -> ImportError {
        ImportError::InvalidRow {
            row: self.number,
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    fn raw_text(&self, index: usize) -> Option<String> {
        match self.cell(index) {
            Cell::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Cell::Number(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            _ => None,
        }
    }

    fn text(&self, index: usize, column: &str) -> Result<String, ImportError> {
        self.raw_text(index)
            .ok_or_else(|| self.error(column, "valor obligatorio vacío"))
    }

    fn optional_text(&self, index: Option<usize>) -> Option<String> {
        index.and_then(|i| self.raw_text(i))
    }

    fn date(&self, index: usize, column: &str) -> Result<NaiveDate, ImportError> {
        self.optional_date(Some(index), column)?
            .ok_or_else(|| self.error(column, "fecha obligatoria vacía"))
    }

    fn optional_date(&self, index: Option<usize>, column: &str) -> Result<Option<NaiveDate>, ImportError> {
        let Some(index) = index else {
            return Ok(None);
        };
        match self.cell(index) {
            Cell::Empty => Ok(None),
            Cell::Date(date) => Ok(Some(*date)),
            Cell::Number(serial) => excel_serial_to_date(*serial)
                .map(Some)
                .ok_or_else(|| self.error(column, format!("fecha inválida '{serial}'"))),
            Cell::Text(s) if s.trim().is_empty() => Ok(None),
            Cell::Text(s) => parse_text_date(s.trim())
                .map(Some)
                .ok_or_else(|| self.error(column, format!("fecha inválida '{}'", s.trim()))),
        }
    }

    fn activity(&self, index: usize, column: &str) -> Result<Activity, ImportError> {
        let raw = self.text(index, column)?;
        Activity::from_str(&raw).map_err(|reason| self.error(column, reason))
    }

    fn budget(&self, index: usize, column: &str) -> Result<Decimal, ImportError> {
        let value = match self.cell(index) {
            Cell::Number(n) => Decimal::from_f64(*n)
                .map(|d| d.round_dp(2))
                .ok_or_else(|| self.error(column, format!("monto inválido '{n}'")))?,
            Cell::Text(s) if !s.trim().is_empty() => parse_amount(s)
                .ok_or_else(|| self.error(column, format!("monto inválido '{}'", s.trim())))?,
            _ => return Err(self.error(column, "valor obligatorio vacío")),
        };
        if value.is_sign_negative() && !value.is_zero() {
            return Err(self.error(column, "el presupuesto no puede ser negativo"));
        }
        Ok(value)
    }

    fn optional_count(&self, index: Option<usize>, column: &str) -> Result<Option<i32>, ImportError> {
        let Some(index) = index else {
            return Ok(None);
        };
        let invalid = |raw: String| self.error(column, format!("cantidad inválida '{raw}'"));
        match self.cell(index) {
            Cell::Empty => Ok(None),
            Cell::Text(s) if s.trim().is_empty() => Ok(None),
            Cell::Number(n) => {
                if n.fract() != 0.0 || *n < 0.0 || *n > f64::from(i32::MAX) {
                    return Err(invalid(n.to_string()));
                }
                Ok(Some(*n as i32))
            }
            Cell::Text(s) => s
                .trim()
                .parse::<i32>()
                .ok()
                .filter(|n| *n >= 0)
                .map(Some)
                .ok_or_else(|| invalid(s.trim().to_string())),
            Cell::Date(d) => Err(invalid(d.to_string())),
        }
    }
}

// Excel conta dias a partir de 30/12/1899 (herança do bug do ano 1900 do Lotus).
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.trunc() as u64))
}

fn parse_text_date(raw: &str) -> Option<NaiveDate> {
    // Datas com hora ("2024-08-01 00:00:00" ou "2024-08-01T00:00:00") também aparecem
    let date_part = raw
        .trim()
        .split(|c: char| c.is_whitespace() || c == 'T')
        .next()
        .unwrap_or(raw);
    ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}

fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$')
        .collect();
    // "1.200,50" (separador latino) ou "1,200.50": o último separador é o decimal
    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => single_separator(&cleaned, ','),
        (None, Some(_)) => single_separator(&cleaned, '.'),
        (None, None) => cleaned,
    };
    Decimal::from_str(&normalized).ok().map(|d| d.round_dp(2))
}

// Um só tipo de separador: é de milhar se repete ou se fecha um grupo de 3 dígitos
fn single_separator(cleaned: &str, sep: char) -> String {
    let occurrences = cleaned.matches(sep).count();
    let digits_after = cleaned.rsplit(sep).next().map_or(0, str::len);
    if occurrences > 1 || digits_after == 3 {
        cleaned.replace(sep, "")
    } else {
        cleaned.replace(sep, ".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn header() -> Vec<Cell> {
        [
            "Fecha",
            "Ejecutivo",
            "Cadena",
            "Detalle PDV",
            "Ciudad",
            "Zona",
            "Actividad",
            "Canal",
            "Presupuesto",
            "Asesor",
            "Asistencia Esperada",
            "POP Hablador",
        ]
        .iter()
        .map(|s| text(s))
        .collect()
    }

    fn row(date: Cell, executive: &str, activity: &str, budget: Cell) -> Vec<Cell> {
        vec![
            date,
            text(executive),
            text("Éxito"),
            text("Éxito Poblado"),
            text("Medellín"),
            text("Antioquia"),
            text(activity),
            text("Moderno"),
            budget,
            text("Camila"),
            Cell::Number(25.0),
            Cell::Number(3.0),
        ]
    }

    #[test]
    fn parses_valid_rows() {
        let rows = vec![
            header(),
            row(Cell::Date(NaiveDate::from_ymd_opt(2024, 8, 5).unwrap()), "Ana", "Impulso", Cell::Number(120000.0)),
            row(text("06/08/2024"), "Luis", "verificacion", text("$ 1.500,75")),
        ];

        let drafts = parse_rows(rows.into_iter()).unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].date, NaiveDate::from_ymd_opt(2024, 8, 5).unwrap());
        assert_eq!(drafts[0].activity, Activity::Impulse);
        assert_eq!(drafts[0].budget, Decimal::new(120000, 0));
        assert_eq!(drafts[0].agent.as_deref(), Some("Camila"));
        assert_eq!(drafts[0].expected_attendance, Some(25));
        assert_eq!(
            drafts[0].material_pop.as_ref().map(|pop| pop.0.get("Hablador").copied()),
            Some(Some(3))
        );
        assert_eq!(drafts[1].date, NaiveDate::from_ymd_opt(2024, 8, 6).unwrap());
        assert_eq!(drafts[1].activity, Activity::Verification);
        assert_eq!(drafts[1].budget, Decimal::new(150075, 2));
    }

    #[test]
    fn header_matching_ignores_case_and_accents() {
        let mut header = header();
        header[1] = text("  EJECUTIVO ");
        header[3] = text("detalle  pdv");
        let rows = vec![
            header,
            row(text("2024-08-01"), "Ana", "Visita", Cell::Number(0.0)),
        ];
        assert_eq!(parse_rows(rows.into_iter()).unwrap().len(), 1);
    }

    #[test]
    fn reports_first_missing_column() {
        let mut header = header();
        header.remove(4); // Ciudad
        let err = parse_rows(vec![header].into_iter()).unwrap_err();
        assert_eq!(err, ImportError::MissingColumn("Ciudad".into()));
    }

    #[test]
    fn stops_at_first_invalid_row() {
        let rows = vec![
            header(),
            row(text("2024-08-01"), "Ana", "Visita", Cell::Number(10.0)),
            row(text("31/02/2024"), "Luis", "Visita", Cell::Number(10.0)),
            row(text("2024-08-03"), "Marta", "Desfile", Cell::Number(10.0)),
        ];

        let err = parse_rows(rows.into_iter()).unwrap_err();

        match err {
            ImportError::InvalidRow { row, column, .. } => {
                assert_eq!(row, 3);
                assert_eq!(column, "Fecha");
            }
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_activity_and_negative_budget() {
        let bad_activity = vec![
            header(),
            row(text("2024-08-01"), "Ana", "Desfile", Cell::Number(10.0)),
        ];
        assert!(matches!(
            parse_rows(bad_activity.into_iter()),
            Err(ImportError::InvalidRow { ref column, .. }) if column == "Actividad"
        ));

        let negative = vec![
            header(),
            row(text("2024-08-01"), "Ana", "Visita", Cell::Number(-5.0)),
        ];
        assert!(matches!(
            parse_rows(negative.into_iter()),
            Err(ImportError::InvalidRow { ref column, .. }) if column == "Presupuesto"
        ));
    }

    #[test]
    fn empty_executive_is_an_invalid_row() {
        let rows = vec![header(), row(text("2024-08-01"), "  ", "Visita", Cell::Number(1.0))];
        assert!(matches!(
            parse_rows(rows.into_iter()),
            Err(ImportError::InvalidRow { row: 2, ref column, .. }) if column == "Ejecutivo"
        ));
    }

    #[test]
    fn blank_rows_are_skipped_and_empty_sheet_fails() {
        let rows = vec![
            header(),
            vec![Cell::Empty, text("  ")],
            row(text("2024-08-01"), "Ana", "Visita", Cell::Number(1.0)),
        ];
        assert_eq!(parse_rows(rows.into_iter()).unwrap().len(), 1);

        assert_eq!(parse_rows(vec![header()].into_iter()), Err(ImportError::NoRows));
        assert_eq!(parse_rows(Vec::<Vec<Cell>>::new().into_iter()), Err(ImportError::EmptySheet));
    }

    #[test]
    fn excel_serial_numbers_are_dates() {
        // 45505 = 2024-08-01
        assert_eq!(excel_serial_to_date(45505.0), NaiveDate::from_ymd_opt(2024, 8, 1));
        assert_eq!(excel_serial_to_date(-3.0), None);
    }

    #[test]
    fn amounts_accept_both_separators() {
        assert_eq!(parse_amount("1,200.50"), Some(Decimal::new(120050, 2)));
        assert_eq!(parse_amount("1.200,50"), Some(Decimal::new(120050, 2)));
        assert_eq!(parse_amount("$ 350000"), Some(Decimal::new(350000, 0)));
        assert_eq!(parse_amount("12,5"), Some(Decimal::new(125, 1)));
        assert_eq!(parse_amount("15,000"), Some(Decimal::new(15000, 0)));
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn lone_separators_follow_thousands_grouping() {
        assert_eq!(parse_amount("150.000"), Some(Decimal::new(150_000, 0)));
        assert_eq!(parse_amount("1.500.000"), Some(Decimal::new(1_500_000, 0)));
        assert_eq!(parse_amount("1,500,000"), Some(Decimal::new(1_500_000, 0)));
        assert_eq!(parse_amount("12.50"), Some(Decimal::new(1250, 2)));
        assert_eq!(parse_amount("12.5"), Some(Decimal::new(125, 1)));
    }

    #[test]
    fn text_dates_with_time_are_accepted() {
        let expected = NaiveDate::from_ymd_opt(2024, 8, 1);
        assert_eq!(parse_text_date("2024-08-01T00:00:00"), expected);
        assert_eq!(parse_text_date("2024-08-01 00:00:00"), expected);
        assert_eq!(parse_text_date("01/08/2024"), expected);
    }

    #[test]
    fn garbage_bytes_are_an_unreadable_workbook() {
        let err = parse_workbook(b"not a spreadsheet".to_vec()).unwrap_err();
        assert!(matches!(err, ImportError::Workbook(_)));
    }
}
