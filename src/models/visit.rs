// src/models/visit.rs

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::month::YearMonth;

/// Material POP entregue na visita: nome do material -> quantidade.
pub type MaterialPop = BTreeMap<String, i32>;

// --- Enums ---

// Mapeia o CREATE TYPE visit_activity do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "visit_activity")]
pub enum Activity {
    #[sqlx(rename = "Visita")]
    #[serde(rename = "Visita")]
    Visit,
    #[sqlx(rename = "Impulso")]
    #[serde(rename = "Impulso")]
    Impulse,
    #[sqlx(rename = "Verificación")]
    #[serde(rename = "Verificación", alias = "Verificacion")]
    Verification,
}

impl Activity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Visit => "Visita",
            Activity::Impulse => "Impulso",
            Activity::Verification => "Verificación",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Activity {
    type Err = String;

    // As planilhas chegam com caixa e acentuação variadas ("VERIFICACION", "impulso ")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
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
            .collect();
        match normalized.as_str() {
            "visita" => Ok(Activity::Visit),
            "impulso" => Ok(Activity::Impulse),
            "verificacion" => Ok(Activity::Verification),
            _ => Err(format!(
                "actividad '{}' inválida (Visita, Impulso o Verificación)",
                s.trim()
            )),
        }
    }
}

// ---
// Validação Customizada
// ---
pub(crate) fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

// --- Visita persistida ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub id: Uuid,
    #[sqlx(rename = "visit_date")]
    pub date: NaiveDate,
    #[schema(example = "Ana Pérez")]
    pub executive: String,
    pub agent: Option<String>,
    #[schema(example = "Éxito")]
    pub chain: String,
    pub pdv_detail: String,
    pub city: String,
    pub zone: String,
    pub activity: Activity,
    pub channel: String,
    #[schema(example = "150000.00")]
    pub budget: Decimal,
    pub expected_attendance: Option<i32>,
    pub material_delivery_date: Option<NaiveDate>,
    pub delivery_place: Option<String>,
    pub objective: Option<String>,
    pub sample_count: Option<i32>,
    #[schema(value_type = Option<Object>)]
    pub material_pop: Option<Json<MaterialPop>>,
    pub other_materials: Option<String>,
}

impl Visit {
    pub fn from_draft(id: Uuid, draft: VisitDraft) -> Self {
        Self {
            id,
            date: draft.date,
            executive: draft.executive,
            agent: draft.agent,
            chain: draft.chain,
            pdv_detail: draft.pdv_detail,
            city: draft.city,
            zone: draft.zone,
            activity: draft.activity,
            channel: draft.channel,
            budget: draft.budget,
            expected_attendance: draft.expected_attendance,
            material_delivery_date: draft.material_delivery_date,
            delivery_place: draft.delivery_place,
            objective: draft.objective,
            sample_count: draft.sample_count,
            material_pop: draft.material_pop,
            other_materials: draft.other_materials,
        }
    }

    /// Cópia sem o `id`, pronta para ser inserida de novo.
    pub fn to_draft(&self) -> VisitDraft {
        VisitDraft {
            date: self.date,
            executive: self.executive.clone(),
            agent: self.agent.clone(),
            chain: self.chain.clone(),
            pdv_detail: self.pdv_detail.clone(),
            city: self.city.clone(),
            zone: self.zone.clone(),
            activity: self.activity,
            channel: self.channel.clone(),
            budget: self.budget,
            expected_attendance: self.expected_attendance,
            material_delivery_date: self.material_delivery_date,
            delivery_place: self.delivery_place.clone(),
            objective: self.objective.clone(),
            sample_count: self.sample_count,
            material_pop: self.material_pop.clone(),
            other_materials: self.other_materials.clone(),
        }
    }

    pub fn year_month(&self) -> YearMonth {
        YearMonth::of(self.date)
    }
}

// --- Visita ainda não persistida (formulário, planilha, duplicação) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitDraft {
    pub date: NaiveDate,

    #[validate(length(min = 1, message = "O executivo é obrigatório."))]
    pub executive: String,

    pub agent: Option<String>,

    #[validate(length(min = 1, message = "A cadeia é obrigatória."))]
    pub chain: String,

    #[serde(default)]
    pub pdv_detail: String,

    #[validate(length(min = 1, message = "A cidade é obrigatória."))]
    pub city: String,

    #[serde(default)]
    pub zone: String,

    pub activity: Activity,

    #[serde(default)]
    pub channel: String,

    #[validate(custom(function = "validate_not_negative"))]
    pub budget: Decimal,

    #[validate(range(min = 0, message = "A assistência esperada não pode ser negativa."))]
    pub expected_attendance: Option<i32>,

    pub material_delivery_date: Option<NaiveDate>,
    pub delivery_place: Option<String>,
    pub objective: Option<String>,

    #[validate(range(min = 0, message = "A quantidade de amostras não pode ser negativa."))]
    pub sample_count: Option<i32>,

    #[schema(value_type = Option<Object>)]
    pub material_pop: Option<Json<MaterialPop>>,

    pub other_materials: Option<String>,
}

impl VisitDraft {
    pub fn year_month(&self) -> YearMonth {
        YearMonth::of(self.date)
    }
}

// --- Atualização parcial (formulário de edição) ---
// Campos ausentes mantêm o valor gravado. Nos campos opcionais, `null` explícito
// limpa o valor: ausente = `None`, `null` = `Some(None)`.

fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitPatch {
    pub date: Option<NaiveDate>,
    #[validate(length(min = 1, message = "O executivo é obrigatório."))]
    pub executive: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub agent: Option<Option<String>>,
    #[validate(length(min = 1, message = "A cadeia é obrigatória."))]
    pub chain: Option<String>,
    pub pdv_detail: Option<String>,
    #[validate(length(min = 1, message = "A cidade é obrigatória."))]
    pub city: Option<String>,
    pub zone: Option<String>,
    pub activity: Option<Activity>,
    pub channel: Option<String>,
    #[validate(custom(function = "validate_not_negative"))]
    pub budget: Option<Decimal>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    #[validate(range(min = 0, message = "A assistência esperada não pode ser negativa."))]
    pub expected_attendance: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<NaiveDate>)]
    pub material_delivery_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub delivery_place: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub objective: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    #[validate(range(min = 0, message = "A quantidade de amostras não pode ser negativa."))]
    pub sample_count: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub material_pop: Option<Option<Json<MaterialPop>>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub other_materials: Option<Option<String>>,
}

impl VisitPatch {
    /// Aplica os campos presentes sobre a visita.
    pub fn apply_to(&self, visit: &mut Visit) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }

        set(&mut visit.date, &self.date);
        set(&mut visit.executive, &self.executive);
        set(&mut visit.agent, &self.agent);
        set(&mut visit.chain, &self.chain);
        set(&mut visit.pdv_detail, &self.pdv_detail);
        set(&mut visit.city, &self.city);
        set(&mut visit.zone, &self.zone);
        set(&mut visit.activity, &self.activity);
        set(&mut visit.channel, &self.channel);
        set(&mut visit.budget, &self.budget);
        set(&mut visit.expected_attendance, &self.expected_attendance);
        set(&mut visit.material_delivery_date, &self.material_delivery_date);
        set(&mut visit.delivery_place, &self.delivery_place);
        set(&mut visit.objective, &self.objective);
        set(&mut visit.sample_count, &self.sample_count);
        set(&mut visit.material_pop, &self.material_pop);
        set(&mut visit.other_materials, &self.other_materials);
    }
}

// --- Filtros de leitura (mês / executivo / asesor) ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitFilter {
    pub month: Option<YearMonth>,
    pub executive: Option<String>,
    pub agent: Option<String>,
}

impl VisitFilter {
    pub fn is_empty(&self) -> bool {
        self.month.is_none() && self.executive.is_none() && self.agent.is_none()
    }

    pub fn matches(&self, visit: &Visit) -> bool {
        if let Some(month) = &self.month {
            if !month.contains(visit.date) {
                return false;
            }
        }
        if let Some(executive) = &self.executive {
            if &visit.executive != executive {
                return false;
            }
        }
        if let Some(agent) = &self.agent {
            if visit.agent.as_ref() != Some(agent) {
                return false;
            }
        }
        true
    }
}
