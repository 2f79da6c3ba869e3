// src/db/visit_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::visit_store::VisitStore,
    models::{OverlapMap, Visit, VisitDraft, VisitFilter, VisitPatch},
};

const VISIT_COLUMNS: &str = "id, visit_date, executive, agent, chain, pdv_detail, city, zone, \
     activity, channel, budget, expected_attendance, material_delivery_date, delivery_place, \
     objective, sample_count, material_pop, other_materials";

const INSERT_COLUMNS: &str = "INSERT INTO visits (visit_date, executive, agent, chain, pdv_detail, \
     city, zone, activity, channel, budget, expected_attendance, material_delivery_date, \
     delivery_place, objective, sample_count, material_pop, other_materials) ";

// O Postgres aceita no máximo 65535 parâmetros por comando: 17 colunas x 1000 linhas cabe folgado.
const INSERT_CHUNK_SIZE: usize = 1000;

// O repositório de visitas, responsável por todas as interações com a tabela 'visits'
#[derive(Clone)]
pub struct PgVisitStore {
    pool: PgPool,
}

impl PgVisitStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VisitStore for PgVisitStore {
    async fn list(&self, filter: &VisitFilter) -> Result<Vec<Visit>, AppError> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {VISIT_COLUMNS} FROM visits WHERE TRUE"));

        if let Some(month) = filter.month {
            query
                .push(" AND visit_date >= ")
                .push_bind(month.first_day())
                .push(" AND visit_date < ")
                .push_bind(month.next_first_day());
        }
        if let Some(executive) = &filter.executive {
            query.push(" AND executive = ").push_bind(executive.clone());
        }
        if let Some(agent) = &filter.agent {
            query.push(" AND agent = ").push_bind(agent.clone());
        }
        query.push(" ORDER BY visit_date ASC, executive ASC");

        let visits = query
            .build_query_as::<Visit>()
            .fetch_all(&self.pool)
            .await?;
        Ok(visits)
    }

    async fn list_all(&self) -> Result<Vec<Visit>, AppError> {
        let visits = sqlx::query_as::<_, Visit>(&format!(
            "SELECT {VISIT_COLUMNS} FROM visits ORDER BY visit_date ASC, executive ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(visits)
    }

    async fn insert_one(&self, draft: &VisitDraft) -> Result<Visit, AppError> {
        let sql = format!(
            "{INSERT_COLUMNS} VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING {VISIT_COLUMNS}"
        );
        let visit = sqlx::query_as::<_, Visit>(&sql)
            .bind(draft.date)
            .bind(&draft.executive)
            .bind(&draft.agent)
            .bind(&draft.chain)
            .bind(&draft.pdv_detail)
            .bind(&draft.city)
            .bind(&draft.zone)
            .bind(draft.activity)
            .bind(&draft.channel)
            .bind(draft.budget)
            .bind(draft.expected_attendance)
            .bind(draft.material_delivery_date)
            .bind(&draft.delivery_place)
            .bind(&draft.objective)
            .bind(draft.sample_count)
            .bind(&draft.material_pop)
            .bind(&draft.other_materials)
            .fetch_one(&self.pool)
            .await?;
        Ok(visit)
    }

    async fn insert_batch(&self, drafts: &[VisitDraft]) -> Result<(), AppError> {
        if drafts.is_empty() {
            return Ok(());
        }

        // Uma transação para o lote inteiro: ou entra tudo, ou nada.
        let mut tx = self.pool.begin().await?;

        for chunk in drafts.chunks(INSERT_CHUNK_SIZE) {
            let mut query: QueryBuilder<Postgres> = QueryBuilder::new(INSERT_COLUMNS);
            query.push_values(chunk, |mut row, draft| {
                row.push_bind(draft.date)
                    .push_bind(draft.executive.clone())
                    .push_bind(draft.agent.clone())
                    .push_bind(draft.chain.clone())
                    .push_bind(draft.pdv_detail.clone())
                    .push_bind(draft.city.clone())
                    .push_bind(draft.zone.clone())
                    .push_bind(draft.activity)
                    .push_bind(draft.channel.clone())
                    .push_bind(draft.budget)
                    .push_bind(draft.expected_attendance)
                    .push_bind(draft.material_delivery_date)
                    .push_bind(draft.delivery_place.clone())
                    .push_bind(draft.objective.clone())
                    .push_bind(draft.sample_count)
                    .push_bind(draft.material_pop.clone())
                    .push_bind(draft.other_materials.clone());
            });
            query.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_one(&self, id: Uuid, patch: &VisitPatch) -> Result<(), AppError> {
        // COALESCE: parâmetro NULL mantém o valor atual da coluna.
        // Colunas anuláveis levam um flag "presente" antes do valor, para aceitar NULL.
        let result = sqlx::query(
            r#"
            UPDATE visits SET
                visit_date = COALESCE($2, visit_date),
                executive = COALESCE($3, executive),
                agent = CASE WHEN $4 THEN $5 ELSE agent END,
                chain = COALESCE($6, chain),
                pdv_detail = COALESCE($7, pdv_detail),
                city = COALESCE($8, city),
                zone = COALESCE($9, zone),
                activity = COALESCE($10, activity),
                channel = COALESCE($11, channel),
                budget = COALESCE($12, budget),
                expected_attendance = CASE WHEN $13 THEN $14 ELSE expected_attendance END,
                material_delivery_date = CASE WHEN $15 THEN $16 ELSE material_delivery_date END,
                delivery_place = CASE WHEN $17 THEN $18 ELSE delivery_place END,
                objective = CASE WHEN $19 THEN $20 ELSE objective END,
                sample_count = CASE WHEN $21 THEN $22 ELSE sample_count END,
                material_pop = CASE WHEN $23 THEN $24 ELSE material_pop END,
                other_materials = CASE WHEN $25 THEN $26 ELSE other_materials END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.date)
        .bind(&patch.executive)
        .bind(patch.agent.is_some())
        .bind(patch.agent.clone().flatten())
        .bind(&patch.chain)
        .bind(&patch.pdv_detail)
        .bind(&patch.city)
        .bind(&patch.zone)
        .bind(patch.activity)
        .bind(&patch.channel)
        .bind(patch.budget)
        .bind(patch.expected_attendance.is_some())
        .bind(patch.expected_attendance.flatten())
        .bind(patch.material_delivery_date.is_some())
        .bind(patch.material_delivery_date.flatten())
        .bind(patch.delivery_place.is_some())
        .bind(patch.delivery_place.clone().flatten())
        .bind(patch.objective.is_some())
        .bind(patch.objective.clone().flatten())
        .bind(patch.sample_count.is_some())
        .bind(patch.sample_count.flatten())
        .bind(patch.material_pop.is_some())
        .bind(patch.material_pop.clone().flatten())
        .bind(patch.other_materials.is_some())
        .bind(patch.other_materials.clone().flatten())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::VisitNotFound(id));
        }
        Ok(())
    }

    async fn delete_one(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM visits WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::VisitNotFound(id));
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM visits").execute(&self.pool).await?;
        Ok(())
    }

    async fn delete_where(&self, month_to_executives: &OverlapMap) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut deleted = 0;

        for (month, executives) in month_to_executives {
            if executives.is_empty() {
                continue;
            }
            let executives: Vec<String> = executives.iter().cloned().collect();
            let result = sqlx::query(
                "DELETE FROM visits WHERE visit_date >= $1 AND visit_date < $2 AND executive = ANY($3)",
            )
            .bind(month.first_day())
            .bind(month.next_first_day())
            .bind(executives)
            .execute(&mut *tx)
            .await?;
            deleted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(deleted)
    }
}
