//! services/ledger_service.rs
//! Ledger de envíos: append-only, una fila por intento. El índice único
//! parcial de `deliveries` es quien garantiza "a lo sumo un 'sent' por
//! (destinatario, plantilla)" incluso con dispatches concurrentes.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::delivery_model::{
    BulkStatusMatrix, DeliveryRecord, HistoryFilters, ListDeliveriesResponse, NewDeliveryRecord,
    TemplateSendStatus,
};

#[derive(Clone)]
pub struct LedgerService {
    db_pool: Pool<Sqlite>,
}

impl LedgerService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        LedgerService { db_pool }
    }

    /// Corre migraciones con sqlx
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db_pool)
            .await
            .context("Fallo al correr migraciones del ledger")?;
        Ok(())
    }

    /// Inserta exactamente una fila. Si el índice único rechaza el INSERT
    /// (ya había un 'sent' para ese par destinatario/plantilla) se devuelve
    /// `DuplicateSend`; el resto de errores de storage son `Write`.
    pub async fn append(&self, record: &NewDeliveryRecord) -> Result<(), LedgerError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO deliveries (
                id, recipient_id, recipient_email, template_key,
                subject, status, failure_kind, failure_reason, sent_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&id)
        .bind(record.recipient_id)
        .bind(&record.recipient_email)
        .bind(&record.template_key)
        .bind(&record.subject)
        .bind(record.status.as_str())
        .bind(record.failure_kind.map(|k| k.as_str()))
        .bind(&record.failure_reason)
        .bind(&now)
        .execute(&self.db_pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(LedgerError::DuplicateSend {
                    recipient_id: record.recipient_id,
                    template_key: record.template_key.clone().unwrap_or_default(),
                })
            }
            Err(e) => Err(LedgerError::Write(e)),
        }
    }

    /// Lookup masivo: una sola query para todo el producto
    /// destinatarios × plantillas. Devuelve, por destinatario, las claves
    /// que ya tienen un 'sent' y su timestamp.
    pub async fn bulk_lookup(
        &self,
        recipient_ids: &[i64],
        template_keys: &[String],
    ) -> Result<HashMap<i64, HashMap<String, String>>, LedgerError> {
        if recipient_ids.is_empty() || template_keys.is_empty() {
            return Ok(HashMap::new());
        }

        let mut qb = sqlx::QueryBuilder::<Sqlite>::new(
            r#"
            SELECT recipient_id, template_key, sent_at
            FROM deliveries
            WHERE status = 'sent' AND template_key IN (
            "#,
        );
        let mut sep = qb.separated(", ");
        for key in template_keys {
            sep.push_bind(key.as_str());
        }
        qb.push(") AND recipient_id IN (");
        let mut sep = qb.separated(", ");
        for id in recipient_ids {
            sep.push_bind(*id);
        }
        qb.push(")");

        let rows = qb.build().fetch_all(&self.db_pool).await?;

        let mut lookup: HashMap<i64, HashMap<String, String>> = HashMap::new();
        for row in rows {
            let recipient_id: i64 = row.try_get("recipient_id")?;
            let template_key: String = row.try_get("template_key")?;
            let sent_at: String = row.try_get("sent_at")?;
            lookup
                .entry(recipient_id)
                .or_default()
                .insert(template_key, sent_at);
        }
        Ok(lookup)
    }

    /// Ids que ya recibieron `template_key`. Lo usa el orquestador para
    /// filtrar antes de enviar.
    pub async fn already_sent(
        &self,
        recipient_ids: &[i64],
        template_key: &str,
    ) -> Result<HashSet<i64>, LedgerError> {
        let keys = vec![template_key.to_string()];
        let lookup = self.bulk_lookup(recipient_ids, &keys).await?;
        Ok(lookup
            .into_iter()
            .filter(|(_, keys)| keys.contains_key(template_key))
            .map(|(id, _)| id)
            .collect())
    }

    /// Matriz completa N×M para la tabla del panel. La ausencia de fila es
    /// `sent=false`, no un error.
    pub async fn bulk_status(
        &self,
        recipient_ids: &[i64],
        template_keys: &[String],
    ) -> Result<BulkStatusMatrix, LedgerError> {
        let lookup = self.bulk_lookup(recipient_ids, template_keys).await?;

        let mut matrix: BulkStatusMatrix = HashMap::new();
        for recipient_id in recipient_ids {
            let sent_keys = lookup.get(recipient_id);
            let row = matrix.entry(*recipient_id).or_default();
            for key in template_keys {
                let sent_at = sent_keys.and_then(|m| m.get(key)).cloned();
                row.insert(
                    key.clone(),
                    TemplateSendStatus {
                        sent: sent_at.is_some(),
                        sent_at,
                    },
                );
            }
        }
        Ok(matrix)
    }

    /// Conteo de 'sent' por plantilla, solo para estadísticas de la UI.
    pub async fn per_template_counts(&self) -> Result<HashMap<String, i64>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT template_key, COUNT(*) AS cnt
            FROM deliveries
            WHERE status = 'sent' AND template_key IS NOT NULL
            GROUP BY template_key
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let key: String = row.try_get("template_key")?;
            let cnt: i64 = row.try_get("cnt")?;
            counts.insert(key, cnt);
        }
        Ok(counts)
    }

    /// Historial paginado, más reciente primero.
    pub async fn query_history(
        &self,
        filters: &HistoryFilters,
        page: u64,
        page_size: u64,
    ) -> Result<ListDeliveriesResponse, LedgerError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, 200);
        let offset = (page - 1) * page_size;

        // total
        let mut count_qb = sqlx::QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS cnt FROM deliveries");
        Self::push_filters(&mut count_qb, filters);
        let total_row = count_qb.build().fetch_one(&self.db_pool).await?;
        let total: i64 = total_row.try_get("cnt")?;

        // items
        let mut qb = sqlx::QueryBuilder::<Sqlite>::new(
            r#"
            SELECT id, recipient_id, recipient_email, template_key,
                   subject, status, failure_kind, failure_reason, sent_at
            FROM deliveries
            "#,
        );
        Self::push_filters(&mut qb, filters);
        qb.push(" ORDER BY sent_at DESC, id DESC LIMIT ");
        qb.push_bind(page_size as i64);
        qb.push(" OFFSET ");
        qb.push_bind(offset as i64);

        let rows = qb.build().fetch_all(&self.db_pool).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(DeliveryRecord {
                id: row.try_get("id")?,
                recipient_id: row.try_get("recipient_id")?,
                recipient_email: row.try_get("recipient_email")?,
                template_key: row.try_get("template_key")?,
                subject: row.try_get("subject")?,
                status: row.try_get("status")?,
                failure_kind: row.try_get("failure_kind")?,
                failure_reason: row.try_get("failure_reason")?,
                sent_at: row.try_get("sent_at")?,
            });
        }

        Ok(ListDeliveriesResponse {
            total: total as u64,
            page,
            page_size,
            items,
        })
    }

    fn push_filters(qb: &mut sqlx::QueryBuilder<Sqlite>, filters: &HistoryFilters) {
        qb.push(" WHERE 1 = 1");
        if let Some(status) = &filters.status {
            qb.push(" AND status = ");
            qb.push_bind(status.clone());
        }
        if let Some(template_key) = &filters.template_key {
            qb.push(" AND template_key = ");
            qb.push_bind(template_key.clone());
        }
        if let Some(recipient_id) = filters.recipient_id {
            qb.push(" AND recipient_id = ");
            qb.push_bind(recipient_id);
        }
    }
}
