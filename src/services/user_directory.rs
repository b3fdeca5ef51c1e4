//! services/user_directory.rs
//! Acceso al roster de usuarios. El sistema de usuarios es un colaborador
//! externo; aquí solo leemos su read-model (tabla `recipients`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

use crate::models::recipient_model::Recipient;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Roster completo.
    async fn list_all(&self) -> Result<Vec<Recipient>>;

    /// Los ids que no existen simplemente no vienen en la respuesta.
    async fn lookup(&self, ids: &[i64]) -> Result<Vec<Recipient>>;
}

#[derive(Clone)]
pub struct SqliteUserDirectory {
    db_pool: Pool<Sqlite>,
}

impl SqliteUserDirectory {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        SqliteUserDirectory { db_pool }
    }

    fn map_row(row: &sqlx::sqlite::SqliteRow) -> Result<Recipient> {
        Ok(Recipient {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            display_name: row.try_get("display_name")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl UserDirectory for SqliteUserDirectory {
    async fn list_all(&self) -> Result<Vec<Recipient>> {
        let rows = sqlx::query(
            r#"
            SELECT id, email, display_name, created_at
            FROM recipients
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db_pool)
        .await
        .context("Fallo al listar recipients")?;

        rows.iter().map(Self::map_row).collect()
    }

    async fn lookup(&self, ids: &[i64]) -> Result<Vec<Recipient>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = sqlx::QueryBuilder::<Sqlite>::new(
            "SELECT id, email, display_name, created_at FROM recipients WHERE id IN (",
        );
        let mut sep = qb.separated(", ");
        for id in ids {
            sep.push_bind(*id);
        }
        qb.push(") ORDER BY id");

        let rows = qb
            .build()
            .fetch_all(&self.db_pool)
            .await
            .context("Fallo al buscar recipients por id")?;

        rows.iter().map(Self::map_row).collect()
    }
}
