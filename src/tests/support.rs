//! tests/support.rs
//! Helpers compartidos: pool SQLite en memoria con las migraciones reales,
//! catálogo de prueba y transportes mock.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::dispatch_config::DispatchConfig;
use crate::error::TransportError;
use crate::models::template_model::Template;
use crate::services::dispatch_service::DispatchService;
use crate::services::ledger_service::LedgerService;
use crate::services::mail_transport::MailTransport;
use crate::services::recipient_resolver::RecipientResolver;
use crate::services::template_catalog::TemplateCatalog;
use crate::services::user_directory::SqliteUserDirectory;

pub async fn test_pool() -> Pool<Sqlite> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("No se pudo abrir SQLite en memoria");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Fallo en migraciones de test");

    pool
}

pub async fn insert_recipient(pool: &Pool<Sqlite>, id: i64, email: &str, name: &str) {
    sqlx::query(
        "INSERT INTO recipients (id, email, display_name, created_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(id)
    .bind(email)
    .bind(name)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .expect("No se pudo insertar recipient");
}

pub fn test_template(key: &str, subject: &str) -> Template {
    Template {
        key: key.to_string(),
        name: key.to_string(),
        subject: subject.to_string(),
        body: format!("<p>Cuerpo de {}</p>", key),
        description: String::new(),
        icon: String::new(),
    }
}

pub fn test_catalog() -> TemplateCatalog {
    TemplateCatalog::new(vec![
        test_template("welcome", "¡Bienvenido!"),
        test_template("examReminder", "Tu examen se acerca"),
    ])
}

/// Transporte mock: registra los envíos y puede fallar para direcciones
/// concretas o tardar un tiempo fijo (para probar el timeout).
#[derive(Default)]
pub struct MockTransport {
    pub sent: Mutex<Vec<String>>,
    fail_for: HashSet<String>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(MockTransport::default())
    }

    pub fn failing_for(emails: &[&str]) -> Arc<Self> {
        Arc::new(MockTransport {
            fail_for: emails.iter().map(|e| e.to_string()).collect(),
            ..MockTransport::default()
        })
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(MockTransport {
            delay: Some(delay),
            ..MockTransport::default()
        })
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MailTransport for MockTransport {
    async fn send(&self, to: &str, _subject: &str, _body: &str) -> Result<(), TransportError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_for.contains(to) {
            return Err(TransportError::Send(format!("rechazo simulado para {}", to)));
        }
        self.sent.lock().unwrap().push(to.to_string());
        Ok(())
    }
}

pub fn make_service(
    pool: &Pool<Sqlite>,
    transport: Arc<dyn MailTransport>,
    config: DispatchConfig,
) -> DispatchService {
    let directory = Arc::new(SqliteUserDirectory::new(pool.clone()));
    DispatchService::new(
        test_catalog(),
        RecipientResolver::new(directory),
        LedgerService::new(pool.clone()),
        transport,
        config,
    )
}

pub async fn count_deliveries(pool: &Pool<Sqlite>, status: Option<&str>) -> i64 {
    let row = match status {
        Some(s) => {
            sqlx::query("SELECT COUNT(*) AS cnt FROM deliveries WHERE status = ?1")
                .bind(s)
                .fetch_one(pool)
                .await
        }
        None => {
            sqlx::query("SELECT COUNT(*) AS cnt FROM deliveries")
                .fetch_one(pool)
                .await
        }
    }
    .expect("No se pudo contar deliveries");

    row.try_get("cnt").expect("Columna cnt ausente")
}
