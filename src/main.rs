use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;

use crate::config::dispatch_config::DispatchConfig;
use crate::config::smtp_config::SmtpConfig;
use crate::logger::init_logger;
use crate::services::dispatch_service::DispatchService;
use crate::services::ledger_service::LedgerService;
use crate::services::mail_transport::{MailTransport, SmtpMailTransport};
use crate::services::recipient_resolver::RecipientResolver;
use crate::services::template_catalog::TemplateCatalog;
use crate::services::user_directory::SqliteUserDirectory;

mod app;
mod config;
mod error;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

async fn setup_database() -> Pool<Sqlite> {
    // 1) Crear carpeta "data"
    std::fs::create_dir_all("data").expect("No se pudo crear directorio 'data'");

    // 2) Ruta final: ./data/campaigns.db
    let db_path = std::env::current_dir()
        .expect("No se pudo obtener el current_dir")
        .join("data")
        .join("campaigns.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.to_string_lossy());

    log::info!("Conectando a SQLite en {}", db_url);

    SqlitePoolOptions::new()
        .connect(&db_url)
        .await
        .expect("No se pudo conectar a la base de datos SQLite.")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    // Conectarnos a la DB
    let db_pool = setup_database().await;

    // LedgerService (corre las migraciones de deliveries/recipients)
    let ledger_service = LedgerService::new(db_pool.clone());
    if let Err(e) = ledger_service.run_migrations().await {
        panic!("Fallo en migraciones: {:?}", e);
    }

    // Catálogo de plantillas (estático, se carga una vez)
    let templates_path =
        std::env::var("TEMPLATES_PATH").unwrap_or_else(|_| "./templates.json".to_string());
    let catalog = TemplateCatalog::load_from_file(&templates_path)
        .expect("No se pudo cargar el catálogo de plantillas");
    log::info!(
        "Catálogo de plantillas cargado: {} plantillas desde {}",
        catalog.list().len(),
        templates_path
    );

    // Transporte SMTP
    let smtp_config = SmtpConfig::from_env().expect("Configuración SMTP incompleta");
    let transport: Arc<dyn MailTransport> = Arc::new(
        SmtpMailTransport::new(&smtp_config).expect("No se pudo inicializar el transporte SMTP"),
    );

    // Directorio de usuarios + resolver
    let directory = Arc::new(SqliteUserDirectory::new(db_pool.clone()));
    let resolver = RecipientResolver::new(directory);

    // DispatchService
    let dispatch_config = DispatchConfig::from_env();
    log::info!(
        "Dispatch configurado: concurrencia={}, timeout por destinatario={}s",
        dispatch_config.concurrency,
        dispatch_config.per_recipient_timeout_secs
    );
    let dispatch_service = DispatchService::new(
        catalog.clone(),
        resolver,
        ledger_service.clone(),
        transport,
        dispatch_config,
    );

    // Levantar servidor
    log::info!("Levantando servidor en 0.0.0.0:5022");
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(catalog.clone()))
            .app_data(web::Data::new(ledger_service.clone()))
            .app_data(web::Data::new(dispatch_service.clone()))
            .configure(app::init_app)
    })
    .workers(1)
    .bind(("0.0.0.0", 5022))?
    .run()
    .await
}
