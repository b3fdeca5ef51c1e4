//! services/mod.rs
//! Módulo que agrupa los servicios (catálogo, resolver, ledger, dispatch, etc.).
pub mod dispatch_service;
pub mod ledger_service;
pub mod mail_transport;
pub mod recipient_resolver;
pub mod template_catalog;
pub mod user_directory;
