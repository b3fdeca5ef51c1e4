//! handlers/mod.rs
//! Módulo que agrupa los distintos handlers (campañas, ledger, plantillas).
pub mod dispatch_handler;
pub mod ledger_handler;
pub mod template_handler;
