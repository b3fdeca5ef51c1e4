//! models/mod.rs
//! Módulo que agrupa los distintos modelos (campañas, plantillas, ledger, etc.).
pub mod campaign_model;
pub mod delivery_model;
pub mod recipient_model;
pub mod template_model;
