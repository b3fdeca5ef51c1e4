use serde::Serialize;

/// Destinatario tal y como lo entrega el directorio de usuarios.
/// Entrada de solo lectura para este servicio.
#[derive(Debug, Clone, Serialize)]
pub struct Recipient {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub created_at: String,
}

/// A quién va dirigida una campaña.
#[derive(Debug, Clone)]
pub enum RecipientTarget {
    /// Todos los destinatarios conocidos por el directorio.
    Everyone,
    /// Un conjunto explícito de ids (puede traer repetidos; el resolver
    /// deduplica).
    Ids(Vec<i64>),
}
