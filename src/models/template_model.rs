use serde::{Deserialize, Serialize};

/// Plantilla de correo: clave + subject/body inmutables.
/// `description` e `icon` son metadatos que solo consume la UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub key: String,
    pub name: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}
