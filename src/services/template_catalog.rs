//! services/template_catalog.rs
//! Catálogo estático de plantillas. Se construye una vez al arrancar
//! desde templates.json y no se muta en runtime.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CampaignError;
use crate::models::template_model::Template;

#[derive(Clone)]
pub struct TemplateCatalog {
    // Vec para conservar el orden del archivo, mapa para lookup por clave.
    templates: Arc<Vec<Template>>,
    by_key: Arc<HashMap<String, usize>>,
}

impl TemplateCatalog {
    pub fn new(templates: Vec<Template>) -> Self {
        let mut by_key = HashMap::with_capacity(templates.len());
        for (idx, template) in templates.iter().enumerate() {
            if by_key.insert(template.key.clone(), idx).is_some() {
                log::warn!(
                    "(TemplateCatalog) Clave duplicada '{}' en el catálogo; gana la última",
                    template.key
                );
            }
        }
        TemplateCatalog {
            templates: Arc::new(templates),
            by_key: Arc::new(by_key),
        }
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("No se pudo leer el catálogo en '{}'", path))?;
        let templates: Vec<Template> = serde_json::from_str(&raw)
            .with_context(|| format!("JSON de plantillas inválido en '{}'", path))?;
        Ok(TemplateCatalog::new(templates))
    }

    pub fn resolve(&self, key: &str) -> Result<&Template, CampaignError> {
        self.by_key
            .get(key)
            .map(|idx| &self.templates[*idx])
            .ok_or_else(|| CampaignError::UnknownTemplate(key.to_string()))
    }

    /// Plantillas en el orden del archivo.
    pub fn list(&self) -> &[Template] {
        &self.templates
    }
}
