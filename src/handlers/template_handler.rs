use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::services::template_catalog::TemplateCatalog;

/// GET /api/templates
pub async fn list_templates_endpoint(catalog: web::Data<TemplateCatalog>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "templates": catalog.list()
    }))
}
