use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{
    models::delivery_model::{BulkStatusRequest, HistoryFilters, HistoryQuery},
    services::ledger_service::LedgerService,
};

/// GET /api/deliveries?page=&page_size=&status=&template_key=&recipient_id=
pub async fn history_endpoint(
    ledger_service: web::Data<LedgerService>,
    query: web::Query<HistoryQuery>,
) -> HttpResponse {
    let q = query.into_inner();
    let page = q.page.unwrap_or(1);
    let page_size = q.page_size.unwrap_or(20);

    let filters = HistoryFilters {
        status: q.status,
        template_key: q.template_key,
        recipient_id: q.recipient_id,
    };

    match ledger_service.query_history(&filters, page, page_size).await {
        Ok(result) => HttpResponse::Ok().json(json!({
            "success": true,
            "history": result
        })),
        Err(e) => {
            log::error!("History query error: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    }
}

/// GET /api/deliveries/statistics
pub async fn statistics_endpoint(ledger_service: web::Data<LedgerService>) -> HttpResponse {
    match ledger_service.per_template_counts().await {
        Ok(counts) => HttpResponse::Ok().json(json!({
            "success": true,
            "statistics": counts
        })),
        Err(e) => {
            log::error!("Statistics error: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    }
}

/// POST /api/deliveries/status
/// Matriz destinatarios × plantillas en una sola consulta; lo que evita
/// que la tabla del panel degenere en N×M requests.
pub async fn bulk_status_endpoint(
    ledger_service: web::Data<LedgerService>,
    body: web::Json<BulkStatusRequest>,
) -> HttpResponse {
    let req = body.into_inner();

    match ledger_service
        .bulk_status(&req.recipient_ids, &req.template_keys)
        .await
    {
        Ok(matrix) => HttpResponse::Ok().json(json!({
            "success": true,
            "statuses": matrix
        })),
        Err(e) => {
            log::error!("Bulk status error: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": e.to_string()
            }))
        }
    }
}
