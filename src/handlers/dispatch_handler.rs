use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{
    error::CampaignError,
    models::campaign_model::{DispatchCampaignRequest, SendSingleRequest},
    models::recipient_model::RecipientTarget,
    services::dispatch_service::DispatchService,
};

/// Errores estructurales de campaña → status HTTP. Los fallos por
/// destinatario nunca llegan aquí: van dentro del CampaignResult.
fn campaign_error_response(e: &CampaignError) -> HttpResponse {
    let status_code = match e {
        CampaignError::UnknownTemplate(_) => actix_web::http::StatusCode::NOT_FOUND,
        CampaignError::InvalidRequest(_) => actix_web::http::StatusCode::BAD_REQUEST,
        _ => actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
    };

    HttpResponse::build(status_code).json(json!({
        "success": false,
        "error": e.to_string()
    }))
}

/// POST /api/campaigns/dispatch
pub async fn dispatch_campaign_endpoint(
    dispatch_service: web::Data<DispatchService>,
    body: web::Json<DispatchCampaignRequest>,
) -> HttpResponse {
    let req = body.into_inner();

    // Idempotencia automática cuando hay plantilla; los envíos custom no
    // tienen identidad contra la que deduplicar.
    let idempotent = req.template_key.is_some();

    let target = match req.recipient_ids {
        Some(ids) => RecipientTarget::Ids(ids),
        None => RecipientTarget::Everyone,
    };

    let campaign =
        match dispatch_service.build_campaign(req.subject, req.body, req.template_key) {
            Ok(c) => c,
            Err(e) => return campaign_error_response(&e),
        };

    match dispatch_service.dispatch(campaign, target, idempotent).await {
        Ok(result) => HttpResponse::Ok().json(json!({
            "success": true,
            "result": result
        })),
        Err(e) => {
            log::error!("Dispatch error: {}", e);
            campaign_error_response(&e)
        }
    }
}

/// POST /api/campaigns/send-single
pub async fn send_single_endpoint(
    dispatch_service: web::Data<DispatchService>,
    body: web::Json<SendSingleRequest>,
) -> HttpResponse {
    let req = body.into_inner();

    match dispatch_service
        .send_single(req.recipient_id, &req.template_key)
        .await
    {
        Ok(outcome) => HttpResponse::Ok().json(json!({
            "success": true,
            "outcome": outcome
        })),
        Err(e) => {
            log::error!("Send-single error: {}", e);
            campaign_error_response(&e)
        }
    }
}
