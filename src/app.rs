//! app.rs
use crate::handlers::{dispatch_handler, ledger_handler, template_handler};
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/campaigns")
                    .route(
                        "/dispatch",
                        web::post().to(dispatch_handler::dispatch_campaign_endpoint),
                    )
                    .route(
                        "/send-single",
                        web::post().to(dispatch_handler::send_single_endpoint),
                    ),
            )
            .service(
                web::scope("/deliveries")
                    .route("", web::get().to(ledger_handler::history_endpoint))
                    .route(
                        "/statistics",
                        web::get().to(ledger_handler::statistics_endpoint),
                    )
                    .route(
                        "/status",
                        web::post().to(ledger_handler::bulk_status_endpoint),
                    ),
            )
            .service(
                web::scope("/templates")
                    .route("", web::get().to(template_handler::list_templates_endpoint)),
            ),
    );
}
