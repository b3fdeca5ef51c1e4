//! tests/dispatch_tests.rs
//! Pruebas del motor de dispatch: idempotencia, aislamiento de fallos,
//! timeout y send-single.

use actix_rt::test;
use std::time::Duration;

use crate::config::dispatch_config::DispatchConfig;
use crate::error::CampaignError;
use crate::models::campaign_model::{Campaign, SendSingleOutcome};
use crate::models::delivery_model::{FailureKind, NewDeliveryRecord};
use crate::models::recipient_model::{Recipient, RecipientTarget};
use crate::services::ledger_service::LedgerService;
use crate::tests::support::{
    count_deliveries, insert_recipient, make_service, test_pool, MockTransport,
};

fn welcome_campaign() -> Campaign {
    Campaign {
        subject: "¡Bienvenido!".to_string(),
        body: "<p>Hola</p>".to_string(),
        template_key: Some("welcome".to_string()),
    }
}

fn custom_campaign() -> Campaign {
    Campaign {
        subject: "Aviso puntual".to_string(),
        body: "<p>Mensaje sin plantilla</p>".to_string(),
        template_key: None,
    }
}

#[test]
async fn test_idempotent_dispatch_skips_already_sent() {
    let pool = test_pool().await;
    insert_recipient(&pool, 1, "ana@example.com", "Ana").await;
    insert_recipient(&pool, 2, "bea@example.com", "Bea").await;
    insert_recipient(&pool, 3, "carlos@example.com", "Carlos").await;

    let transport = MockTransport::new();
    let service = make_service(&pool, transport.clone(), DispatchConfig::default());

    let first = service
        .dispatch(welcome_campaign(), RecipientTarget::Everyone, true)
        .await
        .expect("Primer dispatch falló");
    assert_eq!(first.total_recipients, 3);
    assert_eq!(first.selected_recipients, 3);
    assert_eq!(first.emails_sent, 3);
    assert_eq!(first.emails_failed, 0);

    // Segundo dispatch idéntico: todos ya recibieron la plantilla.
    let second = service
        .dispatch(welcome_campaign(), RecipientTarget::Everyone, true)
        .await
        .expect("Segundo dispatch falló");
    assert_eq!(second.total_recipients, 3);
    assert_eq!(second.selected_recipients, 0);
    assert_eq!(second.emails_sent, 0);
    assert_eq!(second.emails_failed, 0);

    // El transporte solo vio 3 envíos y el ledger tiene 3 filas 'sent'.
    assert_eq!(transport.sent_count(), 3);
    assert_eq!(count_deliveries(&pool, Some("sent")).await, 3);
    assert_eq!(count_deliveries(&pool, None).await, 3);
}

#[test]
async fn test_partial_failure_does_not_abort_batch() {
    let pool = test_pool().await;
    insert_recipient(&pool, 1, "ana@example.com", "Ana").await;
    insert_recipient(&pool, 2, "bea@example.com", "Bea").await;
    insert_recipient(&pool, 3, "carlos@example.com", "Carlos").await;

    let transport = MockTransport::failing_for(&["bea@example.com"]);
    let service = make_service(&pool, transport, DispatchConfig::default());

    let result = service
        .dispatch(welcome_campaign(), RecipientTarget::Everyone, true)
        .await
        .expect("Dispatch falló");

    assert_eq!(result.emails_sent, 2);
    assert_eq!(result.emails_failed, 1);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].recipient_id, 2);
    assert_eq!(result.failures[0].kind, FailureKind::Transport);

    // N filas en total: N-1 'sent' y 1 'failed'.
    assert_eq!(count_deliveries(&pool, Some("sent")).await, 2);
    assert_eq!(count_deliveries(&pool, Some("failed")).await, 1);
}

#[test]
async fn test_custom_campaign_allows_repeats() {
    let pool = test_pool().await;
    insert_recipient(&pool, 1, "ana@example.com", "Ana").await;

    let transport = MockTransport::new();
    let service = make_service(&pool, transport, DispatchConfig::default());

    for _ in 0..2 {
        let result = service
            .dispatch(custom_campaign(), RecipientTarget::Ids(vec![1]), false)
            .await
            .expect("Dispatch custom falló");
        assert_eq!(result.emails_sent, 1);
    }

    // Sin plantilla no hay restricción de unicidad: dos filas 'sent'.
    assert_eq!(count_deliveries(&pool, Some("sent")).await, 2);
}

#[test]
async fn test_duplicate_ids_are_collapsed() {
    let pool = test_pool().await;
    insert_recipient(&pool, 5, "eva@example.com", "Eva").await;

    let transport = MockTransport::new();
    let service = make_service(&pool, transport.clone(), DispatchConfig::default());

    let result = service
        .dispatch(welcome_campaign(), RecipientTarget::Ids(vec![5, 5, 5]), true)
        .await
        .expect("Dispatch falló");

    assert_eq!(result.total_recipients, 1, "Los ids repetidos deben colapsar");
    assert_eq!(result.emails_sent, 1);
    assert_eq!(transport.sent_count(), 1);
    assert_eq!(count_deliveries(&pool, None).await, 1);
}

#[test]
async fn test_empty_target_is_normal_terminal_state() {
    let pool = test_pool().await;

    let transport = MockTransport::new();
    let service = make_service(&pool, transport, DispatchConfig::default());

    let result = service
        .dispatch(welcome_campaign(), RecipientTarget::Ids(vec![]), true)
        .await
        .expect("Un target vacío no debe ser error");

    assert_eq!(result.total_recipients, 0);
    assert_eq!(result.selected_recipients, 0);
    assert_eq!(result.emails_sent, 0);
    assert_eq!(result.emails_failed, 0);
    assert_eq!(count_deliveries(&pool, None).await, 0);
}

#[test]
async fn test_unknown_template_rejected_before_sending() {
    let pool = test_pool().await;
    insert_recipient(&pool, 1, "ana@example.com", "Ana").await;

    let transport = MockTransport::new();
    let service = make_service(&pool, transport.clone(), DispatchConfig::default());

    let campaign = Campaign {
        subject: "Da igual".to_string(),
        body: "<p>Da igual</p>".to_string(),
        template_key: Some("does_not_exist".to_string()),
    };

    let result = service
        .dispatch(campaign, RecipientTarget::Everyone, true)
        .await;

    assert!(
        matches!(result, Err(CampaignError::UnknownTemplate(ref k)) if k.as_str() == "does_not_exist"),
        "Se esperaba UnknownTemplate"
    );
    assert_eq!(transport.sent_count(), 0);
    assert_eq!(count_deliveries(&pool, None).await, 0);
}

#[test]
async fn test_timeout_recorded_as_failed() {
    let pool = test_pool().await;
    insert_recipient(&pool, 1, "ana@example.com", "Ana").await;

    // Transporte que tarda más que el timeout configurado (1s).
    let transport = MockTransport::with_delay(Duration::from_millis(1500));
    let config = DispatchConfig {
        concurrency: 2,
        per_recipient_timeout_secs: 1,
    };
    let service = make_service(&pool, transport, config);

    let result = service
        .dispatch(welcome_campaign(), RecipientTarget::Ids(vec![1]), true)
        .await
        .expect("Dispatch falló");

    assert_eq!(result.emails_sent, 0);
    assert_eq!(result.emails_failed, 1);
    assert_eq!(result.failures[0].kind, FailureKind::Timeout);
    assert_eq!(count_deliveries(&pool, Some("failed")).await, 1);
}

#[test]
async fn test_race_loser_recorded_as_duplicate_failure() {
    let pool = test_pool().await;
    insert_recipient(&pool, 1, "ana@example.com", "Ana").await;

    // Simula que otro dispatch ya registró el 'sent' para (1, welcome).
    let ledger = LedgerService::new(pool.clone());
    let winner = Recipient {
        id: 1,
        email: "ana@example.com".to_string(),
        display_name: "Ana".to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    ledger
        .append(&NewDeliveryRecord::sent(&winner, &welcome_campaign()))
        .await
        .expect("Append inicial falló");

    // Dispatch SIN filtro de idempotencia: el transporte envía, pero el
    // ledger rechaza la segunda fila 'sent'.
    let transport = MockTransport::new();
    let service = make_service(&pool, transport, DispatchConfig::default());

    let result = service
        .dispatch(welcome_campaign(), RecipientTarget::Ids(vec![1]), false)
        .await
        .expect("Dispatch falló");

    assert_eq!(result.emails_sent, 0);
    assert_eq!(result.emails_failed, 1);
    assert_eq!(result.failures[0].kind, FailureKind::Duplicate);

    // Queda la fila 'sent' original y la 'failed: duplicate' del perdedor.
    assert_eq!(count_deliveries(&pool, Some("sent")).await, 1);
    assert_eq!(count_deliveries(&pool, Some("failed")).await, 1);
}

#[test]
async fn test_send_single_lifecycle() {
    let pool = test_pool().await;
    insert_recipient(&pool, 1, "ana@example.com", "Ana").await;

    let transport = MockTransport::new();
    let service = make_service(&pool, transport, DispatchConfig::default());

    let first = service
        .send_single(1, "welcome")
        .await
        .expect("send_single falló");
    assert_eq!(first, SendSingleOutcome::Sent);

    let second = service
        .send_single(1, "welcome")
        .await
        .expect("send_single falló");
    assert_eq!(second, SendSingleOutcome::AlreadySent);

    // Destinatario inexistente.
    let missing = service
        .send_single(999, "welcome")
        .await
        .expect("send_single falló");
    assert!(
        matches!(missing, SendSingleOutcome::Failed { .. }),
        "Un id inexistente debe reportarse como failed"
    );

    // Plantilla desconocida: rechazo estructural.
    let unknown = service.send_single(1, "does_not_exist").await;
    assert!(matches!(unknown, Err(CampaignError::UnknownTemplate(_))));
}

#[test]
async fn test_invalid_emails_not_counted_as_failures() {
    let pool = test_pool().await;
    insert_recipient(&pool, 1, "ana@example.com", "Ana").await;
    insert_recipient(&pool, 2, "esto-no-es-un-email", "Bea").await;

    let transport = MockTransport::new();
    let service = make_service(&pool, transport, DispatchConfig::default());

    let result = service
        .dispatch(welcome_campaign(), RecipientTarget::Everyone, true)
        .await
        .expect("Dispatch falló");

    // El excluido nunca se intentó: no cuenta ni como total ni como fallo.
    assert_eq!(result.total_recipients, 1);
    assert_eq!(result.emails_sent, 1);
    assert_eq!(result.emails_failed, 0);
    assert_eq!(count_deliveries(&pool, None).await, 1);
}
