//! Packing reconciliation tests: the work queue, confirmation and weight
//! validation, the advisory anomaly policy, and replace-on-refinalize.

mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;

use common::{package_of, picking_line, session_key, TestApp};
use fulfillment_core::services::packing::{PackageCheck, PackingStatus};
use fulfillment_core::store::TableStore;
use fulfillment_core::ServiceError;

const USER: &str = "ana@example.com";

fn check(package_id: u32, measured: rust_decimal::Decimal) -> PackageCheck {
    PackageCheck {
        package_id,
        confirmed: true,
        measured_weight: Some(measured),
    }
}

/// Separate order 100 at A1 cleanly into two packages of item X.
async fn separated_app() -> TestApp {
    let app = TestApp::with_picking(vec![picking_line(100, "X", "A1", dec!(10), "UN")]).await;
    let key = session_key(100, "A1", USER);
    app.services
        .separation
        .start_separation(100, "A1", USER)
        .await
        .unwrap();
    app.services
        .separation
        .add_package(&key, package_of(dec!(5), &[("X", dec!(6))]))
        .await
        .unwrap();
    app.services
        .separation
        .add_package(&key, package_of(dec!(3), &[("X", dec!(4))]))
        .await
        .unwrap();
    app.services
        .separation
        .finalize_separation(&key, "")
        .await
        .unwrap();
    app
}

#[tokio::test]
async fn queue_lists_one_row_per_package_with_weight() {
    let app = separated_app().await;

    let queue = app.services.packing.list_ready_for_packing().await.unwrap();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].package_id, 1);
    assert_eq!(queue[0].weight, dec!(5));
    assert_eq!(queue[1].package_id, 2);
    assert_eq!(queue[1].weight, dec!(3));
    for entry in &queue {
        assert_eq!(entry.status, PackingStatus::AguardandoInicio);
    }
}

#[tokio::test]
async fn discrepant_keys_are_hidden_from_the_queue() {
    let app = TestApp::with_picking(vec![
        picking_line(100, "X", "A1", dec!(10), "UN"),
        picking_line(200, "X", "A1", dec!(10), "UN"),
    ])
    .await;

    // Order 100 separated short (discrepancy), order 200 cleanly.
    for (order_id, quantity) in [(100, dec!(6)), (200, dec!(10))] {
        let key = session_key(order_id, "A1", USER);
        app.services
            .separation
            .start_separation(order_id, "A1", USER)
            .await
            .unwrap();
        app.services
            .separation
            .add_package(&key, package_of(dec!(5), &[("X", quantity)]))
            .await
            .unwrap();
        app.services
            .separation
            .finalize_separation(&key, "")
            .await
            .unwrap();
    }

    let queue = app.services.packing.list_ready_for_packing().await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].order_id, 200);
}

#[tokio::test]
async fn verification_view_groups_package_items() {
    let app = separated_app().await;

    let packages = app
        .services
        .packing
        .packages_for_verification(100, "A1")
        .await
        .unwrap();
    assert_eq!(packages.len(), 2);
    assert_eq!(packages[0].declared_weight, dec!(5));
    assert_eq!(packages[0].items[0].item_code, "X");
    assert_eq!(packages[0].items[0].quantity, dec!(6));

    assert!(app
        .services
        .packing
        .packages_for_verification(999, "A1")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn every_package_must_be_confirmed() {
    let app = separated_app().await;

    let errors = app
        .services
        .packing
        .verify_and_finalize(100, "A1", &[check(1, dec!(5))], USER)
        .await
        .unwrap();
    assert_eq!(errors, vec!["Package 2 must be confirmed".to_string()]);

    // Blocking: nothing was written.
    assert!(app.store.load_packing().await.unwrap().is_empty());
}

#[tokio::test]
async fn unconfirmed_flag_blocks_even_with_a_weight() {
    let app = separated_app().await;

    let checks = vec![
        check(1, dec!(5)),
        PackageCheck {
            package_id: 2,
            confirmed: false,
            measured_weight: Some(dec!(3)),
        },
    ];
    let errors = app
        .services
        .packing
        .verify_and_finalize(100, "A1", &checks, USER)
        .await
        .unwrap();
    assert_eq!(errors.len(), 1);
    assert!(app.store.load_packing().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_measured_weight_blocks() {
    let app = separated_app().await;

    let checks = vec![
        check(1, dec!(5)),
        PackageCheck {
            package_id: 2,
            confirmed: true,
            measured_weight: None,
        },
    ];
    let errors = app
        .services
        .packing
        .verify_and_finalize(100, "A1", &checks, USER)
        .await
        .unwrap();
    assert_eq!(
        errors,
        vec!["Measured weight for package 2 is not a valid number".to_string()]
    );
    assert!(app.store.load_packing().await.unwrap().is_empty());
}

#[tokio::test]
async fn weight_divergence_beyond_tolerance_is_advisory() {
    let app = separated_app().await;

    // Package 1 declared 5.0, measured 5.3: 6% over the 5% tolerance.
    let errors = app
        .services
        .packing
        .verify_and_finalize(100, "A1", &[check(1, dec!(5.3)), check(2, dec!(3))], USER)
        .await
        .unwrap();
    assert!(errors.is_empty());

    let records = app.store.load_packing().await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0]
        .anomaly_notes
        .contains("Divergência de peso no Pacote 1"));
    assert!(records[1].anomaly_notes.is_empty());
}

#[tokio::test]
async fn weight_within_tolerance_leaves_no_anomaly() {
    let app = separated_app().await;

    // 5.2 on a declared 5.0 is a 4% divergence, inside the tolerance.
    let errors = app
        .services
        .packing
        .verify_and_finalize(100, "A1", &[check(1, dec!(5.2)), check(2, dec!(3))], USER)
        .await
        .unwrap();
    assert!(errors.is_empty());

    let records = app.store.load_packing().await.unwrap();
    assert!(records.iter().all(|r| r.anomaly_notes.is_empty()));
}

#[tokio::test]
async fn refinalizing_replaces_packing_records() {
    let app = separated_app().await;
    let checks = vec![check(1, dec!(5)), check(2, dec!(3))];

    for _ in 0..2 {
        let errors = app
            .services
            .packing
            .verify_and_finalize(100, "A1", &checks, USER)
            .await
            .unwrap();
        assert!(errors.is_empty());
    }

    let records = app.store.load_packing().await.unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn finalized_keys_show_up_as_finalizado_in_the_queue() {
    let app = separated_app().await;

    app.services
        .packing
        .verify_and_finalize(100, "A1", &[check(1, dec!(5)), check(2, dec!(3))], USER)
        .await
        .unwrap();

    let queue = app.services.packing.list_ready_for_packing().await.unwrap();
    assert!(queue
        .iter()
        .all(|entry| entry.status == PackingStatus::Finalizado));
}

#[tokio::test]
async fn verifying_an_unknown_key_is_not_found() {
    let app = separated_app().await;

    let result = app
        .services
        .packing
        .verify_and_finalize(999, "A1", &[], USER)
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn failed_save_surfaces_as_persistence_failure() {
    let app = separated_app().await;

    app.store.set_fail_saves(true);
    let result = app
        .services
        .packing
        .verify_and_finalize(100, "A1", &[check(1, dec!(5)), check(2, dec!(3))], USER)
        .await;
    assert_matches!(result, Err(ServiceError::PersistenceFailure(_)));

    app.store.set_fail_saves(false);
    let errors = app
        .services
        .packing
        .verify_and_finalize(100, "A1", &[check(1, dec!(5)), check(2, dec!(3))], USER)
        .await
        .unwrap();
    assert!(errors.is_empty());
}
