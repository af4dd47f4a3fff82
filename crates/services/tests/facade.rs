//! End-to-end facade tests over the in-memory stores.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use client::{Cache, RetryPolicy, TtlCache};
use common::Pagination;
use models::inventory::NewInventoryRecord;
use models::notification::NewNotification;
use models::price::NewPrice;
use models::sale::NewSale;
use models::shift::{CloseShift, NewShift};
use models::station::{NewStation, StationFilter};
use models::tables;
use models::violation::{NewViolation, ViolationPhoto};
use models::{FuelType, InventoryKind, NotificationKind, ViolationCategory};
use services::PumpGuard;
use store::mock::{MemoryBlobStore, MemoryStore, MockAuth};
use store::{AuthStore as _, AuthUser};

struct Harness {
    guard: PumpGuard,
    tables: Arc<MemoryStore>,
    auth: Arc<MockAuth>,
    blobs: Arc<MemoryBlobStore>,
}

fn harness() -> Harness {
    let tables = Arc::new(MemoryStore::new());
    let auth = Arc::new(MockAuth::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let cache: Arc<dyn Cache> = Arc::new(TtlCache::new());
    let guard = PumpGuard::with_parts(
        tables.clone(),
        auth.clone(),
        blobs.clone(),
        cache,
        "photos".into(),
        RetryPolicy::default(),
    );
    Harness { guard, tables, auth, blobs }
}

fn admin() -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        email: "admin@pumpguard.app".into(),
        role: Some("admin".into()),
        omc_id: None,
        station_id: None,
    }
}

fn station_row(id: Uuid, name: &str, omc_id: Option<Uuid>) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "code": "GA-100",
        "region": "Greater Accra",
        "address": null,
        "omc_id": omc_id,
        "dealer_id": null,
        "active": true,
        "created_at": Utc::now(),
        "updated_at": null,
    })
}

#[tokio::test]
async fn sign_in_then_create_station_records_activity() {
    let h = harness();
    h.auth.register("admin@pumpguard.app", "hunter2", admin());

    let signed = h.guard.auth().sign_in("admin@pumpguard.app", "hunter2").await;
    assert!(signed.is_success());

    let created = h
        .guard
        .stations()
        .create(NewStation {
            name: "Shell Adenta".into(),
            code: "GA-104".into(),
            region: "Greater Accra".into(),
            address: None,
            omc_id: None,
        })
        .await;
    assert!(created.is_success(), "{:?}", created.error);
    assert_eq!(h.tables.rows(tables::STATIONS).len(), 1);

    let log = h.tables.rows(tables::ACTIVITY_LOGS);
    let ops: Vec<_> = log.iter().filter_map(|r| r["operation"].as_str()).collect();
    assert!(ops.contains(&"auth.sign_in"));
    assert!(ops.contains(&"stations.create"));
}

#[tokio::test]
async fn unauthenticated_writes_are_refused_before_the_store() {
    let h = harness();
    let resp = h
        .guard
        .stations()
        .create(NewStation {
            name: "Shell Adenta".into(),
            code: "GA-104".into(),
            region: "Greater Accra".into(),
            address: None,
            omc_id: None,
        })
        .await;
    assert!(!resp.is_success());
    assert_eq!(resp.error_code.as_deref(), Some("AUTH_REQUIRED"));
    assert!(h.tables.rows(tables::STATIONS).is_empty());
    // the refusal itself is audited
    let log = h.tables.rows(tables::ACTIVITY_LOGS);
    assert_eq!(log.len(), 1);
    assert_eq!(log[0]["success"], false);
}

#[tokio::test]
async fn station_list_is_served_from_cache() {
    let h = harness();
    h.tables.seed(tables::STATIONS, vec![station_row(Uuid::new_v4(), "Shell Adenta", None)]);

    let first = h.guard.stations().list(StationFilter::default(), Pagination::default()).await;
    assert!(first.is_success());
    assert_eq!(first.pagination.unwrap().total_count, 1);
    let after_first = h.tables.select_calls();

    let second = h.guard.stations().list(StationFilter::default(), Pagination::default()).await;
    assert!(second.is_success());
    assert_eq!(second.pagination.unwrap().total_count, 1);
    assert_eq!(h.tables.select_calls(), after_first);
}

#[tokio::test]
async fn sign_out_drops_cached_reads() {
    let h = harness();
    h.tables.seed(tables::STATIONS, vec![station_row(Uuid::new_v4(), "Shell Adenta", None)]);

    h.guard.stations().list(StationFilter::default(), Pagination::default()).await;
    let cached = h.tables.select_calls();
    assert!(h.guard.auth().sign_out().await.is_success());
    h.guard.stations().list(StationFilter::default(), Pagination::default()).await;
    assert_eq!(h.tables.select_calls(), cached + 1);
}

#[tokio::test]
async fn price_above_the_omc_cap_is_rejected() {
    let h = harness();
    let omc_id = Uuid::new_v4();
    let station_id = Uuid::new_v4();
    h.tables.seed(tables::STATIONS, vec![station_row(station_id, "Shell Adenta", Some(omc_id))]);
    h.tables.seed(
        tables::PRICE_CAPS,
        vec![json!({
            "id": Uuid::new_v4(),
            "omc_id": omc_id,
            "fuel_type": "petrol",
            "max_price": 25.0,
            "created_at": Utc::now(),
        })],
    );
    h.auth.authenticate(admin());

    let over = h
        .guard
        .prices()
        .set_price(NewPrice { station_id, fuel_type: FuelType::Petrol, price: 25.5 })
        .await;
    assert!(!over.is_success());
    assert_eq!(over.error_code.as_deref(), Some("VALIDATION_ERROR"));
    assert!(h.tables.rows(tables::FUEL_PRICES).is_empty());

    let within = h
        .guard
        .prices()
        .set_price(NewPrice { station_id, fuel_type: FuelType::Petrol, price: 24.5 })
        .await;
    assert!(within.is_success(), "{:?}", within.error);

    let board = h.guard.prices().board(station_id).await;
    let board = board.data.unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].price, 24.5);
}

#[tokio::test]
async fn shift_close_reconciles_the_drawer() {
    let h = harness();
    let station_id = Uuid::new_v4();
    h.auth.authenticate(admin());

    let opened = h.guard.shifts().open(NewShift { station_id, opening_cash: 200.0 }).await;
    let shift = opened.data.expect("open shift");

    let duplicate = h.guard.shifts().open(NewShift { station_id, opening_cash: 50.0 }).await;
    assert!(!duplicate.is_success());

    let sale = h
        .guard
        .sales()
        .record(NewSale {
            station_id,
            shift_id: Some(shift.id),
            fuel_type: FuelType::Petrol,
            litres: 40.0,
            unit_price: 25.0,
            sold_on: Utc::now().date_naive(),
        })
        .await;
    assert!(sale.is_success(), "{:?}", sale.error);

    let closed = h
        .guard
        .shifts()
        .close(CloseShift { shift_id: shift.id, closing_cash: 1150.0 })
        .await;
    let closed = closed.data.expect("close shift");
    assert_eq!(closed.expected_cash, Some(1200.0));
    assert_eq!(closed.variance, Some(-50.0));
    assert!(h.guard.shifts().current(station_id).await.data.unwrap().is_none());
}

#[tokio::test]
async fn violation_photo_lands_in_blob_storage() {
    let h = harness();
    let station_id = Uuid::new_v4();
    h.auth.authenticate(admin());

    let reported = h
        .guard
        .violations()
        .report(NewViolation {
            station_id,
            category: ViolationCategory::PriceGouging,
            description: "pump 3 over the posted price".into(),
            photo: Some(ViolationPhoto { bytes: vec![0xff, 0xd8, 0xff], content_type: "image/jpeg".into() }),
        })
        .await;
    let violation = reported.data.expect("report violation");
    let url = violation.photo_url.expect("photo url");
    assert!(url.ends_with(&format!("violations/{}.jpeg", violation.id)));
    let path = format!("violations/{}.jpeg", violation.id);
    assert_eq!(h.blobs.object("photos", &path), Some(vec![0xff, 0xd8, 0xff]));
}

#[tokio::test]
async fn bulk_import_collects_per_row_failures() {
    let h = harness();
    h.auth.authenticate(admin());

    let mut rows: Vec<NewStation> = (0..60)
        .map(|i| NewStation {
            name: format!("Station {}", i),
            code: format!("GA-{:03}", i),
            region: "Greater Accra".into(),
            address: None,
            omc_id: None,
        })
        .collect();
    rows[7].code = "X".into(); // fails validation, everything else goes through

    let outcome = h.guard.bulk().import_stations(rows).await;
    let outcome = outcome.data.expect("bulk outcome");
    assert_eq!(outcome.inserted, 59);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].index, 7);
    assert_eq!(h.tables.rows(tables::STATIONS).len(), 59);
}

#[tokio::test]
async fn transient_store_failure_is_retried_to_success() {
    let h = harness();
    h.tables.seed(tables::STATIONS, vec![station_row(Uuid::new_v4(), "Shell Adenta", None)]);
    h.tables.fail_next(store::error::StoreError::status(503, "maintenance"));

    tokio::time::pause();
    let resp = h.guard.stations().list(StationFilter::default(), Pagination::default()).await;
    assert!(resp.is_success(), "{:?}", resp.error);
    assert_eq!(resp.data.unwrap().len(), 1);
}

#[tokio::test]
async fn attendant_reads_stay_inside_their_station() {
    let h = harness();
    let mine = Uuid::new_v4();
    let other = Uuid::new_v4();
    let day = Utc::now().date_naive();
    for (station, amount) in [(mine, 100.0), (other, 900.0)] {
        h.tables.seed(
            tables::SALES,
            vec![json!({
                "id": Uuid::new_v4(),
                "station_id": station,
                "shift_id": null,
                "fuel_type": "petrol",
                "litres": 4.0,
                "unit_price": amount / 4.0,
                "amount": amount,
                "recorded_by": null,
                "sold_on": day,
                "created_at": Utc::now(),
            })],
        );
    }
    h.auth.authenticate(AuthUser {
        id: Uuid::new_v4(),
        email: "pump@pumpguard.app".into(),
        role: Some("attendant".into()),
        omc_id: None,
        station_id: Some(mine),
    });

    let sales = h.guard.sales().list(Default::default(), Pagination::default()).await;
    let sales = sales.data.unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].station_id, mine);
}

#[tokio::test]
async fn dashboard_overview_aggregates_todays_numbers() {
    let h = harness();
    let station_id = Uuid::new_v4();
    h.tables.seed(tables::STATIONS, vec![station_row(station_id, "Shell Adenta", None)]);
    h.tables.seed(
        tables::SALES,
        vec![json!({
            "id": Uuid::new_v4(),
            "station_id": station_id,
            "shift_id": null,
            "fuel_type": "diesel",
            "litres": 10.0,
            "unit_price": 24.0,
            "amount": 240.0,
            "recorded_by": null,
            "sold_on": Utc::now().date_naive(),
            "created_at": Utc::now(),
        })],
    );
    h.tables.seed(
        tables::VIOLATIONS,
        vec![json!({
            "id": Uuid::new_v4(),
            "station_id": station_id,
            "category": "price_gouging",
            "status": "open",
            "description": "x",
            "created_at": Utc::now(),
        })],
    );

    let overview = h.guard.dashboard().overview().await.data.unwrap();
    assert_eq!(overview.active_stations, 1);
    assert_eq!(overview.open_violations, 1);
    assert_eq!(overview.pending_expenses, 0);
    assert_eq!(overview.sales_today, 240.0);
}

#[tokio::test]
async fn settings_set_invalidates_the_cached_read() {
    let h = harness();
    h.auth.authenticate(admin());

    h.guard.settings().set("fuel.display_currency", json!("GHS")).await;
    let first = h.guard.settings().get("fuel.display_currency").await.data.unwrap();
    assert_eq!(first.value, json!("GHS"));

    h.guard.settings().set("fuel.display_currency", json!("USD")).await;
    let second = h.guard.settings().get("fuel.display_currency").await.data.unwrap();
    assert_eq!(second.value, json!("USD"));
}

#[tokio::test]
async fn dip_refreshes_the_cached_levels() {
    let h = harness();
    let station_id = Uuid::new_v4();
    h.auth.authenticate(admin());

    let first = h.guard.inventory().levels(station_id).await.data.unwrap();
    assert!(first.is_empty());

    let dip = h
        .guard
        .inventory()
        .record_dip(NewInventoryRecord {
            station_id,
            fuel_type: FuelType::Diesel,
            kind: InventoryKind::Dip,
            litres: 8_000.0,
        })
        .await;
    let record = dip.data.expect("record dip");
    assert_eq!(record.station_id, station_id);

    let levels = h.guard.inventory().levels(station_id).await.data.unwrap();
    assert_eq!(levels.len(), 1);
    assert_eq!(levels[0].litres, 8_000.0);
}

#[tokio::test]
async fn sent_notification_bumps_the_unread_count() {
    let h = harness();
    let user = admin();
    let recipient_id = user.id;
    h.auth.authenticate(user);

    assert_eq!(h.guard.notifications().unread_count().await.data, Some(0));

    let sent = h
        .guard
        .notifications()
        .send(NewNotification {
            recipient_id,
            kind: NotificationKind::System,
            title: "price cap updated".into(),
            body: None,
        })
        .await;
    assert_eq!(sent.data.expect("send notification").recipient_id, recipient_id);

    assert_eq!(h.guard.notifications().unread_count().await.data, Some(1));
}

#[tokio::test]
async fn sign_out_makes_the_next_actor_anonymous() {
    let h = harness();
    h.auth.register("admin@pumpguard.app", "hunter2", admin());
    h.auth.sign_in("admin@pumpguard.app", "hunter2").await.unwrap();

    assert!(h.guard.auth().current_user().await.data.unwrap().is_some());
    h.guard.auth().sign_out().await;
    assert!(h.guard.auth().current_user().await.data.unwrap().is_none());
}
