// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{NaiveDate, NaiveDateTime};
use harvestrs::application::use_cases::concat_use_case::ConcatUseCase;
use harvestrs::domain::models::listing::ListingCategory;
use harvestrs::domain::models::offer::{OfferDraft, OfferRecord};
use harvestrs::infrastructure::batch_store::{batch_key, BatchKind, OfferBatchStore};
use harvestrs::infrastructure::storage::LocalStorage;
use rust_decimal::Decimal;
use std::sync::Arc;
use tempfile::TempDir;

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn record(id: &str, price: i64) -> OfferRecord {
    let mut draft = OfferDraft::new(format!("https://www.morizon.pl/oferta/{id}"));
    draft.offer_id = Some(id.to_string());
    draft.price = Some(Decimal::new(price, 0));
    draft.title = format!("Mieszkanie {id}");
    draft.finish().unwrap().unwrap()
}

fn local_store(dir: &TempDir) -> OfferBatchStore {
    OfferBatchStore::new(Arc::new(LocalStorage::new(dir.path())))
}

async fn write_raw(store: &OfferBatchStore, when: NaiveDateTime, records: &[OfferRecord]) -> String {
    let key = batch_key(ListingCategory::Sale, BatchKind::Raw, when);
    store.write_batch(&key, records).await.unwrap();
    key
}

fn price_of(records: &[OfferRecord], id: &str) -> Option<Decimal> {
    records.iter().find(|r| r.offer_id == id).map(|r| r.price)
}

#[tokio::test]
async fn test_concat_keeps_latest_observation() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir);

    // Written out of order; timestamps in the names decide precedence
    let second = write_raw(&store, at(2, 12), &[record("A", 110)]).await;
    let first = write_raw(&store, at(1, 12), &[record("A", 100), record("B", 50)]).await;

    let report = ConcatUseCase::new(store.clone())
        .execute(ListingCategory::Sale, at(3, 0))
        .await
        .unwrap();

    assert_eq!(report.files_read, vec![first, second]);
    assert_eq!(report.input_records, 3);
    assert_eq!(report.output_records, 2);

    let merged = store.read_batch(report.output_key.as_deref().unwrap()).await.unwrap();
    assert_eq!(price_of(&merged, "A"), Some(Decimal::new(110, 0)));
    assert_eq!(price_of(&merged, "B"), Some(Decimal::new(50, 0)));
}

#[tokio::test]
async fn test_concat_builds_on_previous_dataset() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir);
    let use_case = ConcatUseCase::new(store.clone());

    write_raw(&store, at(1, 12), &[record("A", 100), record("B", 50)]).await;
    let first = use_case.execute(ListingCategory::Sale, at(1, 13)).await.unwrap();

    write_raw(&store, at(2, 12), &[record("B", 55), record("C", 70)]).await;
    let second = use_case.execute(ListingCategory::Sale, at(2, 13)).await.unwrap();

    assert_eq!(second.files_read.first(), first.output_key.as_ref());
    assert_eq!(second.output_records, 3);

    let merged = store.read_batch(second.output_key.as_deref().unwrap()).await.unwrap();
    assert_eq!(price_of(&merged, "A"), Some(Decimal::new(100, 0)));
    assert_eq!(price_of(&merged, "B"), Some(Decimal::new(55, 0)));
    assert_eq!(price_of(&merged, "C"), Some(Decimal::new(70, 0)));
}

#[tokio::test]
async fn test_concat_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir);
    let use_case = ConcatUseCase::new(store.clone());

    write_raw(&store, at(1, 12), &[record("A", 100), record("B", 50)]).await;
    write_raw(&store, at(2, 12), &[record("A", 110)]).await;

    let first = use_case.execute(ListingCategory::Sale, at(3, 0)).await.unwrap();
    let second = use_case.execute(ListingCategory::Sale, at(3, 1)).await.unwrap();

    let a = store.read_batch(first.output_key.as_deref().unwrap()).await.unwrap();
    let b = store.read_batch(second.output_key.as_deref().unwrap()).await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_concat_without_batches_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir);

    let report = ConcatUseCase::new(store.clone())
        .execute(ListingCategory::Rent, at(3, 0))
        .await
        .unwrap();

    assert!(report.files_read.is_empty());
    assert_eq!(report.output_key, None);
    assert!(store
        .latest_batch(ListingCategory::Rent, BatchKind::Concated)
        .await
        .unwrap()
        .is_none());
}
