// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::NaiveDate;
use harvestrs::application::use_cases::harvest_use_case::HarvestUseCase;
use harvestrs::config::settings::HarvestConfig;
use harvestrs::domain::models::crawl_state::RunClock;
use harvestrs::domain::models::listing::ListingCategory;
use harvestrs::domain::repositories::storage_repository::StorageRepository;
use harvestrs::engines::reqwest_engine::{ReqwestEngine, DEFAULT_USER_AGENT};
use harvestrs::engines::retrying_fetcher::RetryingFetcher;
use harvestrs::engines::traits::PageFetcher;
use harvestrs::infrastructure::batch_store::OfferBatchStore;
use harvestrs::infrastructure::storage::InMemoryStorage;
use harvestrs::utils::errors::CrawlError;
use harvestrs::utils::retry_policy::RetryPolicy;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OFFER_PAGE: &str = include_str!("../fixtures/offer.html");
const OFFER_ID: &str = "mzn2041387771";
const OFFER_PATH: &str = "/oferta/mzn2041387771";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn listing(rows: &[(&str, &str)], next: Option<&str>) -> String {
    let mut html = String::from("<html><body>");
    for (href, listed) in rows {
        html.push_str(&format!(
            "<a class=\"property_link property-url\" href=\"{href}\">oferta</a>\
             <span class=\"single-result__category single-result__category--date\">{listed}</span>"
        ));
    }
    if let Some(next) = next {
        html.push_str(&format!(
            "<a class=\"mz-pagination-number__btn mz-pagination-number__btn--next\" href=\"{next}\">»</a>"
        ));
    }
    html.push_str("</body></html>");
    html
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

/// 两个价格区间：第一个区间有两页，第二个区间为空
async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/mieszkania/"))
        .and(query_param("ps[price_from]", "0"))
        .respond_with(html(listing(
            &[
                (OFFER_PATH, "07-03-2024"),
                ("/oferta/stara", "20-02-2024"),
            ],
            Some("/mieszkania/strona-2/"),
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/mieszkania/strona-2/"))
        .respond_with(html(listing(
            &[
                (OFFER_PATH, "07-03-2024"),
                ("/oferta/bez-ceny", "wczoraj"),
            ],
            None,
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/mieszkania/"))
        .and(query_param("ps[price_from]", "500000"))
        .respond_with(html(listing(&[], None)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(OFFER_PATH))
        .respond_with(html(OFFER_PAGE.to_string()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/oferta/bez-ceny"))
        .respond_with(html("<html><body><h1>Zapytaj o cenę</h1></body></html>".to_string()))
        .mount(server)
        .await;
}

fn fetcher(policy: RetryPolicy) -> Arc<dyn PageFetcher> {
    let engine = ReqwestEngine::new(DEFAULT_USER_AGENT, Duration::from_secs(5)).unwrap();
    Arc::new(RetryingFetcher::new(Arc::new(engine), policy, 4, None))
}

fn config(server: &MockServer, backfill_from: Option<NaiveDate>) -> HarvestConfig {
    HarvestConfig {
        category: ListingCategory::Sale,
        site_origin: Url::parse(&server.uri()).unwrap(),
        category_path: "/mieszkania".to_string(),
        chunk_size: 500_000,
        max_price: 1_000_000,
        backfill_from,
        max_concurrency: 4,
    }
}

async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect()
}

#[tokio::test]
async fn test_harvest_run_writes_raw_batch_and_summary() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let storage = Arc::new(InMemoryStorage::new());
    let store = OfferBatchStore::new(storage.clone());
    let use_case = HarvestUseCase::new(
        fetcher(RetryPolicy::none()),
        store.clone(),
        config(&server, Some(date(2024, 3, 1))),
    );

    let report = use_case
        .execute(RunClock::from_today(date(2024, 3, 10)), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.window.start, date(2024, 3, 1));
    assert_eq!(report.window.end, date(2024, 3, 9));
    assert_eq!(report.date_filter, Some(30));
    assert_eq!(report.records, 1);
    assert_eq!(report.stats.paginations_followed, 1);
    assert_eq!(report.stats.offers_followed, 2);
    assert_eq!(report.stats.offers_no_price, 1);

    let key = report.batch_key.clone().expect("raw batch written");
    let records = store.read_batch(&key).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].offer_id, OFFER_ID);
    assert_eq!(records[0].price, Decimal::new(649_000, 0));
    assert_eq!(records[0].date_added, Some(date(2024, 3, 7)));

    let keys = storage.list("sale/raw/").await.unwrap();
    assert!(keys.iter().any(|key| key.contains("_desc_") && key.ends_with(".json")));

    // The same offer on both pages is fetched once; the old one never
    let paths = requested_paths(&server).await;
    assert_eq!(
        paths.iter().filter(|p| p.as_str() == OFFER_PATH).count(),
        1
    );
    assert!(!paths.iter().any(|p| p == "/oferta/stara"));
}

#[tokio::test]
async fn test_next_run_starts_from_latest_listing_date() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let store = OfferBatchStore::new(Arc::new(InMemoryStorage::new()));
    let first = HarvestUseCase::new(
        fetcher(RetryPolicy::none()),
        store.clone(),
        config(&server, Some(date(2024, 3, 1))),
    );
    first
        .execute(RunClock::from_today(date(2024, 3, 10)), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        store.latest_listing_date(ListingCategory::Sale).await.unwrap(),
        Some(date(2024, 3, 7))
    );

    // Backfill is ignored once output exists
    let second = HarvestUseCase::new(fetcher(RetryPolicy::none()), store.clone(), config(&server, None));
    let report = second
        .execute(RunClock::from_today(date(2024, 3, 12)), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.window.start, date(2024, 3, 7));
    assert_eq!(report.window.end, date(2024, 3, 11));
    assert_eq!(report.date_filter, Some(7));
}

#[tokio::test]
async fn test_unresolvable_window_fails_before_any_request() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let store = OfferBatchStore::new(Arc::new(InMemoryStorage::new()));
    let use_case = HarvestUseCase::new(fetcher(RetryPolicy::none()), store, config(&server, None));

    let result = use_case
        .execute(RunClock::from_today(date(2024, 3, 10)), CancellationToken::new())
        .await;

    assert!(matches!(result, Err(CrawlError::WindowResolution(_))));
    assert!(requested_paths(&server).await.is_empty());
}

#[tokio::test]
async fn test_failing_listing_pages_finish_without_raw_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mieszkania/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let storage = Arc::new(InMemoryStorage::new());
    let store = OfferBatchStore::new(storage.clone());
    let use_case = HarvestUseCase::new(
        fetcher(RetryPolicy::new(1, Duration::from_millis(1))),
        store,
        config(&server, Some(date(2024, 3, 1))),
    );

    let report = use_case
        .execute(RunClock::from_today(date(2024, 3, 10)), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.records, 0);
    assert_eq!(report.batch_key, None);
    assert_eq!(report.stats.pages_failed, 2);
    // Each bucket page is tried twice
    assert_eq!(requested_paths(&server).await.len(), 4);

    let keys = storage.list("sale/raw/").await.unwrap();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].contains("_desc_"));
}

#[tokio::test]
async fn test_cancelled_run_persists_nothing() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let storage = Arc::new(InMemoryStorage::new());
    let store = OfferBatchStore::new(storage.clone());
    let use_case = HarvestUseCase::new(
        fetcher(RetryPolicy::none()),
        store,
        config(&server, Some(date(2024, 3, 1))),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = use_case
        .execute(RunClock::from_today(date(2024, 3, 10)), cancel)
        .await;

    assert!(matches!(result, Err(CrawlError::Cancelled)));
    assert!(storage.list("sale/").await.unwrap().is_empty());
}
