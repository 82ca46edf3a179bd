// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// 单次运行的监控计数器
///
/// 由所有抓取任务共享，计数同时上报到 `metrics` 记录器。
#[derive(Debug, Default)]
pub struct CrawlStats {
    paginations_followed: AtomicU64,
    buckets_advanced: AtomicU64,
    offers_followed: AtomicU64,
    offers_extracted: AtomicU64,
    offers_no_price: AtomicU64,
    offers_outside_window: AtomicU64,
    offers_malformed: AtomicU64,
    listing_refs_unparsed: AtomicU64,
    pages_failed: AtomicU64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pagination(&self) {
        self.paginations_followed.fetch_add(1, Ordering::Relaxed);
        counter!("harvest_paginations_followed_total").increment(1);
    }

    pub fn record_bucket_advance(&self) {
        self.buckets_advanced.fetch_add(1, Ordering::Relaxed);
        counter!("harvest_buckets_advanced_total").increment(1);
    }

    pub fn record_offer_followed(&self) {
        self.offers_followed.fetch_add(1, Ordering::Relaxed);
        counter!("harvest_offers_followed_total").increment(1);
    }

    pub fn record_offer_extracted(&self) {
        self.offers_extracted.fetch_add(1, Ordering::Relaxed);
        counter!("harvest_offers_extracted_total").increment(1);
    }

    pub fn record_no_price(&self) {
        self.offers_no_price.fetch_add(1, Ordering::Relaxed);
        counter!("harvest_offers_no_price_total").increment(1);
    }

    pub fn record_outside_window(&self) {
        self.offers_outside_window.fetch_add(1, Ordering::Relaxed);
        counter!("harvest_offers_skipped_total", "reason" => "outside_window").increment(1);
    }

    /// 记录因字段格式错误被跳过的房源
    pub fn record_malformed(&self, reason: &'static str) {
        self.offers_malformed.fetch_add(1, Ordering::Relaxed);
        counter!("harvest_offers_skipped_total", "reason" => reason).increment(1);
    }

    pub fn record_unparsed_refs(&self, count: usize) {
        if count > 0 {
            self.listing_refs_unparsed
                .fetch_add(count as u64, Ordering::Relaxed);
            counter!("harvest_listing_refs_unparsed_total").increment(count as u64);
        }
    }

    pub fn record_page_failed(&self) {
        self.pages_failed.fetch_add(1, Ordering::Relaxed);
        counter!("harvest_pages_failed_total").increment(1);
    }

    /// 当前计数快照
    pub fn snapshot(&self) -> RunSummary {
        RunSummary {
            paginations_followed: self.paginations_followed.load(Ordering::Relaxed),
            buckets_advanced: self.buckets_advanced.load(Ordering::Relaxed),
            offers_followed: self.offers_followed.load(Ordering::Relaxed),
            offers_extracted: self.offers_extracted.load(Ordering::Relaxed),
            offers_no_price: self.offers_no_price.load(Ordering::Relaxed),
            offers_outside_window: self.offers_outside_window.load(Ordering::Relaxed),
            offers_malformed: self.offers_malformed.load(Ordering::Relaxed),
            listing_refs_unparsed: self.listing_refs_unparsed.load(Ordering::Relaxed),
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
        }
    }
}

/// 运行结束时的计数汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub paginations_followed: u64,
    pub buckets_advanced: u64,
    pub offers_followed: u64,
    pub offers_extracted: u64,
    pub offers_no_price: u64,
    pub offers_outside_window: u64,
    pub offers_malformed: u64,
    pub listing_refs_unparsed: u64,
    pub pages_failed: u64,
}

impl RunSummary {
    /// 所有被跳过的房源数量
    pub fn offers_skipped(&self) -> u64 {
        self.offers_no_price + self.offers_outside_window + self.offers_malformed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::{
        Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// 按指标名汇总计数器的记录器
    #[derive(Default)]
    struct CountingRecorder {
        counters: Mutex<HashMap<String, Arc<AtomicU64>>>,
    }

    impl CountingRecorder {
        fn value(&self, name: &str) -> u64 {
            self.counters
                .lock()
                .unwrap()
                .get(name)
                .map_or(0, |counter| counter.load(Ordering::Relaxed))
        }
    }

    impl Recorder for CountingRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            let counter = self
                .counters
                .lock()
                .unwrap()
                .entry(key.name().to_string())
                .or_default()
                .clone();
            Counter::from_arc(counter)
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[test]
    fn test_every_counter_is_exported() {
        let recorder = CountingRecorder::default();
        let stats = CrawlStats::new();

        metrics::with_local_recorder(&recorder, || {
            stats.record_pagination();
            stats.record_bucket_advance();
            stats.record_offer_followed();
            stats.record_offer_extracted();
            stats.record_no_price();
            stats.record_outside_window();
            stats.record_malformed("missing_offer_id");
            stats.record_unparsed_refs(3);
            stats.record_unparsed_refs(0);
            stats.record_page_failed();
        });

        assert_eq!(recorder.value("harvest_paginations_followed_total"), 1);
        assert_eq!(recorder.value("harvest_buckets_advanced_total"), 1);
        assert_eq!(recorder.value("harvest_offers_followed_total"), 1);
        assert_eq!(recorder.value("harvest_offers_extracted_total"), 1);
        assert_eq!(recorder.value("harvest_offers_no_price_total"), 1);
        assert_eq!(recorder.value("harvest_offers_skipped_total"), 2);
        assert_eq!(recorder.value("harvest_listing_refs_unparsed_total"), 3);
        assert_eq!(recorder.value("harvest_pages_failed_total"), 1);
        assert_eq!(stats.snapshot().listing_refs_unparsed, 3);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_counted() {
        let stats = Arc::new(CrawlStats::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let stats = stats.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    stats.record_offer_followed();
                    stats.record_no_price();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let summary = stats.snapshot();
        assert_eq!(summary.offers_followed, 800);
        assert_eq!(summary.offers_no_price, 800);
    }

    #[test]
    fn test_skipped_total() {
        let stats = CrawlStats::new();
        stats.record_no_price();
        stats.record_outside_window();
        stats.record_malformed("malformed_numeric");
        stats.record_unparsed_refs(0);
        assert_eq!(stats.snapshot().offers_skipped(), 3);
        assert_eq!(stats.snapshot().listing_refs_unparsed, 0);
    }
}
