// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::settings::HarvestConfig;
use crate::domain::models::crawl_state::{CrawlState, DateWindow, PriceBucketWalker, RunClock};
use crate::domain::models::crawl_stats::{CrawlStats, RunSummary};
use crate::domain::models::listing::ListingCategory;
use crate::domain::services::date_window::DateWindowResolver;
use crate::domain::services::listing_urls::ListingUrlBuilder;
use crate::engines::traits::PageFetcher;
use crate::infrastructure::batch_store::{batch_key, summary_key, BatchKind, OfferBatchStore};
use crate::utils::errors::CrawlError;
use crate::workers::harvest_worker::HarvestWorker;

/// 一次采集运行的报告，同时作为运行汇总写入存储
#[derive(Debug, Clone, Serialize)]
pub struct HarvestReport {
    pub run_id: Uuid,
    pub category: ListingCategory,
    pub window: DateWindow,
    pub date_filter: Option<u32>,
    /// 本次写入的原始批次；没有记录时为 `None`
    pub batch_key: Option<String>,
    pub records: usize,
    pub stats: RunSummary,
    pub finished_at: NaiveDateTime,
}

/// 采集用例
///
/// 解析日期窗口、执行采集并持久化本次运行的原始批次与汇总。
pub struct HarvestUseCase {
    fetcher: Arc<dyn PageFetcher>,
    store: OfferBatchStore,
    config: HarvestConfig,
}

impl HarvestUseCase {
    pub fn new(fetcher: Arc<dyn PageFetcher>, store: OfferBatchStore, config: HarvestConfig) -> Self {
        Self {
            fetcher,
            store,
            config,
        }
    }

    /// 执行一次采集运行
    ///
    /// 日期窗口无法确定时在发出任何请求前失败；运行被取消或遇到致命错误时
    /// 不写入任何批次。
    ///
    /// # 参数
    ///
    /// * `clock` - 运行开始时捕获的时钟
    /// * `cancel` - 运行级取消信号
    #[instrument(skip_all, fields(category = %self.config.category))]
    pub async fn execute(
        &self,
        clock: RunClock,
        cancel: CancellationToken,
    ) -> Result<HarvestReport, CrawlError> {
        let category = self.config.category;
        let prior = self.store.latest_listing_date(category).await?;
        let resolved = DateWindowResolver::resolve(prior, &clock, self.config.backfill_from)?;

        let run_id = Uuid::new_v4();
        info!(
            "Harvest run {} for window {} (date filter {:?})",
            run_id,
            resolved.window,
            resolved.date_filter.days()
        );

        let state = CrawlState::new(
            resolved.window,
            clock,
            PriceBucketWalker::new(self.config.chunk_size, self.config.max_price),
        );
        let urls = ListingUrlBuilder::new(
            self.config.site_origin.clone(),
            &self.config.category_path,
            resolved.date_filter,
        );
        let stats = Arc::new(CrawlStats::new());
        let worker = HarvestWorker::new(
            self.fetcher.clone(),
            urls,
            stats.clone(),
            cancel,
            self.config.max_concurrency,
            run_id,
        );

        let records = worker.run(state).await?;

        let finished_at = Local::now().naive_local();
        // An empty batch would hide the previous latest listing date
        let batch_key = if records.is_empty() {
            info!("No offers harvested; raw batch not written");
            None
        } else {
            let key = batch_key(category, BatchKind::Raw, finished_at);
            self.store.write_batch(&key, &records).await?;
            Some(key)
        };

        let report = HarvestReport {
            run_id,
            category,
            window: resolved.window,
            date_filter: resolved.date_filter.days(),
            batch_key,
            records: records.len(),
            stats: stats.snapshot(),
            finished_at,
        };
        self.store
            .write_summary(&summary_key(category, finished_at), &report)
            .await?;

        info!(
            "Harvest run {} done: {} records, {} offers skipped, {} pages failed",
            run_id,
            report.records,
            report.stats.offers_skipped(),
            report.stats.pages_failed
        );
        Ok(report)
    }
}
