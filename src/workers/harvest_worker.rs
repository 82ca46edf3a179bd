// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::domain::models::crawl_state::CrawlState;
use crate::domain::models::crawl_stats::CrawlStats;
use crate::domain::models::listing::ListingPage;
use crate::domain::models::offer::OfferRecord;
use crate::domain::services::listing_parser::{refs_in_window, ListingPageParser};
use crate::domain::services::listing_urls::ListingUrlBuilder;
use crate::domain::services::offer_extractor::{OfferExtractor, OfferOutcome, SkipReason};
use crate::engines::traits::{EngineError, FetchRequest, PageFetcher};
use crate::queue::work_queue::{WorkItem, WorkQueue};
use crate::utils::errors::{CrawlError, ExtractError};

/// 单个抓取任务的结果
enum TaskOutput {
    ListingPage {
        state: CrawlState,
        url: Url,
        result: Result<Result<ListingPage, CrawlError>, EngineError>,
    },
    Offer {
        url: Url,
        result: Result<Result<OfferOutcome, ExtractError>, EngineError>,
    },
    /// 运行取消时被放弃的请求
    Abandoned,
}

/// 采集工作器
///
/// 驱动一次采集运行：从第一个价格区间的第一页开始，沿"下一页"链接翻页，
/// 翻页结束后推进价格区间，直到价格上限。列表页发现的详情页并发抓取，
/// 并发数由 `max_in_flight` 限制。
///
/// 同一价格区间内的列表页严格按顺序处理，因为下一页的地址只能从上一页得到。
pub struct HarvestWorker {
    fetcher: Arc<dyn PageFetcher>,
    urls: Arc<ListingUrlBuilder>,
    stats: Arc<CrawlStats>,
    cancel: CancellationToken,
    max_in_flight: usize,
    run_id: Uuid,
}

impl HarvestWorker {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        urls: ListingUrlBuilder,
        stats: Arc<CrawlStats>,
        cancel: CancellationToken,
        max_in_flight: usize,
        run_id: Uuid,
    ) -> Self {
        Self {
            fetcher,
            urls: Arc::new(urls),
            stats,
            cancel,
            max_in_flight: max_in_flight.max(1),
            run_id,
        }
    }

    /// 执行采集
    ///
    /// # 参数
    ///
    /// * `initial` - 初始采集状态（第一个价格区间）
    ///
    /// # 返回值
    ///
    /// * `Ok(Vec<OfferRecord>)` - 价格区间全部遍历完成后得到的记录
    /// * `Err(CrawlError)` - 运行被取消或遇到致命错误；此时不返回任何部分结果
    #[instrument(skip_all, fields(run_id = %self.run_id, window = %initial.window))]
    pub async fn run(&self, initial: CrawlState) -> Result<Vec<OfferRecord>, CrawlError> {
        let run_token = self.cancel.child_token();
        let mut queue = WorkQueue::new();
        let mut tasks: JoinSet<TaskOutput> = JoinSet::new();
        let mut records = Vec::new();
        let mut fatal: Option<CrawlError> = None;

        queue.push_listing_page(initial, self.urls.bucket_url(initial.bucket())?);
        info!("Starting harvest at bucket {}", initial.bucket());

        loop {
            while !run_token.is_cancelled() && tasks.len() < self.max_in_flight {
                let Some(item) = queue.pop() else { break };
                self.spawn(&mut tasks, item, run_token.clone());
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };

            let output = match joined {
                Ok(output) => output,
                Err(e) => {
                    // Follow-up work of the lost task is unknown
                    error!("Harvest task failed to complete: {}", e);
                    if fatal.is_none() && !run_token.is_cancelled() {
                        fatal = Some(CrawlError::TaskFailed(e.to_string()));
                        run_token.cancel();
                    }
                    continue;
                }
            };

            // Once stopping, in-flight results are drained and discarded
            if run_token.is_cancelled() {
                continue;
            }

            if let Err(e) = self.handle(output, &mut queue, &mut records) {
                error!("Stopping harvest: {}", e);
                fatal = Some(e);
                run_token.cancel();
            }
        }

        if let Some(e) = fatal {
            return Err(e);
        }
        if self.cancel.is_cancelled() {
            warn!(
                "Harvest cancelled with {} records in memory; nothing will be persisted",
                records.len()
            );
            return Err(CrawlError::Cancelled);
        }

        info!(
            "Harvest finished: {} records from {} offer pages",
            records.len(),
            queue.offers_discovered()
        );
        Ok(records)
    }

    fn spawn(&self, tasks: &mut JoinSet<TaskOutput>, item: WorkItem, token: CancellationToken) {
        let fetcher = self.fetcher.clone();
        match item {
            WorkItem::ListingPage { state, url } => {
                let page_url = url.clone();
                tasks.spawn(async move {
                    let fetch = async move { fetch_listing_page(fetcher.as_ref(), &state, &page_url).await };
                    match guarded(&token, fetch).await {
                        Some(result) => TaskOutput::ListingPage { state, url, result },
                        None => TaskOutput::Abandoned,
                    }
                });
            }
            WorkItem::Offer { state, url } => {
                let stats = self.stats.clone();
                let offer_url = url.clone();
                tasks.spawn(async move {
                    let fetch =
                        async move { fetch_offer(fetcher.as_ref(), &stats, &state, &offer_url).await };
                    match guarded(&token, fetch).await {
                        Some(result) => TaskOutput::Offer { url, result },
                        None => TaskOutput::Abandoned,
                    }
                });
            }
        }
    }

    /// 处理任务结果并把后续工作加入队列；返回错误表示运行必须终止
    fn handle(
        &self,
        output: TaskOutput,
        queue: &mut WorkQueue,
        records: &mut Vec<OfferRecord>,
    ) -> Result<(), CrawlError> {
        match output {
            TaskOutput::ListingPage { state, url, result } => match result {
                Ok(parsed) => {
                    let page = parsed?;
                    self.follow_listing_page(state, &url, page, queue)
                }
                Err(e) => {
                    self.stats.record_page_failed();
                    warn!(
                        "Listing page {} failed after retries ({}); moving to the next bucket",
                        url, e
                    );
                    self.advance_bucket(state, queue)
                }
            },
            TaskOutput::Offer { url, result } => {
                match result {
                    Ok(Ok(OfferOutcome::Extracted(record))) => {
                        self.stats.record_offer_extracted();
                        records.push(*record);
                    }
                    Ok(Ok(OfferOutcome::Skipped(SkipReason::NoPrice))) => {
                        self.stats.record_no_price();
                        debug!("Offer {} has no price, skipped", url);
                    }
                    Ok(Ok(OfferOutcome::Skipped(SkipReason::OutsideWindow(published)))) => {
                        self.stats.record_outside_window();
                        debug!("Offer {} published {} outside window, skipped", url, published);
                    }
                    Ok(Err(e)) => {
                        self.stats.record_malformed(e.reason());
                        warn!("Offer {} skipped: {}", url, e);
                    }
                    Err(e) => {
                        self.stats.record_page_failed();
                        warn!("Offer {} failed after retries: {}", url, e);
                    }
                }
                Ok(())
            }
            TaskOutput::Abandoned => Ok(()),
        }
    }

    fn follow_listing_page(
        &self,
        state: CrawlState,
        url: &Url,
        page: ListingPage,
        queue: &mut WorkQueue,
    ) -> Result<(), CrawlError> {
        self.stats.record_unparsed_refs(page.unparsed_dates);

        let mut accepted = 0;
        for listing in refs_in_window(&page, &state.window) {
            match self.urls.resolve_offer(&listing.url) {
                Ok(offer_url) => {
                    if queue.push_offer(state, offer_url) {
                        accepted += 1;
                    }
                }
                Err(e) => {
                    self.stats.record_unparsed_refs(1);
                    warn!("Skipping offer link on {}: {}", url, e);
                }
            }
        }
        debug!(
            "Listing page {} [{}]: {} refs, {} queued",
            url,
            state.bucket(),
            page.refs.len(),
            accepted
        );

        let Some(href) = page.next_page else {
            return self.advance_bucket(state, queue);
        };
        match self.urls.resolve_next(&href) {
            Ok(next) => {
                self.stats.record_pagination();
                queue.push_listing_page(state, next);
                Ok(())
            }
            Err(e) => {
                self.stats.record_page_failed();
                warn!("Next page link on {} is unusable ({}); moving to the next bucket", url, e);
                self.advance_bucket(state, queue)
            }
        }
    }

    fn advance_bucket(&self, state: CrawlState, queue: &mut WorkQueue) -> Result<(), CrawlError> {
        match state.advance() {
            Some(next) => {
                self.stats.record_bucket_advance();
                debug!("Advancing to price bucket {}", next.bucket());
                queue.push_listing_page(next, self.urls.bucket_url(next.bucket())?);
            }
            None => {
                info!(
                    "Price ceiling {} reached after bucket {}",
                    state.walker().max_price(),
                    state.bucket()
                );
            }
        }
        Ok(())
    }
}

/// 在独立任务中执行抓取
///
/// 抓取任务 panic 时转换为 [`EngineError::Other`]，调用方仍能按失败页面处理；
/// 运行取消时中止抓取并返回 `None`。
async fn guarded<T, F>(token: &CancellationToken, fetch: F) -> Option<Result<T, EngineError>>
where
    T: Send + 'static,
    F: Future<Output = Result<T, EngineError>> + Send + 'static,
{
    let mut handle = tokio::spawn(fetch);
    tokio::select! {
        _ = token.cancelled() => {
            handle.abort();
            None
        }
        joined = &mut handle => Some(match joined {
            Ok(result) => result,
            Err(e) => Err(EngineError::Other(format!("fetch task failed: {}", e))),
        }),
    }
}

#[instrument(skip(fetcher, state), fields(bucket = %state.bucket()))]
async fn fetch_listing_page(
    fetcher: &dyn PageFetcher,
    state: &CrawlState,
    url: &Url,
) -> Result<Result<ListingPage, CrawlError>, EngineError> {
    let response = fetcher.fetch(&FetchRequest::new(url.as_str())).await?;
    Ok(ListingPageParser::parse(
        &response.content,
        url.as_str(),
        &state.clock,
    ))
}

#[instrument(skip(fetcher, stats, state))]
async fn fetch_offer(
    fetcher: &dyn PageFetcher,
    stats: &CrawlStats,
    state: &CrawlState,
    url: &Url,
) -> Result<Result<OfferOutcome, ExtractError>, EngineError> {
    let response = fetcher.fetch(&FetchRequest::new(url.as_str())).await?;
    stats.record_offer_followed();
    Ok(OfferExtractor::extract(&response.content, url.as_str(), state))
}

#[cfg(test)]
#[path = "harvest_worker_test.rs"]
mod tests;
