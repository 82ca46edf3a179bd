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

use anyhow::Context;
use chrono::Local;
use harvestrs::application::use_cases::concat_use_case::ConcatUseCase;
use harvestrs::application::use_cases::harvest_use_case::HarvestUseCase;
use harvestrs::config::settings::Settings;
use harvestrs::domain::models::crawl_state::RunClock;
use harvestrs::engines::reqwest_engine::ReqwestEngine;
use harvestrs::engines::retrying_fetcher::RetryingFetcher;
use harvestrs::engines::traits::PageFetcher;
use harvestrs::infrastructure::batch_store::OfferBatchStore;
use harvestrs::infrastructure::metrics;
use harvestrs::infrastructure::storage::create_storage_repository;
use harvestrs::utils::telemetry;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// 主函数
///
/// 执行一次增量采集，随后合并该类别的全部批次
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting harvestrs...");

    // 2. Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    let config = settings.harvest_config()?;
    info!("Configuration loaded for category {}", config.category);

    // 3. Metrics exporter
    if let Some(addr) = settings.metrics_addr()? {
        metrics::init_metrics(addr).context("failed to start metrics exporter")?;
    }

    // 4. Storage
    let storage = create_storage_repository(&settings.storage)?;
    let store = OfferBatchStore::new(storage);

    // 5. Fetcher
    let engine = ReqwestEngine::new(
        &settings.http.user_agent,
        Duration::from_secs(settings.http.timeout_secs),
    )?;
    let fetcher: Arc<dyn PageFetcher> = Arc::new(RetryingFetcher::new(
        Arc::new(engine),
        settings.retry_policy(),
        config.max_concurrency,
        settings.requests_per_second(),
    ));

    // 6. Cancellation on Ctrl-C
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling harvest run");
            signal_token.cancel();
        }
    });

    // 7. Harvest
    let category = config.category;
    let harvest = HarvestUseCase::new(fetcher, store.clone(), config);
    let report = harvest
        .execute(RunClock::now(), cancel)
        .await
        .context("harvest run failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    // 8. Concatenate
    let concat = ConcatUseCase::new(store);
    let summary = concat
        .execute(category, Local::now().naive_local())
        .await
        .context("concatenation failed")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    info!("harvestrs finished");
    Ok(())
}
