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

use chrono::NaiveDateTime;
use metrics::counter;
use serde::Serialize;
use tracing::{info, instrument};

use crate::domain::models::listing::ListingCategory;
use crate::domain::services::dedup::Dataset;
use crate::infrastructure::batch_store::{batch_key, BatchKind, OfferBatchStore};
use crate::utils::errors::CrawlError;

/// 合并结果汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConcatReport {
    pub category: ListingCategory,
    /// 读取的文件，按合并顺序
    pub files_read: Vec<String>,
    pub input_records: usize,
    pub output_records: usize,
    /// 写入的数据集；没有任何输入时为 `None`
    pub output_key: Option<String>,
}

/// 合并用例
///
/// 依次读取最新的合并数据集与全部原始批次（按时间戳升序），
/// 去重后写出新的合并数据集。
pub struct ConcatUseCase {
    store: OfferBatchStore,
}

impl ConcatUseCase {
    pub fn new(store: OfferBatchStore) -> Self {
        Self { store }
    }

    /// 合并某个类别的所有批次
    ///
    /// # 参数
    ///
    /// * `category` - 房源类别
    /// * `at` - 输出文件名中使用的时间
    #[instrument(skip(self))]
    pub async fn execute(
        &self,
        category: ListingCategory,
        at: NaiveDateTime,
    ) -> Result<ConcatReport, CrawlError> {
        let mut keys: Vec<String> = Vec::new();
        if let Some(previous) = self.store.latest_batch(category, BatchKind::Concated).await? {
            keys.push(previous.key);
        }
        keys.extend(
            self.store
                .list_batches(category, BatchKind::Raw)
                .await?
                .into_iter()
                .map(|batch| batch.key),
        );

        let mut batches = Vec::with_capacity(keys.len());
        for key in &keys {
            batches.push(self.store.read_batch(key).await?);
        }
        let input_records = batches.iter().map(Vec::len).sum();
        info!("Concatenating {} files with {} records", keys.len(), input_records);

        if keys.is_empty() {
            return Ok(ConcatReport {
                category,
                files_read: keys,
                input_records,
                output_records: 0,
                output_key: None,
            });
        }

        let dataset = Dataset::from_batches(batches);
        let output_key = batch_key(category, BatchKind::Concated, at);
        self.store.write_batch(&output_key, dataset.records()).await?;
        counter!("harvest_records_merged_total").increment(dataset.len() as u64);
        info!("Wrote {} deduplicated records to {}", dataset.len(), output_key);

        Ok(ConcatReport {
            category,
            files_read: keys,
            input_records,
            output_records: dataset.len(),
            output_key: Some(output_key),
        })
    }
}
