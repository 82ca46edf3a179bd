// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::models::listing::ListingCategory;
use crate::domain::models::offer::OfferRecord;
use crate::domain::repositories::storage_repository::{StorageError, StorageRepository};

/// 文件名中嵌入的时间戳格式
const FILE_TIMESTAMP_FORMAT: &str = "%Y_%m_%dT%H_%M_%S";
/// 提取数字后用于解析的格式
const DIGITS_FORMAT: &str = "%Y%m%d%H%M%S";
const TIMESTAMP_DIGITS: usize = 14;
/// 汇总文件名中的标记，此类文件不参与合并
const SUMMARY_MARKER: &str = "desc";
const BATCH_EXTENSION: &str = ".csv";

/// 批次文件种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// 单次运行的原始输出
    Raw,
    /// 去重合并后的数据集
    Concated,
}

impl BatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchKind::Raw => "raw",
            BatchKind::Concated => "concated",
        }
    }
}

/// 存储中的一个批次文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFile {
    pub key: String,
    pub timestamp: NaiveDateTime,
}

/// 从文件名中解析时间戳
///
/// 收集文件名中的全部数字，必须恰好 14 位 (`YYYYMMDDHHMMSS`)，
/// 否则记录警告并返回 `None`。
pub fn timestamp_from_file_name(name: &str) -> Option<NaiveDateTime> {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    let digits: String = file_name.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() != TIMESTAMP_DIGITS {
        warn!(
            "File name {} has {} digits, expected {}; skipping",
            file_name,
            digits.len(),
            TIMESTAMP_DIGITS
        );
        return None;
    }

    match NaiveDateTime::parse_from_str(&digits, DIGITS_FORMAT) {
        Ok(timestamp) => Some(timestamp),
        Err(e) => {
            warn!("File name {} has an invalid timestamp: {}", file_name, e);
            None
        }
    }
}

/// 批次文件的存储键
pub fn batch_key(category: ListingCategory, kind: BatchKind, at: NaiveDateTime) -> String {
    format!(
        "{category}/{kind}/{category}_{kind}_{ts}{BATCH_EXTENSION}",
        kind = kind.as_str(),
        ts = at.format(FILE_TIMESTAMP_FORMAT)
    )
}

/// 运行汇总的存储键
pub fn summary_key(category: ListingCategory, at: NaiveDateTime) -> String {
    format!(
        "{category}/raw/{category}_{SUMMARY_MARKER}_{ts}.json",
        ts = at.format(FILE_TIMESTAMP_FORMAT)
    )
}

/// 房源批次存储
///
/// 在 [`StorageRepository`] 之上按类别与种类组织批次文件，
/// 批次以 CSV 表格保存。
#[derive(Clone)]
pub struct OfferBatchStore {
    storage: Arc<dyn StorageRepository>,
}

impl OfferBatchStore {
    pub fn new(storage: Arc<dyn StorageRepository>) -> Self {
        Self { storage }
    }

    /// 列出某类别某种类的全部批次，按时间戳升序
    ///
    /// 汇总文件、非 CSV 文件以及时间戳无法识别的文件都会被跳过。
    pub async fn list_batches(
        &self,
        category: ListingCategory,
        kind: BatchKind,
    ) -> Result<Vec<BatchFile>, StorageError> {
        let prefix = format!("{}/{}/", category, kind.as_str());
        let mut batches: Vec<BatchFile> = self
            .storage
            .list(&prefix)
            .await?
            .into_iter()
            .filter(|key| {
                let name = key.rsplit('/').next().unwrap_or(key);
                !name.contains(SUMMARY_MARKER) && name.ends_with(BATCH_EXTENSION)
            })
            .filter_map(|key| timestamp_from_file_name(&key).map(|timestamp| BatchFile { key, timestamp }))
            .collect();

        batches.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.key.cmp(&b.key)));
        Ok(batches)
    }

    /// 最新的批次
    pub async fn latest_batch(
        &self,
        category: ListingCategory,
        kind: BatchKind,
    ) -> Result<Option<BatchFile>, StorageError> {
        Ok(self.list_batches(category, kind).await?.pop())
    }

    /// 读取批次内容
    pub async fn read_batch(&self, key: &str) -> Result<Vec<OfferRecord>, StorageError> {
        let data = self
            .storage
            .get(key)
            .await?
            .ok_or_else(|| StorageError::Other(format!("batch {} not found", key)))?;

        let mut reader = csv::Reader::from_reader(data.as_slice());
        let records = reader
            .deserialize()
            .collect::<Result<Vec<OfferRecord>, csv::Error>>()?;
        debug!("Read {} records from {}", records.len(), key);
        Ok(records)
    }

    /// 写入批次
    pub async fn write_batch(&self, key: &str, records: &[OfferRecord]) -> Result<(), StorageError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in records {
            writer.serialize(record)?;
        }
        let data = writer
            .into_inner()
            .map_err(|e| StorageError::Io(e.into_error()))?;

        self.storage.save(key, &data).await?;
        debug!("Wrote {} records to {}", records.len(), key);
        Ok(())
    }

    /// 写入 JSON 汇总
    pub async fn write_summary<T: Serialize + Sync>(
        &self,
        key: &str,
        summary: &T,
    ) -> Result<(), StorageError> {
        let data = serde_json::to_vec_pretty(summary)?;
        self.storage.save(key, &data).await
    }

    /// 历史输出中最新的发布日期
    ///
    /// 取全部原始批次中 `date_added` 的最大值；`date_added` 是可选字段，
    /// 最新批次可能不含任何日期。没有可用批次或所有批次都没有日期时返回 `None`。
    pub async fn latest_listing_date(
        &self,
        category: ListingCategory,
    ) -> Result<Option<NaiveDate>, StorageError> {
        let mut latest: Option<NaiveDate> = None;
        for batch in self.list_batches(category, BatchKind::Raw).await? {
            let records = self.read_batch(&batch.key).await?;
            let date = records.iter().filter_map(|record| record.date_added).max();
            debug!("Latest listing date in {}: {:?}", batch.key, date);
            latest = latest.max(date);
        }
        Ok(latest)
    }
}
