// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::HashMap;

use crate::domain::models::offer::OfferRecord;

/// 去重后的房源数据集
///
/// 任意两条记录的 `offer_id` 都不相同。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<OfferRecord>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按顺序拼接多个批次并去重
    ///
    /// 同一房源出现多次时保留最后出现的那条记录（视为最新观察），
    /// 输出顺序为各房源最后一次出现的顺序。记录本身原样保留，不做字段合并。
    pub fn from_batches<I>(batches: I) -> Self
    where
        I: IntoIterator<Item = Vec<OfferRecord>>,
    {
        let records: Vec<OfferRecord> = batches.into_iter().flatten().collect();

        let mut last_seen: HashMap<&str, usize> = HashMap::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            last_seen.insert(record.offer_id.as_str(), index);
        }
        let keep: Vec<bool> = records
            .iter()
            .enumerate()
            .map(|(index, record)| last_seen.get(record.offer_id.as_str()) == Some(&index))
            .collect();

        let records = records
            .into_iter()
            .zip(keep)
            .filter_map(|(record, keep)| keep.then_some(record))
            .collect();

        Self { records }
    }

    /// 合并另一个数据集，`other` 中的记录视为更新的观察
    pub fn merge(self, other: Dataset) -> Dataset {
        Self::from_batches([self.records, other.records])
    }

    pub fn records(&self) -> &[OfferRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<OfferRecord> {
        self.records
    }

    pub fn get(&self, offer_id: &str) -> Option<&OfferRecord> {
        self.records.iter().find(|record| record.offer_id == offer_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
