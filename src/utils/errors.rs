// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

use crate::domain::models::offer::OfferField;
use crate::domain::repositories::storage_repository::StorageError;

/// 单个房源提取错误
///
/// 只影响当前房源：调用方跳过该房源并计数，运行继续。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("字段 {field} 数值格式错误: {raw:?}")]
    MalformedNumericField { field: OfferField, raw: String },

    #[error("字段 {field} 日期格式错误: {raw:?}")]
    MalformedDate { field: OfferField, raw: String },

    #[error("缺少房源编号")]
    MissingOfferId,
}

impl ExtractError {
    /// 用于计数与日志的跳过原因
    pub fn reason(&self) -> &'static str {
        match self {
            ExtractError::MalformedNumericField { .. } => "malformed_numeric",
            ExtractError::MalformedDate { .. } => "malformed_date",
            ExtractError::MissingOfferId => "missing_offer_id",
        }
    }
}

/// 运行级错误
///
/// 除 `Cancelled` 外均表示运行无法可靠完成，进程应以非零状态退出。
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error(
        "listing page {url} has {links} offer links but {dates} listing dates; page layout assumption violated"
    )]
    ParseInconsistency {
        url: String,
        links: usize,
        dates: usize,
    },

    #[error("cannot resolve date window: {0}")]
    WindowResolution(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("harvest task failed: {0}")]
    TaskFailed(String),

    #[error("crawl run was cancelled")]
    Cancelled,
}
