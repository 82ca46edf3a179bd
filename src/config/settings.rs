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

use chrono::NaiveDate;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::time::Duration;
use url::Url;

use crate::domain::models::listing::ListingCategory;
use crate::utils::errors::CrawlError;
use crate::utils::retry_policy::RetryPolicy;

/// 应用程序配置设置
///
/// 包含采集、HTTP、存储与指标等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 采集配置
    pub crawl: CrawlSettings,
    /// HTTP 客户端配置
    pub http: HttpSettings,
    /// 存储配置
    pub storage: StorageSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 采集配置设置
#[derive(Debug, Deserialize)]
pub struct CrawlSettings {
    /// 房源类别 (sale, rent)
    pub category: ListingCategory,
    /// 站点根地址
    pub site_origin: String,
    /// 出售房源列表路径
    pub sale_path: String,
    /// 出租房源列表路径
    pub rent_path: String,
    /// 价格区间宽度
    pub chunk_size: u64,
    /// 价格上限
    pub max_price: u64,
    /// 没有历史输出时的起始日期 (YYYY-MM-DD)
    pub backfill_from: Option<NaiveDate>,
}

/// HTTP 客户端配置设置
#[derive(Debug, Deserialize)]
pub struct HttpSettings {
    pub user_agent: String,
    /// 单个请求超时（秒）
    pub timeout_secs: u64,
    /// 同时进行的最大请求数
    pub max_concurrency: usize,
    /// 每秒请求上限，0 表示不限速
    pub requests_per_second: u32,
    /// 最大重试次数
    pub max_retries: u32,
    /// 初始退避时间（毫秒）
    pub initial_backoff_ms: u64,
}

/// 存储配置设置
#[derive(Debug, Deserialize)]
pub struct StorageSettings {
    /// 存储类型 (local, s3, memory)
    pub storage_type: String,
    /// 本地存储路径 (当 type=local 时使用)
    pub local_path: Option<String>,
    /// S3 区域
    pub s3_region: Option<String>,
    /// S3 存储桶名称
    pub s3_bucket: Option<String>,
    /// S3 访问密钥
    pub s3_access_key: Option<String>,
    /// S3 密钥
    pub s3_secret_key: Option<String>,
    /// S3 端点 (可选，用于 MinIO 等兼容服务)
    pub s3_endpoint: Option<String>,
}

/// 指标配置设置
#[derive(Debug, Deserialize)]
pub struct MetricsSettings {
    /// 是否启动 Prometheus 导出器
    pub enabled: bool,
    /// 导出器监听地址
    pub listen_addr: String,
}

/// 采集核心使用的已校验配置
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub category: ListingCategory,
    pub site_origin: Url,
    pub category_path: String,
    pub chunk_size: u64,
    pub max_price: u64,
    pub backfill_from: Option<NaiveDate>,
    pub max_concurrency: usize,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加内置默认值、`config/default.toml`、`config/{APP_ENVIRONMENT}.toml`
    /// 以及 `HARVESTRS__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("HARVESTRS").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 只包含内置默认值的配置构造器
    pub fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            // Default crawl settings
            .set_default("crawl.category", "sale")?
            .set_default("crawl.site_origin", "https://www.morizon.pl")?
            .set_default("crawl.sale_path", "/mieszkania")?
            .set_default("crawl.rent_path", "/do-wynajecia/mieszkania")?
            .set_default("crawl.chunk_size", 20_000)?
            .set_default("crawl.max_price", 5_000_000)?
            // Default HTTP settings
            .set_default("http.user_agent", crate::engines::reqwest_engine::DEFAULT_USER_AGENT)?
            .set_default("http.timeout_secs", 30)?
            .set_default("http.max_concurrency", 8)?
            .set_default("http.requests_per_second", 4)?
            .set_default("http.max_retries", 3)?
            .set_default("http.initial_backoff_ms", 1000)?
            // Default Storage settings
            .set_default("storage.storage_type", "local")?
            .set_default("storage.local_path", "./storage")?
            // Default Metrics settings
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")
    }

    /// 生成采集核心使用的配置
    ///
    /// # 返回值
    ///
    /// * `Ok(HarvestConfig)` - 校验后的配置
    /// * `Err(CrawlError::Config)` - 站点地址无效，或价格区间参数为 0
    pub fn harvest_config(&self) -> Result<HarvestConfig, CrawlError> {
        let crawl = &self.crawl;
        let site_origin = Url::parse(&crawl.site_origin).map_err(|source| CrawlError::InvalidUrl {
            url: crawl.site_origin.clone(),
            source,
        })?;
        if crawl.chunk_size == 0 || crawl.max_price == 0 {
            return Err(CrawlError::Config(format!(
                "crawl.chunk_size ({}) and crawl.max_price ({}) must be positive",
                crawl.chunk_size, crawl.max_price
            )));
        }
        let category_path = match crawl.category {
            ListingCategory::Sale => crawl.sale_path.clone(),
            ListingCategory::Rent => crawl.rent_path.clone(),
        };

        Ok(HarvestConfig {
            category: crawl.category,
            site_origin,
            category_path,
            chunk_size: crawl.chunk_size,
            max_price: crawl.max_price,
            backfill_from: crawl.backfill_from,
            max_concurrency: self.http.max_concurrency.max(1),
        })
    }

    /// 请求重试策略
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.http.max_retries,
            Duration::from_millis(self.http.initial_backoff_ms),
        )
    }

    /// 每秒请求上限，0 表示不限速
    pub fn requests_per_second(&self) -> Option<NonZeroU32> {
        NonZeroU32::new(self.http.requests_per_second)
    }

    /// 指标导出器监听地址；未启用时返回 `None`
    pub fn metrics_addr(&self) -> Result<Option<SocketAddr>, CrawlError> {
        if !self.metrics.enabled {
            return Ok(None);
        }
        self.metrics
            .listen_addr
            .parse()
            .map(Some)
            .map_err(|e| {
                CrawlError::Config(format!(
                    "metrics.listen_addr {:?} is invalid: {}",
                    self.metrics.listen_addr, e
                ))
            })
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
