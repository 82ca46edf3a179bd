// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::Url;

use crate::domain::models::crawl_state::{DateFilter, PriceBucket};
use crate::utils::errors::CrawlError;

const PRICE_FROM: &str = "ps[price_from]";
const PRICE_TO: &str = "ps[price_to]";
const DATE_FILTER: &str = "ps[date_filter]";

/// 详情页链接的路径标记
const OFFER_PATH_MARKER: &str = "/oferta/";

/// 列表页地址构造器
///
/// 价格区间与日期过滤档位以查询参数形式附加在每个列表页地址上。
#[derive(Debug, Clone)]
pub struct ListingUrlBuilder {
    origin: Url,
    category_path: String,
    date_filter: DateFilter,
}

impl ListingUrlBuilder {
    pub fn new(origin: Url, category_path: &str, date_filter: DateFilter) -> Self {
        Self {
            origin,
            category_path: format!("{}/", category_path.trim_end_matches('/')),
            date_filter,
        }
    }

    pub fn date_filter(&self) -> DateFilter {
        self.date_filter
    }

    fn join(&self, href: &str) -> Result<Url, CrawlError> {
        self.origin.join(href).map_err(|source| CrawlError::InvalidUrl {
            url: href.to_string(),
            source,
        })
    }

    /// 价格区间第一页的地址
    pub fn bucket_url(&self, bucket: PriceBucket) -> Result<Url, CrawlError> {
        let mut url = self.join(&self.category_path)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(PRICE_FROM, &bucket.low.to_string());
            query.append_pair(PRICE_TO, &bucket.high.to_string());
            if let Some(days) = self.date_filter.days() {
                query.append_pair(DATE_FILTER, &days.to_string());
            }
        }
        Ok(url)
    }

    /// 解析"下一页"链接
    ///
    /// 站点返回的链接是相对地址，且可能丢失日期过滤参数，缺失时重新附加。
    pub fn resolve_next(&self, href: &str) -> Result<Url, CrawlError> {
        let mut url = self.join(href)?;
        if let Some(days) = self.date_filter.days() {
            let has_filter = url.query_pairs().any(|(key, _)| key == DATE_FILTER);
            if !has_filter {
                url.query_pairs_mut()
                    .append_pair(DATE_FILTER, &days.to_string());
            }
        }
        Ok(url)
    }

    /// 解析详情页链接
    pub fn resolve_offer(&self, href: &str) -> Result<Url, CrawlError> {
        self.join(href)
    }
}

/// 判断链接是否指向房源详情页
pub fn is_offer_link(href: &str) -> bool {
    href.contains(OFFER_PATH_MARKER)
}
