// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::{HashSet, VecDeque};
use url::Url;

use crate::domain::models::crawl_state::CrawlState;

/// 待执行的抓取工作
#[derive(Debug, Clone)]
pub enum WorkItem {
    /// 抓取并解析一个列表页
    ListingPage { state: CrawlState, url: Url },
    /// 抓取并提取一个详情页
    Offer { state: CrawlState, url: Url },
}

impl WorkItem {
    pub fn url(&self) -> &Url {
        match self {
            WorkItem::ListingPage { url, .. } | WorkItem::Offer { url, .. } => url,
        }
    }
}

/// 单次运行的工作队列
///
/// 列表页优先出队，因为它们会产生后续工作；详情页按发现顺序出队。
/// 同一详情页地址在一次运行中只入队一次。
#[derive(Debug, Default)]
pub struct WorkQueue {
    listing_pages: VecDeque<WorkItem>,
    offers: VecDeque<WorkItem>,
    seen_offers: HashSet<String>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_listing_page(&mut self, state: CrawlState, url: Url) {
        self.listing_pages
            .push_back(WorkItem::ListingPage { state, url });
    }

    /// 入队详情页；地址已出现过时返回 `false`
    pub fn push_offer(&mut self, state: CrawlState, url: Url) -> bool {
        if !self.seen_offers.insert(url.as_str().to_string()) {
            return false;
        }
        self.offers.push_back(WorkItem::Offer { state, url });
        true
    }

    pub fn pop(&mut self) -> Option<WorkItem> {
        self.listing_pages
            .pop_front()
            .or_else(|| self.offers.pop_front())
    }

    pub fn len(&self) -> usize {
        self.listing_pages.len() + self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listing_pages.is_empty() && self.offers.is_empty()
    }

    /// 已入队过的详情页数量
    pub fn offers_discovered(&self) -> usize {
        self.seen_offers.len()
    }
}
