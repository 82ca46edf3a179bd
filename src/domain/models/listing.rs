// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 房源类别
///
/// 每个类别有独立的站点路径和独立的存储前缀。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListingCategory {
    /// 出售
    #[default]
    Sale,
    /// 出租
    Rent,
}

impl ListingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingCategory::Sale => "sale",
            ListingCategory::Rent => "rent",
        }
    }
}

impl fmt::Display for ListingCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sale" => Ok(ListingCategory::Sale),
            "rent" => Ok(ListingCategory::Rent),
            other => Err(format!("unknown listing category: {}", other)),
        }
    }
}

/// 列表页上的一条房源引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRef {
    /// 房源详情页链接（原样，尚未解析为绝对地址）
    pub url: String,
    /// 列表页显示的发布日期
    pub listed_on: NaiveDate,
}

/// 解析后的列表页
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub refs: Vec<ListingRef>,
    /// "下一页"按钮的 href
    pub next_page: Option<String>,
    /// 日期无法识别而被丢弃的条目数
    pub unparsed_dates: usize,
}
