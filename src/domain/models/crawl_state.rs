// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 运行时钟
///
/// 在一次采集运行开始时捕获"今天"与"昨天"，整个运行期间保持不变，
/// 保证跨午夜的运行内部日期判断一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunClock {
    /// 运行开始时的日期
    pub today: NaiveDate,
    /// `today` 的前一天
    pub yesterday: NaiveDate,
}

impl RunClock {
    /// 以指定日期作为"今天"构造时钟
    pub fn from_today(today: NaiveDate) -> Self {
        Self {
            today,
            yesterday: today - Duration::days(1),
        }
    }

    /// 捕获本地当前日期
    pub fn now() -> Self {
        Self::from_today(Local::now().date_naive())
    }
}

/// 日期窗口
///
/// 本次运行要采集的闭区间 `[start, end]`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// 判断日期是否落在窗口内（含两端）
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// 窗口起点距离终点的天数
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// 站点日期过滤档位
///
/// 仅作为性能提示传给来源站点，从不作为权威过滤条件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateFilter(pub Option<u32>);

impl DateFilter {
    /// 可选的天数档位，升序
    pub const THRESHOLDS: [u32; 5] = [3, 7, 30, 90, 180];

    /// 选择严格大于实际天数差的最小档位；超出最大档位时不过滤
    pub fn for_gap(gap_days: i64) -> Self {
        Self(
            Self::THRESHOLDS
                .iter()
                .copied()
                .find(|threshold| gap_days < i64::from(*threshold)),
        )
    }

    pub fn days(&self) -> Option<u32> {
        self.0
    }
}

/// 价格区间 `[low, high)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceBucket {
    pub low: u64,
    pub high: u64,
}

impl fmt::Display for PriceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

/// 价格区间推进结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketAdvance {
    /// 进入下一个价格区间
    Next(PriceBucket),
    /// 已达到价格上限，采集正常结束
    Exhausted,
}

/// 价格区间遍历器
///
/// 从 `(0, chunk_size)` 开始，每次推进把 `low` 设为旧的 `high`。
/// 当 `low >= max_price` 时遍历结束。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBucketWalker {
    bucket: PriceBucket,
    chunk_size: u64,
    max_price: u64,
}

impl PriceBucketWalker {
    pub fn new(chunk_size: u64, max_price: u64) -> Self {
        Self {
            bucket: PriceBucket {
                low: 0,
                high: chunk_size,
            },
            chunk_size,
            max_price,
        }
    }

    pub fn bucket(&self) -> PriceBucket {
        self.bucket
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn max_price(&self) -> u64 {
        self.max_price
    }

    /// 当前区间是否已越过价格上限
    pub fn is_exhausted(&self) -> bool {
        self.bucket.low >= self.max_price
    }

    /// 推进到下一个价格区间
    pub fn advance(&mut self) -> BucketAdvance {
        let low = self.bucket.high;
        let high = low.saturating_add(self.chunk_size);
        self.bucket = PriceBucket { low, high };

        if self.is_exhausted() {
            BucketAdvance::Exhausted
        } else {
            // low < max_price, so a saturated high still lies above low
            debug_assert!(low < high, "price bucket {}..{} is empty", low, high);
            BucketAdvance::Next(self.bucket)
        }
    }
}

/// 遍历尚未越界的价格区间，包括初始区间
impl Iterator for PriceBucketWalker {
    type Item = PriceBucket;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_exhausted() {
            return None;
        }
        let current = self.bucket;
        self.advance();
        Some(current)
    }
}

/// 采集状态
///
/// 不可变值，随每个遍历步骤传递。日期窗口与时钟在整个运行中固定，
/// 只有价格区间通过 [`CrawlState::advance`] 产生新的状态值。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlState {
    pub window: DateWindow,
    pub clock: RunClock,
    walker: PriceBucketWalker,
}

impl CrawlState {
    pub fn new(window: DateWindow, clock: RunClock, walker: PriceBucketWalker) -> Self {
        Self {
            window,
            clock,
            walker,
        }
    }

    pub fn bucket(&self) -> PriceBucket {
        self.walker.bucket()
    }

    pub fn walker(&self) -> PriceBucketWalker {
        self.walker
    }

    /// 返回下一个价格区间的状态；到达上限时返回 `None`
    pub fn advance(&self) -> Option<CrawlState> {
        let mut walker = self.walker;
        match walker.advance() {
            BucketAdvance::Next(_) => Some(Self { walker, ..*self }),
            BucketAdvance::Exhausted => None,
        }
    }
}
