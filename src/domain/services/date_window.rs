// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::models::crawl_state::{DateFilter, DateWindow, RunClock};
use crate::utils::errors::CrawlError;

/// 日期窗口解析结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedWindow {
    pub window: DateWindow,
    /// 传给站点的日期过滤档位
    pub date_filter: DateFilter,
}

/// 日期窗口解析器
///
/// 根据历史输出中最新的发布日期计算本次运行的采集窗口。
/// 窗口终点总是"昨天"，当天的房源尚未稳定，不在本次采集范围内。
pub struct DateWindowResolver;

impl DateWindowResolver {
    /// 解析日期窗口
    ///
    /// # 参数
    ///
    /// * `prior` - 历史输出中最新的发布日期，没有历史输出时为 `None`
    /// * `clock` - 本次运行的时钟
    /// * `backfill_from` - 没有历史输出时使用的起始日期
    ///
    /// # 返回值
    ///
    /// * `Ok(ResolvedWindow)` - 日期窗口与站点过滤档位
    /// * `Err(CrawlError::WindowResolution)` - 没有可用的起始日期，或起始日期晚于昨天
    pub fn resolve(
        prior: Option<NaiveDate>,
        clock: &RunClock,
        backfill_from: Option<NaiveDate>,
    ) -> Result<ResolvedWindow, CrawlError> {
        let end = clock.yesterday;

        let start = match prior {
            Some(prior) if prior == clock.today => clock.yesterday,
            Some(prior) if prior > clock.today => {
                return Err(CrawlError::WindowResolution(format!(
                    "latest stored listing date {} is after today {}",
                    prior, clock.today
                )));
            }
            Some(prior) => prior,
            None => {
                let backfill = backfill_from.ok_or_else(|| {
                    CrawlError::WindowResolution(
                        "no prior output found and no backfill start date configured".to_string(),
                    )
                })?;
                if backfill > end {
                    return Err(CrawlError::WindowResolution(format!(
                        "backfill start date {} is after yesterday {}",
                        backfill, end
                    )));
                }
                backfill
            }
        };

        let window = DateWindow { start, end };
        let date_filter = DateFilter::for_gap(window.span_days());
        debug!(
            "Resolved date window {} (prior: {:?}, date filter: {:?})",
            window,
            prior,
            date_filter.days()
        );

        Ok(ResolvedWindow {
            window,
            date_filter,
        })
    }
}

#[cfg(test)]
#[path = "date_window_test.rs"]
mod tests;
