// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 波兰语日期解析

use chrono::NaiveDate;

use crate::domain::models::crawl_state::RunClock;
use crate::domain::models::offer::OfferField;
use crate::utils::errors::ExtractError;

const TODAY: &str = "dzisiaj";
const YESTERDAY: &str = "wczoraj";

/// 月份名称的属格形式，按月份顺序排列
const GENITIVE_MONTHS: [&str; 12] = [
    "stycznia",
    "lutego",
    "marca",
    "kwietnia",
    "maja",
    "czerwca",
    "lipca",
    "sierpnia",
    "września",
    "października",
    "listopada",
    "grudnia",
];

fn relative_date(text: &str, clock: &RunClock) -> Option<NaiveDate> {
    match text {
        TODAY => Some(clock.today),
        YESTERDAY => Some(clock.yesterday),
        _ => None,
    }
}

/// 属格月份名称对应的月份数字
pub fn month_from_genitive(name: &str) -> Option<u32> {
    GENITIVE_MONTHS
        .iter()
        .position(|month| *month == name)
        .map(|index| index as u32 + 1)
}

/// 解析列表页上的日期文字
///
/// 列表页日期形如 `05-03-2024`，或者是"今天"/"昨天"的相对表达。
/// 文字中的所有空白会先被移除。无法识别时返回 `None`。
pub fn parse_listing_date(raw: &str, clock: &RunClock) -> Option<NaiveDate> {
    let text: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    relative_date(&text, clock).or_else(|| NaiveDate::parse_from_str(&text, "%d-%m-%Y").ok())
}

/// 解析详情页上的日期文字
///
/// 支持相对表达，以及 `<日> <属格月份> <年>` 形式，如 `3 stycznia 2024`。
/// 其余任何写法都视为格式错误。
///
/// # 参数
///
/// * `raw` - 页面上的日期文字
/// * `clock` - 本次运行的时钟，用于相对日期
/// * `field` - 日期所属字段，用于错误报告
pub fn parse_polish_date(
    raw: &str,
    clock: &RunClock,
    field: OfferField,
) -> Result<NaiveDate, ExtractError> {
    let malformed = || ExtractError::MalformedDate {
        field,
        raw: raw.to_string(),
    };

    let text = raw.trim().to_lowercase();
    if let Some(date) = relative_date(&text, clock) {
        return Ok(date);
    }

    let mut parts = text.split_whitespace();
    let (Some(day), Some(month), Some(year), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed());
    };

    if day.is_empty() || day.len() > 2 || !day.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }

    let day: u32 = day.parse().map_err(|_| malformed())?;
    let year: i32 = year.parse().map_err(|_| malformed())?;
    let month = month_from_genitive(month).ok_or_else(malformed)?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(malformed)
}
