// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::domain::models::offer::OfferField;
use crate::utils::errors::ExtractError;

/// 数值后面可能跟随的单位，较长的写在前面
const UNIT_SUFFIXES: [&str; 6] = ["zł/m²", "zł/m2", "zł", "pln", "m²", "m2"];

/// 约数标记
const CIRCA: char = '~';

/// 规范化数值文字
///
/// 移除各种空白（含不换行空格与窄空格）、约数标记与单位后缀，
/// 并把逗号小数点转换为句点。
pub fn normalize(raw: &str) -> String {
    let mut text: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != CIRCA)
        .collect::<String>()
        .to_lowercase();

    // "1 234 zł/m²" style trailing units
    while let Some(stripped) = UNIT_SUFFIXES
        .iter()
        .find_map(|unit| text.strip_suffix(unit))
    {
        text = stripped.to_string();
    }

    text.replace(',', ".")
}

fn malformed(field: OfferField, raw: &str) -> ExtractError {
    ExtractError::MalformedNumericField {
        field,
        raw: raw.to_string(),
    }
}

/// 解析十进制数值
pub fn parse_decimal(raw: &str, field: OfferField) -> Result<Decimal, ExtractError> {
    let text = normalize(raw);
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return Err(malformed(field, raw));
    }
    Decimal::from_str(&text).map_err(|_| malformed(field, raw))
}

/// 解析整数值
pub fn parse_int(raw: &str, field: OfferField) -> Result<i32, ExtractError> {
    normalize(raw)
        .parse::<i32>()
        .map_err(|_| malformed(field, raw))
}

/// 解析楼层
///
/// `parter` 表示底层 (0)；`3/10` 形式只取斜杠前的部分。
pub fn parse_floor(raw: &str) -> Result<i32, ExtractError> {
    let text = raw.trim().to_lowercase();
    let floor = text.split('/').next().unwrap_or_default().trim();
    if floor == "parter" {
        return Ok(0);
    }
    parse_int(floor, OfferField::Floor).map_err(|_| malformed(OfferField::Floor, raw))
}

/// 从统计文字中取前两个数字，依次为浏览次数与推广次数
pub fn leading_counters(text: &str) -> Result<(u64, u64), ExtractError> {
    let mut numbers = text
        .split_whitespace()
        .filter(|token| token.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|token| token.parse::<u64>().ok());

    match (numbers.next(), numbers.next()) {
        (Some(views), Some(promotions)) => Ok((views, promotions)),
        (None, _) => Err(malformed(OfferField::ViewCount, text)),
        (Some(_), None) => Err(malformed(OfferField::PromotionCount, text)),
    }
}
