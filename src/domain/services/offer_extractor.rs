// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::domain::models::crawl_state::CrawlState;
use crate::domain::models::offer::{OfferDraft, OfferField, OfferParam, OfferRecord, OfferSection};
use crate::domain::services::locale_date::parse_polish_date;
use crate::domain::services::numeric::{leading_counters, parse_decimal, parse_floor, parse_int};
use crate::utils::errors::ExtractError;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static PRICE: Lazy<Selector> = Lazy::new(|| selector("li.paramIconPrice em"));
static PRICE_M2: Lazy<Selector> = Lazy::new(|| selector("li.paramIconPriceM2 em"));
static LIVING_AREA: Lazy<Selector> = Lazy::new(|| selector("li.paramIconLivingArea em"));
static ROOMS: Lazy<Selector> = Lazy::new(|| selector("li.paramIconNumberOfRooms em"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("div.col-xs-9 span"));
static PARAM_ROW: Lazy<Selector> = Lazy::new(|| selector("section.propertyParams tr"));
static PARAM_KEY: Lazy<Selector> = Lazy::new(|| selector("th"));
static PARAM_VALUE: Lazy<Selector> = Lazy::new(|| selector("td"));
static SECTION_HEADING: Lazy<Selector> = Lazy::new(|| selector("h3"));
static MAP: Lazy<Selector> = Lazy::new(|| selector("div.GoogleMap"));
static OWNER_TYPE: Lazy<Selector> = Lazy::new(|| selector("div.agentOwnerType"));
static DESCRIPTION: Lazy<Selector> = Lazy::new(|| selector("div.description"));
static IMAGE: Lazy<Selector> = Lazy::new(|| selector("img#imageBig"));
static STATS: Lazy<Selector> = Lazy::new(|| selector("div.propertyStat p"));

/// 房源被跳过的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 页面没有价格
    NoPrice,
    /// 详情页上的发布日期不在本次日期窗口内
    OutsideWindow(NaiveDate),
}

/// 单个详情页的提取结果
#[derive(Debug, Clone, PartialEq)]
pub enum OfferOutcome {
    Extracted(Box<OfferRecord>),
    Skipped(SkipReason),
}

/// 房源详情页提取器
pub struct OfferExtractor;

impl OfferExtractor {
    /// 从详情页提取房源记录
    ///
    /// 价格是唯一的必填字段，缺失时返回 [`SkipReason::NoPrice`]。
    /// 详情页上的发布日期会按本次日期窗口再校验一次，窗口外的房源整体丢弃。
    /// 其余字段缺失时保持为空，格式错误时返回 [`ExtractError`]。
    ///
    /// # 参数
    ///
    /// * `html` - 详情页内容
    /// * `url` - 详情页地址
    /// * `state` - 当前采集状态，提供日期窗口与运行时钟
    pub fn extract(html: &str, url: &str, state: &CrawlState) -> Result<OfferOutcome, ExtractError> {
        let document = Html::parse_document(html);
        let mut draft = OfferDraft::new(url);

        let Some(price) = first_text(&document, &PRICE) else {
            return Ok(OfferOutcome::Skipped(SkipReason::NoPrice));
        };
        draft.price = Some(parse_decimal(&price, OfferField::Price)?);

        if let Some(raw) = first_text(&document, &PRICE_M2) {
            draft.price_per_m2 = Some(parse_decimal(&raw, OfferField::PricePerM2)?);
        }
        if let Some(raw) = first_text(&document, &LIVING_AREA) {
            draft.size = Some(parse_decimal(&raw, OfferField::Size)?);
        }
        if let Some(raw) = first_text(&document, &ROOMS) {
            draft.room_count = Some(parse_int(&raw, OfferField::RoomCount)?);
        }

        draft.title = joined_text(document.select(&TITLE));

        for row in document.select(&PARAM_ROW) {
            let (Some(key), Some(value)) = (
                row.select(&PARAM_KEY).next().map(element_text),
                row.select(&PARAM_VALUE).next().map(element_text),
            ) else {
                continue;
            };

            let Some(param) = OfferParam::from_label(&key) else {
                debug!("Ignoring unknown offer parameter {:?} on {}", key, url);
                continue;
            };

            if let Some(skip) = apply_param(&mut draft, param, &value, state)? {
                return Ok(OfferOutcome::Skipped(skip));
            }
        }

        for heading in document.select(&SECTION_HEADING) {
            let heading_text = element_text(heading);
            let Some(section) = OfferSection::ALL
                .into_iter()
                .find(|section| section.heading() == heading_text)
            else {
                continue;
            };
            if let Some(paragraph) = following_paragraph(heading) {
                let text = element_text(paragraph).replace('\n', "");
                if !text.is_empty() {
                    draft.set_text(section.field(), text);
                }
            }
        }

        if let Some(map) = document.select(&MAP).next() {
            draft.latitude = optional_decimal(map.value().attr("data-lat"), OfferField::Latitude)?;
            draft.longitude =
                optional_decimal(map.value().attr("data-lng"), OfferField::Longitude)?;
        }

        draft.direct = document
            .select(&OWNER_TYPE)
            .next()
            .map(|element| !element_text(element).is_empty())
            .unwrap_or(false);

        draft.description = document
            .select(&DESCRIPTION)
            .next()
            .map(|element| joined_text(std::iter::once(element)))
            .unwrap_or_default();

        if let Some(src) = document
            .select(&IMAGE)
            .next()
            .and_then(|element| element.value().attr("src"))
        {
            draft.set_text(OfferField::ImageLink, src.to_string());
        }

        let stats = joined_text(document.select(&STATS));
        let (views, promotions) = leading_counters(&stats)?;
        draft.view_count = views;
        draft.promotion_count = promotions;

        Ok(match draft.finish()? {
            Some(record) => OfferOutcome::Extracted(Box::new(record)),
            None => OfferOutcome::Skipped(SkipReason::NoPrice),
        })
    }
}

/// 把参数表中的一行写入草稿；发布日期在窗口外时返回跳过原因
fn apply_param(
    draft: &mut OfferDraft,
    param: OfferParam,
    value: &str,
    state: &CrawlState,
) -> Result<Option<SkipReason>, ExtractError> {
    let field = param.field();
    match param {
        OfferParam::Floor => draft.floor = Some(parse_floor(value)?),
        OfferParam::BuildingHeight => draft.building_height = Some(parse_int(value, field)?),
        OfferParam::BuildingYear => draft.building_year = Some(parse_int(value, field)?),
        OfferParam::OfferId => draft.offer_id = Some(value.to_string()),
        OfferParam::Published => {
            let published = parse_polish_date(value, &state.clock, field)?;
            if !state.window.contains(published) {
                return Ok(Some(SkipReason::OutsideWindow(published)));
            }
            draft.date_added = Some(published);
        }
        OfferParam::Updated => {
            draft.date_refreshed = Some(parse_polish_date(value, &state.clock, field)?)
        }
        OfferParam::BuildingType
        | OfferParam::BuildingMaterial
        | OfferParam::Market
        | OfferParam::Condition
        | OfferParam::Balcony
        | OfferParam::Terrace => {
            if !value.is_empty() {
                draft.set_text(field, value.to_string());
            }
        }
    }
    Ok(None)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// 拼接多个元素中的所有非空文本片段
fn joined_text<'a>(elements: impl Iterator<Item = ElementRef<'a>>) -> String {
    elements
        .flat_map(|element| element.text())
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

fn optional_decimal(
    raw: Option<&str>,
    field: OfferField,
) -> Result<Option<rust_decimal::Decimal>, ExtractError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => parse_decimal(value, field).map(Some),
        None => Ok(None),
    }
}

/// 标题之后的第一个 `<p>` 兄弟元素
fn following_paragraph(heading: ElementRef<'_>) -> Option<ElementRef<'_>> {
    heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == "p")
}

#[cfg(test)]
#[path = "offer_extractor_test.rs"]
mod tests;
