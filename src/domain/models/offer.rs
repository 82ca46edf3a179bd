// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::errors::ExtractError;

/// 房源记录
///
/// 由提取器从单个详情页生成，创建后不再修改。`offer_id` 是站点分配的
/// 房源标识，用于跨运行去重。可选字段缺失表示"未知"，从不填充占位值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferRecord {
    /// 站点分配的房源编号
    pub offer_id: String,
    /// 详情页地址
    pub url: String,
    /// 总价
    pub price: Decimal,
    /// 每平方米价格
    pub price_per_m2: Option<Decimal>,
    /// 面积（平方米）
    pub size: Option<Decimal>,
    pub room_count: Option<i32>,
    pub floor: Option<i32>,
    pub building_height: Option<i32>,
    pub building_year: Option<i32>,
    /// 发布日期
    pub date_added: Option<NaiveDate>,
    /// 更新日期
    pub date_refreshed: Option<NaiveDate>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub title: String,
    pub description: String,
    /// 描述的字符数
    pub description_length: usize,
    pub view_count: u64,
    pub promotion_count: u64,
    /// 是否为业主直售
    pub direct: bool,
    pub building_type: Option<String>,
    pub building_material: Option<String>,
    pub market_type: Option<String>,
    pub condition: Option<String>,
    pub balcony: Option<String>,
    pub terrace: Option<String>,
    pub heating: Option<String>,
    pub amenities: Option<String>,
    pub media: Option<String>,
    pub equipment: Option<String>,
    pub image_link: Option<String>,
}

/// 房源记录字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OfferField {
    OfferId,
    Url,
    Price,
    PricePerM2,
    Size,
    RoomCount,
    Floor,
    BuildingHeight,
    BuildingYear,
    DateAdded,
    DateRefreshed,
    Latitude,
    Longitude,
    Title,
    Description,
    ViewCount,
    PromotionCount,
    Direct,
    BuildingType,
    BuildingMaterial,
    MarketType,
    Condition,
    Balcony,
    Terrace,
    Heating,
    Amenities,
    Media,
    Equipment,
    ImageLink,
}

impl OfferField {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferField::OfferId => "offer_id",
            OfferField::Url => "url",
            OfferField::Price => "price",
            OfferField::PricePerM2 => "price_per_m2",
            OfferField::Size => "size",
            OfferField::RoomCount => "room_count",
            OfferField::Floor => "floor",
            OfferField::BuildingHeight => "building_height",
            OfferField::BuildingYear => "building_year",
            OfferField::DateAdded => "date_added",
            OfferField::DateRefreshed => "date_refreshed",
            OfferField::Latitude => "latitude",
            OfferField::Longitude => "longitude",
            OfferField::Title => "title",
            OfferField::Description => "description",
            OfferField::ViewCount => "view_count",
            OfferField::PromotionCount => "promotion_count",
            OfferField::Direct => "direct",
            OfferField::BuildingType => "building_type",
            OfferField::BuildingMaterial => "building_material",
            OfferField::MarketType => "market_type",
            OfferField::Condition => "condition",
            OfferField::Balcony => "balcony",
            OfferField::Terrace => "terrace",
            OfferField::Heating => "heating",
            OfferField::Amenities => "amenities",
            OfferField::Media => "media",
            OfferField::Equipment => "equipment",
            OfferField::ImageLink => "image_link",
        }
    }
}

impl fmt::Display for OfferField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 详情页参数表中的已知标签
///
/// 参数表是"标签: 值"的行列表，只有这里列出的标签会写入记录，
/// 其余标签被忽略并记录日志。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferParam {
    Floor,
    BuildingHeight,
    OfferId,
    BuildingYear,
    /// 发布日期，需再次校验是否落在日期窗口内
    Published,
    Updated,
    BuildingType,
    BuildingMaterial,
    Market,
    Condition,
    Balcony,
    Terrace,
}

impl OfferParam {
    pub const ALL: [OfferParam; 12] = [
        OfferParam::Floor,
        OfferParam::BuildingHeight,
        OfferParam::OfferId,
        OfferParam::BuildingYear,
        OfferParam::Published,
        OfferParam::Updated,
        OfferParam::BuildingType,
        OfferParam::BuildingMaterial,
        OfferParam::Market,
        OfferParam::Condition,
        OfferParam::Balcony,
        OfferParam::Terrace,
    ];

    /// 页面上显示的标签文字
    pub fn label(&self) -> &'static str {
        match self {
            OfferParam::Floor => "Piętro",
            OfferParam::BuildingHeight => "Liczba pięter",
            OfferParam::OfferId => "Numer oferty",
            OfferParam::BuildingYear => "Rok budowy",
            OfferParam::Published => "Opublikowano",
            OfferParam::Updated => "Zaktualizowano",
            OfferParam::BuildingType => "Typ budynku",
            OfferParam::BuildingMaterial => "Materiał budowlany",
            OfferParam::Market => "Rynek",
            OfferParam::Condition => "Stan nieruchomości",
            OfferParam::Balcony => "Balkon",
            OfferParam::Terrace => "Taras",
        }
    }

    /// 根据标签文字查找参数，忽略结尾的冒号与空白
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().trim_end_matches(':').trim();
        Self::ALL.into_iter().find(|param| param.label() == label)
    }

    /// 参数写入的记录字段
    pub fn field(&self) -> OfferField {
        match self {
            OfferParam::Floor => OfferField::Floor,
            OfferParam::BuildingHeight => OfferField::BuildingHeight,
            OfferParam::OfferId => OfferField::OfferId,
            OfferParam::BuildingYear => OfferField::BuildingYear,
            OfferParam::Published => OfferField::DateAdded,
            OfferParam::Updated => OfferField::DateRefreshed,
            OfferParam::BuildingType => OfferField::BuildingType,
            OfferParam::BuildingMaterial => OfferField::BuildingMaterial,
            OfferParam::Market => OfferField::MarketType,
            OfferParam::Condition => OfferField::Condition,
            OfferParam::Balcony => OfferField::Balcony,
            OfferParam::Terrace => OfferField::Terrace,
        }
    }
}

/// 详情页中以 `<h3>` 标题引出的自由文本段落
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferSection {
    Heating,
    Amenities,
    Media,
    Equipment,
}

impl OfferSection {
    pub const ALL: [OfferSection; 4] = [
        OfferSection::Heating,
        OfferSection::Amenities,
        OfferSection::Media,
        OfferSection::Equipment,
    ];

    pub fn heading(&self) -> &'static str {
        match self {
            OfferSection::Heating => "Ogrzewanie",
            OfferSection::Amenities => "Udogodnienia",
            OfferSection::Media => "Media",
            OfferSection::Equipment => "Wyposażenie",
        }
    }

    pub fn field(&self) -> OfferField {
        match self {
            OfferSection::Heating => OfferField::Heating,
            OfferSection::Amenities => OfferField::Amenities,
            OfferSection::Media => OfferField::Media,
            OfferSection::Equipment => OfferField::Equipment,
        }
    }
}

/// 房源记录草稿
///
/// 提取过程中逐步填充，[`OfferDraft::finish`] 校验必填字段后生成记录。
#[derive(Debug, Clone, Default)]
pub struct OfferDraft {
    pub offer_id: Option<String>,
    pub url: String,
    pub price: Option<Decimal>,
    pub price_per_m2: Option<Decimal>,
    pub size: Option<Decimal>,
    pub room_count: Option<i32>,
    pub floor: Option<i32>,
    pub building_height: Option<i32>,
    pub building_year: Option<i32>,
    pub date_added: Option<NaiveDate>,
    pub date_refreshed: Option<NaiveDate>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub title: String,
    pub description: String,
    pub view_count: u64,
    pub promotion_count: u64,
    pub direct: bool,
    pub building_type: Option<String>,
    pub building_material: Option<String>,
    pub market_type: Option<String>,
    pub condition: Option<String>,
    pub balcony: Option<String>,
    pub terrace: Option<String>,
    pub heating: Option<String>,
    pub amenities: Option<String>,
    pub media: Option<String>,
    pub equipment: Option<String>,
    pub image_link: Option<String>,
}

impl OfferDraft {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// 写入自由文本字段；非文本字段返回 `false`
    pub fn set_text(&mut self, field: OfferField, value: String) -> bool {
        let slot = match field {
            OfferField::BuildingType => &mut self.building_type,
            OfferField::BuildingMaterial => &mut self.building_material,
            OfferField::MarketType => &mut self.market_type,
            OfferField::Condition => &mut self.condition,
            OfferField::Balcony => &mut self.balcony,
            OfferField::Terrace => &mut self.terrace,
            OfferField::Heating => &mut self.heating,
            OfferField::Amenities => &mut self.amenities,
            OfferField::Media => &mut self.media,
            OfferField::Equipment => &mut self.equipment,
            OfferField::ImageLink => &mut self.image_link,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// 生成最终记录
    ///
    /// 价格缺失时返回 `Ok(None)`：没有价格的房源不在采集范围内，不是错误。
    pub fn finish(self) -> Result<Option<OfferRecord>, ExtractError> {
        let Some(price) = self.price else {
            return Ok(None);
        };
        let offer_id = self
            .offer_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ExtractError::MissingOfferId)?;
        let description_length = self.description.chars().count();

        Ok(Some(OfferRecord {
            offer_id,
            url: self.url,
            price,
            price_per_m2: self.price_per_m2,
            size: self.size,
            room_count: self.room_count,
            floor: self.floor,
            building_height: self.building_height,
            building_year: self.building_year,
            date_added: self.date_added,
            date_refreshed: self.date_refreshed,
            latitude: self.latitude,
            longitude: self.longitude,
            title: self.title,
            description: self.description,
            description_length,
            view_count: self.view_count,
            promotion_count: self.promotion_count,
            direct: self.direct,
            building_type: self.building_type,
            building_material: self.building_material,
            market_type: self.market_type,
            condition: self.condition,
            balcony: self.balcony,
            terrace: self.terrace,
            heating: self.heating,
            amenities: self.amenities,
            media: self.media,
            equipment: self.equipment,
            image_link: self.image_link,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_from_label() {
        assert_eq!(OfferParam::from_label("Piętro:"), Some(OfferParam::Floor));
        assert_eq!(
            OfferParam::from_label("  Numer oferty: "),
            Some(OfferParam::OfferId)
        );
        assert_eq!(
            OfferParam::from_label("Opublikowano"),
            Some(OfferParam::Published)
        );
        assert_eq!(OfferParam::from_label("Winda"), None);
    }

    #[test]
    fn test_finish_without_price_is_skipped() {
        let mut draft = OfferDraft::new("https://example.com/oferta/1");
        draft.offer_id = Some("mzn1".to_string());
        assert!(draft.finish().unwrap().is_none());
    }

    #[test]
    fn test_finish_requires_offer_id() {
        let mut draft = OfferDraft::new("https://example.com/oferta/1");
        draft.price = Some(Decimal::new(100, 0));
        assert!(matches!(draft.finish(), Err(ExtractError::MissingOfferId)));
    }

    #[test]
    fn test_finish_counts_description_chars() {
        let mut draft = OfferDraft::new("https://example.com/oferta/1");
        draft.price = Some(Decimal::new(100, 0));
        draft.offer_id = Some("mzn1".to_string());
        draft.description = "Piękne mieszkanie".to_string();

        let record = draft.finish().unwrap().unwrap();
        assert_eq!(record.description_length, 17);
        assert!(record.size.is_none());
    }

    #[test]
    fn test_set_text_rejects_numeric_fields() {
        let mut draft = OfferDraft::default();
        assert!(draft.set_text(OfferField::Balcony, "tak".to_string()));
        assert!(!draft.set_text(OfferField::Price, "100".to_string()));
        assert_eq!(draft.balcony.as_deref(), Some("tak"));
    }
}
