// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::warn;

use crate::domain::models::crawl_state::{DateWindow, RunClock};
use crate::domain::models::listing::{ListingPage, ListingRef};
use crate::domain::services::listing_urls::is_offer_link;
use crate::domain::services::locale_date::parse_listing_date;
use crate::utils::errors::CrawlError;

static OFFER_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.property_link.property-url").expect("valid selector"));
static LISTING_DATE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("span.single-result__category.single-result__category--date")
        .expect("valid selector")
});
static NEXT_PAGE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a.mz-pagination-number__btn.mz-pagination-number__btn--next")
        .expect("valid selector")
});

/// 列表页解析器
pub struct ListingPageParser;

impl ListingPageParser {
    /// 解析列表页
    ///
    /// 房源链接与发布日期在页面上是两个平行的列表，按位置一一对应。
    /// 两者数量不一致说明页面结构已经变化，此时返回
    /// [`CrawlError::ParseInconsistency`]，该页不产生任何房源。
    ///
    /// # 参数
    ///
    /// * `html` - 列表页内容
    /// * `page_url` - 列表页地址，用于错误报告
    /// * `clock` - 本次运行的时钟，用于"今天"/"昨天"
    pub fn parse(html: &str, page_url: &str, clock: &RunClock) -> Result<ListingPage, CrawlError> {
        let document = Html::parse_document(html);

        let links: Vec<&str> = document
            .select(&OFFER_LINK)
            .filter_map(|element| element.value().attr("href"))
            .filter(|href| is_offer_link(href))
            .collect();

        let dates: Vec<String> = document
            .select(&LISTING_DATE)
            .map(|element| element.text().collect::<String>())
            .collect();

        if links.len() != dates.len() {
            return Err(CrawlError::ParseInconsistency {
                url: page_url.to_string(),
                links: links.len(),
                dates: dates.len(),
            });
        }

        let mut page = ListingPage::default();
        for (href, raw_date) in links.into_iter().zip(dates) {
            match parse_listing_date(&raw_date, clock) {
                Some(listed_on) => page.refs.push(ListingRef {
                    url: href.to_string(),
                    listed_on,
                }),
                None => {
                    warn!(
                        "Unrecognised listing date {:?} for {} on {}",
                        raw_date.trim(),
                        href,
                        page_url
                    );
                    page.unparsed_dates += 1;
                }
            }
        }

        page.next_page = document
            .select(&NEXT_PAGE)
            .find_map(|element| element.value().attr("href"))
            .map(|href| href.to_string());

        Ok(page)
    }
}

/// 保留发布日期落在窗口内的房源引用
pub fn refs_in_window<'a>(
    page: &'a ListingPage,
    window: &'a DateWindow,
) -> impl Iterator<Item = &'a ListingRef> + 'a {
    page.refs
        .iter()
        .filter(move |listing| window.contains(listing.listed_on))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn clock() -> RunClock {
        RunClock::from_today(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap())
    }

    fn row(href: &str, date: &str) -> String {
        format!(
            r#"<div class="row--property-list">
                <a class="property_link property-url" href="{href}">oferta</a>
                <span class="single-result__category single-result__category--date">
                    {date}
                </span>
            </div>"#
        )
    }

    #[test]
    fn test_parse_pairs_links_and_dates() {
        let html = format!(
            "<html><body>{}{}{}<a class=\"mz-pagination-number__btn mz-pagination-number__btn--next\" href=\"/mieszkania/?page=2\">next</a></body></html>",
            row("/oferta/a-mzn1", "01-03-2024"),
            row("/oferta/b-mzn2", "wczoraj"),
            row("/oferta/c-mzn3", "dzisiaj"),
        );

        let page = ListingPageParser::parse(&html, "https://x/mieszkania/", &clock()).unwrap();
        let dates: Vec<NaiveDate> = page.refs.iter().map(|r| r.listed_on).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            ]
        );
        assert_eq!(page.refs[0].url, "/oferta/a-mzn1");
        assert_eq!(page.next_page.as_deref(), Some("/mieszkania/?page=2"));
    }

    #[test]
    fn test_count_mismatch_is_inconsistency() {
        let html = format!(
            "<html><body>{}<span class=\"single-result__category single-result__category--date\">02-03-2024</span></body></html>",
            row("/oferta/a-mzn1", "01-03-2024"),
        );

        let result = ListingPageParser::parse(&html, "https://x/p", &clock());
        assert!(matches!(
            result,
            Err(CrawlError::ParseInconsistency {
                links: 1,
                dates: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_non_offer_links_are_ignored() {
        let html = format!(
            "<html><body>{}<a class=\"property_link property-url\" href=\"/inwestycje/x\">promo</a></body></html>",
            row("/oferta/a-mzn1", "01-03-2024"),
        );
        let page = ListingPageParser::parse(&html, "https://x/p", &clock()).unwrap();
        assert_eq!(page.refs.len(), 1);
        assert!(page.next_page.is_none());
    }

    #[test]
    fn test_unparseable_date_drops_only_that_ref() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            row("/oferta/a-mzn1", "wkrótce"),
            row("/oferta/b-mzn2", "05-03-2024"),
        );
        let page = ListingPageParser::parse(&html, "https://x/p", &clock()).unwrap();
        assert_eq!(page.refs.len(), 1);
        assert_eq!(page.unparsed_dates, 1);
    }

    #[test]
    fn test_window_filter() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            row("/oferta/u1", "01-03-2024"),
            row("/oferta/u2", "10-03-2024"),
        );
        let page = ListingPageParser::parse(&html, "https://x/p", &clock()).unwrap();
        let window = DateWindow {
            start: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
        };
        assert_eq!(refs_in_window(&page, &window).count(), 0);
    }
}
