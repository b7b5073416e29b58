// src/services/products.rs

//! Product listing page parser.
//!
//! Reads shop search pages with configured CSS selectors. The container
//! selector doubles as a layout check: a page without it means the shop
//! changed its markup, which is reported instead of silently yielding nothing.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::collector::{PageParser, ParsedPage, SkippedItem};
use crate::error::{AppError, Result};
use crate::models::{Product, ProductSelectors};
use crate::utils::resolve_url;
use crate::utils::text::{normalize_whitespace, parse_amount, truncate_graphemes};

/// Longest item name quoted in a skip reason.
const LABEL_LEN: usize = 40;

/// Parser for product listing pages.
#[derive(Debug, Clone)]
pub struct ProductPageParser {
    selectors: ProductSelectors,
    container: Selector,
    item: Selector,
    name: Selector,
    price: Selector,
    list_price: Option<Selector>,
    discount: Option<Selector>,
    sold_out: Option<Selector>,
    link: Option<Selector>,
    percent: Regex,
}

impl ProductPageParser {
    /// Compile the configured selectors.
    pub fn new(selectors: &ProductSelectors) -> Result<Self> {
        let optional = |s: &Option<String>| s.as_deref().map(parse_selector).transpose();

        Ok(Self {
            container: parse_selector(&selectors.container)?,
            item: parse_selector(&selectors.item)?,
            name: parse_selector(&selectors.name)?,
            price: parse_selector(&selectors.price)?,
            list_price: optional(&selectors.list_price)?,
            discount: optional(&selectors.discount)?,
            sold_out: optional(&selectors.sold_out)?,
            link: optional(&selectors.link)?,
            percent: Regex::new(r"(\d{1,3})\s*%")
                .map_err(|e| AppError::invalid_input(e.to_string()))?,
            selectors: selectors.clone(),
        })
    }

    /// Build a product from one item element, or explain why it was skipped.
    fn parse_item(
        &self,
        item: &ElementRef,
        base: Option<&Url>,
    ) -> std::result::Result<Product, SkippedItem> {
        let name = item
            .select(&self.name)
            .next()
            .map(|el| normalize_whitespace(&el.text().collect::<String>()))
            .unwrap_or_default();

        let code = item
            .value()
            .attr(&self.selectors.code_attr)
            .map(str::trim)
            .unwrap_or_default();
        if code.is_empty() {
            if name.is_empty() {
                return Err(SkippedItem::untitled("unnamed item (missing product code)"));
            }
            let label = format!("{} (missing product code)", truncate_graphemes(&name, LABEL_LEN));
            return Err(SkippedItem::titled(name, label));
        }
        if name.is_empty() {
            return Err(SkippedItem::untitled(format!("{code} (missing name)")));
        }

        let sold_out = self
            .sold_out
            .as_ref()
            .is_some_and(|sel| item.select(sel).next().is_some());

        let price = item
            .select(&self.price)
            .next()
            .and_then(|el| parse_amount(&el.text().collect::<String>()));
        let price = match (price, sold_out) {
            (Some(price), _) => price,
            (None, true) => 0,
            (None, false) => {
                let label = format!("{} (price unreadable)", truncate_graphemes(&name, LABEL_LEN));
                return Err(SkippedItem::titled(name, label));
            }
        };

        let list_price = self
            .list_price
            .as_ref()
            .and_then(|sel| item.select(sel).next())
            .and_then(|el| parse_amount(&el.text().collect::<String>()))
            .filter(|&list| list > price);

        let discount_rate = self
            .discount
            .as_ref()
            .and_then(|sel| item.select(sel).next())
            .and_then(|el| {
                let text: String = el.text().collect();
                self.percent
                    .captures(&text)
                    .and_then(|caps| caps[1].parse::<u8>().ok())
            })
            .or_else(|| list_price.map(|list| derived_discount(list, price)))
            .unwrap_or(0)
            .min(100);

        let href = self
            .link
            .as_ref()
            .and_then(|sel| item.select(sel).next())
            .or_else(|| item.select(&self.name).next())
            .and_then(|el| el.value().attr(&self.selectors.link_attr))
            .unwrap_or("");
        let url = match (base, href.is_empty()) {
            (_, true) => String::new(),
            (Some(base), false) => resolve_url(base, href),
            (None, false) => href.to_string(),
        };

        let mut product = Product::new(code, name, price);
        product.url = url;
        product.list_price = list_price;
        product.discount_rate = discount_rate;
        product.sold_out = sold_out;
        Ok(product)
    }
}

impl PageParser for ProductPageParser {
    type Record = Product;

    fn parse(&self, body: &[u8], url: &str) -> Result<ParsedPage<Product>> {
        let html = String::from_utf8_lossy(body);
        let document = Html::parse_document(&html);

        let container = document.select(&self.container).next().ok_or_else(|| {
            AppError::structure(&self.selectors.container, url, "container not found")
        })?;

        let base = Url::parse(url).ok();
        let mut page = ParsedPage::empty();
        for item in container.select(&self.item) {
            page.raw_count += 1;
            match self.parse_item(&item, base.as_ref()) {
                Ok(product) => page.records.push(product),
                Err(skipped) => {
                    log::debug!("Skipping item on {url}: {}", skipped.label);
                    page.skipped.push(skipped);
                }
            }
        }
        Ok(page)
    }
}

/// Discount in percent implied by a list price, rounded to nearest.
fn derived_discount(list_price: u64, price: u64) -> u8 {
    if list_price == 0 || price >= list_price {
        return 0;
    }
    let (list, price) = (u128::from(list_price), u128::from(price));
    let rate = ((list - price) * 100 + list / 2) / list;
    u8::try_from(rate.min(100)).unwrap_or(0)
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
