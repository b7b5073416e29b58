//! Product listing record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Record;
use crate::render::{self, Render};
use crate::utils::text::format_price;

/// A product offered by an online shop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    /// Shop-assigned product code
    pub code: String,

    /// Display name
    pub name: String,

    /// Product page URL
    #[serde(default)]
    pub url: String,

    /// Current selling price
    pub price: u64,

    /// Price before discount, when the shop shows one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_price: Option<u64>,

    /// Discount rate in percent
    #[serde(default)]
    pub discount_rate: u8,

    /// Sold out or delisted
    #[serde(default)]
    pub sold_out: bool,

    /// Lowest price seen since the product was first watched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lowest_price: Option<u64>,

    /// When the lowest price was observed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lowest_price_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn new(code: impl Into<String>, name: impl Into<String>, price: u64) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            url: String::new(),
            price,
            list_price: None,
            discount_rate: 0,
            sold_out: false,
            lowest_price: None,
            lowest_price_at: None,
        }
    }

    fn update_lowest(&mut self, observed_at: DateTime<Utc>) {
        if self.sold_out || self.price == 0 {
            return;
        }
        if self.lowest_price.is_none_or(|lowest| self.price < lowest) {
            self.lowest_price = Some(self.price);
            self.lowest_price_at = Some(observed_at);
        }
    }

    fn price_label(&self, html: bool) -> String {
        let mut label = format_price(self.price);
        if self.discount_rate > 0 {
            label.push_str(&format!(" ({}% off)", self.discount_rate));
        }
        render::text(&label, html)
    }

    fn lowest_label(&self, html: bool) -> Option<String> {
        let lowest = self.lowest_price?;
        let at = self
            .lowest_price_at
            .map(|t| format!(", {}", t.format("%Y-%m-%d")))
            .unwrap_or_default();
        Some(render::text(
            &format!("lowest {}{}", format_price(lowest), at),
            html,
        ))
    }
}

impl Record for Product {
    fn key(&self) -> String {
        self.code.clone()
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        !self.sold_out
    }

    fn has_changed(&self, previous: &Self) -> bool {
        self.price != previous.price || self.discount_rate != previous.discount_rate
    }

    fn init_derived(&mut self, observed_at: DateTime<Utc>) {
        self.lowest_price = None;
        self.lowest_price_at = None;
        self.update_lowest(observed_at);
    }

    fn carry_forward(&mut self, previous: &Self, observed_at: DateTime<Utc>) {
        self.lowest_price = previous.lowest_price;
        self.lowest_price_at = previous.lowest_price_at;
        self.update_lowest(observed_at);
    }
}

impl Render for Product {
    fn render(&self, html: bool) -> String {
        let name = render::link(&self.name, Some(&self.url), html);
        if self.sold_out {
            return format!("{name} {}", render::text("(sold out)", html));
        }

        let mut line = format!("{name} {}", self.price_label(html));
        if let Some(lowest) = self.lowest_label(html) {
            line.push_str(&format!(" [{lowest}]"));
        }
        line
    }

    fn render_change(&self, previous: &Self, html: bool) -> String {
        let name = render::link(&self.name, Some(&self.url), html);
        let before = render::superseded(&format_price(previous.price), html);
        let arrow = render::text("→", html);

        let mut line = format!("{name} {before} {arrow} {}", self.price_label(html));
        if let Some(lowest) = self.lowest_label(html) {
            line.push_str(&format!(" [{lowest}]"));
        }
        line
    }
}
