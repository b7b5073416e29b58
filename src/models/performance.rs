//! Performance (concert, musical, play) listing record.

use serde::{Deserialize, Serialize};

use crate::models::Record;
use crate::render::{self, Render};
use crate::utils::text::composite_key;

/// A performance found in a search feed.
///
/// Feeds carry no stable id, so identity is the title and venue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Performance {
    pub title: String,

    /// Venue
    pub place: String,

    /// Run period as shown by the source, e.g. `2024.05.01 ~ 2024.06.30`
    #[serde(default)]
    pub period: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Performance {
    pub fn new(title: impl Into<String>, place: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            place: place.into(),
            period: String::new(),
            url: None,
        }
    }
}

impl Record for Performance {
    fn key(&self) -> String {
        composite_key(&[&self.title, &self.place])
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn detail(&self) -> Option<&str> {
        Some(&self.place)
    }

    fn has_changed(&self, previous: &Self) -> bool {
        self.period != previous.period
    }
}

impl Render for Performance {
    fn render(&self, html: bool) -> String {
        let title = render::link(&self.title, self.url.as_deref(), html);
        let mut line = format!("{title} {}", render::text(&format!("@ {}", self.place), html));
        if !self.period.is_empty() {
            line.push_str(&format!(" ({})", render::text(&self.period, html)));
        }
        line
    }

    fn render_change(&self, previous: &Self, html: bool) -> String {
        let title = render::link(&self.title, self.url.as_deref(), html);
        format!(
            "{title} {} {} {} {}",
            render::text(&format!("@ {}", self.place), html),
            render::superseded(&previous.period, html),
            render::text("→", html),
            render::text(&self.period, html),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_title_and_place() {
        let a = Performance::new("레미제라블", "블루스퀘어");
        let mut b = Performance::new("레미제라블 ", "블루스퀘어");
        b.period = "2024.05.01 ~ 2024.06.30".into();
        let c = Performance::new("레미제라블", "샤롯데씨어터");

        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_period_change_is_significant() {
        let mut a = Performance::new("Cats", "Hall");
        a.period = "05.01 ~ 05.31".into();
        let mut b = a.clone();
        assert!(!b.has_changed(&a));
        b.period = "05.01 ~ 06.30".into();
        assert!(b.has_changed(&a));
    }

    #[test]
    fn test_render() {
        let mut p = Performance::new("Cats <Revival>", "Hall");
        p.period = "05.01 ~ 05.31".into();
        assert_eq!(p.render(false), "Cats <Revival> @ Hall (05.01 ~ 05.31)");

        p.url = Some("https://tickets.test/1".into());
        assert_eq!(
            p.render(true),
            "<a href=\"https://tickets.test/1\">Cats &lt;Revival&gt;</a> @ Hall (05.01 ~ 05.31)"
        );
    }
}
