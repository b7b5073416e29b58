//! Per-site page parsers.
//!
//! - Product listing pages (`ProductPageParser`)
//! - Performance search feeds (`PerformanceFeedParser`)

mod performances;
mod products;

pub use performances::PerformanceFeedParser;
pub use products::ProductPageParser;
