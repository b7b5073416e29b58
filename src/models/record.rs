//! Record contract shared by every watched entity.

use chrono::{DateTime, Utc};

use crate::render::Render;

/// A watched item that can be diffed across collection passes.
///
/// `key` must be derived only from identity fields. `has_changed` must
/// compare every significant non-identity field, so two records with equal
/// keys and different significant values are never treated as unchanged.
pub trait Record: Render + Clone + Send + Sync + 'static {
    /// Stable identity across passes.
    fn key(&self) -> String;

    /// Primary text used for keyword filtering.
    fn title(&self) -> &str;

    /// Secondary text for keyword filtering (venue, seller, ...).
    fn detail(&self) -> Option<&str> {
        None
    }

    /// False once the item is sold out, delisted or otherwise not offered.
    fn is_available(&self) -> bool {
        true
    }

    /// Whether any significant field differs from `previous`.
    fn has_changed(&self, previous: &Self) -> bool;

    /// Initialize derived state from this record's own values.
    fn init_derived(&mut self, _observed_at: DateTime<Utc>) {}

    /// Take derived state from `previous`, then update it with current values.
    fn carry_forward(&mut self, _previous: &Self, _observed_at: DateTime<Utc>) {}
}
