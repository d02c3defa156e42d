use chrono::{DateTime, Utc};

use citycat_core::CityId;

/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (schema evolution)
/// - published only **after** the change they describe has committed
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "catalog.product.forked").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the change committed (business time).
    fn occurred_at(&self) -> DateTime<Utc>;

    /// The city whose overlay changed, if the change is city-scoped.
    ///
    /// Global changes (category order, catalog entity edits) return `None`.
    fn city_id(&self) -> Option<CityId>;
}
