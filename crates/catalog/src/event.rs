//! Facts published after a catalog change commits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use citycat_core::{CategoryId, CityId, ProductId};
use citycat_events::Event;

use crate::entity_type::EntityType;
use crate::import::{ImportOutcome, ImportScope};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CityChange {
    Created,
    Updated,
    Deactivated,
    Activated,
    Deleted,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityChange {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CatalogEvent {
    EntitiesAssigned {
        city_id: CityId,
        entity_type: EntityType,
        entity_ids: Vec<Uuid>,
        cascaded_ids: Vec<Uuid>,
        occurred_at: DateTime<Utc>,
    },
    EntitiesUnassigned {
        city_id: CityId,
        entity_type: EntityType,
        entity_ids: Vec<Uuid>,
        cascaded_ids: Vec<Uuid>,
        occurred_at: DateTime<Utc>,
    },
    CategoriesReordered {
        category_ids: Vec<CategoryId>,
        version: u64,
        occurred_at: DateTime<Utc>,
    },
    ProductEdited {
        city_id: CityId,
        product_id: ProductId,
        occurred_at: DateTime<Utc>,
    },
    /// `replaced_product_id` is what the city showed before; it is untouched.
    ProductForked {
        city_id: CityId,
        replaced_product_id: ProductId,
        fork_product_id: ProductId,
        occurred_at: DateTime<Utc>,
    },
    CityImported {
        city_id: CityId,
        source_city_id: CityId,
        scope: ImportScope,
        outcome: ImportOutcome,
        occurred_at: DateTime<Utc>,
    },
    CityChanged {
        city_id: CityId,
        change: CityChange,
        occurred_at: DateTime<Utc>,
    },
    CatalogEntityChanged {
        entity_type: EntityType,
        entity_id: Uuid,
        change: EntityChange,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for CatalogEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::EntitiesAssigned { .. } => "catalog.assignment.added",
            CatalogEvent::EntitiesUnassigned { .. } => "catalog.assignment.removed",
            CatalogEvent::CategoriesReordered { .. } => "catalog.category.reordered",
            CatalogEvent::ProductEdited { .. } => "catalog.product.edited",
            CatalogEvent::ProductForked { .. } => "catalog.product.forked",
            CatalogEvent::CityImported { .. } => "catalog.city.imported",
            CatalogEvent::CityChanged { .. } => "markets.city.changed",
            CatalogEvent::CatalogEntityChanged { .. } => "catalog.entity.changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CatalogEvent::EntitiesAssigned { occurred_at, .. }
            | CatalogEvent::EntitiesUnassigned { occurred_at, .. }
            | CatalogEvent::CategoriesReordered { occurred_at, .. }
            | CatalogEvent::ProductEdited { occurred_at, .. }
            | CatalogEvent::ProductForked { occurred_at, .. }
            | CatalogEvent::CityImported { occurred_at, .. }
            | CatalogEvent::CityChanged { occurred_at, .. }
            | CatalogEvent::CatalogEntityChanged { occurred_at, .. } => *occurred_at,
        }
    }

    fn city_id(&self) -> Option<CityId> {
        match self {
            CatalogEvent::EntitiesAssigned { city_id, .. }
            | CatalogEvent::EntitiesUnassigned { city_id, .. }
            | CatalogEvent::ProductEdited { city_id, .. }
            | CatalogEvent::ProductForked { city_id, .. }
            | CatalogEvent::CityImported { city_id, .. }
            | CatalogEvent::CityChanged { city_id, .. } => Some(*city_id),
            CatalogEvent::CategoriesReordered { .. } | CatalogEvent::CatalogEntityChanged { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorder_is_global_and_fork_is_city_scoped() {
        let now = Utc::now();
        let reorder = CatalogEvent::CategoriesReordered {
            category_ids: vec![CategoryId::new()],
            version: 3,
            occurred_at: now,
        };
        assert_eq!(reorder.city_id(), None);
        assert_eq!(reorder.event_type(), "catalog.category.reordered");

        let patna = CityId::new();
        let fork = CatalogEvent::ProductForked {
            city_id: patna,
            replaced_product_id: ProductId::new(),
            fork_product_id: ProductId::new(),
            occurred_at: now,
        };
        assert_eq!(fork.city_id(), Some(patna));
        assert_eq!(fork.occurred_at(), now);
    }

    #[test]
    fn serializes_with_kind_tag_and_camel_case_fields() {
        let event = CatalogEvent::CityImported {
            city_id: CityId::new(),
            source_city_id: CityId::new(),
            scope: ImportScope::ProductsOnly,
            outcome: ImportOutcome::default(),
            occurred_at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "cityImported");
        assert_eq!(json["scope"], "productsOnly");
        assert!(json.get("sourceCityId").is_some());
        assert_eq!(json["outcome"]["subCategoriesAdded"], 0);
    }
}
