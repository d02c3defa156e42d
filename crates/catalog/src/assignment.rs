//! The assignment index rules: what a city can see, and how category visibility
//! cascades to subcategories.
//!
//! Every caller (manual add/remove, import, subcategory creation) goes through these
//! planners, so the cascade cannot be forgotten by any one of them.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use citycat_core::{CatalogError, CatalogResult, CategoryId, CityId, SubCategoryId};

use crate::entity_type::EntityType;
use crate::view::CatalogView;

/// One visibility row: `entity_id` of `entity_type` is visible in `city_id`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub city_id: CityId,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
}

impl Assignment {
    pub fn new(city_id: CityId, entity_type: EntityType, entity_id: Uuid) -> Self {
        Self {
            city_id,
            entity_type,
            entity_id,
        }
    }

    /// Key range covering every `entity_type` row of `city` in an ordered index.
    pub fn slice(city_id: CityId, entity_type: EntityType) -> RangeInclusive<Assignment> {
        Assignment::new(city_id, entity_type, Uuid::nil())..=Assignment::new(city_id, entity_type, Uuid::from_u128(u128::MAX))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignOutcome {
    pub added_count: usize,
    pub cascaded_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnassignOutcome {
    pub removed_count: usize,
    pub cascaded_count: usize,
}

/// Rows an assign request will insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignPlan {
    pub direct: Vec<Assignment>,
    pub cascaded: Vec<Assignment>,
}

impl AssignPlan {
    pub fn outcome(&self) -> AssignOutcome {
        AssignOutcome {
            added_count: self.direct.len(),
            cascaded_count: self.cascaded.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.cascaded.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Assignment> {
        self.direct.iter().chain(self.cascaded.iter())
    }
}

/// Rows an unassign request will delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnassignPlan {
    pub direct: Vec<Assignment>,
    pub cascaded: Vec<Assignment>,
}

impl UnassignPlan {
    pub fn outcome(&self) -> UnassignOutcome {
        UnassignOutcome {
            removed_count: self.direct.len(),
            cascaded_count: self.cascaded.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.cascaded.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Assignment> {
        self.direct.iter().chain(self.cascaded.iter())
    }
}

/// Plan an assign. Already-assigned ids contribute nothing; categories pull in every
/// subcategory the city does not already see.
///
/// The city itself must have been checked (exists, active) by the caller.
pub fn plan_assign(
    view: &impl CatalogView,
    city: CityId,
    entity_type: EntityType,
    ids: &[Uuid],
) -> CatalogResult<AssignPlan> {
    let mut seen = HashSet::new();
    let mut cascaded_seen = HashSet::new();
    let mut plan = AssignPlan::default();

    for &id in ids {
        if !seen.insert(id) {
            continue;
        }
        if !view.entity_exists(entity_type, id) {
            return Err(CatalogError::not_found(format!("{entity_type} {id}")));
        }
        if !view.is_assigned(city, entity_type, id) {
            plan.direct.push(Assignment::new(city, entity_type, id));
        }
        if entity_type == EntityType::Category {
            for sub in view.subcategories_of(CategoryId::from_uuid(id)) {
                let sub_id = *sub.as_uuid();
                if !view.is_assigned(city, EntityType::Subcategory, sub_id) && cascaded_seen.insert(sub_id) {
                    plan.cascaded.push(Assignment::new(city, EntityType::Subcategory, sub_id));
                }
            }
        }
    }

    Ok(plan)
}

/// Plan an unassign. Unknown or unassigned ids are skipped; removing a category removes
/// its subcategories from this city only.
///
/// A subcategory cannot be removed on its own while its category stays assigned to the
/// city, since that would break the cascade invariant.
pub fn plan_unassign(
    view: &impl CatalogView,
    city: CityId,
    entity_type: EntityType,
    ids: &[Uuid],
) -> CatalogResult<UnassignPlan> {
    let mut seen = HashSet::new();
    let mut cascaded_seen = HashSet::new();
    let mut plan = UnassignPlan::default();

    for &id in ids {
        if !seen.insert(id) || !view.is_assigned(city, entity_type, id) {
            continue;
        }

        if entity_type == EntityType::Subcategory {
            let sub = SubCategoryId::from_uuid(id);
            if let Some(parent) = view.parent_of(sub) {
                if view.is_assigned(city, EntityType::Category, *parent.as_uuid()) {
                    return Err(CatalogError::validation(format!(
                        "subcategory {sub} is visible through category {parent}; unassign the category instead"
                    )));
                }
            }
        }

        plan.direct.push(Assignment::new(city, entity_type, id));

        if entity_type == EntityType::Category {
            for sub in view.subcategories_of(CategoryId::from_uuid(id)) {
                let sub_id = *sub.as_uuid();
                if view.is_assigned(city, EntityType::Subcategory, sub_id) && cascaded_seen.insert(sub_id) {
                    plan.cascaded.push(Assignment::new(city, EntityType::Subcategory, sub_id));
                }
            }
        }
    }

    Ok(plan)
}
