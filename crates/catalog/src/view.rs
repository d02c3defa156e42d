//! Read access the planners need, independent of where the catalog lives.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use citycat_core::{CategoryId, CityId, Entity, SubCategoryId};

use crate::assignment::Assignment;
use crate::carousel::CarouselItem;
use crate::category::{Category, SubCategory};
use crate::entity_type::EntityType;
use crate::product::Product;

/// A consistent read of the catalog + assignment index, taken inside the caller's
/// transaction. Planners only ever read through this trait.
pub trait CatalogView {
    fn entity_exists(&self, entity_type: EntityType, id: Uuid) -> bool;

    fn is_assigned(&self, city: CityId, entity_type: EntityType, id: Uuid) -> bool;

    /// Ids of `entity_type` assigned to `city`, in ascending id order.
    fn assigned_ids(&self, city: CityId, entity_type: EntityType) -> Vec<Uuid>;

    fn subcategories_of(&self, category: CategoryId) -> Vec<SubCategoryId>;

    fn parent_of(&self, sub: SubCategoryId) -> Option<CategoryId>;
}

/// A prefetched, self-contained [`CatalogView`].
///
/// Database-backed stores load exactly the rows an operation touches into one of these
/// (under row locks) and plan against it.
#[derive(Debug, Clone, Default)]
pub struct SnapshotView {
    entities: HashSet<(EntityType, Uuid)>,
    assignments: BTreeSet<Assignment>,
    children: HashMap<CategoryId, Vec<SubCategoryId>>,
    parents: HashMap<SubCategoryId, CategoryId>,
}

impl SnapshotView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_entity(&mut self, entity_type: EntityType, id: Uuid) {
        self.entities.insert((entity_type, id));
    }

    pub fn insert_assignment(&mut self, assignment: Assignment) {
        self.assignments.insert(assignment);
    }

    pub fn insert_sub_category(&mut self, sub: SubCategoryId, parent: CategoryId) {
        self.entities.insert((EntityType::Subcategory, *sub.as_uuid()));
        if self.parents.insert(sub, parent).is_none() {
            self.children.entry(parent).or_default().push(sub);
        }
    }

    pub fn with_entity(mut self, entity_type: EntityType, id: Uuid) -> Self {
        self.insert_entity(entity_type, id);
        self
    }

    pub fn with_assignment(mut self, city: CityId, entity_type: EntityType, id: Uuid) -> Self {
        self.insert_assignment(Assignment::new(city, entity_type, id));
        self
    }

    pub fn with_sub_category(mut self, sub: SubCategoryId, parent: CategoryId) -> Self {
        self.insert_sub_category(sub, parent);
        self
    }

}

impl CatalogView for SnapshotView {
    fn entity_exists(&self, entity_type: EntityType, id: Uuid) -> bool {
        self.entities.contains(&(entity_type, id))
    }

    fn is_assigned(&self, city: CityId, entity_type: EntityType, id: Uuid) -> bool {
        self.assignments.contains(&Assignment::new(city, entity_type, id))
    }

    fn assigned_ids(&self, city: CityId, entity_type: EntityType) -> Vec<Uuid> {
        self.assignments
            .range(Assignment::slice(city, entity_type))
            .map(|a| a.entity_id)
            .collect()
    }

    fn subcategories_of(&self, category: CategoryId) -> Vec<SubCategoryId> {
        let mut subs = self.children.get(&category).cloned().unwrap_or_default();
        subs.sort();
        subs
    }

    fn parent_of(&self, sub: SubCategoryId) -> Option<CategoryId> {
        self.parents.get(&sub).copied()
    }
}

/// Any catalog entity, as returned by the assignment listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CatalogEntity {
    Product(Product),
    Category(Category),
    SubCategory(SubCategory),
    Carousel(CarouselItem),
}

impl CatalogEntity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            CatalogEntity::Product(_) => EntityType::Product,
            CatalogEntity::Category(_) => EntityType::Category,
            CatalogEntity::SubCategory(_) => EntityType::Subcategory,
            CatalogEntity::Carousel(_) => EntityType::Carousel,
        }
    }

    pub fn entity_id(&self) -> Uuid {
        match self {
            CatalogEntity::Product(p) => *p.id.as_uuid(),
            CatalogEntity::Category(c) => *c.id.as_uuid(),
            CatalogEntity::SubCategory(s) => *s.id.as_uuid(),
            CatalogEntity::Carousel(c) => *c.id.as_uuid(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CatalogEntity::Product(p) => p.label(),
            CatalogEntity::Category(c) => c.label(),
            CatalogEntity::SubCategory(s) => s.label(),
            CatalogEntity::Carousel(c) => c.label(),
        }
    }

    pub fn matches_query(&self, query: &str) -> bool {
        match self {
            CatalogEntity::Product(p) => p.matches_query(query),
            CatalogEntity::Category(c) => c.matches_query(query),
            CatalogEntity::SubCategory(s) => s.matches_query(query),
            CatalogEntity::Carousel(c) => c.matches_query(query),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigned_ids_are_scoped_to_city_and_type() {
        let (a, b) = (CityId::new(), CityId::new());
        let (x, y, z) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        let view = SnapshotView::new()
            .with_assignment(a, EntityType::Product, x)
            .with_assignment(a, EntityType::Product, y)
            .with_assignment(a, EntityType::Category, z)
            .with_assignment(b, EntityType::Product, z);

        let mut expected = vec![x, y];
        expected.sort();
        assert_eq!(view.assigned_ids(a, EntityType::Product), expected);
        assert_eq!(view.assigned_ids(a, EntityType::Category), vec![z]);
        assert_eq!(view.assigned_ids(b, EntityType::Product), vec![z]);
        assert!(view.assigned_ids(b, EntityType::Carousel).is_empty());
    }

    #[test]
    fn subcategory_parent_links_are_bidirectional() {
        let parent = CategoryId::new();
        let sub = SubCategoryId::new();
        let view = SnapshotView::new().with_sub_category(sub, parent);
        assert_eq!(view.parent_of(sub), Some(parent));
        assert_eq!(view.subcategories_of(parent), vec![sub]);
        assert!(view.entity_exists(EntityType::Subcategory, *sub.as_uuid()));
    }
}
