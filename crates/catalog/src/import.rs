//! Bulk copy of one city's visible catalog into another.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use citycat_core::{CatalogError, CatalogResult, CityId};

use crate::assignment::{Assignment, plan_assign};
use crate::entity_type::EntityType;
use crate::view::CatalogView;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportScope {
    #[default]
    All,
    ProductsOnly,
}

impl ImportScope {
    pub fn includes(self, entity_type: EntityType) -> bool {
        match self {
            ImportScope::All => true,
            ImportScope::ProductsOnly => entity_type == EntityType::Product,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub products_added: usize,
    pub categories_added: usize,
    pub sub_categories_added: usize,
    pub carousel_added: usize,
}

impl ImportOutcome {
    pub fn is_empty(&self) -> bool {
        *self == ImportOutcome::default()
    }
}

/// Rows an import will insert into the target city, grouped by type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportPlan {
    pub categories: Vec<Assignment>,
    pub sub_categories: Vec<Assignment>,
    pub products: Vec<Assignment>,
    pub carousel: Vec<Assignment>,
}

impl ImportPlan {
    pub fn outcome(&self) -> ImportOutcome {
        ImportOutcome {
            products_added: self.products.len(),
            categories_added: self.categories.len(),
            sub_categories_added: self.sub_categories.len(),
            carousel_added: self.carousel.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.outcome().is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Assignment> {
        self.categories
            .iter()
            .chain(self.sub_categories.iter())
            .chain(self.products.iter())
            .chain(self.carousel.iter())
    }
}

/// Plan `Import(target, source, scope)`: for each type in scope, assign
/// `source − target`.
///
/// Categories go through [`plan_assign`] so their subcategories follow. Products are
/// copied by id: when the source shows a fork, the fork is what the target gets, even if
/// the target already shows the original. Nothing is ever forked here.
///
/// Both cities must have been checked by the caller.
pub fn plan_import(
    view: &impl CatalogView,
    target: CityId,
    source: CityId,
    scope: ImportScope,
) -> CatalogResult<ImportPlan> {
    if target == source {
        return Err(CatalogError::SameCity);
    }

    let mut plan = ImportPlan::default();

    if scope.includes(EntityType::Category) {
        let missing = difference(view, target, source, EntityType::Category);
        let categories = plan_assign(view, target, EntityType::Category, &missing)?;
        plan.categories = categories.direct;

        let mut seen: HashSet<Uuid> = HashSet::new();
        let direct_subs = difference(view, target, source, EntityType::Subcategory);
        for row in categories
            .cascaded
            .into_iter()
            .chain(direct_subs.into_iter().map(|id| Assignment::new(target, EntityType::Subcategory, id)))
        {
            if seen.insert(row.entity_id) {
                plan.sub_categories.push(row);
            }
        }
    }

    if scope.includes(EntityType::Carousel) {
        plan.carousel = difference(view, target, source, EntityType::Carousel)
            .into_iter()
            .map(|id| Assignment::new(target, EntityType::Carousel, id))
            .collect();
    }

    if scope.includes(EntityType::Product) {
        plan.products = difference(view, target, source, EntityType::Product)
            .into_iter()
            .map(|id| Assignment::new(target, EntityType::Product, id))
            .collect();
    }

    Ok(plan)
}

fn difference(view: &impl CatalogView, target: CityId, source: CityId, entity_type: EntityType) -> Vec<Uuid> {
    view.assigned_ids(source, entity_type)
        .into_iter()
        .filter(|id| !view.is_assigned(target, entity_type, *id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use citycat_core::{CategoryId, ProductId, SubCategoryId};

    use crate::view::SnapshotView;

    struct Markets {
        patna: CityId,
        ranchi: CityId,
        birthday: CategoryId,
        balloons: SubCategoryId,
        view: SnapshotView,
    }

    /// Patna shows Birthday (and, by cascade, Balloon Decor); Ranchi shows nothing.
    fn markets() -> Markets {
        let patna = CityId::new();
        let ranchi = CityId::new();
        let birthday = CategoryId::new();
        let balloons = SubCategoryId::new();
        let view = SnapshotView::new()
            .with_entity(EntityType::Category, *birthday.as_uuid())
            .with_sub_category(balloons, birthday)
            .with_assignment(patna, EntityType::Category, *birthday.as_uuid())
            .with_assignment(patna, EntityType::Subcategory, *balloons.as_uuid());
        Markets {
            patna,
            ranchi,
            birthday,
            balloons,
            view,
        }
    }

    fn apply(view: &mut SnapshotView, plan: &ImportPlan) {
        for row in plan.rows() {
            view.insert_assignment(*row);
        }
    }

    #[test]
    fn patna_into_ranchi_copies_category_and_subcategory_once() {
        let Markets {
            patna,
            ranchi,
            birthday,
            balloons,
            mut view,
        } = markets();

        let plan = plan_import(&view, ranchi, patna, ImportScope::All).unwrap();
        assert_eq!(
            plan.outcome(),
            ImportOutcome {
                products_added: 0,
                categories_added: 1,
                sub_categories_added: 1,
                carousel_added: 0,
            }
        );
        apply(&mut view, &plan);
        assert!(view.is_assigned(ranchi, EntityType::Category, *birthday.as_uuid()));
        assert!(view.is_assigned(ranchi, EntityType::Subcategory, *balloons.as_uuid()));

        let again = plan_import(&view, ranchi, patna, ImportScope::All).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn same_city_is_rejected() {
        let m = markets();
        assert_eq!(
            plan_import(&m.view, m.patna, m.patna, ImportScope::All).unwrap_err(),
            CatalogError::SameCity
        );
    }

    #[test]
    fn products_only_skips_other_types() {
        let m = markets();
        let product = ProductId::new();
        let carousel = Uuid::now_v7();
        let view = m
            .view
            .with_entity(EntityType::Product, *product.as_uuid())
            .with_entity(EntityType::Carousel, carousel)
            .with_assignment(m.patna, EntityType::Product, *product.as_uuid())
            .with_assignment(m.patna, EntityType::Carousel, carousel);

        let plan = plan_import(&view, m.ranchi, m.patna, ImportScope::ProductsOnly).unwrap();
        assert_eq!(
            plan.outcome(),
            ImportOutcome {
                products_added: 1,
                ..ImportOutcome::default()
            }
        );

        let plan = plan_import(&view, m.ranchi, m.patna, ImportScope::All).unwrap();
        assert_eq!(plan.outcome().carousel_added, 1);
        assert_eq!(plan.outcome().products_added, 1);
    }

    #[test]
    fn source_fork_is_what_propagates() {
        let m = markets();
        let original = ProductId::new();
        let fork = ProductId::new();
        let third = CityId::new();
        let view = m
            .view
            .with_entity(EntityType::Product, *original.as_uuid())
            .with_entity(EntityType::Product, *fork.as_uuid())
            .with_assignment(m.patna, EntityType::Product, *fork.as_uuid())
            .with_assignment(m.ranchi, EntityType::Product, *original.as_uuid());

        let plan = plan_import(&view, third, m.patna, ImportScope::ProductsOnly).unwrap();
        assert_eq!(plan.products, vec![Assignment::new(third, EntityType::Product, *fork.as_uuid())]);

        // Ranchi shows the original, not the fork, so the fork is still missing there.
        let plan = plan_import(&view, m.ranchi, m.patna, ImportScope::ProductsOnly).unwrap();
        assert_eq!(
            plan.products,
            vec![Assignment::new(m.ranchi, EntityType::Product, *fork.as_uuid())]
        );
    }

    #[test]
    fn directly_assigned_subcategory_is_copied_without_its_category() {
        let m = markets();
        let other_parent = CategoryId::new();
        let loose = SubCategoryId::new();
        let view = m
            .view
            .with_entity(EntityType::Category, *other_parent.as_uuid())
            .with_sub_category(loose, other_parent)
            .with_assignment(m.patna, EntityType::Subcategory, *loose.as_uuid());

        let plan = plan_import(&view, m.ranchi, m.patna, ImportScope::All).unwrap();
        assert_eq!(plan.outcome().categories_added, 1);
        assert_eq!(plan.outcome().sub_categories_added, 2);
    }
}
