//! Clone-on-write editing of products from a city's point of view.
//!
//! A product visible in several cities is shared; editing it from one city must not
//! change what the others see. The planner decides between patching in place and
//! forking a private copy, and the store applies the decision in the same transaction
//! that read `assigned_cities`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use citycat_core::{CatalogError, CatalogResult, CityId, ProductId};

use crate::assignment::Assignment;
use crate::entity_type::EntityType;
use crate::product::{Product, ProductPatch};
use crate::view::CatalogView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOutcome {
    pub product_id: ProductId,
    pub was_forked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditPlan {
    /// The city owns the product exclusively; overwrite it.
    InPlace(Product),
    /// Insert `fork` and repoint the city's assignment from `replaces` to the fork.
    Fork { fork: Product, replaces: ProductId },
}

impl EditPlan {
    pub fn outcome(&self) -> EditOutcome {
        match self {
            EditPlan::InPlace(product) => EditOutcome {
                product_id: product.id,
                was_forked: false,
            },
            EditPlan::Fork { fork, .. } => EditOutcome {
                product_id: fork.id,
                was_forked: true,
            },
        }
    }

    pub fn product(&self) -> &Product {
        match self {
            EditPlan::InPlace(product) => product,
            EditPlan::Fork { fork, .. } => fork,
        }
    }

    /// For a fork: the assignment row to delete and the one to insert.
    pub fn assignment_swap(&self, city: CityId) -> Option<(Assignment, Assignment)> {
        match self {
            EditPlan::InPlace(_) => None,
            EditPlan::Fork { fork, replaces } => Some((
                Assignment::new(city, EntityType::Product, *replaces.as_uuid()),
                Assignment::new(city, EntityType::Product, *fork.id.as_uuid()),
            )),
        }
    }
}

/// Decide how `patch` lands for `city`.
///
/// `assigned_cities` must be `CitiesAssignedTo(product.id)` read in the caller's
/// transaction. `fork_id` is only used when a fork is needed.
pub fn plan_edit(
    view: &impl CatalogView,
    city: CityId,
    product: &Product,
    assigned_cities: &[CityId],
    patch: &ProductPatch,
    fork_id: ProductId,
    now: DateTime<Utc>,
) -> CatalogResult<EditPlan> {
    if patch.is_empty() {
        return Err(CatalogError::validation("patch must change at least one field"));
    }
    if !assigned_cities.contains(&city) {
        return Err(CatalogError::not_assigned(format!(
            "product {} is not assigned to city {city}",
            product.id
        )));
    }

    let plan = if assigned_cities.len() == 1 {
        EditPlan::InPlace(product.patched(patch, now)?)
    } else {
        EditPlan::Fork {
            fork: product.fork(fork_id, patch, now)?,
            replaces: product.id,
        }
    };

    if patch.touches_links() {
        plan.product().validate_links(view)?;
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use citycat_core::{CategoryId, SubCategoryId};

    use crate::product::NewProduct;
    use crate::view::SnapshotView;

    struct Fixture {
        patna: CityId,
        ranchi: CityId,
        birthday: CategoryId,
        balloons: SubCategoryId,
        gold_arch: Product,
        view: SnapshotView,
    }

    fn fixture() -> Fixture {
        let patna = CityId::new();
        let ranchi = CityId::new();
        let birthday = CategoryId::new();
        let balloons = SubCategoryId::new();
        let gold_arch = NewProduct {
            name: "Gold Arch".to_string(),
            description: String::new(),
            price: 999,
            images: Vec::new(),
            attributes: BTreeMap::new(),
            category_id: birthday,
            sub_category_id: Some(balloons),
        }
        .into_product(ProductId::new(), Utc::now())
        .unwrap();
        let view = SnapshotView::new()
            .with_entity(EntityType::Category, *birthday.as_uuid())
            .with_sub_category(balloons, birthday)
            .with_entity(EntityType::Product, *gold_arch.id.as_uuid());

        Fixture {
            patna,
            ranchi,
            birthday,
            balloons,
            gold_arch,
            view,
        }
    }

    fn price(p: u64) -> ProductPatch {
        ProductPatch {
            price: Some(p),
            ..ProductPatch::default()
        }
    }

    #[test]
    fn exclusive_product_is_patched_in_place() {
        let f = fixture();
        let plan = plan_edit(&f.view, f.patna, &f.gold_arch, &[f.patna], &price(799), ProductId::new(), Utc::now())
            .unwrap();

        let outcome = plan.outcome();
        assert_eq!(outcome.product_id, f.gold_arch.id);
        assert!(!outcome.was_forked);
        assert_eq!(plan.product().price, 799);
        assert!(plan.assignment_swap(f.patna).is_none());
    }

    #[test]
    fn shared_product_is_forked_for_the_editing_city() {
        let f = fixture();
        let fork_id = ProductId::new();
        let plan = plan_edit(
            &f.view,
            f.patna,
            &f.gold_arch,
            &[f.patna, f.ranchi],
            &price(799),
            fork_id,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(
            plan.outcome(),
            EditOutcome {
                product_id: fork_id,
                was_forked: true
            }
        );
        let fork = plan.product();
        assert_eq!(fork.price, 799);
        assert_eq!(fork.origin_product_id, Some(f.gold_arch.id));
        assert_eq!(fork.category_id, f.birthday);
        assert_eq!(fork.sub_category_id, Some(f.balloons));

        let (removed, added) = plan.assignment_swap(f.patna).unwrap();
        assert_eq!(removed.entity_id, *f.gold_arch.id.as_uuid());
        assert_eq!(added.entity_id, *fork_id.as_uuid());
        assert_eq!(added.city_id, f.patna);
    }

    #[test]
    fn editing_an_invisible_product_is_not_assigned() {
        let f = fixture();
        let err = plan_edit(&f.view, f.patna, &f.gold_arch, &[f.ranchi], &price(1), ProductId::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotAssigned(_)));

        let err = plan_edit(&f.view, f.patna, &f.gold_arch, &[], &price(1), ProductId::new(), Utc::now()).unwrap_err();
        assert!(matches!(err, CatalogError::NotAssigned(_)));
    }

    #[test]
    fn empty_patch_is_rejected() {
        let f = fixture();
        let err = plan_edit(
            &f.view,
            f.patna,
            &f.gold_arch,
            &[f.patna],
            &ProductPatch::default(),
            ProductId::new(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[test]
    fn moving_category_without_clearing_subcategory_is_rejected() {
        let f = fixture();
        let other = CategoryId::new();
        let view = f.view.with_entity(EntityType::Category, *other.as_uuid());
        let patch = ProductPatch {
            category_id: Some(other),
            ..ProductPatch::default()
        };
        let err = plan_edit(&view, f.patna, &f.gold_arch, &[f.patna], &patch, ProductId::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        let patch = ProductPatch {
            category_id: Some(other),
            sub_category_id: Some(None),
            ..ProductPatch::default()
        };
        let plan = plan_edit(&view, f.patna, &f.gold_arch, &[f.patna], &patch, ProductId::new(), Utc::now()).unwrap();
        assert_eq!(plan.product().category_id, other);
        assert_eq!(plan.product().sub_category_id, None);
    }

    #[test]
    fn patch_to_unknown_category_is_not_found() {
        let f = fixture();
        let patch = ProductPatch {
            category_id: Some(CategoryId::new()),
            sub_category_id: Some(None),
            ..ProductPatch::default()
        };
        let err = plan_edit(&f.view, f.patna, &f.gold_arch, &[f.patna, f.ranchi], &patch, ProductId::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn forking_a_fork_keeps_lineage_flat() {
        let f = fixture();
        let first = f.gold_arch.fork(ProductId::new(), &price(899), Utc::now()).unwrap();
        let plan = plan_edit(&f.view, f.patna, &first, &[f.patna, f.ranchi], &price(799), ProductId::new(), Utc::now())
            .unwrap();
        assert_eq!(plan.product().origin_product_id, Some(f.gold_arch.id));
    }
}
