use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use citycat_core::{CatalogError, CatalogResult, CategoryId, Entity, ProductId, SubCategoryId};

use crate::entity_type::EntityType;
use crate::fields::{media_urls, required};
use crate::view::CatalogView;

/// A product. Originals have no `origin_product_id`; forks point at the original
/// (never at another fork).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Price in the smallest currency unit (e.g. paise).
    pub price: u64,
    pub images: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub category_id: CategoryId,
    pub sub_category_id: Option<SubCategoryId>,
    pub origin_product_id: Option<ProductId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The original every member of this product's lineage points at.
    pub fn lineage_root(&self) -> ProductId {
        self.origin_product_id.unwrap_or(self.id)
    }

    pub fn is_fork(&self) -> bool {
        self.origin_product_id.is_some()
    }

    /// Return an updated copy with `patch` applied. `self` is left untouched so a
    /// failed validation never leaves a half-patched record behind.
    pub fn patched(&self, patch: &ProductPatch, now: DateTime<Utc>) -> CatalogResult<Product> {
        let mut next = self.clone();
        if let Some(name) = &patch.name {
            next.name = required("name", name.clone())?;
        }
        if let Some(description) = &patch.description {
            next.description = description.trim().to_string();
        }
        if let Some(price) = patch.price {
            next.price = price;
        }
        if let Some(images) = &patch.images {
            next.images = media_urls("images", images.clone())?;
        }
        if let Some(attributes) = &patch.attributes {
            next.attributes = attributes.clone();
        }
        if let Some(category_id) = patch.category_id {
            next.category_id = category_id;
        }
        if let Some(sub_category_id) = patch.sub_category_id {
            next.sub_category_id = sub_category_id;
        }
        next.updated_at = now;
        Ok(next)
    }

    /// Clone-on-write: a new record carrying `patch`, owned by the same lineage.
    pub fn fork(&self, fork_id: ProductId, patch: &ProductPatch, now: DateTime<Utc>) -> CatalogResult<Product> {
        let mut fork = self.patched(patch, now)?;
        fork.id = fork_id;
        fork.origin_product_id = Some(self.lineage_root());
        fork.created_at = now;
        Ok(fork)
    }

    /// Check the category/subcategory references against the catalog.
    pub fn validate_links(&self, view: &impl CatalogView) -> CatalogResult<()> {
        if !view.entity_exists(EntityType::Category, *self.category_id.as_uuid()) {
            return Err(CatalogError::not_found(format!("category {}", self.category_id)));
        }
        if let Some(sub) = self.sub_category_id {
            match view.parent_of(sub) {
                None => return Err(CatalogError::not_found(format!("subcategory {sub}"))),
                Some(parent) if parent != self.category_id => {
                    return Err(CatalogError::validation(format!(
                        "subcategory {sub} does not belong to category {}",
                        self.category_id
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &ProductId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: u64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub category_id: CategoryId,
    #[serde(default)]
    pub sub_category_id: Option<SubCategoryId>,
}

impl NewProduct {
    /// Build an original product. Links are checked separately via
    /// [`Product::validate_links`] because they need catalog state.
    pub fn into_product(self, id: ProductId, now: DateTime<Utc>) -> CatalogResult<Product> {
        Ok(Product {
            id,
            name: required("name", self.name)?,
            description: self.description.trim().to_string(),
            price: self.price,
            images: media_urls("images", self.images)?,
            attributes: self.attributes,
            category_id: self.category_id,
            sub_category_id: self.sub_category_id,
            origin_product_id: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// A partial product edit. Absent fields keep the source value.
///
/// `subCategoryId: null` clears the subcategory; omitting the field keeps it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<u64>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub attributes: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub sub_category_id: Option<Option<SubCategoryId>>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.images.is_none()
            && self.attributes.is_none()
            && self.category_id.is_none()
            && self.sub_category_id.is_none()
    }

    /// Whether applying the patch can change category/subcategory linkage.
    pub fn touches_links(&self) -> bool {
        self.category_id.is_some() || self.sub_category_id.is_some()
    }
}

/// Distinguishes an explicit `null` (clear) from an absent field (keep).
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gold_arch() -> Product {
        NewProduct {
            name: "Gold Arch".to_string(),
            description: "Balloon arch in gold".to_string(),
            price: 999,
            images: vec!["https://cdn.example.com/arch.jpg".to_string()],
            attributes: BTreeMap::from([("colour".to_string(), "gold".to_string())]),
            category_id: CategoryId::new(),
            sub_category_id: Some(SubCategoryId::new()),
        }
        .into_product(ProductId::new(), Utc::now())
        .unwrap()
    }

    #[test]
    fn patched_changes_only_patched_fields() {
        let p = gold_arch();
        let next = p
            .patched(&ProductPatch { price: Some(799), ..ProductPatch::default() }, Utc::now())
            .unwrap();
        assert_eq!(next.price, 799);
        assert_eq!(next.name, p.name);
        assert_eq!(next.sub_category_id, p.sub_category_id);
        assert_eq!(p.price, 999);
    }

    #[test]
    fn fork_of_original_points_at_original() {
        let p = gold_arch();
        let fork = p
            .fork(ProductId::new(), &ProductPatch { price: Some(799), ..ProductPatch::default() }, Utc::now())
            .unwrap();
        assert_ne!(fork.id, p.id);
        assert_eq!(fork.origin_product_id, Some(p.id));
        assert_eq!(fork.category_id, p.category_id);
        assert_eq!(fork.images, p.images);
    }

    #[test]
    fn fork_of_fork_points_at_original() {
        let p = gold_arch();
        let first = p.fork(ProductId::new(), &ProductPatch::default(), Utc::now()).unwrap();
        let second = first.fork(ProductId::new(), &ProductPatch::default(), Utc::now()).unwrap();
        assert_eq!(second.origin_product_id, Some(p.id));
        assert_eq!(second.lineage_root(), p.id);
    }

    #[test]
    fn patch_rejects_blank_name_without_touching_source() {
        let p = gold_arch();
        let err = p
            .patched(&ProductPatch { name: Some("  ".to_string()), ..ProductPatch::default() }, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
        assert_eq!(p.name, "Gold Arch");
    }

    #[test]
    fn explicit_null_clears_subcategory() {
        let clear: ProductPatch = serde_json::from_str(r#"{"subCategoryId": null}"#).unwrap();
        assert_eq!(clear.sub_category_id, Some(None));
        assert!(clear.touches_links());

        let keep: ProductPatch = serde_json::from_str(r#"{"price": 10}"#).unwrap();
        assert_eq!(keep.sub_category_id, None);
        assert!(!keep.touches_links());

        let next = gold_arch().patched(&clear, Utc::now()).unwrap();
        assert_eq!(next.sub_category_id, None);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(ProductPatch::default().is_empty());
        assert!(!ProductPatch { price: Some(1), ..ProductPatch::default() }.is_empty());
    }
}
