use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use citycat_core::{CatalogResult, CategoryId, Entity, SubCategoryId};

use crate::fields::{media_urls, required};

/// A top-level category. `sort_order` is its position in the global category order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub media: Vec<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn apply_update(&mut self, update: CategoryUpdate, now: DateTime<Utc>) -> CatalogResult<()> {
        let name = update.name.map(|n| required("name", n)).transpose()?;
        let media = update.media.map(|m| media_urls("media", m)).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description.trim().to_string();
        }
        if let Some(media) = media {
            self.media = media;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &CategoryId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub media: Vec<String>,
}

impl NewCategory {
    /// Build the record; the caller supplies the next free position in the order.
    pub fn into_category(self, id: CategoryId, sort_order: i32, now: DateTime<Utc>) -> CatalogResult<Category> {
        Ok(Category {
            id,
            name: required("name", self.name)?,
            description: self.description.trim().to_string(),
            media: media_urls("media", self.media)?,
            sort_order,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub media: Option<Vec<String>>,
}

/// A subcategory, owned by exactly one category for its whole life.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategory {
    pub id: SubCategoryId,
    pub name: String,
    pub description: String,
    pub media: Vec<String>,
    pub parent_category_id: CategoryId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubCategory {
    /// The parent is fixed at creation, so updates only touch display fields.
    pub fn apply_update(&mut self, update: SubCategoryUpdate, now: DateTime<Utc>) -> CatalogResult<()> {
        let name = update.name.map(|n| required("name", n)).transpose()?;
        let media = update.media.map(|m| media_urls("media", m)).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description.trim().to_string();
        }
        if let Some(media) = media {
            self.media = media;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for SubCategory {
    type Id = SubCategoryId;

    fn id(&self) -> &SubCategoryId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub media: Vec<String>,
    pub parent_category_id: CategoryId,
}

impl NewSubCategory {
    /// Build the record. The caller has already checked the parent exists.
    pub fn into_sub_category(self, id: SubCategoryId, now: DateTime<Utc>) -> CatalogResult<SubCategory> {
        Ok(SubCategory {
            id,
            name: required("name", self.name)?,
            description: self.description.trim().to_string(),
            media: media_urls("media", self.media)?,
            parent_category_id: self.parent_category_id,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub media: Option<Vec<String>>,
}
