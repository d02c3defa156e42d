use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use citycat_core::{CarouselItemId, CatalogResult, Entity};

use crate::fields::{media_url, required};

/// A storefront banner slide; independent of the category/product hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselItem {
    pub id: CarouselItemId,
    pub title: String,
    pub image: String,
    pub is_mobile: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CarouselItem {
    pub fn apply_update(&mut self, update: CarouselUpdate, now: DateTime<Utc>) -> CatalogResult<()> {
        let title = update.title.map(|t| required("title", t)).transpose()?;
        let image = update.image.map(|i| media_url("image", i)).transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(image) = image {
            self.image = image;
        }
        if let Some(is_mobile) = update.is_mobile {
            self.is_mobile = is_mobile;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for CarouselItem {
    type Id = CarouselItemId;

    fn id(&self) -> &CarouselItemId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.title
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCarouselItem {
    pub title: String,
    pub image: String,
    #[serde(default)]
    pub is_mobile: bool,
}

impl NewCarouselItem {
    pub fn into_item(self, id: CarouselItemId, now: DateTime<Utc>) -> CatalogResult<CarouselItem> {
        Ok(CarouselItem {
            id,
            title: required("title", self.title)?,
            image: media_url("image", self.image)?,
            is_mobile: self.is_mobile,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselUpdate {
    pub title: Option<String>,
    pub image: Option<String>,
    pub is_mobile: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_item_requires_title_and_url() {
        let ok = NewCarouselItem {
            title: "Diwali Sale".to_string(),
            image: "https://cdn.example.com/diwali.webp".to_string(),
            is_mobile: true,
        }
        .into_item(CarouselItemId::new(), Utc::now());
        assert!(ok.is_ok());

        let bad = NewCarouselItem {
            title: " ".to_string(),
            image: "https://cdn.example.com/diwali.webp".to_string(),
            is_mobile: false,
        }
        .into_item(CarouselItemId::new(), Utc::now());
        assert!(bad.is_err());
    }
}
