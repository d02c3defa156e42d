use core::str::FromStr;
use serde::{Deserialize, Serialize};

use citycat_core::CatalogError;

/// The kinds of catalog entity a city can be assigned.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Product,
    Category,
    #[serde(alias = "subCategory", alias = "sub_category")]
    Subcategory,
    Carousel,
}

impl EntityType {
    pub const ALL: [EntityType; 4] = [
        EntityType::Product,
        EntityType::Category,
        EntityType::Subcategory,
        EntityType::Carousel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Product => "product",
            EntityType::Category => "category",
            EntityType::Subcategory => "subcategory",
            EntityType::Carousel => "carousel",
        }
    }
}

impl core::fmt::Display for EntityType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CatalogError;

    /// Accepts the singular and plural forms used by the admin client's URLs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "product" | "products" => Ok(EntityType::Product),
            "category" | "categories" => Ok(EntityType::Category),
            "subcategory" | "subcategories" | "sub_category" | "sub_categories" => {
                Ok(EntityType::Subcategory)
            }
            "carousel" | "carousels" | "carousel_item" => Ok(EntityType::Carousel),
            other => Err(CatalogError::validation(format!(
                "unknown entity type '{other}' (expected product, category, subcategory or carousel)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_url_forms() {
        assert_eq!("products".parse::<EntityType>().unwrap(), EntityType::Product);
        assert_eq!("SubCategories".parse::<EntityType>().unwrap(), EntityType::Subcategory);
        assert_eq!("carousel".parse::<EntityType>().unwrap(), EntityType::Carousel);
        assert!("tags".parse::<EntityType>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for t in EntityType::ALL {
            assert_eq!(t.to_string().parse::<EntityType>().unwrap(), t);
        }
    }
}
