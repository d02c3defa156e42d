use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use citycat_core::{CatalogError, CatalogResult, CityId, Entity, required};

/// A market: the unit catalog visibility is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub state: String,
    pub contact_number: String,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl City {
    /// Assignments may only be added to active cities.
    pub fn ensure_active(&self) -> CatalogResult<()> {
        if self.is_active {
            Ok(())
        } else {
            Err(CatalogError::invalid_city(format!("city {} is deactivated", self.id)))
        }
    }

    /// Apply a partial update. Validation runs before any field changes.
    pub fn apply_update(&mut self, update: CityUpdate, now: DateTime<Utc>) -> CatalogResult<()> {
        let name = match update.name {
            Some(n) => required("name", n)?,
            None => self.name.clone(),
        };
        let state = match update.state {
            Some(s) => required("state", s)?,
            None => self.state.clone(),
        };
        let contact_number = match update.contact_number {
            Some(c) => validate_contact_number(&c)?,
            None => self.contact_number.clone(),
        };

        self.name = name;
        self.state = state;
        self.contact_number = contact_number;
        if let Some(order) = update.sort_order {
            self.sort_order = order;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Soft-deactivate. Returns `false` when the city was already inactive.
    pub fn deactivate(&mut self, now: DateTime<Utc>) -> bool {
        self.set_active(false, now)
    }

    /// Re-activate. Returns `false` when the city was already active.
    pub fn activate(&mut self, now: DateTime<Utc>) -> bool {
        self.set_active(true, now)
    }

    fn set_active(&mut self, active: bool, now: DateTime<Utc>) -> bool {
        if self.is_active == active {
            return false;
        }
        self.is_active = active;
        self.updated_at = now;
        true
    }
}

impl Entity for City {
    type Id = CityId;

    fn id(&self) -> &CityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }
}

/// Input for creating a city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCity {
    pub name: String,
    pub state: String,
    pub contact_number: String,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl NewCity {
    /// Validate and build the record. Cities without an explicit sort order go last.
    pub fn into_city(self, id: CityId, next_sort_order: i32, now: DateTime<Utc>) -> CatalogResult<City> {
        Ok(City {
            id,
            name: required("name", self.name)?,
            state: required("state", self.state)?,
            contact_number: validate_contact_number(&self.contact_number)?,
            is_active: self.is_active.unwrap_or(true),
            sort_order: self.sort_order.unwrap_or(next_sort_order),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of a city's display metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityUpdate {
    pub name: Option<String>,
    pub state: Option<String>,
    pub contact_number: Option<String>,
    pub sort_order: Option<i32>,
}

/// Normalize and validate a contact number.
///
/// Accepts an optional leading `+`, digits, spaces and dashes; requires 7 to 15 digits.
pub fn validate_contact_number(raw: &str) -> CatalogResult<String> {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);

    if body.chars().any(|c| !(c.is_ascii_digit() || c == ' ' || c == '-')) {
        return Err(CatalogError::validation(
            "contactNumber may only contain digits, spaces, dashes and a leading '+'",
        ));
    }

    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    if !(7..=15).contains(&digits) {
        return Err(CatalogError::validation("contactNumber must have 7 to 15 digits"));
    }

    Ok(trimmed.to_string())
}
