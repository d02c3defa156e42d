//! Market registry domain module.
//!
//! Cities are the geographic scopes that filter which catalog entities a storefront
//! shows. This crate holds the City record and its validation rules as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod city;

pub use city::{City, CityUpdate, NewCity, validate_contact_number};
