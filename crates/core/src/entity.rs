//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Human-facing label used by name searches (name, or title for carousel slides).
    fn label(&self) -> &str;

    /// Case-insensitive substring match against [`Entity::label`].
    ///
    /// An empty or whitespace-only query matches everything.
    fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim();
        if needle.is_empty() {
            return true;
        }
        self.label().to_lowercase().contains(&needle.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(u8, &'static str);

    impl Entity for Named {
        type Id = u8;

        fn id(&self) -> &u8 {
            &self.0
        }

        fn label(&self) -> &str {
            self.1
        }
    }

    #[test]
    fn blank_query_matches_everything() {
        assert!(Named(1, "Gold Arch").matches_query(""));
        assert!(Named(1, "Gold Arch").matches_query("   "));
    }

    #[test]
    fn query_is_case_insensitive_substring() {
        let e = Named(1, "Balloon Decor");
        assert!(e.matches_query("balloon"));
        assert!(e.matches_query(" DECOR "));
        assert!(!e.matches_query("arch"));
    }
}
