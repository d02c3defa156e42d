//! The global category order: one versioned permutation, replaced atomically.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use citycat_core::{CatalogError, CatalogResult, CategoryId, ExpectedVersion};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

impl FromStr for MoveDirection {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(MoveDirection::Up),
            "down" => Ok(MoveDirection::Down),
            other => Err(CatalogError::validation(format!("direction must be up or down, got '{other}'"))),
        }
    }
}

/// Every category id in display order, stamped with a monotonic version.
///
/// Position `i` in `ids` is the category's `sortOrder`, so the sort orders are always
/// exactly `0..len`. Every successful change bumps `version`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryOrder {
    #[serde(rename = "categoryIds")]
    ids: Vec<CategoryId>,
    version: u64,
}

impl CategoryOrder {
    pub fn new(ids: Vec<CategoryId>, version: u64) -> Self {
        Self { ids, version }
    }

    pub fn ids(&self) -> &[CategoryId] {
        &self.ids
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn position(&self, id: CategoryId) -> Option<usize> {
        self.ids.iter().position(|c| *c == id)
    }

    /// `(category, sortOrder)` pairs for persisting the order.
    pub fn positions(&self) -> impl Iterator<Item = (CategoryId, i32)> + '_ {
        self.ids.iter().enumerate().map(|(i, id)| (*id, i as i32))
    }

    /// Replace the whole order. `proposed` must be a permutation of every category.
    pub fn reorder(&mut self, proposed: &[CategoryId], expected: ExpectedVersion) -> CatalogResult<()> {
        expected.check(self.version)?;
        validate_permutation(&self.ids, proposed)?;
        self.ids = proposed.to_vec();
        self.version += 1;
        Ok(())
    }

    /// Swap a category with its neighbour. Returns `false` (and leaves the version
    /// alone) when the category is already at that boundary.
    pub fn move_adjacent(
        &mut self,
        id: CategoryId,
        direction: MoveDirection,
        expected: ExpectedVersion,
    ) -> CatalogResult<bool> {
        expected.check(self.version)?;
        let pos = self
            .position(id)
            .ok_or_else(|| CatalogError::not_found(format!("category {id}")))?;

        let neighbour = match direction {
            MoveDirection::Up if pos > 0 => pos - 1,
            MoveDirection::Down if pos + 1 < self.ids.len() => pos + 1,
            _ => return Ok(false),
        };

        self.ids.swap(pos, neighbour);
        self.version += 1;
        Ok(true)
    }

    /// A new category goes last. Returns its sort order.
    pub fn append(&mut self, id: CategoryId) -> i32 {
        self.ids.push(id);
        self.version += 1;
        (self.ids.len() - 1) as i32
    }

    /// Drop a deleted category and close the gap.
    pub fn remove(&mut self, id: CategoryId) -> bool {
        match self.position(id) {
            Some(pos) => {
                self.ids.remove(pos);
                self.version += 1;
                true
            }
            None => false,
        }
    }
}

/// Check that `proposed` names every id in `current` exactly once and nothing else.
pub fn validate_permutation(current: &[CategoryId], proposed: &[CategoryId]) -> CatalogResult<()> {
    let known: HashSet<CategoryId> = current.iter().copied().collect();
    let mut seen = HashSet::with_capacity(proposed.len());

    for id in proposed {
        if !known.contains(id) {
            return Err(CatalogError::incomplete_order(format!("unknown category {id}")));
        }
        if !seen.insert(*id) {
            return Err(CatalogError::incomplete_order(format!("category {id} listed more than once")));
        }
    }

    if seen.len() != known.len() {
        let missing = known.len() - seen.len();
        return Err(CatalogError::incomplete_order(format!(
            "{missing} categor{} missing from the new order",
            if missing == 1 { "y" } else { "ies" }
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_of(n: usize) -> CategoryOrder {
        CategoryOrder::new((0..n).map(|_| CategoryId::new()).collect(), 0)
    }

    fn assert_dense(order: &CategoryOrder) {
        let positions: Vec<i32> = order.positions().map(|(_, p)| p).collect();
        assert_eq!(positions, (0..order.len() as i32).collect::<Vec<_>>());
    }

    #[test]
    fn reorder_rewrites_positions_and_bumps_version() {
        let mut order = order_of(3);
        let mut proposed = order.ids().to_vec();
        proposed.reverse();
        order.reorder(&proposed, ExpectedVersion::Exact(0)).unwrap();
        assert_eq!(order.ids(), proposed.as_slice());
        assert_eq!(order.version(), 1);
        assert_dense(&order);
    }

    #[test]
    fn reorder_rejects_partial_and_duplicate_lists() {
        let mut order = order_of(3);
        let ids = order.ids().to_vec();

        let partial = order.reorder(&ids[..2], ExpectedVersion::Any).unwrap_err();
        assert!(matches!(partial, CatalogError::IncompleteOrder(_)));

        let dup = order.reorder(&[ids[0], ids[0], ids[1]], ExpectedVersion::Any).unwrap_err();
        assert!(matches!(dup, CatalogError::IncompleteOrder(_)));

        let unknown = order
            .reorder(&[ids[0], ids[1], CategoryId::new()], ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(unknown, CatalogError::IncompleteOrder(_)));

        assert_eq!(order.ids(), ids.as_slice());
        assert_eq!(order.version(), 0);
    }

    #[test]
    fn stale_version_is_order_conflict() {
        let mut order = order_of(2);
        let ids = order.ids().to_vec();
        order.reorder(&ids, ExpectedVersion::Any).unwrap();
        let err = order.reorder(&ids, ExpectedVersion::Exact(0)).unwrap_err();
        assert_eq!(err, CatalogError::OrderConflict { expected: 0, actual: 1 });
    }

    #[test]
    fn move_adjacent_swaps_neighbours() {
        let mut order = order_of(3);
        let ids = order.ids().to_vec();
        assert!(order.move_adjacent(ids[1], MoveDirection::Up, ExpectedVersion::Any).unwrap());
        assert_eq!(order.ids(), &[ids[1], ids[0], ids[2]]);
        assert!(order.move_adjacent(ids[1], MoveDirection::Down, ExpectedVersion::Any).unwrap());
        assert_eq!(order.ids(), ids.as_slice());
        assert_eq!(order.version(), 2);
    }

    #[test]
    fn move_adjacent_is_a_no_op_at_the_boundaries() {
        let mut order = order_of(3);
        let ids = order.ids().to_vec();
        assert!(!order.move_adjacent(ids[0], MoveDirection::Up, ExpectedVersion::Any).unwrap());
        assert!(!order.move_adjacent(ids[2], MoveDirection::Down, ExpectedVersion::Any).unwrap());
        assert_eq!(order.ids(), ids.as_slice());
        assert_eq!(order.version(), 0);
    }

    #[test]
    fn move_adjacent_unknown_category_is_not_found() {
        let mut order = order_of(2);
        let err = order
            .move_adjacent(CategoryId::new(), MoveDirection::Up, ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn append_and_remove_keep_order_dense() {
        let mut order = order_of(3);
        let added = CategoryId::new();
        assert_eq!(order.append(added), 3);
        let middle = order.ids()[1];
        assert!(order.remove(middle));
        assert!(!order.remove(middle));
        assert_dense(&order);
        assert_eq!(order.position(added), Some(2));
    }

    #[test]
    fn direction_parses() {
        assert_eq!("UP".parse::<MoveDirection>().unwrap(), MoveDirection::Up);
        assert!("left".parse::<MoveDirection>().is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Move(usize, bool),
            Shuffle(Vec<usize>),
            Append,
            Remove(usize),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0usize..16, any::<bool>()).prop_map(|(i, up)| Op::Move(i, up)),
                proptest::collection::vec(any::<usize>(), 16).prop_map(Op::Shuffle),
                Just(Op::Append),
                (0usize..16).prop_map(Op::Remove),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: after any sequence of order operations, sort orders are exactly
            /// 0..N with no duplicates or gaps, and the id set is preserved.
            #[test]
            fn order_stays_total(initial in 1usize..10, ops in proptest::collection::vec(op(), 0..40)) {
                let mut order = order_of(initial);
                let mut expected: HashSet<CategoryId> = order.ids().iter().copied().collect();

                for op in ops {
                    let len = order.len();
                    match op {
                        Op::Move(i, up) if len > 0 => {
                            let id = order.ids()[i % len];
                            let dir = if up { MoveDirection::Up } else { MoveDirection::Down };
                            order.move_adjacent(id, dir, ExpectedVersion::Any).unwrap();
                        }
                        Op::Shuffle(keys) => {
                            let mut ids: Vec<(usize, CategoryId)> = order
                                .ids()
                                .iter()
                                .enumerate()
                                .map(|(i, id)| (keys[i % keys.len()], *id))
                                .collect();
                            ids.sort_by_key(|(k, _)| *k);
                            let proposed: Vec<CategoryId> = ids.into_iter().map(|(_, id)| id).collect();
                            order.reorder(&proposed, ExpectedVersion::Exact(order.version())).unwrap();
                        }
                        Op::Append => {
                            let id = CategoryId::new();
                            order.append(id);
                            expected.insert(id);
                        }
                        Op::Remove(i) if len > 0 => {
                            let id = order.ids()[i % len];
                            order.remove(id);
                            expected.remove(&id);
                        }
                        _ => {}
                    }

                    let positions: Vec<i32> = order.positions().map(|(_, p)| p).collect();
                    prop_assert_eq!(positions, (0..order.len() as i32).collect::<Vec<_>>());
                    let ids: HashSet<CategoryId> = order.ids().iter().copied().collect();
                    prop_assert_eq!(ids.len(), order.len());
                    prop_assert_eq!(&ids, &expected);
                }
            }
        }
    }
}
