//! Bucketed spatial index over occupant positions.
//!
//! The grid is partitioned into square buckets of side `bucket_size`.
//! Each bucket holds the keys of the occupants standing in it, and a
//! reverse map records every occupant's current position. A radius
//! query visits only the buckets overlapping the query's bounding square.
//!
//! # Consistency
//!
//! Every registered key lives in exactly one bucket: the one containing
//! its recorded position. [`Occupancy::move_to`] removes and re-inserts
//! within a single `&mut self` call, so no caller can observe a stale
//! entry.
//!
//! # Sharing
//!
//! Agents receive the index as `&mut dyn Occupancy<K>` for the duration
//! of their own tick and may only touch their own registration. The
//! index itself performs no locking; a partitioned or lock-striped
//! implementation can be substituted behind the same trait.

use crate::error::IndexError;
use cairn_core::{euclidean, Occupant, Position};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::trace;

/// Default bucket side, matching the learning agent's collision radius.
pub const DEFAULT_BUCKET_SIZE: u32 = 2;

/// One occupant as seen by a query: its key and position at query time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Entry<K> {
    /// Registration key.
    pub key: K,
    /// Position recorded in the index.
    pub position: Position,
}

/// Registry of occupant positions supporting neighbour queries.
///
/// This is the seam between the agent decision loop and the index
/// implementation. Errors are contract violations (see [`IndexError`]).
pub trait Occupancy<K> {
    /// Register `key` at `position`.
    ///
    /// Fails with `DuplicateRegistration` if `key` is present.
    fn insert(&mut self, key: K, position: Position) -> Result<(), IndexError>;

    /// Unregister `key`, returning its last position.
    ///
    /// Fails with `NotFound` if `key` is absent.
    fn remove(&mut self, key: K) -> Result<Position, IndexError>;

    /// Atomically move `key` to `position`.
    ///
    /// Callers must already have validated bounds and routability; this
    /// only maintains index consistency.
    fn move_to(&mut self, key: K, position: Position) -> Result<(), IndexError>;

    /// All occupants within Euclidean `radius` of `center`, optionally
    /// filtered by `predicate`.
    ///
    /// The result is materialised at call time (snapshot semantics).
    fn explore(
        &self,
        center: Position,
        radius: f64,
        predicate: Option<&dyn Fn(&Entry<K>) -> bool>,
    ) -> Vec<Entry<K>>;

    /// Advance `key` by up to `step_size` cells along `bearing` (degrees
    /// clockwise from North), clamped to the index extent.
    ///
    /// Returns the resulting position whether or not it changed.
    fn move_towards(&mut self, key: K, bearing: f64, step_size: u32)
        -> Result<Position, IndexError>;

    /// The recorded position of `key`, if registered.
    fn position_of(&self, key: K) -> Option<Position>;
}

type BucketKey = (i32, i32);

/// Uniform-bucket spatial index over a `width × height` extent.
///
/// Query cost is proportional to the number of occupants in the buckets
/// overlapping the query, not to the total population. Bucket side
/// should be about the largest exploration radius in use so a typical
/// query touches one bucket and its neighbours.
///
/// Results are ordered deterministically: buckets in row-major order,
/// then registration order within a bucket.
pub struct SpatialIndex<K> {
    width: u32,
    height: u32,
    bucket_size: u32,
    buckets: HashMap<BucketKey, IndexSet<K>>,
    positions: IndexMap<K, Position>,
}

impl<K> SpatialIndex<K>
where
    K: Copy + Eq + Hash + Debug,
{
    /// Create an empty index over a `width × height` extent.
    ///
    /// Returns `Err(IndexError::InvalidBucketSize)` if `bucket_size` is 0.
    pub fn new(width: u32, height: u32, bucket_size: u32) -> Result<Self, IndexError> {
        if bucket_size == 0 {
            return Err(IndexError::InvalidBucketSize);
        }
        Ok(Self {
            width,
            height,
            bucket_size,
            buckets: HashMap::new(),
            positions: IndexMap::new(),
        })
    }

    /// Register an [`Occupant`] at its current position.
    pub fn insert_occupant<O>(&mut self, occupant: &O) -> Result<(), IndexError>
    where
        O: Occupant<Key = K>,
    {
        self.insert(occupant.key(), occupant.position())
    }

    /// Shorthand for [`Occupancy::explore`] with a closure predicate.
    pub fn explore_where(
        &self,
        center: Position,
        radius: f64,
        predicate: impl Fn(&Entry<K>) -> bool,
    ) -> Vec<Entry<K>> {
        let predicate: &dyn Fn(&Entry<K>) -> bool = &predicate;
        self.explore(center, radius, Some(predicate))
    }

    /// Number of registered occupants.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether no occupants are registered.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether `key` is registered.
    pub fn contains(&self, key: K) -> bool {
        self.positions.contains_key(&key)
    }

    /// Bucket side length in cells.
    pub fn bucket_size(&self) -> u32 {
        self.bucket_size
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Index extent as `(width, height)`.
    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Iterate `(key, position)` in registration order.
    pub fn iter(&self) -> impl Iterator<Item = Entry<K>> + '_ {
        self.positions.iter().map(|(&key, &position)| Entry { key, position })
    }

    /// Verify the one-entry-per-occupant invariant.
    ///
    /// Returns a description of the first violation found.
    pub fn check_consistency(&self) -> Result<(), String> {
        let mut members = 0usize;
        for (bucket, keys) in &self.buckets {
            if keys.is_empty() {
                return Err(format!("empty bucket {bucket:?} retained"));
            }
            for key in keys {
                let Some(&pos) = self.positions.get(key) else {
                    return Err(format!("bucket {bucket:?} holds unregistered {key:?}"));
                };
                if self.bucket_of(pos) != *bucket {
                    return Err(format!(
                        "{key:?} at {pos} filed under bucket {bucket:?}, expected {:?}",
                        self.bucket_of(pos)
                    ));
                }
            }
            members += keys.len();
        }
        if members != self.positions.len() {
            return Err(format!(
                "{members} bucket members for {} registered occupants",
                self.positions.len()
            ));
        }
        Ok(())
    }

    fn bucket_of(&self, pos: Position) -> BucketKey {
        let b = self.bucket_size as i32;
        (pos.x.div_euclid(b), pos.y.div_euclid(b))
    }

    fn in_extent(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    fn file(&mut self, key: K, pos: Position) {
        let bucket = self.bucket_of(pos);
        self.buckets.entry(bucket).or_default().insert(key);
    }

    fn unfile(&mut self, key: K, pos: Position) {
        let bucket = self.bucket_of(pos);
        if let Some(keys) = self.buckets.get_mut(&bucket) {
            keys.shift_remove(&key);
            if keys.is_empty() {
                self.buckets.remove(&bucket);
            }
        }
    }

    fn not_found(key: K) -> IndexError {
        IndexError::NotFound {
            key: format!("{key:?}"),
        }
    }
}

impl<K> Occupancy<K> for SpatialIndex<K>
where
    K: Copy + Eq + Hash + Debug,
{
    fn insert(&mut self, key: K, position: Position) -> Result<(), IndexError> {
        if self.positions.contains_key(&key) {
            return Err(IndexError::DuplicateRegistration {
                key: format!("{key:?}"),
            });
        }
        if !self.in_extent(position) {
            return Err(IndexError::OutOfBounds {
                position,
                width: self.width,
                height: self.height,
            });
        }
        self.positions.insert(key, position);
        self.file(key, position);
        trace!(?key, %position, "registered occupant");
        Ok(())
    }

    fn remove(&mut self, key: K) -> Result<Position, IndexError> {
        let position = self
            .positions
            .shift_remove(&key)
            .ok_or_else(|| Self::not_found(key))?;
        self.unfile(key, position);
        trace!(?key, %position, "unregistered occupant");
        Ok(position)
    }

    fn move_to(&mut self, key: K, position: Position) -> Result<(), IndexError> {
        let old = *self.positions.get(&key).ok_or_else(|| Self::not_found(key))?;
        if self.bucket_of(old) != self.bucket_of(position) {
            self.unfile(key, old);
            self.file(key, position);
        }
        self.positions.insert(key, position);
        Ok(())
    }

    fn explore(
        &self,
        center: Position,
        radius: f64,
        predicate: Option<&dyn Fn(&Entry<K>) -> bool>,
    ) -> Vec<Entry<K>> {
        let mut out = Vec::new();
        if radius.is_nan() || radius < 0.0 || self.positions.is_empty() {
            return out;
        }
        let reach = radius.floor().min(f64::from(i32::MAX / 2)) as i32;
        let max_x = self.width.saturating_sub(1) as i32;
        let max_y = self.height.saturating_sub(1) as i32;
        let lo = Position::new(
            center.x.saturating_sub(reach).max(0),
            center.y.saturating_sub(reach).max(0),
        );
        let hi = Position::new(
            center.x.saturating_add(reach).min(max_x),
            center.y.saturating_add(reach).min(max_y),
        );
        if lo.x > hi.x || lo.y > hi.y {
            return out;
        }
        let (bx_lo, by_lo) = self.bucket_of(lo);
        let (bx_hi, by_hi) = self.bucket_of(hi);
        for by in by_lo..=by_hi {
            for bx in bx_lo..=bx_hi {
                let Some(keys) = self.buckets.get(&(bx, by)) else {
                    continue;
                };
                for &key in keys {
                    let position = self.positions[&key];
                    if euclidean(center, position) > radius {
                        continue;
                    }
                    let entry = Entry { key, position };
                    if predicate.map_or(true, |p| p(&entry)) {
                        out.push(entry);
                    }
                }
            }
        }
        out
    }

    fn move_towards(
        &mut self,
        key: K,
        bearing: f64,
        step_size: u32,
    ) -> Result<Position, IndexError> {
        let current = self.position_of(key).ok_or_else(|| Self::not_found(key))?;
        let rad = bearing.to_radians();
        let step = f64::from(step_size);
        // Offsets beyond the extent clamp to the same edge.
        let reach_x = f64::from(self.width);
        let reach_y = f64::from(self.height);
        let dx = (rad.sin() * step).round().clamp(-reach_x, reach_x) as i32;
        let dy = (rad.cos() * step).round().clamp(-reach_y, reach_y) as i32;
        let max_x = self.width.saturating_sub(1) as i32;
        let max_y = self.height.saturating_sub(1) as i32;
        let target = Position::new(
            (current.x + dx).clamp(0, max_x),
            (current.y + dy).clamp(0, max_y),
        );
        if target != current {
            self.move_to(key, target)?;
        }
        Ok(target)
    }

    fn position_of(&self, key: K) -> Option<Position> {
        self.positions.get(&key).copied()
    }
}

impl<K: Debug> Debug for SpatialIndex<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("extent", &(self.width, self.height))
            .field("bucket_size", &self.bucket_size)
            .field("occupants", &self.positions.len())
            .field("buckets", &self.buckets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(x: i32, y: i32) -> Position {
        Position::new(x, y)
    }

    fn keys(entries: &[Entry<u32>]) -> Vec<u32> {
        entries.iter().map(|e| e.key).collect()
    }

    // ── Registration ────────────────────────────────────────────

    #[test]
    fn insert_then_locate() {
        let mut idx = SpatialIndex::new(10, 10, 2).unwrap();
        idx.insert(1u32, p(3, 4)).unwrap();
        assert_eq!(idx.position_of(1), Some(p(3, 4)));
        assert_eq!(idx.len(), 1);
        assert!(idx.contains(1));
    }

    #[test]
    fn duplicate_insert_rejected() {
        let mut idx = SpatialIndex::new(10, 10, 2).unwrap();
        idx.insert(1u32, p(0, 0)).unwrap();
        let err = idx.insert(1, p(5, 5)).unwrap_err();
        assert!(matches!(err, IndexError::DuplicateRegistration { .. }));
        assert_eq!(idx.position_of(1), Some(p(0, 0)));
    }

    #[test]
    fn insert_outside_extent_rejected() {
        let mut idx = SpatialIndex::new(4, 4, 2).unwrap();
        assert!(matches!(
            idx.insert(1u32, p(4, 0)),
            Err(IndexError::OutOfBounds { .. })
        ));
        assert!(idx.is_empty());
    }

    #[test]
    fn insert_occupant_uses_key_and_position() {
        let mut idx = SpatialIndex::new(4, 4, 2).unwrap();
        idx.insert_occupant(&(9u32, p(1, 2))).unwrap();
        assert_eq!(idx.position_of(9), Some(p(1, 2)));
    }

    #[test]
    fn remove_unknown_is_not_found() {
        let mut idx: SpatialIndex<u32> = SpatialIndex::new(4, 4, 2).unwrap();
        assert!(matches!(idx.remove(3), Err(IndexError::NotFound { .. })));
        assert!(matches!(idx.move_to(3, p(0, 0)), Err(IndexError::NotFound { .. })));
    }

    #[test]
    fn remove_drops_empty_bucket() {
        let mut idx = SpatialIndex::new(10, 10, 2).unwrap();
        idx.insert(1u32, p(0, 0)).unwrap();
        assert_eq!(idx.bucket_count(), 1);
        assert_eq!(idx.remove(1).unwrap(), p(0, 0));
        assert_eq!(idx.bucket_count(), 0);
        idx.check_consistency().unwrap();
    }

    #[test]
    fn zero_bucket_size_rejected() {
        assert!(matches!(
            SpatialIndex::<u32>::new(4, 4, 0),
            Err(IndexError::InvalidBucketSize)
        ));
    }

    // ── Queries ─────────────────────────────────────────────────

    #[test]
    fn move_to_leaves_no_stale_entry() {
        let mut idx = SpatialIndex::new(10, 10, 2).unwrap();
        idx.insert(1u32, p(0, 0)).unwrap();
        idx.move_to(1, p(3, 3)).unwrap();
        let hits = idx.explore(p(3, 3), 0.0, None);
        assert_eq!(hits, vec![Entry { key: 1, position: p(3, 3) }]);
        assert!(idx.explore(p(0, 0), 0.0, None).is_empty());
        idx.check_consistency().unwrap();
    }

    #[test]
    fn explore_uses_euclidean_radius() {
        let mut idx = SpatialIndex::new(10, 10, 2).unwrap();
        idx.insert(1u32, p(5, 5)).unwrap();
        idx.insert(2, p(6, 6)).unwrap(); // sqrt(2)
        idx.insert(3, p(7, 5)).unwrap(); // 2
        idx.insert(4, p(7, 7)).unwrap(); // 2*sqrt(2)
        let mut within = keys(&idx.explore(p(5, 5), 2.0, None));
        within.sort();
        assert_eq!(within, vec![1, 2, 3]);
        let mut near = keys(&idx.explore(p(5, 5), 1.5, None));
        near.sort();
        assert_eq!(near, vec![1, 2]);
    }

    #[test]
    fn explore_applies_predicate() {
        let mut idx = SpatialIndex::new(10, 10, 2).unwrap();
        idx.insert(1u32, p(1, 1)).unwrap();
        idx.insert(2, p(2, 1)).unwrap();
        let hits = idx.explore_where(p(1, 1), 2.0, |e| e.position == p(2, 1));
        assert_eq!(keys(&hits), vec![2]);
    }

    #[test]
    fn explore_spans_bucket_boundaries() {
        let mut idx = SpatialIndex::new(20, 20, 4).unwrap();
        // (3,3) and (4,4) fall in different buckets.
        idx.insert(1u32, p(3, 3)).unwrap();
        idx.insert(2, p(4, 4)).unwrap();
        let mut hits = keys(&idx.explore(p(4, 4), 2.0, None));
        hits.sort();
        assert_eq!(hits, vec![1, 2]);
    }

    #[test]
    fn explore_result_is_a_snapshot() {
        let mut idx = SpatialIndex::new(10, 10, 2).unwrap();
        idx.insert(1u32, p(1, 1)).unwrap();
        let hits = idx.explore(p(1, 1), 1.0, None);
        idx.move_to(1, p(8, 8)).unwrap();
        assert_eq!(hits[0].position, p(1, 1));
    }

    #[test]
    fn explore_order_is_deterministic() {
        let mut idx = SpatialIndex::new(10, 10, 2).unwrap();
        idx.insert(5u32, p(3, 3)).unwrap();
        idx.insert(2, p(0, 0)).unwrap();
        idx.insert(7, p(1, 0)).unwrap();
        // Bucket (0,0) first, registration order within it.
        assert_eq!(keys(&idx.explore(p(1, 1), 5.0, None)), vec![2, 7, 5]);
    }

    // ── move_towards ────────────────────────────────────────────

    #[test]
    fn move_towards_east_and_north() {
        let mut idx = SpatialIndex::new(10, 10, 2).unwrap();
        idx.insert(1u32, p(5, 5)).unwrap();
        assert_eq!(idx.move_towards(1, 90.0, 1).unwrap(), p(6, 5));
        assert_eq!(idx.move_towards(1, 0.0, 2).unwrap(), p(6, 7));
        assert_eq!(idx.move_towards(1, 45.0, 1).unwrap(), p(7, 8));
        assert_eq!(idx.position_of(1), Some(p(7, 8)));
        idx.check_consistency().unwrap();
    }

    #[test]
    fn move_towards_clamps_to_extent() {
        let mut idx = SpatialIndex::new(5, 5, 2).unwrap();
        idx.insert(1u32, p(0, 0)).unwrap();
        assert_eq!(idx.move_towards(1, 270.0, 3).unwrap(), p(0, 0));
        assert_eq!(idx.move_towards(1, 180.0, 1).unwrap(), p(0, 0));
        assert_eq!(idx.move_towards(1, 90.0, 10).unwrap(), p(4, 0));
    }

    #[test]
    fn move_towards_with_max_step_lands_on_edge() {
        let mut idx = SpatialIndex::new(10, 10, 2).unwrap();
        idx.insert(1u32, p(5, 5)).unwrap();
        assert_eq!(idx.move_towards(1, 90.0, u32::MAX).unwrap(), p(9, 5));
        assert_eq!(idx.move_towards(1, 225.0, u32::MAX).unwrap(), p(0, 0));
        assert_eq!(idx.move_towards(1, 45.0, u32::MAX).unwrap(), p(9, 9));
        assert_eq!(idx.position_of(1), Some(p(9, 9)));
        idx.check_consistency().unwrap();
    }

    // ── Property tests ──────────────────────────────────────────

    #[derive(Clone, Debug)]
    enum Op {
        Insert(u32, i32, i32),
        Remove(u32),
        Move(u32, i32, i32),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..8, 0i32..16, 0i32..16).prop_map(|(k, x, y)| Op::Insert(k, x, y)),
            (0u32..8).prop_map(Op::Remove),
            (0u32..8, 0i32..16, 0i32..16).prop_map(|(k, x, y)| Op::Move(k, x, y)),
        ]
    }

    proptest! {
        #[test]
        fn stays_consistent_and_matches_brute_force(
            bucket in 1u32..6,
            ops in proptest::collection::vec(arb_op(), 1..64),
            cx in 0i32..16, cy in 0i32..16, radius in 0.0f64..6.0,
        ) {
            let mut idx = SpatialIndex::new(16, 16, bucket).unwrap();
            let mut model: HashMap<u32, Position> = HashMap::new();
            for op in ops {
                match op {
                    Op::Insert(k, x, y) => {
                        let r = idx.insert(k, p(x, y));
                        prop_assert_eq!(r.is_ok(), !model.contains_key(&k));
                        model.entry(k).or_insert(p(x, y));
                    }
                    Op::Remove(k) => {
                        let r = idx.remove(k);
                        prop_assert_eq!(r.ok(), model.remove(&k));
                    }
                    Op::Move(k, x, y) => {
                        let r = idx.move_to(k, p(x, y));
                        prop_assert_eq!(r.is_ok(), model.contains_key(&k));
                        if let Some(pos) = model.get_mut(&k) {
                            *pos = p(x, y);
                        }
                    }
                }
                prop_assert!(idx.check_consistency().is_ok());
            }
            let center = p(cx, cy);
            let mut got = keys(&idx.explore(center, radius, None));
            got.sort();
            let mut want: Vec<u32> = model
                .iter()
                .filter(|(_, &pos)| euclidean(center, pos) <= radius)
                .map(|(&k, _)| k)
                .collect();
            want.sort();
            prop_assert_eq!(got, want);
        }
    }
}
