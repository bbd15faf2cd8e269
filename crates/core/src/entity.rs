//! Persisted records: identity plus audit timestamps.

use chrono::{DateTime, Utc};

/// A stored record with a stable identifier.
///
/// Both collections (users, leads) carry `createdAt`/`updatedAt`; listing
/// endpoints order by creation time, newest first.
pub trait Entity {
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    fn id(&self) -> Self::Id;

    fn created_at(&self) -> DateTime<Utc>;

    fn updated_at(&self) -> DateTime<Utc>;
}

/// Sort records newest first, breaking ties by id so ordering is stable.
pub fn sort_newest_first<E: Entity>(records: &mut [E])
where
    E::Id: Ord,
{
    records.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().cmp(&a.id()))
    });
}
