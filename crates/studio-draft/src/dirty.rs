//! Dirty comparator
//!
//! Field-appropriate equality between a draft value and its last synced
//! snapshot. Scalars compare strictly; id lists compare as sorted arrays.
//! Text fields are stored as `String` with `""` standing for unset, so a
//! controlled input's empty default never reads as an edit.

use crate::types::{EntityId, IdList};
use chrono::{DateTime, NaiveDate, Utc};

/// Equality used to decide whether a field differs from the server state
pub trait DirtyEq {
    /// `true` when `self` and `synced` represent the same persisted value
    fn dirty_eq(&self, synced: &Self) -> bool;
}

/// Compare text fields strictly
#[inline]
#[must_use]
pub fn text_eq(draft: &str, synced: &str) -> bool {
    draft == synced
}

/// Compare id lists ignoring order
#[must_use]
pub fn id_list_eq(draft: &[EntityId], synced: &[EntityId]) -> bool {
    if draft.len() != synced.len() {
        return false;
    }
    let mut left = draft.to_vec();
    let mut right = synced.to_vec();
    left.sort_unstable();
    right.sort_unstable();
    left == right
}

impl DirtyEq for String {
    fn dirty_eq(&self, synced: &Self) -> bool {
        text_eq(self, synced)
    }
}

impl DirtyEq for IdList {
    fn dirty_eq(&self, synced: &Self) -> bool {
        id_list_eq(self.as_slice(), synced.as_slice())
    }
}

impl<T: PartialEq> DirtyEq for Option<T> {
    fn dirty_eq(&self, synced: &Self) -> bool {
        self == synced
    }
}

macro_rules! scalar_dirty_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl DirtyEq for $ty {
                #[inline]
                fn dirty_eq(&self, synced: &Self) -> bool {
                    self == synced
                }
            }
        )*
    };
}

scalar_dirty_eq!(bool, i32, i64, u32, u64, EntityId, NaiveDate, DateTime<Utc>);
