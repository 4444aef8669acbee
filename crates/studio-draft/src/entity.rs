//! Entity model traits
//!
//! Each panel is generic over an [`EntityKind`]. A kind names:
//! - its editable [`FieldSet`], whose edits form a closed [`FieldChange`] enum
//! - its server representation, a [`PersistedEntity`]
//!
//! A change variant carries its own value type, so a field can only ever be
//! set to a value of the right type.

use crate::types::EntityId;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Marker for one entity type (task, team, ...)
pub trait EntityKind: Debug + Clone + Send + Sync + 'static {
    /// Singular name used in logs and notifications
    const NAME: &'static str;
    /// Collection segment used by REST-style gateways
    const COLLECTION: &'static str;

    /// Editable fields
    type Fields: FieldSet;
    /// Server representation
    type Entity: PersistedEntity<Fields = Self::Fields>;
}

/// Edit variant type of a kind
pub type ChangeOf<K> = <<K as EntityKind>::Fields as FieldSet>::Change;

/// Field name type of a kind
pub type FieldOf<K> = <<K as EntityKind>::Fields as FieldSet>::Field;

/// The editable fields of one entity
pub trait FieldSet:
    Clone + Debug + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Field names
    type Field: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static;
    /// One edit to one field
    type Change: FieldChange<Field = Self::Field>;

    /// Required field gating creation (task title, team name)
    fn title(&self) -> &str;

    /// Apply one edit
    fn apply(&mut self, change: Self::Change);

    /// Current value of `field`, as the edit that would set it
    fn current(&self, field: Self::Field) -> Self::Change;

    /// Fields whose value differs from `synced` under dirty equality
    fn diff(&self, synced: &Self) -> Vec<Self::Field>;

    /// Check if the required title field is filled in
    #[inline]
    fn has_title(&self) -> bool {
        !self.title().trim().is_empty()
    }
}

/// One edit to one field
///
/// Serializes as a single-key object (`{"priority": "high"}`) so a patch is
/// the merge of its changes.
pub trait FieldChange:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Field name type
    type Field: Copy + Eq + Hash + Debug + Display;

    /// Field this change targets
    fn field(&self) -> Self::Field;
}

/// Entity as returned by the server
pub trait PersistedEntity:
    Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Editable field set
    type Fields: FieldSet;

    /// Server id
    fn id(&self) -> EntityId;

    /// Editable projection, used as the synced snapshot
    fn fields(&self) -> Self::Fields;

    /// Build a freshly created entity (used by non-HTTP gateways)
    fn materialize(id: EntityId, fields: Self::Fields, at: DateTime<Utc>) -> Self;

    /// Same entity with replaced fields and a new modification stamp
    fn with_fields(&self, fields: Self::Fields, at: DateTime<Utc>) -> Self;
}

/// Merge changes into one JSON patch object
///
/// # Errors
/// Returns an error if a change does not serialize to a JSON object
pub fn patch_object<C: FieldChange>(
    changes: &[C],
) -> Result<serde_json::Map<String, serde_json::Value>, serde_json::Error> {
    let mut patch = serde_json::Map::new();
    for change in changes {
        match serde_json::to_value(change)? {
            serde_json::Value::Object(entries) => patch.extend(entries),
            other => {
                return Err(serde::ser::Error::custom(format!(
                    "change {change:?} serialized to non-object {other}"
                )))
            }
        }
    }
    Ok(patch)
}

/// Apply changes on top of an entity's fields
#[must_use]
pub fn patched_fields<E: PersistedEntity>(
    entity: &E,
    changes: &[<E::Fields as FieldSet>::Change],
) -> E::Fields {
    let mut fields = entity.fields();
    for change in changes {
        fields.apply(change.clone());
    }
    fields
}
