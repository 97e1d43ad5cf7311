//! Three-state field wrapper for partial updates.

use serde::{Deserialize, Deserializer};

/// A field in a partial update body.
///
/// Use together with `#[serde(default)]` so a missing key deserializes to
/// `Absent`, while an explicit `null` becomes `Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    /// Key not present; leave the stored value untouched.
    Absent,
    /// Key present with `null`; clear the stored value.
    Null,
    /// Key present with a value; overwrite the stored value.
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Patch<U>, E> {
        Ok(match self {
            Patch::Absent => Patch::Absent,
            Patch::Null => Patch::Null,
            Patch::Value(v) => Patch::Value(f(v)?),
        })
    }
}

impl<T> Patch<Option<T>> {
    /// Collapse a patch whose value may itself be "nothing" (e.g. an empty date string).
    pub fn flatten(self) -> Patch<T> {
        match self {
            Patch::Absent => Patch::Absent,
            Patch::Null | Patch::Value(None) => Patch::Null,
            Patch::Value(Some(v)) => Patch::Value(v),
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|value| match value {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        })
    }
}
