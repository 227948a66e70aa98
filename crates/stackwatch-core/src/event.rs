//! The decoded event envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::resource::ResourceKind;

/// One change pushed by the platform.
///
/// Created once per frame and shared read-only with every consumer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event tag, e.g. `"resource.change"`.
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// Resource discriminator, e.g. `"stack"`, `"scalingGroup"`, `"container"`.
    #[serde(default, deserialize_with = "nullable")]
    pub resource_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub resource_id: String,
    /// Open payload; `data.resource` usually holds the full entity snapshot.
    #[serde(default, deserialize_with = "nullable")]
    pub data: Map<String, Value>,
}

impl Event {
    pub fn kind(&self) -> ResourceKind {
        ResourceKind::from(self.resource_type.as_str())
    }

    /// The nested `data.resource` snapshot, if any.
    pub fn resource(&self) -> Option<&Value> {
        self.data.get("resource")
    }

    /// The value stored in the resource cache for this event:
    /// `data.resource` when present, otherwise the whole `data` object.
    pub fn snapshot(&self) -> Value {
        match self.resource() {
            Some(resource) => resource.clone(),
            None => Value::Object(self.data.clone()),
        }
    }

    /// Decode `data.resource` into a typed view.
    pub fn decode_resource<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        let resource = self.resource().ok_or_else(|| DecodeError::MissingResource {
            kind: self.resource_type.clone(),
        })?;
        T::deserialize(resource).map_err(|source| DecodeError::Resource {
            kind: self.resource_type.clone(),
            source,
        })
    }
}

/// Deserialize JSON `null` as the type's default.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
