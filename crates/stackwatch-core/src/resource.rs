//! Typed views over `data.resource` for the stack → service → container
//! hierarchy.

use serde::{Deserialize, Serialize};

use crate::event::nullable;

/// Resource kinds the narrator understands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Stack,
    /// Wire name `scalingGroup`.
    Service,
    Container,
    Other(String),
}

impl From<&str> for ResourceKind {
    fn from(s: &str) -> Self {
        match s {
            "stack" => Self::Stack,
            "scalingGroup" => Self::Service,
            "container" => Self::Container,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stack => write!(f, "stack"),
            Self::Service => write!(f, "scalingGroup"),
            Self::Container => write!(f, "container"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Status fields shared by every level of the hierarchy.
pub trait Transition {
    fn name(&self) -> &str;
    fn transitioning(&self) -> &str;
    fn transitioning_message(&self) -> &str;

    /// `true` while the entity is mid-change.
    fn is_transitioning(&self) -> bool {
        self.transitioning() == "yes"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackView {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub transitioning: String,
    #[serde(default, deserialize_with = "nullable")]
    pub transitioning_message: String,
    #[serde(default, deserialize_with = "nullable")]
    pub service_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceView {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub stack_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub transitioning: String,
    #[serde(default, deserialize_with = "nullable")]
    pub transitioning_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerView {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub stack_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub transitioning: String,
    #[serde(default, deserialize_with = "nullable")]
    pub transitioning_message: String,
}

macro_rules! impl_transition {
    ($($ty:ty),*) => {$(
        impl Transition for $ty {
            fn name(&self) -> &str { &self.name }
            fn transitioning(&self) -> &str { &self.transitioning }
            fn transitioning_message(&self) -> &str { &self.transitioning_message }
        }
    )*};
}

impl_transition!(StackView, ServiceView, ContainerView);
