//! stackwatch-core — event model and in-process distribution for Stackwatch.
//!
//! # Overview
//!
//! The platform pushes resource changes over a single event socket. This
//! crate holds everything that does not touch the socket itself:
//!
//! - [`Event`] — the decoded wire envelope, plus typed views of its
//!   `data.resource` snapshot ([`StackView`], [`ServiceView`], [`ContainerView`])
//! - [`decode_frame`] — raw frame → [`Event`]
//! - [`Connector`] — the async trait every frame source implements
//! - [`SubscriptionHub`] — bounded per-subscriber queues with ordered fan-out
//! - [`ResourceCache`] — latest snapshot per resource with a fixed TTL
//! - [`StreamError`] / [`DecodeError`] / [`CacheError`] — error taxonomy

pub mod cache;
pub mod config;
pub mod decoder;
pub mod error;
pub mod event;
pub mod hub;
pub mod resource;
pub mod source;

pub use cache::ResourceCache;
pub use config::MonitorConfig;
pub use decoder::decode_frame;
pub use error::{CacheError, DecodeError, StreamError};
pub use event::Event;
pub use hub::{DeliveryPolicy, DispatchReport, Subscription, SubscriptionHub, SubscriptionId};
pub use resource::{ContainerView, ResourceKind, ServiceView, StackView, Transition};
pub use source::{Connector, Frame, FrameStream};
