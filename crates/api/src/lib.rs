//! RunPod GraphQL API layer.
//!
//! Payload construction lives in [`mutations`] and [`queries`] as pure
//! functions so field-serialization edge cases are unit-testable without
//! network access. [`client::ApiClient`] is the thin transport on top;
//! orchestration code depends on the [`client::PodApi`] trait instead of the
//! concrete client.

pub mod client;
pub mod error;
pub mod mutations;
pub mod queries;
pub mod types;

pub use client::{ApiClient, PodApi};
pub use error::{ApiError, ApiResult};
pub use mutations::{DeployPodFields, SaveEndpointFields, SaveTemplateFields};
pub use types::{Endpoint, Pod, PodStatus, Template};
