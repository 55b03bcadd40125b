//! Data models for the TestRail connector.
//!
//! - [`ArtifactKind`] and [`Artifact`] - the loosely-typed remote records
//! - [`Project`] and [`SuiteMode`]
//! - [`Suite`] and [`Section`] - the case hierarchy
//! - [`FieldDescriptor`] - custom-field schema entries

pub mod artifact;
pub mod field;
pub mod hierarchy;
pub mod kind;
pub mod project;

pub use artifact::{value_as_i64, value_to_string, Artifact, Fields};
pub use field::{FieldDescriptor, FieldType};
pub use hierarchy::{Section, Suite};
pub use kind::ArtifactKind;
pub use project::{Project, SuiteMode};
