//! trsync - the TestRail side of a test-management synchronization.
//!
//! This crate provides the connector core and the `trsync` CLI built on it.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Configuration accessor and the resolved session settings
//! - [`connector`] - Field catalog, hierarchy, gateway, filtering, discovery
//! - [`model`] - Data types (Artifact, Project, Suite, Section, FieldDescriptor)
//! - [`remote`] - The transport seam and the TestRail HTTP client
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod connector;
pub mod error;
pub mod model;
pub mod remote;

pub use error::{Error, Result};
