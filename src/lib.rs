//! PhET-iO API Comparison
//!
//! Decides whether a proposed PhET-iO API descriptor is safe to publish
//! relative to a reference descriptor, and whether it deviates from the parts
//! of the reference that were explicitly designed.
//!
//! ## Features
//!
//! - **Breaking changes**: removed elements, types, methods and events, changed
//!   signatures, elements leaving state or becoming read-only, incompatible
//!   initial state
//! - **Designed changes**: any deviation inside a `phetioDesigned` subtree
//! - **Metadata inheritance**: sparse metadata resolved through IO Type
//!   supertype chains
//! - **Legacy formats**: flat pre-1.0 descriptors are up-converted transparently
//!
//! ## Pipeline
//!
//! ```text
//! reference ─┐                ┌─ tree (metadata, compatibility) ─┐
//!            ├─ up_convert ───┤                                  ├─ problems ─► ComparisonReport
//! proposed ──┘                └─ types ──────────────────────────┘
//! ```
//!
//! Comparison itself performs no I/O; only [`config`] and the
//! `phetio-api-compare` binary touch the filesystem.

pub mod compare;
pub mod compatibility;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod metadata;
pub mod normalize;
pub mod problems;
pub mod tree;
pub mod types;
pub mod version;

pub use compare::{compare_apis, compare_descriptors, compare_normalized};
pub use compatibility::{is_initial_state_compatible, json_deep_equal};
pub use config::CompareConfig;
pub use descriptor::{Api, ApiDescriptor, Element, Metadata, TypeDefinition};
pub use error::{CompareError, Result};
pub use metadata::resolve_metadata;
pub use normalize::up_convert;
pub use problems::{Bucket, CompareOptions, ComparisonReport, ProblemCollector};
pub use version::ApiVersion;
