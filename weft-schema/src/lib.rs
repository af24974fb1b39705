//! Schema resolution for weft plugins.
//!
//! Takes the manifests a workspace declares, resolves their import
//! closure, expands named types across plugin namespaces, and builds the
//! concrete root schema each plugin's store conforms to:
//!
//! - [`dependency_closure`] / [`topological_sort`] walk and order imports
//! - [`expanded_types_for_plugin`] flattens every visible named type
//! - [`root_schema_for_plugin`] concretizes a store against those types
//! - [`resolve_deferred_ref_keys`] finalizes cross-plugin ref key types
//! - [`is_compatible`] compares two built schemas structurally
//!
//! All transforms are pure; only manifest fetches go through the
//! [`weft_manifest::DataSource`] trait.

mod compat;
mod error;
mod expand;
mod refs;
mod resolve;
mod root;

pub use compat::is_compatible;
pub use error::{SchemaError, SchemaResult};
pub use expand::{expanded_types_for_plugin, iterate_schema_types};
pub use refs::resolve_deferred_ref_keys;
pub use resolve::{
    dependency_closure, schema_map_from_manifests, topological_sort, upstream_dependency_names,
};
pub use root::{construct_root_schema, root_schema_for_plugin, root_schema_map, RootSchemaMap};
