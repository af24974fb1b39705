//! State validation for weft plugins.
//!
//! Consumes the root schemas built by `weft-schema` plus a workspace's
//! flattened state and reports which entries violate their schema:
//!
//! - [`decode_schema_path`] / [`write_path_string`] encode state keys
//! - [`re_index_schema_arrays`] turns keyed list paths positional
//! - [`invalid_states`] produces the per-plugin invalid path report
//!
//! Validation is best-effort by design: unresolvable plugins are skipped,
//! never propagated as failures.

mod path;
mod reindex;
mod state;
mod validate;

pub use path::{
    decode_schema_path, write_path_string, write_path_string_with_arrays, PathPart,
};
pub use reindex::re_index_schema_arrays;
pub use state::{ApplicationState, DiffElement, PluginVersion};
pub use validate::{
    invalid_root_states, invalid_state_indices, invalid_states, InvalidStateReport,
};
