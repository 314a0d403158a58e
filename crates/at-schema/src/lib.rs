//! Component traits (Input/Filter/Batcher/Transformer/Validator/Command),
//! the `Repo`/`ChangeTarget` seam, built-in components, and the Schema value
//! type + Schema Map resolver. See `crate::traits` for why `Repo` lives here
//! rather than in `at-repo`.

pub mod builtin;
pub mod error;
pub mod factories;
pub mod schema;
pub mod schema_config;
pub mod schema_map;
pub mod traits;

pub use error::{SchemaError, SchemaReason, SchemaResult};
pub use factories::{factories, Factories};
pub use schema::{Schema, SchemaPipelineContext};
pub use schema_config::SchemaConfig;
pub use schema_map::{SchemaBuilder, SchemaMap, SchemaMapEntry, SchemaSourceType};
pub use traits::{
    Batcher, ChangeTarget, Command, Filter, FilterEntry, Input, PipelineContext, Repo, Transformer,
    Validator,
};
