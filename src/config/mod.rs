//! Pipeline configuration merging
//!
//! Builds one strongly-typed pipeline configuration from partial fragment
//! files and dotted-path argument overrides, with fixed source precedence
//! (model, train, eval, dataset, extra, then overrides).

mod apply;
mod error;
mod merge;
mod schema;
mod value;

pub use error::ConfigError;
pub use merge::{init_config, ConfigSources, CONFIG_FILENAME};
pub use schema::PipelineConfig;
pub use value::ConfigValue;
