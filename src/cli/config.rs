//! Config merge command implementation

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use crate::config::{init_config, ConfigSources, ConfigValue, CONFIG_FILENAME};

#[derive(Args)]
pub struct ConfigArgs {
    /// Path to a full pipeline config - overrides all other config
    #[arg(long, value_name = "PATH")]
    pub pipeline_config: Option<PathBuf>,

    /// Path to a model config fragment
    #[arg(long, value_name = "PATH")]
    pub model_config: Option<PathBuf>,

    /// Path to a train config fragment
    #[arg(long, value_name = "PATH")]
    pub train_config: Option<PathBuf>,

    /// Path to an eval config fragment
    #[arg(long, value_name = "PATH")]
    pub eval_config: Option<PathBuf>,

    /// Path to a dataset config fragment
    #[arg(long, value_name = "PATH")]
    pub dataset_config: Option<PathBuf>,

    /// Path to an extra config fragment applied over the full pipeline
    #[arg(long, value_name = "PATH")]
    pub extra_config: Option<PathBuf>,

    /// Train for this many steps (sets train_config.num_steps)
    #[arg(long, value_name = "N")]
    pub train_steps: Option<i64>,

    /// Evaluate this many examples (sets eval_config.num_examples)
    #[arg(long, value_name = "N")]
    pub eval_examples: Option<i64>,

    /// Set a config field by dotted path (repeatable, KEY=VALUE)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Directory searched for fragment files (repeatable)
    #[arg(long, value_name = "DIR")]
    pub search_path: Vec<PathBuf>,

    /// Where to write the generated config
    #[arg(short, long, value_name = "PATH", default_value = CONFIG_FILENAME)]
    pub output: PathBuf,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    let sources = ConfigSources {
        pipeline_config: args.pipeline_config,
        model: args.model_config,
        train: args.train_config,
        eval: args.eval_config,
        dataset: args.dataset_config,
        extra: args.extra_config,
        search_path: args.search_path,
    };

    let mut overrides: Vec<(String, ConfigValue)> = Vec::new();
    if let Some(steps) = args.train_steps {
        overrides.push(("train_config.num_steps".to_string(), ConfigValue::Int(steps)));
    }
    if let Some(examples) = args.eval_examples {
        overrides.push(("eval_config.num_examples".to_string(), ConfigValue::Int(examples)));
    }
    for assignment in &args.set {
        let Some((key, value)) = assignment.split_once('=') else {
            bail!("invalid --set '{}': expected KEY=VALUE", assignment);
        };
        overrides.push((key.to_string(), parse_scalar(value)));
    }

    let config_path = init_config(&sources, &overrides, &args.output)?;

    // The resolved path goes to stdout so wrapper scripts can consume it.
    println!("{}", config_path.display());
    Ok(())
}

/// `--set` values arrive untyped; infer the narrowest scalar, falling back
/// to a plain string.
fn parse_scalar(raw: &str) -> ConfigValue {
    match raw {
        "true" => return ConfigValue::Bool(true),
        "false" => return ConfigValue::Bool(false),
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return ConfigValue::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return ConfigValue::Float(f);
    }
    ConfigValue::Str(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalar_inference() {
        assert_eq!(parse_scalar("true"), ConfigValue::Bool(true));
        assert_eq!(parse_scalar("42"), ConfigValue::Int(42));
        assert_eq!(parse_scalar("0.001"), ConfigValue::Float(0.001));
        assert_eq!(parse_scalar("adam"), ConfigValue::Str("adam".to_string()));
    }
}
