//! Fragment merging with fixed precedence
//!
//! Sources merge in a fixed order (model, train, eval, dataset, extra, then
//! argument overrides), later sources overwriting earlier ones at the same
//! path. A full pipeline-config override short-circuits everything and is
//! handed back untouched.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::apply::{apply_entries, ApplyFields};
use crate::config::error::ConfigError;
use crate::config::schema::PipelineConfig;
use crate::config::value::ConfigValue;

/// Canonical output filename consumed by the framework wrappers.
pub const CONFIG_FILENAME: &str = "generated.config";

/// The named fragment sources of one merge invocation.
#[derive(Debug, Default, Clone)]
pub struct ConfigSources {
    /// Full pipeline configuration; overrides all other sources.
    pub pipeline_config: Option<PathBuf>,
    pub model: Option<PathBuf>,
    pub train: Option<PathBuf>,
    pub eval: Option<PathBuf>,
    pub dataset: Option<PathBuf>,
    pub extra: Option<PathBuf>,
    /// Directories searched when a fragment path does not resolve as given.
    pub search_path: Vec<PathBuf>,
}

impl ConfigSources {
    fn has_partials(&self) -> bool {
        self.model.is_some()
            || self.train.is_some()
            || self.eval.is_some()
            || self.dataset.is_some()
            || self.extra.is_some()
    }
}

/// Merge all sources and overrides into `output` and return the path the
/// caller should hand to the training framework. With a full pipeline
/// override this is the override path itself and nothing is written.
pub fn init_config(
    sources: &ConfigSources,
    overrides: &[(String, ConfigValue)],
    output: &Path,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = &sources.pipeline_config {
        if sources.has_partials() || !overrides.is_empty() {
            warn!("pipeline config specified, ignoring all other config options");
        }
        return Ok(path.clone());
    }

    let mut config = PipelineConfig::default();

    if let Some(src) = &sources.model {
        let entries = load_fragment(src, "model", &sources.search_path)?;
        let node = config.model.get_or_insert_with(Default::default);
        apply_entries(node, &entries, "model")?;
    }
    if let Some(src) = &sources.train {
        let entries = load_fragment(src, "train", &sources.search_path)?;
        let node = config.train_config.get_or_insert_with(Default::default);
        apply_entries(node, &entries, "train_config")?;
    }
    if let Some(src) = &sources.eval {
        let entries = load_fragment(src, "eval", &sources.search_path)?;
        let node = config.eval_config.get_or_insert_with(Default::default);
        apply_entries(node, &entries, "eval_config")?;
    }
    if let Some(src) = &sources.dataset {
        let entries = load_fragment(src, "dataset", &sources.search_path)?;
        apply_dataset_fragment(&mut config, &entries)?;
    }
    if let Some(src) = &sources.extra {
        let entries = load_fragment(src, "extra", &sources.search_path)?;
        apply_entries(&mut config, &entries, "")?;
    }

    for (path, value) in overrides {
        info!("applying argument {}={}", path, value);
        let doc = ConfigValue::from_dotted_path(path, value.clone());
        let ConfigValue::Mapping(entries) = doc else { unreachable!() };
        apply_entries(&mut config, &entries, "")?;
    }

    write_config(&config, output)?;
    Ok(output.to_path_buf())
}

/// Dataset fragments are not a plain subtree: `num_classes` lands in the
/// active detector variant, and the reader/eval subtrees project into their
/// pipeline counterparts. Keys used only by the dataset tooling itself are
/// left alone.
fn apply_dataset_fragment(
    config: &mut PipelineConfig,
    entries: &[(String, ConfigValue)],
) -> Result<(), ConfigError> {
    for (name, value) in entries {
        match name.as_str() {
            "num_classes" => apply_num_classes(config, value)?,
            "eval_config" | "train_input_reader" | "eval_input_reader" => {
                config.apply_field(name, value, "")?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn apply_num_classes(config: &mut PipelineConfig, value: &ConfigValue) -> Result<(), ConfigError> {
    let ConfigValue::Int(num_classes) = value else {
        return Err(ConfigError::assign("", "num_classes", "integer", value.to_string()));
    };
    let model = config.model.as_mut().ok_or_else(|| {
        ConfigError::Invalid("num_classes requires a model config with a detector variant".to_string())
    })?;
    if let Some(ssd) = model.ssd.as_mut() {
        ssd.num_classes = Some(*num_classes);
    } else if let Some(faster_rcnn) = model.faster_rcnn.as_mut() {
        faster_rcnn.num_classes = Some(*num_classes);
    } else {
        return Err(ConfigError::Invalid(
            "num_classes requires model.ssd or model.faster_rcnn to be set".to_string(),
        ));
    }
    Ok(())
}

/// Resolve a fragment path as given or against the configured search
/// directories. The existence check runs once, up front.
pub(crate) fn find_file(src: &Path, search_path: &[PathBuf]) -> Option<PathBuf> {
    if src.exists() {
        return Some(src.to_path_buf());
    }
    for dir in search_path {
        let candidate = dir.join(src);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

fn load_fragment(
    src: &Path,
    desc: &str,
    search_path: &[PathBuf],
) -> Result<Vec<(String, ConfigValue)>, ConfigError> {
    let resolved = find_file(src, search_path)
        .ok_or_else(|| ConfigError::NotFound(src.display().to_string()))?;
    info!("using {} config {}", desc, resolved.display());

    let content = fs::read_to_string(&resolved).map_err(|source| ConfigError::Read {
        path: resolved.clone(),
        source,
    })?;

    let ext = resolved.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    let value = match ext.as_str() {
        "json" => {
            let raw: serde_json::Value =
                serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                    path: resolved.clone(),
                    message: e.to_string(),
                })?;
            ConfigValue::from_json(raw, &resolved)?
        }
        "toml" => {
            let raw: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: resolved.clone(),
                message: e.to_string(),
            })?;
            ConfigValue::from_toml(raw, &resolved)?
        }
        // Fragments default to YAML, extension or not.
        _ => {
            let raw: serde_yaml::Value =
                serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
                    path: resolved.clone(),
                    message: e.to_string(),
                })?;
            ConfigValue::from_yaml(raw, &resolved)?
        }
    };

    match value {
        ConfigValue::Mapping(entries) => Ok(entries),
        other => Err(ConfigError::TopLevel {
            path: resolved,
            found: other.type_name(),
        }),
    }
}

/// Serialize fully in memory, then write once. A failed merge never leaves
/// a partial output file behind.
fn write_config(config: &PipelineConfig, output: &Path) -> Result<(), ConfigError> {
    let body = serde_yaml::to_string(config)
        .map_err(|e| ConfigError::Invalid(format!("serializing config: {}", e)))?;
    fs::write(output, body).map_err(|source| ConfigError::Write {
        path: output.to_path_buf(),
        source,
    })
}
