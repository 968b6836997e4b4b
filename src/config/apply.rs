//! Projection of fragment documents onto the typed schema
//!
//! Each schema message implements [`ApplyFields`] with one match arm per
//! named field, routing values through explicit per-type setters. Dispatch
//! is over the tagged [`ConfigValue`] representation, so every supported
//! assignment is spelled out here and an unknown key or mismatched type
//! fails the merge instead of being dropped.
//!
//! A reflective message backend would need an assign-then-readback guard
//! here to catch float precision loss during assignment. Native typed
//! fields store values verbatim, so no readback is performed.

use std::str::FromStr;

use crate::config::error::{join_path, ConfigError};
use crate::config::schema::{
    AugmentationConfig, DetectorConfig, EvalConfig, FeatureExtractorConfig, ImageResizerConfig,
    InputReaderConfig, MetricsSet, ModelConfig, OptimizerConfig, OptimizerType, PipelineConfig,
    TrainConfig,
};
use crate::config::value::ConfigValue;

/// A schema node that accepts named field assignments.
pub(crate) trait ApplyFields: Default {
    fn apply_field(&mut self, name: &str, value: &ConfigValue, path: &str) -> Result<(), ConfigError>;
}

/// Apply every entry of a mapping to a schema node.
pub(crate) fn apply_entries<T: ApplyFields>(
    target: &mut T,
    entries: &[(String, ConfigValue)],
    path: &str,
) -> Result<(), ConfigError> {
    for (name, value) in entries {
        target.apply_field(name, value, path)?;
    }
    Ok(())
}

fn set_i64(slot: &mut Option<i64>, value: &ConfigValue, path: &str, name: &str) -> Result<(), ConfigError> {
    match value {
        ConfigValue::Int(i) => {
            *slot = Some(*i);
            Ok(())
        }
        other => Err(ConfigError::assign(path, name, "integer", other.to_string())),
    }
}

fn set_f64(slot: &mut Option<f64>, value: &ConfigValue, path: &str, name: &str) -> Result<(), ConfigError> {
    match value {
        ConfigValue::Float(x) => {
            *slot = Some(*x);
            Ok(())
        }
        // YAML writes 1.0 as 1; accept integers on float fields.
        ConfigValue::Int(i) => {
            *slot = Some(*i as f64);
            Ok(())
        }
        other => Err(ConfigError::assign(path, name, "float", other.to_string())),
    }
}

fn set_bool(slot: &mut Option<bool>, value: &ConfigValue, path: &str, name: &str) -> Result<(), ConfigError> {
    match value {
        ConfigValue::Bool(b) => {
            *slot = Some(*b);
            Ok(())
        }
        other => Err(ConfigError::assign(path, name, "bool", other.to_string())),
    }
}

fn set_string(slot: &mut Option<String>, value: &ConfigValue, path: &str, name: &str) -> Result<(), ConfigError> {
    match value {
        ConfigValue::Str(s) => {
            *slot = Some(s.clone());
            Ok(())
        }
        other => Err(ConfigError::assign(path, name, "string", other.to_string())),
    }
}

/// Enum fields take the member's symbolic name, mirroring the original's
/// retry-as-enum fallback for scalar assignment.
fn set_enum<E: FromStr>(
    slot: &mut Option<E>,
    value: &ConfigValue,
    path: &str,
    name: &str,
) -> Result<(), ConfigError> {
    let ConfigValue::Str(s) = value else {
        return Err(ConfigError::assign(path, name, "enum name", value.to_string()));
    };
    match E::from_str(s) {
        Ok(member) => {
            *slot = Some(member);
            Ok(())
        }
        Err(_) => Err(ConfigError::assign(path, name, "enum name", s.clone())),
    }
}

/// Recurse into a nested message, creating it if absent. Touching the slot
/// makes an empty-but-present message explicit, so `eval_config: {}` in a
/// fragment survives into the serialized output.
fn set_message<T: ApplyFields>(
    slot: &mut Option<T>,
    value: &ConfigValue,
    path: &str,
    name: &str,
) -> Result<(), ConfigError> {
    let ConfigValue::Mapping(entries) = value else {
        return Err(ConfigError::assign(path, name, "mapping", value.to_string()));
    };
    let node = slot.get_or_insert_with(T::default);
    apply_entries(node, entries, &join_path(path, name))
}

/// Append sequence elements to a repeated message field; each element must
/// itself be a mapping and becomes a freshly appended child.
fn append_messages<T: ApplyFields>(
    target: &mut Vec<T>,
    value: &ConfigValue,
    path: &str,
    name: &str,
) -> Result<(), ConfigError> {
    let ConfigValue::Sequence(items) = value else {
        return Err(ConfigError::assign(path, name, "sequence", value.to_string()));
    };
    for item in items {
        let ConfigValue::Mapping(entries) = item else {
            return Err(ConfigError::assign(path, name, "mapping element", item.to_string()));
        };
        let mut child = T::default();
        apply_entries(&mut child, entries, &join_path(path, name))?;
        target.push(child);
    }
    Ok(())
}

/// Append sequence elements to a repeated string field.
fn append_strings(
    target: &mut Vec<String>,
    value: &ConfigValue,
    path: &str,
    name: &str,
) -> Result<(), ConfigError> {
    let ConfigValue::Sequence(items) = value else {
        return Err(ConfigError::assign(path, name, "sequence", value.to_string()));
    };
    for item in items {
        let ConfigValue::Str(s) = item else {
            return Err(ConfigError::assign(path, name, "string element", item.to_string()));
        };
        target.push(s.clone());
    }
    Ok(())
}

impl ApplyFields for PipelineConfig {
    fn apply_field(&mut self, name: &str, value: &ConfigValue, path: &str) -> Result<(), ConfigError> {
        match name {
            "model" => set_message(&mut self.model, value, path, name),
            "train_config" => set_message(&mut self.train_config, value, path, name),
            "eval_config" => set_message(&mut self.eval_config, value, path, name),
            "train_input_reader" => set_message(&mut self.train_input_reader, value, path, name),
            "eval_input_reader" => set_message(&mut self.eval_input_reader, value, path, name),
            _ => Err(ConfigError::unknown_field(path, name)),
        }
    }
}

impl ApplyFields for ModelConfig {
    fn apply_field(&mut self, name: &str, value: &ConfigValue, path: &str) -> Result<(), ConfigError> {
        match name {
            "ssd" => set_message(&mut self.ssd, value, path, name),
            "faster_rcnn" => set_message(&mut self.faster_rcnn, value, path, name),
            _ => Err(ConfigError::unknown_field(path, name)),
        }
    }
}

impl ApplyFields for DetectorConfig {
    fn apply_field(&mut self, name: &str, value: &ConfigValue, path: &str) -> Result<(), ConfigError> {
        match name {
            "num_classes" => set_i64(&mut self.num_classes, value, path, name),
            "feature_extractor" => set_message(&mut self.feature_extractor, value, path, name),
            "image_resizer" => set_message(&mut self.image_resizer, value, path, name),
            _ => Err(ConfigError::unknown_field(path, name)),
        }
    }
}

impl ApplyFields for FeatureExtractorConfig {
    fn apply_field(&mut self, name: &str, value: &ConfigValue, path: &str) -> Result<(), ConfigError> {
        match name {
            "type" => set_string(&mut self.kind, value, path, name),
            "depth_multiplier" => set_f64(&mut self.depth_multiplier, value, path, name),
            "min_depth" => set_i64(&mut self.min_depth, value, path, name),
            _ => Err(ConfigError::unknown_field(path, name)),
        }
    }
}

impl ApplyFields for ImageResizerConfig {
    fn apply_field(&mut self, name: &str, value: &ConfigValue, path: &str) -> Result<(), ConfigError> {
        match name {
            "min_dimension" => set_i64(&mut self.min_dimension, value, path, name),
            "max_dimension" => set_i64(&mut self.max_dimension, value, path, name),
            "keep_aspect_ratio" => set_bool(&mut self.keep_aspect_ratio, value, path, name),
            _ => Err(ConfigError::unknown_field(path, name)),
        }
    }
}

impl ApplyFields for TrainConfig {
    fn apply_field(&mut self, name: &str, value: &ConfigValue, path: &str) -> Result<(), ConfigError> {
        match name {
            "batch_size" => set_i64(&mut self.batch_size, value, path, name),
            "num_steps" => set_i64(&mut self.num_steps, value, path, name),
            "fine_tune_checkpoint" => set_string(&mut self.fine_tune_checkpoint, value, path, name),
            "from_detection_checkpoint" => {
                set_bool(&mut self.from_detection_checkpoint, value, path, name)
            }
            "optimizer" => set_message(&mut self.optimizer, value, path, name),
            "data_augmentation_options" => {
                append_messages(&mut self.data_augmentation_options, value, path, name)
            }
            _ => Err(ConfigError::unknown_field(path, name)),
        }
    }
}

impl ApplyFields for OptimizerConfig {
    fn apply_field(&mut self, name: &str, value: &ConfigValue, path: &str) -> Result<(), ConfigError> {
        match name {
            "type" => set_enum::<OptimizerType>(&mut self.kind, value, path, name),
            "learning_rate" => set_f64(&mut self.learning_rate, value, path, name),
            "momentum" => set_f64(&mut self.momentum, value, path, name),
            _ => Err(ConfigError::unknown_field(path, name)),
        }
    }
}

impl ApplyFields for AugmentationConfig {
    fn apply_field(&mut self, name: &str, value: &ConfigValue, path: &str) -> Result<(), ConfigError> {
        match name {
            "operation" => set_string(&mut self.operation, value, path, name),
            "probability" => set_f64(&mut self.probability, value, path, name),
            "max_delta" => set_f64(&mut self.max_delta, value, path, name),
            _ => Err(ConfigError::unknown_field(path, name)),
        }
    }
}

impl ApplyFields for EvalConfig {
    fn apply_field(&mut self, name: &str, value: &ConfigValue, path: &str) -> Result<(), ConfigError> {
        match name {
            "num_examples" => set_i64(&mut self.num_examples, value, path, name),
            "metrics_set" => set_enum::<MetricsSet>(&mut self.metrics_set, value, path, name),
            "num_visualizations" => set_i64(&mut self.num_visualizations, value, path, name),
            "eval_interval_secs" => set_i64(&mut self.eval_interval_secs, value, path, name),
            "include_metrics_per_category" => {
                set_bool(&mut self.include_metrics_per_category, value, path, name)
            }
            _ => Err(ConfigError::unknown_field(path, name)),
        }
    }
}

impl ApplyFields for InputReaderConfig {
    fn apply_field(&mut self, name: &str, value: &ConfigValue, path: &str) -> Result<(), ConfigError> {
        match name {
            "input_path" => append_strings(&mut self.input_path, value, path, name),
            "label_map_path" => set_string(&mut self.label_map_path, value, path, name),
            "shuffle" => set_bool(&mut self.shuffle, value, path, name),
            "num_readers" => set_i64(&mut self.num_readers, value, path, name),
            _ => Err(ConfigError::unknown_field(path, name)),
        }
    }
}
