//! Typed pipeline configuration schema
//!
//! The merged configuration is a plain typed tree, not a reflective message:
//! nested messages are `Option<T>` so an empty-but-present message (touched
//! by a fragment) is distinguishable from an absent one, and repeated fields
//! are `Vec<T>`. Serialization skips unset fields, producing a canonical
//! document containing only what the sources actually configured.

use std::str::FromStr;

use serde::Serialize;

/// Root of the merged training/eval pipeline configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub train_config: Option<TrainConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_config: Option<EvalConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub train_input_reader: Option<InputReaderConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_input_reader: Option<InputReaderConfig>,
}

/// Model selection: exactly one detector variant is expected to be set.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ModelConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssd: Option<DetectorConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faster_rcnn: Option<DetectorConfig>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DetectorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_classes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_extractor: Option<FeatureExtractorConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_resizer: Option<ImageResizerConfig>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct FeatureExtractorConfig {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_multiplier: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_depth: Option<i64>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ImageResizerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_dimension: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dimension: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_aspect_ratio: Option<bool>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct TrainConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_steps: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fine_tune_checkpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_detection_checkpoint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimizer: Option<OptimizerConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_augmentation_options: Vec<AugmentationConfig>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct OptimizerConfig {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<OptimizerType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub momentum: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerType {
    Sgd,
    Momentum,
    Adam,
    RmsProp,
}

impl FromStr for OptimizerType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sgd" => Ok(OptimizerType::Sgd),
            "momentum" => Ok(OptimizerType::Momentum),
            "adam" => Ok(OptimizerType::Adam),
            "rms_prop" => Ok(OptimizerType::RmsProp),
            _ => Err(()),
        }
    }
}

/// One entry of the repeated `data_augmentation_options` field.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct AugmentationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delta: Option<f64>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct EvalConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_examples: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_set: Option<MetricsSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_visualizations: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_interval_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_metrics_per_category: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsSet {
    PascalVocMetrics,
    CocoDetectionMetrics,
    OpenImagesMetrics,
}

impl FromStr for MetricsSet {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pascal_voc_metrics" => Ok(MetricsSet::PascalVocMetrics),
            "coco_detection_metrics" => Ok(MetricsSet::CocoDetectionMetrics),
            "open_images_metrics" => Ok(MetricsSet::OpenImagesMetrics),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct InputReaderConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub input_path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_map_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shuffle: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_readers: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_fields_are_skipped_in_output() {
        let config = PipelineConfig {
            train_config: Some(TrainConfig {
                batch_size: Some(32),
                ..Default::default()
            }),
            ..Default::default()
        };
        let text = serde_yaml::to_string(&config).expect("serialize");
        assert!(text.contains("batch_size: 32"));
        assert!(!text.contains("model"));
        assert!(!text.contains("num_steps"));
    }

    #[test]
    fn test_touched_empty_message_serializes_as_present() {
        // A fragment that mentions a nested message, even with no fields,
        // must leave a visible trace in the output.
        let config = PipelineConfig {
            eval_config: Some(EvalConfig::default()),
            ..Default::default()
        };
        let text = serde_yaml::to_string(&config).expect("serialize");
        assert!(text.contains("eval_config"));
    }

    #[test]
    fn test_enum_serializes_snake_case() {
        let config = EvalConfig {
            metrics_set: Some(MetricsSet::CocoDetectionMetrics),
            ..Default::default()
        };
        let text = serde_yaml::to_string(&config).expect("serialize");
        assert!(text.contains("metrics_set: coco_detection_metrics"));
    }

    #[test]
    fn test_optimizer_type_from_symbolic_name() {
        assert_eq!("rms_prop".parse::<OptimizerType>(), Ok(OptimizerType::RmsProp));
        assert!("rmsprop".parse::<OptimizerType>().is_err());
    }
}
