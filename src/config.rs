//! YAML run configuration.
//!
//! Every field is optional; omitted fields take the comparator and report
//! defaults. Command-line flags are applied on top of a loaded file.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    align::PadSentinel,
    compare::{ComparatorConfig, DEFAULT_LOW_CONFIDENCE_THRESHOLD},
    error::ReconcileError,
    matcher::DEFAULT_SIMILARITY_CUTOFF,
    report::{HighlightPolarity, ReportLabels, ReportOptions},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    pub similarity_cutoff: f64,
    pub low_confidence_threshold: f64,
    pub pad_sentinel: PadSentinel,
    pub highlight_polarity: HighlightPolarity,
    pub keys: Vec<String>,
    pub labels: ReportLabels,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            similarity_cutoff: DEFAULT_SIMILARITY_CUTOFF,
            low_confidence_threshold: DEFAULT_LOW_CONFIDENCE_THRESHOLD,
            pad_sentinel: PadSentinel::default(),
            highlight_polarity: HighlightPolarity::default(),
            keys: Vec::new(),
            labels: ReportLabels::default(),
        }
    }
}

impl ReconcileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config: ReconcileConfig = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config file {path:?}"))?;
        config
            .validate()
            .with_context(|| format!("Validating config file {path:?}"))?;
        debug!("Loaded configuration from {path:?}: {config:?}");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconcileError> {
        self.comparator_config().validate()?;
        let labels = [
            ("left", &self.labels.left),
            ("right", &self.labels.right),
            ("agreement", &self.labels.agreement),
        ];
        for (which, label) in labels {
            if label.trim().is_empty() {
                return Err(ReconcileError::InvalidConfig(format!(
                    "{which} label cannot be empty"
                )));
            }
        }
        Ok(())
    }

    pub fn comparator_config(&self) -> ComparatorConfig {
        ComparatorConfig {
            similarity_cutoff: self.similarity_cutoff,
            low_confidence_threshold: self.low_confidence_threshold,
            pad_sentinel: self.pad_sentinel,
            keys: self.keys.clone(),
        }
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            polarity: self.highlight_polarity,
            labels: self.labels.clone(),
        }
    }
}
