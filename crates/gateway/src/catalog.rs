//! Model catalog
//!
//! Static registry of named text-generation endpoints. Loaded once at startup
//! and read-only afterwards.

use cinemate_common::error::{CinemateError, Result};
use cinemate_common::ModelEntry;
use serde::Serialize;
use std::collections::HashSet;

const HOSTED_INFERENCE_BASE: &str = "https://api-inference.huggingface.co/models";

/// Built-in catalog: display name and hosted repository id
const BUILTIN_MODELS: &[(&str, &str)] = &[
    ("GPT-2", "gpt2"),
    ("DistilGPT-2", "distilgpt2"),
    ("GPT-2 Medium", "gpt2-medium"),
    ("GPT-2 Large", "gpt2-large"),
    ("GPT-Neo 125M", "EleutherAI/gpt-neo-125m"),
    ("GPT-Neo 1.3B", "EleutherAI/gpt-neo-1.3B"),
    ("GPT-Neo 2.7B", "EleutherAI/gpt-neo-2.7B"),
    ("GPT-J 6B", "EleutherAI/gpt-j-6b"),
    ("BLOOM 560M", "bigscience/bloom-560m"),
    ("BLOOM 1B1", "bigscience/bloom-1b1"),
    ("BLOOMZ 560M", "bigscience/bloomz-560m"),
    ("OPT 125M", "facebook/opt-125m"),
    ("OPT 350M", "facebook/opt-350m"),
    ("OPT 1.3B", "facebook/opt-1.3b"),
    ("DialoGPT Small", "microsoft/DialoGPT-small"),
    ("DialoGPT Medium", "microsoft/DialoGPT-medium"),
    ("DialoGPT Large", "microsoft/DialoGPT-large"),
    ("Flan-T5 Base", "google/flan-t5-base"),
    ("Flan-T5 Large", "google/flan-t5-large"),
    ("Falcon 7B Instruct", "tiiuae/falcon-7b-instruct"),
    ("Mistral 7B Instruct", "mistralai/Mistral-7B-Instruct-v0.2"),
];

/// A named inference endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDescriptor {
    /// Unique, human-readable name
    pub name: String,

    /// Fully-qualified HTTP(S) endpoint
    pub endpoint_url: String,
}

impl From<ModelEntry> for ModelDescriptor {
    fn from(entry: ModelEntry) -> Self {
        Self {
            name: entry.name,
            endpoint_url: entry.endpoint_url,
        }
    }
}

/// Immutable set of model descriptors with unique names
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<ModelDescriptor>,
}

impl ModelCatalog {
    /// The built-in hosted model catalog
    pub fn builtin() -> Self {
        let models = BUILTIN_MODELS
            .iter()
            .map(|(name, repo)| ModelDescriptor {
                name: name.to_string(),
                endpoint_url: format!("{}/{}", HOSTED_INFERENCE_BASE, repo),
            })
            .collect();

        Self { models }
    }

    /// Build a catalog from explicit descriptors
    pub fn from_descriptors(models: Vec<ModelDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();

        for model in &models {
            if model.name.is_empty() {
                return Err(CinemateError::config("Model name must not be empty"));
            }
            if !seen.insert(model.name.as_str()) {
                return Err(CinemateError::config(format!(
                    "Duplicate model name in catalog: {}",
                    model.name
                )));
            }
            if !model.endpoint_url.starts_with("http://")
                && !model.endpoint_url.starts_with("https://")
            {
                return Err(CinemateError::config(format!(
                    "Model {} has invalid endpoint URL: {}",
                    model.name, model.endpoint_url
                )));
            }
        }

        Ok(Self { models })
    }

    /// Configured entries, or the built-in catalog when none are given
    pub fn from_entries(entries: &[ModelEntry]) -> Result<Self> {
        if entries.is_empty() {
            return Ok(Self::builtin());
        }
        Self::from_descriptors(entries.iter().cloned().map(ModelDescriptor::from).collect())
    }

    /// Exact, case-sensitive lookup by name
    pub fn resolve(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Fail unless `name` is a catalog entry
    pub fn check_default(&self, name: &str) -> Result<()> {
        if self.resolve(name).is_none() {
            return Err(CinemateError::config(format!(
                "Default model {} is not in the catalog",
                name
            )));
        }
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
