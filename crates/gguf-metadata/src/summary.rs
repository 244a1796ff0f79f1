//! Well-known keys pulled out of decoded metadata.

use serde::{Deserialize, Serialize};

use crate::metadata::GGUFMetadata;
use crate::types::file_type_name;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub architecture: Option<String>,
    pub name: Option<String>,
    pub file_type: Option<u32>,
    pub file_type_name: Option<String>,
    pub context_length: Option<u32>,
    pub embedding_length: Option<u32>,
    pub chat_template: Option<String>,
    /// String values that were not valid UTF-8.
    pub opaque_strings: usize,
}

impl ModelSummary {
    pub fn from_metadata(md: &GGUFMetadata) -> Self {
        let text = |key: &str| md.get(key).and_then(|v| v.as_str()).map(String::from);

        let architecture = text("general.architecture");
        let file_type = md.get("general.file_type").and_then(|v| v.as_u32());

        // Per-architecture keys; llama is the de-facto default.
        let arch = architecture.as_deref().unwrap_or("llama");
        let per_arch = |suffix: &str| md.get(&format!("{arch}.{suffix}")).and_then(|v| v.as_u32());

        Self {
            name: text("general.name"),
            file_type,
            file_type_name: file_type.map(file_type_name).map(String::from),
            context_length: per_arch("context_length"),
            embedding_length: per_arch("embedding_length"),
            chat_template: text("tokenizer.chat_template"),
            opaque_strings: md.opaque_count(),
            architecture,
        }
    }
}
