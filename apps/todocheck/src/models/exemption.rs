//! Exemption file schema.
//!
//! Mirrors the protobuf message shape used by the text format:
//! a repeated `todo_open_exemption` of `{ exempted_file_path, line_number* }`.
//! The same shape is accepted from JSON, TOML and YAML files, and from the
//! binary protobuf encoding through the `Pb*` mirrors.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
/// Root of an exemption file.
pub struct ExemptionFile {
    #[serde(default)]
    pub todo_open_exemption: Vec<ExemptionRecord>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
/// Exempted lines for one file. Line order is irrelevant and duplicates are
/// harmless.
pub struct ExemptionRecord {
    pub exempted_file_path: String,
    #[serde(default)]
    pub line_number: Vec<u32>,
}

/// Binary wire form of [`ExemptionFile`] (`.pb`).
#[derive(Clone, PartialEq, prost::Message)]
pub struct PbExemptionFile {
    #[prost(message, repeated, tag = "1")]
    pub todo_open_exemption: Vec<PbExemptionRecord>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PbExemptionRecord {
    #[prost(string, tag = "1")]
    pub exempted_file_path: String,
    #[prost(uint32, repeated, tag = "2")]
    pub line_number: Vec<u32>,
}

impl From<PbExemptionFile> for ExemptionFile {
    fn from(pb: PbExemptionFile) -> Self {
        Self {
            todo_open_exemption: pb
                .todo_open_exemption
                .into_iter()
                .map(|r| ExemptionRecord {
                    exempted_file_path: r.exempted_file_path,
                    line_number: r.line_number,
                })
                .collect(),
        }
    }
}

impl From<&ExemptionFile> for PbExemptionFile {
    fn from(file: &ExemptionFile) -> Self {
        Self {
            todo_open_exemption: file
                .todo_open_exemption
                .iter()
                .map(|r| PbExemptionRecord {
                    exempted_file_path: r.exempted_file_path.clone(),
                    line_number: r.line_number.clone(),
                })
                .collect(),
        }
    }
}
