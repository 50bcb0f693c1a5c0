//! Heartbeat record decoding.
//!
//! `heartbeat.json` carries the list of produced output files as a JSON
//! document encoded inside the `xml` string field. Decoding happens in two
//! explicit stages and neither stage is allowed to fail the run: a broken
//! envelope is an error value, a broken manifest is [`ManifestDecode::Absent`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Failure to decode the outer heartbeat envelope.
#[derive(Error, Debug)]
pub enum HeartbeatError {
    #[error("heartbeat is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why no manifest could be recovered from the `xml` field.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("no xml field in heartbeat")]
    MissingXmlField,

    #[error("xml field is not a string")]
    XmlNotString,

    #[error("xml field is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("xml field is neither a list of file names nor an object keyed by file name")]
    UnexpectedShape,
}

/// Outer heartbeat envelope. Only the `xml` field is consumed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeartbeatRecord {
    #[serde(default)]
    pub xml: Option<Value>,
}

/// Result of decoding the nested manifest.
#[derive(Debug)]
pub enum ManifestDecode {
    Decoded(OutputManifest),
    Absent(ManifestError),
}

/// Ordered list of output file names reported by the job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputManifest {
    pub files: Vec<String>,
}

impl HeartbeatRecord {
    /// Stage one: decode the raw entry bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HeartbeatError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Stage two: decode the `xml` field into file names.
    ///
    /// The pilot writes either a JSON list of names or a JSON object keyed by
    /// output file name; for an object the keys are the names, in document
    /// order.
    pub fn manifest(&self) -> ManifestDecode {
        match self.decode_manifest() {
            Ok(manifest) => ManifestDecode::Decoded(manifest),
            Err(cause) => ManifestDecode::Absent(cause),
        }
    }

    fn decode_manifest(&self) -> Result<OutputManifest, ManifestError> {
        let encoded = match &self.xml {
            None | Some(Value::Null) => return Err(ManifestError::MissingXmlField),
            Some(Value::String(s)) => s,
            Some(_) => return Err(ManifestError::XmlNotString),
        };

        let files = match serde_json::from_str::<Value>(encoded)? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(name) => Ok(name),
                    _ => Err(ManifestError::UnexpectedShape),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Value::Object(outputs) => outputs.into_iter().map(|(name, _)| name).collect(),
            _ => return Err(ManifestError::UnexpectedShape),
        };
        Ok(OutputManifest { files })
    }
}

impl OutputManifest {
    /// First file whose name matches `pattern`.
    pub fn find_matching(&self, pattern: &Regex) -> Option<&str> {
        self.files
            .iter()
            .map(String::as_str)
            .find(|name| pattern.is_match(name))
    }
}
