//! Core data types shared by the partitioner, the pool executors and the aggregator.

use serde::{Deserialize, Serialize};

use crate::error::PartitionFailure;
use crate::parallel::Strategy;

/// Per-page metadata travelling with the page payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Whether the page needs OCR rather than embedded text
    #[serde(default)]
    pub ocr: bool,

    /// Document language hint (e.g. "en", "ch")
    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_lang() -> String {
    "en".to_string()
}

impl Default for PageMeta {
    fn default() -> Self {
        Self {
            ocr: false,
            lang: default_lang(),
        }
    }
}

/// One page's processing input. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Zero-based page number within the source document
    pub page_no: usize,

    /// Opaque page payload, usually an encoded page image. Base64 on the wire.
    #[serde(default, with = "base64_payload")]
    pub payload: Vec<u8>,

    #[serde(default)]
    pub meta: PageMeta,
}

impl WorkItem {
    pub fn new(page_no: usize, payload: Vec<u8>, meta: PageMeta) -> Self {
        Self {
            page_no,
            payload,
            meta,
        }
    }
}

mod base64_payload {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(payload))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// One page result record produced by an analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub page_no: usize,

    /// Analyzer-defined content (layout detections, spans, ...)
    pub data: serde_json::Value,
}

/// Processing flags active for a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingFlags {
    #[serde(default)]
    pub formula_enable: bool,
    #[serde(default)]
    pub table_enable: bool,
}

impl ProcessingFlags {
    pub fn new(formula_enable: bool, table_enable: bool) -> Self {
        Self {
            formula_enable,
            table_enable,
        }
    }
}

/// A contiguous, indexed slice of the run's work items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Position of this partition in the partitioner's output
    pub index: usize,
    pub items: Vec<WorkItem>,
    pub flags: ProcessingFlags,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Outcome of invoking one partition, uniform across execution backends
pub type PartitionOutcome = std::result::Result<Vec<PageResult>, PartitionFailure>;

/// Final ordered output of one run
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    /// Page results of every successful partition, in input order
    pub pages: Vec<PageResult>,

    /// Strategy the run executed with
    pub strategy: Strategy,

    /// Number of partitions dispatched
    pub partition_count: usize,

    /// Indices of partitions that contributed nothing, sorted
    pub failed_partitions: Vec<usize>,
}

impl AggregateResult {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// True when every dispatched partition succeeded
    pub fn is_complete(&self) -> bool {
        self.failed_partitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_is_base64_on_the_wire() {
        let item = WorkItem::new(3, vec![0xff, 0x00, 0x10], PageMeta::default());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["payload"], "/wAQ");

        let back: WorkItem = serde_json::from_value(json).unwrap();
        assert_eq!(back.payload, vec![0xff, 0x00, 0x10]);
    }

    #[test]
    fn test_payload_defaults_empty_and_rejects_garbage() {
        let item: WorkItem = serde_json::from_str(r#"{"page_no":1}"#).unwrap();
        assert!(item.payload.is_empty());

        assert!(serde_json::from_str::<WorkItem>(r#"{"page_no":1,"payload":"not base64!"}"#).is_err());
    }
}
