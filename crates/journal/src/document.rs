//! Workspace document model
//!
//! A workspace is the editable project page: a business-model canvas, a short
//! description, and references to uploaded evidence. On disk it is edited as
//! pretty-printed JSON; in the store and journal it travels as bincode.

use crate::hash::ContentHash;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use ulid::Ulid;

/// Stable identity of a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(Ulid);

impl WorkspaceId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_bytes()
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Ulid::from_bytes(bytes))
    }
}

impl Default for WorkspaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WorkspaceId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let ulid = Ulid::from_string(s).with_context(|| format!("Invalid workspace id: {}", s))?;
        Ok(Self(ulid))
    }
}

/// The nine blocks of a business-model canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanvasBlock {
    KeyPartners,
    KeyActivities,
    KeyResources,
    ValuePropositions,
    CustomerRelationships,
    Channels,
    CustomerSegments,
    CostStructure,
    RevenueStreams,
}

impl CanvasBlock {
    pub const ALL: [CanvasBlock; 9] = [
        CanvasBlock::KeyPartners,
        CanvasBlock::KeyActivities,
        CanvasBlock::KeyResources,
        CanvasBlock::ValuePropositions,
        CanvasBlock::CustomerRelationships,
        CanvasBlock::Channels,
        CanvasBlock::CustomerSegments,
        CanvasBlock::CostStructure,
        CanvasBlock::RevenueStreams,
    ];

    /// Key used in the JSON file
    pub fn key(&self) -> &'static str {
        match self {
            CanvasBlock::KeyPartners => "key_partners",
            CanvasBlock::KeyActivities => "key_activities",
            CanvasBlock::KeyResources => "key_resources",
            CanvasBlock::ValuePropositions => "value_propositions",
            CanvasBlock::CustomerRelationships => "customer_relationships",
            CanvasBlock::Channels => "channels",
            CanvasBlock::CustomerSegments => "customer_segments",
            CanvasBlock::CostStructure => "cost_structure",
            CanvasBlock::RevenueStreams => "revenue_streams",
        }
    }

    /// Heading shown to people
    pub fn title(&self) -> &'static str {
        match self {
            CanvasBlock::KeyPartners => "Key Partners",
            CanvasBlock::KeyActivities => "Key Activities",
            CanvasBlock::KeyResources => "Key Resources",
            CanvasBlock::ValuePropositions => "Value Propositions",
            CanvasBlock::CustomerRelationships => "Customer Relationships",
            CanvasBlock::Channels => "Channels",
            CanvasBlock::CustomerSegments => "Customer Segments",
            CanvasBlock::CostStructure => "Cost Structure",
            CanvasBlock::RevenueStreams => "Revenue Streams",
        }
    }
}

impl FromStr for CanvasBlock {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        CanvasBlock::ALL
            .into_iter()
            .find(|block| block.key() == normalized)
            .with_context(|| format!("Unknown canvas block: {}", s))
    }
}

/// Kind of uploaded evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Document,
    Spreadsheet,
    Image,
    Link,
    Other,
}

/// Reference to a document or file backing a canvas claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRef {
    pub name: String,
    pub kind: EvidenceKind,
    pub uri: String,
}

/// The editable workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    pub id: WorkspaceId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub canvas: BTreeMap<CanvasBlock, String>,
    #[serde(default)]
    pub evidence: Vec<EvidenceRef>,
    #[serde(default)]
    pub published: bool,
}

impl WorkspaceDocument {
    /// Create an empty workspace with every canvas block present
    pub fn new(title: impl Into<String>) -> Self {
        let canvas = CanvasBlock::ALL
            .into_iter()
            .map(|block| (block, String::new()))
            .collect();

        Self {
            id: WorkspaceId::new(),
            title: title.into(),
            description: String::new(),
            canvas,
            evidence: Vec::new(),
            published: false,
        }
    }

    /// Load a workspace from its JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read(path)
            .with_context(|| format!("Failed to read workspace file {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Failed to parse workspace file {}", path.display()))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let document: Self = serde_json::from_slice(bytes)?;
        if document.title.trim().is_empty() {
            anyhow::bail!("Workspace title must not be empty");
        }
        Ok(document)
    }

    /// Write the workspace as pretty JSON (temp file + rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_pretty_json()?;
        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, json)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Hash of the canonical (compact JSON) encoding
    pub fn content_hash(&self) -> ContentHash {
        // Field order is fixed and the canvas is a BTreeMap, so the encoding is stable
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        ContentHash::of(&canonical)
    }

    /// Number of canvas blocks with content
    pub fn filled_blocks(&self) -> usize {
        self.canvas.values().filter(|text| !text.trim().is_empty()).count()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).context("Failed to encode workspace")
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).context("Failed to decode workspace")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_has_all_blocks() {
        let doc = WorkspaceDocument::new("Solar kiosks");
        assert_eq!(doc.canvas.len(), 9);
        assert_eq!(doc.filled_blocks(), 0);
        assert!(!doc.published);
    }

    #[test]
    fn test_json_file_roundtrip() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("workspace.json");

        let mut doc = WorkspaceDocument::new("Solar kiosks");
        doc.canvas
            .insert(CanvasBlock::ValuePropositions, "Cheap evening light".to_string());
        doc.evidence.push(EvidenceRef {
            name: "survey.pdf".to_string(),
            kind: EvidenceKind::Document,
            uri: "files/survey.pdf".to_string(),
        });
        doc.save(&path)?;

        let loaded = WorkspaceDocument::load(&path)?;
        assert_eq!(loaded, doc);
        assert!(!path.with_extension("json.tmp").exists());

        let raw = std::fs::read_to_string(&path)?;
        assert!(raw.contains("\"value_propositions\""));
        Ok(())
    }

    #[test]
    fn test_missing_optional_fields_default() -> Result<()> {
        let id = WorkspaceId::new();
        let json = format!(r#"{{"id":"{}","title":"Bare"}}"#, id);
        let doc = WorkspaceDocument::from_json(json.as_bytes())?;
        assert_eq!(doc.id, id);
        assert!(doc.canvas.is_empty());
        assert!(doc.evidence.is_empty());
        Ok(())
    }

    #[test]
    fn test_empty_title_rejected() {
        let id = WorkspaceId::new();
        let json = format!(r#"{{"id":"{}","title":"  "}}"#, id);
        assert!(WorkspaceDocument::from_json(json.as_bytes()).is_err());
    }

    #[test]
    fn test_content_hash_tracks_edits() {
        let mut doc = WorkspaceDocument::new("Hash me");
        let before = doc.content_hash();
        assert_eq!(before, doc.clone().content_hash());

        doc.canvas.insert(CanvasBlock::Channels, "Market stalls".to_string());
        assert_ne!(before, doc.content_hash());
    }

    #[test]
    fn test_canvas_block_parsing() -> Result<()> {
        assert_eq!("revenue-streams".parse::<CanvasBlock>()?, CanvasBlock::RevenueStreams);
        assert_eq!("Key Partners".parse::<CanvasBlock>()?, CanvasBlock::KeyPartners);
        assert!("pricing".parse::<CanvasBlock>().is_err());
        Ok(())
    }

    #[test]
    fn test_bincode_roundtrip() -> Result<()> {
        let mut doc = WorkspaceDocument::new("Binary");
        doc.published = true;
        let decoded = WorkspaceDocument::deserialize(&doc.serialize()?)?;
        assert_eq!(decoded, doc);
        Ok(())
    }
}
