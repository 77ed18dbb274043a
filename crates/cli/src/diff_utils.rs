//! Line-by-line diffs between two versions of a workspace

use journal::{CanvasBlock, EvidenceRef, WorkspaceDocument};
use owo_colors::OwoColorize;
use similar::{ChangeTag, TextDiff};

/// Generate a unified diff with colored output
///
/// Returns the colored hunks, or an empty string when the texts are equal
pub fn generate_unified_diff(old_text: &str, new_text: &str, context_lines: usize) -> String {
    let diff = TextDiff::from_lines(old_text, new_text);

    let mut output = String::new();

    for (hunk_idx, hunk) in diff
        .unified_diff()
        .context_radius(context_lines)
        .iter_hunks()
        .enumerate()
    {
        if hunk_idx > 0 {
            output.push('\n');
        }

        // Hunk header (e.g., @@ -12,7 +12,8 @@)
        let header = format!("{}", hunk.header());
        output.push_str(&format!("    {}\n", header.cyan()));

        for change in hunk.iter_changes() {
            let line: &str = change.value();

            match change.tag() {
                ChangeTag::Delete => {
                    output.push_str(&format!("    {}", format!("-{}", line).red()));
                }
                ChangeTag::Insert => {
                    output.push_str(&format!("    {}", format!("+{}", line).green()));
                }
                ChangeTag::Equal => {
                    output.push_str(&format!("    {}", format!(" {}", line).dimmed()));
                }
            }

            if !line.ends_with('\n') {
                output.push('\n');
            }
        }
    }

    output
}

/// One changed part of a workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    Title,
    Description,
    Block(CanvasBlock),
    Evidence,
    Published,
}

impl Section {
    pub fn heading(&self) -> String {
        match self {
            Section::Title => "Title".to_string(),
            Section::Description => "Description".to_string(),
            Section::Block(block) => block.title().to_string(),
            Section::Evidence => "Evidence".to_string(),
            Section::Published => "Published".to_string(),
        }
    }
}

/// Sections that differ between two versions, in document order
pub fn changed_sections(old: &WorkspaceDocument, new: &WorkspaceDocument) -> Vec<Section> {
    let mut sections = Vec::new();

    if old.title != new.title {
        sections.push(Section::Title);
    }
    if old.description != new.description {
        sections.push(Section::Description);
    }
    for block in CanvasBlock::ALL {
        if block_text(old, block) != block_text(new, block) {
            sections.push(Section::Block(block));
        }
    }
    if old.evidence != new.evidence {
        sections.push(Section::Evidence);
    }
    if old.published != new.published {
        sections.push(Section::Published);
    }

    sections
}

fn block_text(doc: &WorkspaceDocument, block: CanvasBlock) -> &str {
    doc.canvas.get(&block).map(String::as_str).unwrap_or("")
}

fn with_newline(text: &str) -> String {
    if text.is_empty() || text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{}\n", text)
    }
}

fn evidence_lines(evidence: &[EvidenceRef]) -> String {
    evidence
        .iter()
        .map(|e| format!("{} ({:?}) {}\n", e.name, e.kind, e.uri))
        .collect()
}

/// Render every changed section with its hunks
pub fn render_document_diff(
    old: &WorkspaceDocument,
    new: &WorkspaceDocument,
    context_lines: usize,
) -> String {
    let mut output = String::new();

    for section in changed_sections(old, new) {
        output.push_str(&format!("  {}\n", section.heading().bold()));

        let (before, after) = match &section {
            Section::Title => (with_newline(&old.title), with_newline(&new.title)),
            Section::Description => (
                with_newline(&old.description),
                with_newline(&new.description),
            ),
            Section::Block(block) => (
                with_newline(block_text(old, *block)),
                with_newline(block_text(new, *block)),
            ),
            Section::Evidence => (evidence_lines(&old.evidence), evidence_lines(&new.evidence)),
            Section::Published => (
                format!("{}\n", old.published),
                format!("{}\n", new.published),
            ),
        };

        output.push_str(&generate_unified_diff(&before, &after, context_lines));
        output.push('\n');
    }

    output
}
