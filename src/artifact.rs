//! Artifact extraction
//!
//! Finds the first complete `<artifact type="..." title="...">...</artifact>`
//! block in a finished response and splits it away from the chat text.
//!
//! The scan is explicit rather than regex-driven: find an opening marker,
//! parse its two attributes, then take the content up to the nearest closing
//! marker. A header that does not parse is skipped and the scan resumes one
//! byte later. Once a well-formed header is found, the nearest closing marker
//! ends the block; with no closing marker there is no artifact.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

const OPEN_PREFIX: &str = "<artifact type=\"";
const TITLE_ATTR: &str = " title=\"";
const CLOSE_MARKER: &str = "</artifact>";

/// Shown in chat where an extracted block used to be
pub const PLACEHOLDER: &str = "_(I've prepared a detailed resource for you in the side panel.)_";

/// Locale assigned to every extracted artifact
pub const DEFAULT_LOCALE: &str = "en";

/// What kind of resource an artifact is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Summary,
    Guide,
    Quiz,
    Analysis,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Summary => "summary",
            ArtifactKind::Guide => "guide",
            ArtifactKind::Quiz => "quiz",
            ArtifactKind::Analysis => "analysis",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown artifact kind: {}", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for ArtifactKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(ArtifactKind::Summary),
            "guide" => Ok(ArtifactKind::Guide),
            "quiz" => Ok(ArtifactKind::Quiz),
            "analysis" => Ok(ArtifactKind::Analysis),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// A structured resource displayed beside the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub kind: ArtifactKind,
    pub title: String,
    pub content: String,
    pub locale: String,
}

/// Result of a successful scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub kind: ArtifactKind,
    pub title: String,
    pub content: String,
    /// The input with the block replaced by [`PLACEHOLDER`]
    pub display_text: String,
}

impl Extraction {
    pub fn into_artifact(self, id: impl Into<String>) -> Artifact {
        Artifact {
            id: id.into(),
            kind: self.kind,
            title: self.title,
            content: self.content,
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

struct Header<'a> {
    kind: ArtifactKind,
    title: &'a str,
    /// Text right after the closing `>` of the opening marker
    rest: &'a str,
}

/// Extract the first complete artifact block, if any.
///
/// Pure and deterministic. `None` means the text should be shown verbatim.
pub fn extract(text: &str) -> Option<Extraction> {
    let Block {
        header,
        content,
        span,
    } = find_block(text)?;
    let display_text = format!(
        "{}{PLACEHOLDER}{}",
        text.get(..span.start)?,
        text.get(span.end..)?
    );

    Some(Extraction {
        kind: header.kind,
        title: header.title.to_string(),
        content: content.to_string(),
        display_text,
    })
}

struct Block<'a> {
    header: Header<'a>,
    content: &'a str,
    /// Byte range of the whole block, markers included
    span: Range<usize>,
}

fn find_block(text: &str) -> Option<Block<'_>> {
    let mut offset = 0;

    while let Some(found) = text.get(offset..)?.find(OPEN_PREFIX) {
        let start = offset + found;
        let after_prefix = text.get(start + OPEN_PREFIX.len()..)?;

        if let Some(header) = parse_header(after_prefix) {
            let (content, tail) = header.rest.split_once(CLOSE_MARKER)?;
            return Some(Block {
                content,
                span: start..text.len() - tail.len(),
                header,
            });
        }

        // '<' is one byte, so start + 1 is a char boundary
        offset = start + 1;
    }

    None
}

fn parse_header(s: &str) -> Option<Header<'_>> {
    let (kind, rest) = s.split_once('"')?;
    if kind.is_empty() {
        return None;
    }
    let kind = kind.parse().ok()?;

    let rest = rest.strip_prefix(TITLE_ATTR)?;
    let (title, rest) = rest.split_once('"')?;
    if title.is_empty() {
        return None;
    }

    let rest = rest.strip_prefix('>')?;
    Some(Header { kind, title, rest })
}
