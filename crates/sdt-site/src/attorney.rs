//! Attorney records and the built-in roster.

use crate::breakpoint::Breakpoint;
use crate::result::{SiteError, SiteResult};
use crate::resolver::id_selector;
use serde::{Deserialize, Serialize};

const BUILTIN: &str = include_str!("../data/attorneys.json");

/// Image-crop insets in percent of the source image
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Inset {
    /// Top inset
    pub top: f64,
    /// Right inset
    pub right: f64,
    /// Bottom inset
    pub bottom: f64,
    /// Left inset
    pub left: f64,
}

impl Inset {
    /// CSS `inset(...)` clip value
    #[must_use]
    pub fn to_css(&self) -> String {
        format!(
            "inset({}% {}% {}% {}%)",
            self.top, self.right, self.bottom, self.left
        )
    }
}

/// Per-breakpoint portrait crops
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Crops {
    /// Phone crop
    pub phone: Inset,
    /// Tablet crop
    pub tablet: Inset,
    /// Desktop crop
    pub desktop: Inset,
}

impl Crops {
    /// Crop for `breakpoint`
    #[must_use]
    pub const fn for_breakpoint(&self, breakpoint: Breakpoint) -> Inset {
        match breakpoint {
            Breakpoint::Phone => self.phone,
            Breakpoint::Tablet => self.tablet,
            Breakpoint::Desktop => self.desktop,
        }
    }
}

/// One attorney's card and bio content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttorneyRecord {
    /// Card container id in the export markup (stable key)
    pub id: String,
    /// Card container id in the semantic markup
    pub semantic_id: String,
    /// Display name
    pub name: String,
    /// First name, used in scene names
    pub short_name: String,
    /// Position
    pub title: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// Portrait path
    pub image: String,
    /// Portrait crops
    #[serde(default)]
    pub crops: Crops,
    /// Biography; paragraphs separated by blank lines
    pub bio: String,
}

impl AttorneyRecord {
    /// Biography split on blank-line boundaries, trimmed, empties dropped
    #[must_use]
    pub fn paragraphs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut start = 0;
        let bytes = self.bio.as_str();
        let mut rest = bytes;
        while let Some(pos) = find_blank_line(rest) {
            out.push(&bytes[start..start + pos.0]);
            start += pos.1;
            rest = &bytes[start..];
        }
        out.push(&bytes[start..]);
        out.into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }

    /// `mailto:` link
    #[must_use]
    pub fn mailto(&self) -> String {
        format!("mailto:{}", self.email)
    }

    /// `tel:` link with digits only
    #[must_use]
    pub fn tel(&self) -> String {
        let digits: String = self
            .phone
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '+')
            .collect();
        format!("tel:{digits}")
    }
}

/// Finds the next run of two or more line breaks (with optional blank
/// whitespace between them); returns (start, end) byte offsets
fn find_blank_line(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\n' {
            let mut j = i + 1;
            let mut breaks = 1;
            while j < bytes.len() && matches!(bytes[j], b'\n' | b' ' | b'\t' | b'\r') {
                if bytes[j] == b'\n' {
                    breaks += 1;
                }
                j += 1;
            }
            if breaks >= 2 {
                return Some((i, j));
            }
        }
        i += 1;
    }
    None
}

/// Immutable attorney table
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    records: Vec<AttorneyRecord>,
}

impl Roster {
    /// Parse a roster from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON or duplicate identifiers.
    pub fn from_json(json: &str) -> SiteResult<Self> {
        let records: Vec<AttorneyRecord> = serde_json::from_str(json)?;
        for (i, r) in records.iter().enumerate() {
            let dup = records[..i]
                .iter()
                .any(|o| o.id == r.id || o.semantic_id == r.semantic_id);
            if dup {
                return Err(SiteError::config(format!(
                    "duplicate attorney id `{}`",
                    r.id
                )));
            }
        }
        Ok(Self { records })
    }

    /// The firm's three attorneys.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded table fails to parse.
    pub fn builtin() -> SiteResult<Self> {
        Self::from_json(BUILTIN)
    }

    /// Look up by export id or semantic id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&AttorneyRecord> {
        self.records
            .iter()
            .find(|r| r.id == id || r.semantic_id == id)
    }

    /// All records in table order
    #[must_use]
    pub fn records(&self) -> &[AttorneyRecord] {
        &self.records
    }

    /// Selector matching every card container, duplicates included
    #[must_use]
    pub fn card_container_selector(&self) -> String {
        self.records
            .iter()
            .map(|r| id_selector(&r.id))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
