// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Closed label vocabulary and raw-label normalization

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome category for a scan
///
/// `Clear` is the aggregate default and is never carried by a single detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Lice,
    Nits,
    Dandruff,
    Psoriasis,
    Clear,
}

impl Label {
    /// Labels a detection may carry
    pub const REPORTABLE: [Label; 4] = [Label::Lice, Label::Nits, Label::Dandruff, Label::Psoriasis];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Lice => "lice",
            Label::Nits => "nits",
            Label::Dandruff => "dandruff",
            Label::Psoriasis => "psoriasis",
            Label::Clear => "clear",
        }
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, Label::Clear)
    }
}

impl Default for Label {
    fn default() -> Self {
        Label::Clear
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synonyms emitted by other model versions, checked in order after the canonical names
const LABEL_SYNONYMS: &[(&str, Label)] = &[
    ("nit", Label::Nits),
    ("head lice", Label::Lice),
    ("louse", Label::Lice),
    ("lice detected", Label::Lice),
    ("no lice", Label::Clear),
    ("none", Label::Clear),
    ("", Label::Clear),
];

/// Map an arbitrary raw label token onto the closed vocabulary
///
/// Total and idempotent: anything unrecognized becomes [`Label::Clear`].
pub fn normalize_label(raw: &str) -> Label {
    let token = raw.trim().to_lowercase();
    if token.is_empty() {
        return Label::Clear;
    }

    if let Some(label) = Label::REPORTABLE
        .iter()
        .find(|label| label.as_str() == token)
    {
        return *label;
    }

    LABEL_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == token)
        .map(|(_, label)| *label)
        .unwrap_or(Label::Clear)
}

/// Same as [`normalize_label`] for a token that may be absent
pub fn normalize_optional_label(raw: Option<&str>) -> Label {
    raw.map(normalize_label).unwrap_or(Label::Clear)
}
