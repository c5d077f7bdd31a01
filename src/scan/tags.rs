// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Keyword-priority matching for tag-backend output
//!
//! The tag backend produces a `|`-delimited string of free-text tags. The
//! first label in [`TAG_KEYWORDS`] with a matching keyword wins, so the table
//! order matters: more specific labels come first.

use serde::{Deserialize, Serialize};

use super::labels::Label;

/// Heuristic confidence reported when a keyword matched. Not a calibrated probability.
pub const KEYWORD_MATCH_CONFIDENCE: f32 = 0.85;

/// Heuristic confidence reported when nothing matched. Not a calibrated probability.
pub const NO_MATCH_CONFIDENCE: f32 = 0.9;

/// Separator between tags in a tag string
pub const TAG_DELIMITER: char = '|';

const TAG_KEYWORDS: &[(Label, &[&str])] = &[
    (Label::Nits, &["nit", "nits", "egg", "eggs"]),
    (
        Label::Lice,
        &["lice", "louse", "insect", "parasite", "bug", "head lice"],
    ),
    (
        Label::Dandruff,
        &[
            "dandruff",
            "dandruffs",
            "flake",
            "flakes",
            "scalp",
            "dry skin",
            "dry scalp",
        ],
    ),
];

/// Tag pipeline response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagPrediction {
    pub label: Label,
    /// Fixed per outcome, see [`KEYWORD_MATCH_CONFIDENCE`] and [`NO_MATCH_CONFIDENCE`]
    pub confidence: f32,
    pub explanation: Option<String>,
}

impl TagPrediction {
    /// Result used when no tag model is available
    pub fn stub() -> Self {
        Self {
            label: Label::Clear,
            confidence: NO_MATCH_CONFIDENCE,
            explanation: None,
        }
    }

    pub fn with_explanation(mut self, explanation: Option<String>) -> Self {
        self.explanation = explanation;
        self
    }
}

/// Map a tag string to one label and its fixed confidence
pub fn match_tags(tag_string: &str) -> TagPrediction {
    let lowered = tag_string.to_lowercase();
    let tags: Vec<&str> = lowered.split(TAG_DELIMITER).map(str::trim).collect();

    for (label, keywords) in TAG_KEYWORDS {
        let hit = keywords
            .iter()
            .any(|kw| tags.iter().any(|tag| tag.contains(kw)) || lowered.contains(kw));
        if hit {
            return TagPrediction {
                label: *label,
                confidence: KEYWORD_MATCH_CONFIDENCE,
                explanation: None,
            };
        }
    }

    TagPrediction::stub()
}
