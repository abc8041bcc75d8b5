//! Prompt construction for note transformations.
//!
//! Recognized kinds wrap the note text in a fixed instruction. Any other kind
//! passes the text through untouched so processing never stalls on an unknown
//! request. The same module owns the canned texts returned when the model
//! cannot be reached.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const SUMMARY_INSTRUCTION: &str = "Please provide a concise summary of the following text:\n\n";
pub const BULLET_POINTS_INSTRUCTION: &str =
    "Convert the following text into clear bullet points:\n\n";
pub const STUDY_QUESTIONS_INSTRUCTION: &str =
    "Generate 5-7 study questions based on the following content:\n\n";

/// Number of characters of the note echoed back by the summary fallback.
pub const FALLBACK_SUMMARY_CHARS: usize = 50;

pub const FALLBACK_BULLET_POINTS: &str =
    "**Bullet Points:** • Main ideas extracted from note [Gemini AI unavailable]";
pub const FALLBACK_STUDY_QUESTIONS: &str = "**Study Questions:** 1. What is the main idea? 2. How does it relate to other topics? [Gemini AI unavailable]";
pub const FALLBACK_GENERIC: &str = "AI processing completed. [Gemini AI unavailable]";

/// The transformation requested for a piece of note content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransformationKind {
    Summary,
    BulletPoints,
    StudyQuestions,
    /// Unrecognized kind, kept verbatim so it can be stored in history.
    Other(String),
}

impl TransformationKind {
    pub fn as_str(&self) -> &str {
        match self {
            TransformationKind::Summary => "summary",
            TransformationKind::BulletPoints => "bullet_points",
            TransformationKind::StudyQuestions => "study_questions",
            TransformationKind::Other(s) => s,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, TransformationKind::Other(_))
    }

    fn instruction(&self) -> Option<&'static str> {
        match self {
            TransformationKind::Summary => Some(SUMMARY_INSTRUCTION),
            TransformationKind::BulletPoints => Some(BULLET_POINTS_INSTRUCTION),
            TransformationKind::StudyQuestions => Some(STUDY_QUESTIONS_INSTRUCTION),
            TransformationKind::Other(_) => None,
        }
    }
}

impl From<&str> for TransformationKind {
    fn from(s: &str) -> Self {
        match s {
            "summary" => TransformationKind::Summary,
            "bullet_points" => TransformationKind::BulletPoints,
            "study_questions" => TransformationKind::StudyQuestions,
            other => TransformationKind::Other(other.to_string()),
        }
    }
}

impl FromStr for TransformationKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TransformationKind::from(s))
    }
}

impl fmt::Display for TransformationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TransformationKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TransformationKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(TransformationKind::from(s.as_str()))
    }
}

/// Build the instruction handed to the language model.
pub fn build_prompt(kind: &TransformationKind, content: &str) -> String {
    match kind.instruction() {
        Some(instruction) => format!("{}{}", instruction, content),
        None => content.to_string(),
    }
}

/// Deterministic stand-in for model output when generation fails.
pub fn fallback_content(kind: &TransformationKind, content: &str) -> String {
    match kind {
        TransformationKind::Summary => {
            let head: String = content.chars().take(FALLBACK_SUMMARY_CHARS).collect();
            format!("**AI Summary:** {}... [Gemini AI unavailable]", head)
        }
        TransformationKind::BulletPoints => FALLBACK_BULLET_POINTS.to_string(),
        TransformationKind::StudyQuestions => FALLBACK_STUDY_QUESTIONS.to_string(),
        TransformationKind::Other(_) => FALLBACK_GENERIC.to_string(),
    }
}
