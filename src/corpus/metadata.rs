use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Kind of writing a document contains, inferred from its filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Essay,
    Reflection,
    Podcast,
    Newsletter,
    General,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Essay => "essay",
            ContentType::Reflection => "reflection",
            ContentType::Podcast => "podcast",
            ContentType::Newsletter => "newsletter",
            ContentType::General => "general",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "essay" => Some(ContentType::Essay),
            "reflection" => Some(ContentType::Reflection),
            "podcast" => Some(ContentType::Podcast),
            "newsletter" => Some(ContentType::Newsletter),
            "general" => Some(ContentType::General),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata attached to every chunk of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub tags: Vec<String>,
    pub content_type: ContentType,
    pub source_file: String,
}

fn tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^(.*?)\s*\[(.*?)\]").expect("valid tag pattern"))
}

/// Extract document metadata from a filename.
///
/// Filenames follow the convention `Title [tag1, tag2].txt`; the tag block
/// is optional. The content type comes from keywords anywhere in the stem
/// ("essay", "reflection", "podcast", "substack"/"newsletter").
pub fn metadata_from_filename(filename: &str) -> DocumentMetadata {
    let base_name = match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    };

    let mut title = base_name.trim().to_string();
    let mut tags = Vec::new();

    if let Some(caps) = tag_pattern().captures(base_name) {
        title = caps[1].trim().to_string();
        tags = caps[2]
            .split(',')
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
    }

    let lower = base_name.to_lowercase();
    let content_type = if lower.contains("essay") {
        ContentType::Essay
    } else if lower.contains("reflection") {
        ContentType::Reflection
    } else if lower.contains("podcast") {
        ContentType::Podcast
    } else if lower.contains("substack") || lower.contains("newsletter") {
        ContentType::Newsletter
    } else {
        ContentType::General
    };

    DocumentMetadata {
        title,
        tags,
        content_type,
        source_file: filename.to_string(),
    }
}
