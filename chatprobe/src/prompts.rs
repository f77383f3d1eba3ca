//! Loading the scripted prompt list from disk.

use crate::errors::AutomationError;
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// One scripted user turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub risk_level: Option<String>,
}

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emotion: None,
            id: None,
            risk_level: None,
        }
    }
}

/// Prompt files label ids and risk levels either way: `"7"` or `7`
fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }
    Ok(Option::<Raw>::deserialize(d)?.map(|raw| match raw {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    }))
}

/// Read prompts from a `.json` array or a delimited text file.
///
/// Blank entries are dropped, text is trimmed and file order is kept.
pub fn read_prompts(path: impl AsRef<Path>) -> Result<Vec<Prompt>, AutomationError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AutomationError::InputLoadFailed(format!("cannot read {}: {e}", path.display()))
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let prompts = match extension.as_deref() {
        Some("json") => parse_json_prompts(&raw).map_err(|e| e.to_string()),
        Some("tsv") => parse_delimited_prompts(&raw, b'\t').map_err(|e| e.to_string()),
        _ => parse_delimited_prompts(&raw, b',').map_err(|e| e.to_string()),
    }
    .map_err(|e| AutomationError::InputLoadFailed(format!("{}: {e}", path.display())))?;

    info!("Loaded {} prompts from {}", prompts.len(), path.display());
    Ok(prompts)
}

/// Like [`read_prompts`], but in lenient mode a missing or malformed file
/// is logged and treated as an empty prompt list.
pub fn load_prompts(path: impl AsRef<Path>, strict: bool) -> Result<Vec<Prompt>, AutomationError> {
    match read_prompts(path) {
        Ok(prompts) => Ok(prompts),
        Err(e) if !strict => {
            warn!("{}; continuing with no prompts", e);
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

pub fn parse_json_prompts(raw: &str) -> Result<Vec<Prompt>, serde_json::Error> {
    let prompts: Vec<Prompt> = serde_json::from_str(raw)?;
    Ok(prompts
        .into_iter()
        .filter_map(|mut prompt| {
            let trimmed = prompt.text.trim();
            if trimmed.is_empty() {
                return None;
            }
            prompt.text = trimmed.to_string();
            Some(prompt)
        })
        .collect())
}

/// Column names that mark the first record as a header row
const HEADER_FIELDS: &[&str] = &["text", "prompt", "prompts", "emotion", "id", "risk_level"];

/// First field of every record, trimmed, blanks dropped.
///
/// Quotes only open a quoted field at the start of a field, so stray quotes
/// in free text stay literal. The first record is treated as a header only
/// when it has several columns that are all known column names.
pub fn parse_delimited_prompts(raw: &str, delimiter: u8) -> Result<Vec<Prompt>, csv::Error> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let records = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(raw.as_bytes())
        .into_records()
        .collect::<Result<Vec<StringRecord>, _>>()?;

    let skip = records.first().map_or(0, |first| usize::from(is_header(first)));
    Ok(records
        .iter()
        .skip(skip)
        .filter_map(|record| record.get(0))
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(Prompt::new)
        .collect())
}

fn is_header(record: &StringRecord) -> bool {
    record.len() > 1
        && record
            .iter()
            .all(|field| HEADER_FIELDS.contains(&field.trim().to_ascii_lowercase().as_str()))
}
