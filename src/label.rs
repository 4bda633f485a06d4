// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drug label lookup.
//!
//! A [`LabelSource`] returns the raw label text for a drug name, or `None`
//! when nothing is on file. [`OpenFdaLabelSource`] queries the openFDA drug
//! label endpoint; [`FileLabelSource`] serves a local text file.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Label fields concatenated by default, in order.
pub const DEFAULT_SECTIONS: &[&str] = &[
    "indications_and_usage",
    "dosage_and_administration",
    "contraindications",
    "warnings",
    "warnings_and_cautions",
    "adverse_reactions",
    "drug_interactions",
    "overdosage",
];

/// Source of label text for a drug name.
pub trait LabelSource: Send + Sync {
    /// Fetches the label for `drug`. `Ok(None)` means no label was found.
    fn fetch_label(&self, drug: &str) -> Result<Option<String>>;
}

/// openFDA `drug/label.json` client.
pub struct OpenFdaLabelSource {
    client: Client,
    base_url: String,
    sections: Vec<String>,
}

impl OpenFdaLabelSource {
    pub fn new(base_url: &str, timeout: Duration, sections: Vec<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build label HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            sections,
        })
    }
}

impl LabelSource for OpenFdaLabelSource {
    fn fetch_label(&self, drug: &str) -> Result<Option<String>> {
        let Some(search) = search_expression(drug) else {
            return Ok(None);
        };

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("search", search.as_str()), ("limit", "1")])
            .send()
            .with_context(|| format!("label lookup for '{}' failed", drug.trim()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(drug = drug.trim(), "no label on file");
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            anyhow::bail!("label lookup returned {}: {}", status, body.trim());
        }

        let payload: Value = resp.json().context("failed to parse label response")?;
        Ok(extract_label_text(&payload, &self.sections))
    }
}

/// Serves the same local file for every drug name.
pub struct FileLabelSource {
    path: PathBuf,
}

impl FileLabelSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LabelSource for FileLabelSource {
    fn fetch_label(&self, _drug: &str) -> Result<Option<String>> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read label file: {}", self.path.display()))?;
        Ok(Some(text))
    }
}

/// openFDA search matching brand or generic name.
fn search_expression(drug: &str) -> Option<String> {
    let name: String = drug
        .trim()
        .chars()
        .filter(|c| *c != '"' && *c != '\\')
        .collect();
    if name.trim().is_empty() {
        return None;
    }
    Some(format!(
        "openfda.brand_name:\"{0}\" openfda.generic_name:\"{0}\"",
        name.trim()
    ))
}

/// Concatenates the requested sections of the first result.
///
/// Each section is a string or an array of strings (joined by newlines);
/// sections are separated by a blank line. Returns `None` when no requested
/// section carries text.
pub fn extract_label_text(payload: &Value, sections: &[String]) -> Option<String> {
    let result = payload.get("results")?.as_array()?.first()?;

    let parts: Vec<String> = sections
        .iter()
        .filter_map(|section| match result.get(section)? {
            Value::String(text) => Some(text.trim().to_string()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            _ => None,
        })
        .filter(|text| !text.trim().is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn sections(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extract_in_configured_order() {
        let payload = json!({
            "meta": {"results": {"total": 1}},
            "results": [{
                "warnings": ["Do not exceed 2 tablets in 24 hours."],
                "dosage_and_administration": ["Take 1 tablet", "twice daily with food."],
                "spl_id": "abc"
            }]
        });
        let text =
            extract_label_text(&payload, &sections(&["dosage_and_administration", "warnings"]))
                .unwrap();
        assert_eq!(
            text,
            "Take 1 tablet\ntwice daily with food.\n\nDo not exceed 2 tablets in 24 hours."
        );
    }

    #[test]
    fn test_extract_skips_missing_and_blank_sections() {
        let payload = json!({
            "results": [{"warnings": ["  "], "overdosage": "Call poison control."}]
        });
        let text =
            extract_label_text(&payload, &sections(&["warnings", "indications_and_usage", "overdosage"]))
                .unwrap();
        assert_eq!(text, "Call poison control.");
    }

    #[test]
    fn test_extract_none_without_results() {
        assert!(extract_label_text(&json!({"results": []}), &sections(&["warnings"])).is_none());
        assert!(extract_label_text(&json!({"error": {}}), &sections(&["warnings"])).is_none());
        assert!(extract_label_text(
            &json!({"results": [{"spl_id": "x"}]}),
            &sections(&["warnings"])
        )
        .is_none());
    }

    #[test]
    fn test_search_expression() {
        assert_eq!(
            search_expression("  Ibuprofen ").unwrap(),
            "openfda.brand_name:\"Ibuprofen\" openfda.generic_name:\"Ibuprofen\""
        );
        assert_eq!(
            search_expression("ty\"lenol").unwrap(),
            "openfda.brand_name:\"tylenol\" openfda.generic_name:\"tylenol\""
        );
        assert!(search_expression("   ").is_none());
        assert!(search_expression("\"\"").is_none());
    }

    #[test]
    fn test_file_source_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("label.txt");
        fs::write(&path, "Take with water.").unwrap();

        let source = FileLabelSource::new(&path);
        assert_eq!(
            source.fetch_label("anything").unwrap().as_deref(),
            Some("Take with water.")
        );
    }

    #[test]
    fn test_file_source_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let source = FileLabelSource::new(dir.path().join("missing.txt"));
        assert!(source.fetch_label("x").is_err());
    }

    #[test]
    fn test_default_sections_parse_from_config() {
        let config = crate::config::LabelConfig::default();
        assert_eq!(config.sections().len(), DEFAULT_SECTIONS.len());
        assert_eq!(config.sections()[0], "indications_and_usage");
    }
}
