//! Narrative summarizer: external text generation with a deterministic
//! local fallback.
//!
//! `summarize` never fails outward. The external call is bounded by a
//! timeout; any failure, timeout or blank result falls back to a templated
//! sentence computed from the numeric values, so the fallback path is a
//! pure function of its input.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::config::NarrativeConfig;
use crate::ingest::Row;
use crate::stats::{flatten_numeric, ColumnStats};

/// Rows embedded in the prompt are capped to bound payload size.
pub const SAMPLE_ROWS: usize = 6;

/// Numeric values embedded in a series prompt are capped the same way.
const SERIES_PROMPT_VALUES: usize = 50;

const NO_NUMERIC_DATA: &str = "No numeric data available for this dataset.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeSource {
    External,
    Fallback,
}

impl NarrativeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            NarrativeSource::External => "external",
            NarrativeSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
    pub text: String,
    pub source: NarrativeSource,
    pub generated_at: DateTime<Utc>,
}

/// The external text-generation call, opaque to the rest of the crate.
/// Tests substitute a deterministic stub.
#[async_trait]
pub trait NarrativeClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// OpenAI-style chat-completions client over reqwest.
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
}

impl OpenAiClient {
    pub fn new(config: &NarrativeConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.resolved_api_key(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl NarrativeClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("narrative api key not configured"))?;

        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": self.max_tokens,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let payload: Value = response.json().await?;
        let text = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("narrative response carried no text"))?;

        Ok(text.trim().to_string())
    }
}

pub struct Summarizer {
    client: Arc<dyn NarrativeClient>,
    timeout: Duration,
}

impl Summarizer {
    pub fn new(client: Arc<dyn NarrativeClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Summarize a dataset from its column stats plus a bounded row sample.
    pub async fn summarize(
        &self,
        stats: &std::collections::BTreeMap<String, ColumnStats>,
        rows: &[Row],
    ) -> Narrative {
        let values = flatten_numeric(rows);
        if values.is_empty() {
            return fallback_narrative(&values);
        }

        let prompt = dataset_prompt(stats, rows);
        self.request(&prompt, &values).await
    }

    /// Summarize a caller-supplied numeric series (the chart-data path).
    pub async fn summarize_series(&self, values: &[f64]) -> Narrative {
        if values.is_empty() {
            return fallback_narrative(values);
        }

        let prompt = series_prompt(values);
        self.request(&prompt, values).await
    }

    async fn request(&self, prompt: &str, values: &[f64]) -> Narrative {
        match tokio::time::timeout(self.timeout, self.client.complete(prompt)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => Narrative {
                text: text.trim().to_string(),
                source: NarrativeSource::External,
                generated_at: Utc::now(),
            },
            Ok(Ok(_)) => {
                warn!("narrative service returned blank text, using fallback");
                fallback_narrative(values)
            }
            Ok(Err(err)) => {
                warn!("narrative service failed, using fallback: {err:#}");
                fallback_narrative(values)
            }
            Err(_) => {
                warn!("narrative service timed out, using fallback");
                fallback_narrative(values)
            }
        }
    }
}

fn dataset_prompt(stats: &std::collections::BTreeMap<String, ColumnStats>, rows: &[Row]) -> String {
    let mut prompt =
        String::from("Analyze this tabular data and give a short professional summary.\n\nColumn statistics:\n");
    for (column, s) in stats {
        let _ = writeln!(
            prompt,
            "- {column}: count {}, sum {}, avg {:.2}, min {}, max {}",
            s.count,
            format_number(s.sum),
            s.avg,
            format_number(s.min),
            format_number(s.max),
        );
    }

    let _ = writeln!(prompt, "\nSample rows:");
    for row in rows.iter().take(SAMPLE_ROWS) {
        let _ = writeln!(
            prompt,
            "{}",
            serde_json::to_string(row).unwrap_or_default()
        );
    }
    prompt
}

fn series_prompt(values: &[f64]) -> String {
    let listed: Vec<String> = values
        .iter()
        .take(SERIES_PROMPT_VALUES)
        .map(|v| format_number(*v))
        .collect();
    format!(
        "Summarize the key numeric trends in this series in a few sentences: {}",
        listed.join(", ")
    )
}

/// Deterministic templated summary. Identical input yields identical text.
fn fallback_narrative(values: &[f64]) -> Narrative {
    Narrative {
        text: fallback_text(values),
        source: NarrativeSource::Fallback,
        generated_at: Utc::now(),
    }
}

fn fallback_text(values: &[f64]) -> String {
    if values.is_empty() {
        return NO_NUMERIC_DATA.to_string();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    let trend = if values.len() < 2 {
        "stable"
    } else if values[values.len() - 1] > values[0] {
        "upward"
    } else {
        "downward"
    };

    format!(
        "Values range between {} and {}, averaging {:.2}. Trend: {}.",
        format_number(min),
        format_number(max),
        avg,
        trend
    )
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
