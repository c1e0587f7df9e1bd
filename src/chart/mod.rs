//! Chart-specification synthesis against the product catalog.
//!
//! The remote model proposes a chart (type, title, labels, datasets); this
//! module decides whether the proposal is answerable from the catalog and, if
//! so, builds the renderer-ready spec with ground-truth values. Model-supplied
//! numbers never survive validation: every emitted value comes from the
//! catalog, per product or per aggregate.

pub mod decode;
pub mod synthesizer;


pub use decode::{decode, DecodeError, NormalizedRequest};
pub use synthesizer::{synthesize, Synthesis};

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Line,
    Bar,
    Pie,
}

impl ChartType {
    /// Clamps a loose type string to a supported chart type; anything
    /// unrecognized or absent renders as a bar chart.
    pub fn clamp(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("line") => ChartType::Line,
            Some("pie") => ChartType::Pie,
            _ => ChartType::Bar,
        }
    }
}

/// Series color assignment: one color for a whole series, or one per slice.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Paint {
    Solid(String),
    Slices(Vec<String>),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Paint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
}

impl Dataset {
    pub fn new(label: impl Into<String>, data: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            data,
            background_color: None,
            border_color: None,
            fill: None,
            tension: None,
        }
    }
}

/// Fully-formed chart handed to the external renderer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub chart_type: ChartType,
    pub title: String,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

/// Fixed series palette, cycled by index for deterministic coloring.
pub(crate) const PALETTE: [&str; 6] = [
    "#36a2eb", "#ff6384", "#ffce56", "#4bc0c0", "#9966ff", "#ff9f40",
];

pub(crate) fn palette_color(index: usize) -> String {
    PALETTE[index % PALETTE.len()].to_string()
}
