//! Turns a decoded chart request into a renderer-ready spec, substituting
//! catalog ground truth for every value the model proposed.

use super::decode::{decode, NormalizedRequest};
use super::{palette_color, ChartSpec, ChartType, Dataset, Paint};
use crate::catalog::{Catalog, Product};
use serde_json::Value;
use tracing::{debug, warn};

/// Labels referring to computed statistics across the whole catalog rather
/// than a single product. Matched case-insensitively.
const AGGREGATE_LABELS: [&str; 6] = [
    "stock card",
    "stock in",
    "stock out",
    "units",
    "report",
    "stock in vs out",
];

/// Aggregate charts with more labels than this are not answerable.
const MAX_AGGREGATE_LABELS: usize = 6;

const LINE_TENSION: f64 = 0.4;

/// Outcome of chart synthesis. A rejection is a complete user-facing
/// message, not a system failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Synthesis {
    Chart(ChartSpec),
    Rejected { reason: String },
}

/// Synthesizes a chart from a loosely-typed request.
///
/// Returns `None` when the request cannot be decoded at all (the caller
/// falls back to its generic no-data reply), `Rejected` when a label names
/// something outside the catalog, and `Chart` otherwise. Model-supplied
/// dataset values are never emitted: valid requests get their values from
/// the catalog, invalid ones are rejected with the datasets unexamined.
pub fn synthesize(request: &Value, catalog: &Catalog) -> Option<Synthesis> {
    let normalized = match decode(request) {
        Ok(normalized) => normalized,
        Err(error) => {
            warn!(%error, "discarding undecodable chart request");
            return None;
        }
    };

    if is_aggregate_request(&normalized.labels) {
        debug!(labels = normalized.labels.len(), "synthesizing aggregate chart");
        return Some(Synthesis::Chart(build_aggregate_chart(normalized, catalog)));
    }

    // Not an aggregate chart, so every label must name a catalog product
    // exactly. The first label that doesn't rejects the whole request.
    let mut products: Vec<&Product> = Vec::with_capacity(normalized.labels.len());
    for label in &normalized.labels {
        match catalog.product_by_name(label) {
            Some(product) => products.push(product),
            None => {
                return Some(Synthesis::Rejected {
                    reason: format!(
                        "Product \"{label}\" was not found in our inventory. \
                         Please ask using the exact product names from the stock list."
                    ),
                })
            }
        }
    }

    debug!(products = products.len(), "synthesizing product chart");
    Some(Synthesis::Chart(build_product_chart(normalized, &products)))
}

fn is_aggregate_label(label: &str) -> bool {
    let lowered = label.trim().to_lowercase();
    AGGREGATE_LABELS.contains(&lowered.as_str())
}

fn is_aggregate_request(labels: &[String]) -> bool {
    labels.len() <= MAX_AGGREGATE_LABELS && labels.iter().all(|l| is_aggregate_label(l))
}

/// Intermediate series carrying already-substituted catalog values.
struct Series {
    label: String,
    data: Vec<f64>,
}

/// Every dataset's values are replaced with the per-product metric selected
/// by keywords in the dataset's own label ("in" → stock in, "out" → stock
/// out, anything else → current stock).
fn build_product_chart(request: NormalizedRequest, products: &[&Product]) -> ChartSpec {
    let labels: Vec<String> = products.iter().map(|p| p.name.clone()).collect();
    let series = request
        .datasets
        .iter()
        .map(|draft| Series {
            label: series_label(&draft.label, "Current Stock"),
            data: products
                .iter()
                .map(|p| product_metric(&draft.label, p) as f64)
                .collect(),
        })
        .collect();

    finish(request.chart_type, request.title, labels, series)
}

fn product_metric(series_label: &str, product: &Product) -> i64 {
    let lowered = series_label.to_lowercase();
    if lowered.contains("in") {
        product.stock_in
    } else if lowered.contains("out") {
        product.stock_out
    } else {
        product.current_stock
    }
}

/// Every label maps to the matching catalog-wide statistic.
fn build_aggregate_chart(request: NormalizedRequest, catalog: &Catalog) -> ChartSpec {
    let stats = catalog.stats();
    let values: Vec<f64> = request
        .labels
        .iter()
        .map(|label| {
            let lowered = label.to_lowercase();
            let has_in = lowered.contains("in");
            let has_out = lowered.contains("out");
            if has_in && !has_out {
                stats.total_in as f64
            } else if has_out && !has_in {
                stats.total_out as f64
            } else {
                stats.total_units as f64
            }
        })
        .collect();

    let series = request
        .datasets
        .iter()
        .map(|draft| Series {
            label: series_label(&draft.label, "Inventory"),
            data: values.clone(),
        })
        .collect();

    finish(request.chart_type, request.title, request.labels, series)
}

fn series_label(label: &str, fallback: &str) -> String {
    if label.trim().is_empty() {
        fallback.to_string()
    } else {
        label.trim().to_string()
    }
}

/// Applies the shape invariants and presentation hints for the chart type.
///
/// Pie keeps only the first dataset and reconciles its length to the label
/// count; line/bar series get the length reconciliation plus deterministic
/// per-series colors cycling the fixed palette.
fn finish(chart_type: ChartType, title: String, labels: Vec<String>, series: Vec<Series>) -> ChartSpec {
    let datasets = match chart_type {
        ChartType::Pie => {
            let first = series.into_iter().next().unwrap_or_else(|| Series {
                label: "Inventory".to_string(),
                data: Vec::new(),
            });
            let data = reconcile(labels.len(), first.data);
            let slices: Vec<String> = (0..labels.len()).map(palette_color).collect();
            let mut dataset = Dataset::new(first.label, data);
            dataset.background_color = Some(Paint::Slices(slices));
            vec![dataset]
        }
        ChartType::Line => series
            .into_iter()
            .enumerate()
            .map(|(i, s)| {
                let mut dataset = Dataset::new(s.label, reconcile(labels.len(), s.data));
                dataset.border_color = Some(palette_color(i));
                dataset.fill = Some(false);
                dataset.tension = Some(LINE_TENSION);
                dataset
            })
            .collect(),
        ChartType::Bar => series
            .into_iter()
            .enumerate()
            .map(|(i, s)| {
                let mut dataset = Dataset::new(s.label, reconcile(labels.len(), s.data));
                dataset.background_color = Some(Paint::Solid(palette_color(i)));
                dataset.fill = Some(true);
                dataset
            })
            .collect(),
    };

    ChartSpec {
        chart_type,
        title,
        labels,
        datasets,
    }
}

/// Truncates or zero-pads a series so `labels.len() == data.len()` always
/// holds on the emitted spec.
pub(super) fn reconcile(label_count: usize, mut data: Vec<f64>) -> Vec<f64> {
    data.truncate(label_count);
    while data.len() < label_count {
        data.push(0.0);
    }
    data
}
