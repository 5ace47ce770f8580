//! Layout data for the 3D result view and the relevance bar chart.
//!
//! Only geometry and labels are produced here; drawing is left to the
//! client. The query sits at the origin and results are spread on a
//! golden-angle spiral, closer to the query the more relevant they are.

use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::rag::ScoredResult;

const MIN_DIST: f64 = 0.5;
const MAX_DIST: f64 = 4.0;
const SKEW_POWER: i32 = 2;
const QUERY_LABEL_CHARS: usize = 30;
const STEM_MAX_CHARS: usize = 50;
const FALLBACK_STEM: &str = "search";

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryNode {
    pub position: Point3,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultNode {
    pub document_id: String,
    pub file_name: String,
    pub relevance: f64,
    pub position: Point3,
    pub size: f64,
    /// Colour scale value, equal to the relevance.
    pub color: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: Point3,
    pub to: Point3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout3d {
    pub query: QueryNode,
    pub nodes: Vec<ResultNode>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub file_name: String,
    pub relevance: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarChart {
    pub bars: Vec<Bar>,
    pub color_min: f64,
    pub color_max: f64,
}

fn by_relevance(results: &[ScoredResult]) -> Vec<&ScoredResult> {
    let mut sorted: Vec<&ScoredResult> = results.iter().collect();
    sorted.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
    sorted
}

fn query_label(query: &str) -> String {
    let mut chars = query.chars();
    let head: String = chars.by_ref().take(QUERY_LABEL_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Distance from the query for a relevance in [0, 100].
fn distance_for(relevance: f64) -> f64 {
    MIN_DIST + (1.0 - relevance / 100.0) * (MAX_DIST - MIN_DIST)
}

pub fn layout_3d(query: &str, results: &[ScoredResult]) -> Layout3d {
    let origin = Point3::default();
    let golden_angle = PI * (3.0 - 5f64.sqrt());
    let sorted = by_relevance(results);
    let n = sorted.len().max(1) as f64;

    let nodes: Vec<ResultNode> = sorted
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let rel = result.relevance;
            let dist = distance_for(rel);
            let theta = i as f64 * golden_angle;
            let u = (i as f64 + 0.5) / n;
            let phi = PI * u.powi(SKEW_POWER);

            ResultNode {
                document_id: result.document_id.clone(),
                file_name: result.file_name.clone(),
                relevance: rel,
                position: Point3 {
                    x: origin.x + dist * phi.sin() * theta.cos(),
                    y: origin.y + dist * phi.sin() * theta.sin(),
                    z: origin.z + dist * phi.cos(),
                },
                size: (rel / 4.0).max(8.0),
                color: rel,
                label: format!("{}\n{:.1}%", result.file_name, rel),
            }
        })
        .collect();

    let edges = nodes
        .iter()
        .map(|node| Edge {
            from: origin,
            to: node.position,
        })
        .collect();

    Layout3d {
        query: QueryNode {
            position: origin,
            label: query_label(query),
        },
        nodes,
        edges,
    }
}

pub fn bar_chart(results: &[ScoredResult]) -> BarChart {
    BarChart {
        bars: by_relevance(results)
            .into_iter()
            .map(|r| Bar {
                file_name: r.file_name.clone(),
                relevance: r.relevance,
                label: format!("{:.1}%", r.relevance),
            })
            .collect(),
        color_min: 0.0,
        color_max: 100.0,
    }
}

/// File-name-safe form of a query: reserved characters removed, spaces
/// turned into underscores, at most 50 characters.
pub fn safe_file_stem(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .collect();
    cleaned
        .trim()
        .replace(' ', "_")
        .chars()
        .take(STEM_MAX_CHARS)
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedLayout {
    pub layout_path: PathBuf,
    pub bar_chart_path: PathBuf,
}

/// Writes layout JSON files into the export directory.
#[derive(Debug, Clone)]
pub struct LayoutExporter {
    dir: PathBuf,
}

impl LayoutExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files are named `{stem}_3d_layout_{timestamp}.json` and
    /// `{stem}_bar_chart_{timestamp}.json`.
    pub async fn export(
        &self,
        query: &str,
        timestamp: &str,
        layout: &Layout3d,
        chart: &BarChart,
    ) -> Result<ExportedLayout, ApiError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create export dir: {}", e)))?;

        let stem = Some(safe_file_stem(query))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| FALLBACK_STEM.to_string());

        let layout_path = self.dir.join(format!("{}_3d_layout_{}.json", stem, timestamp));
        let bar_chart_path = self.dir.join(format!("{}_bar_chart_{}.json", stem, timestamp));

        write_json(&layout_path, layout).await?;
        write_json(&bar_chart_path, chart).await?;

        tracing::debug!(path = %layout_path.display(), "Exported search layout");
        Ok(ExportedLayout {
            layout_path,
            bar_chart_path,
        })
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ApiError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(ApiError::internal)?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::{RawMatch, RelevanceRanker};

    fn results(distances: &[f64]) -> Vec<ScoredResult> {
        RelevanceRanker::default().score(
            distances
                .iter()
                .enumerate()
                .map(|(i, d)| RawMatch::new(i.to_string(), *d, format!("doc {i}"))),
            distances.len(),
        )
    }

    fn norm(p: Point3) -> f64 {
        (p.x * p.x + p.y * p.y + p.z * p.z).sqrt()
    }

    #[test]
    fn empty_results_only_have_the_query_node() {
        let layout = layout_3d("anything", &[]);
        assert!(layout.nodes.is_empty());
        assert!(layout.edges.is_empty());
        assert_eq!(layout.query.position, Point3::default());
        assert!(bar_chart(&[]).bars.is_empty());
    }

    #[test]
    fn distance_from_query_tracks_relevance() {
        let layout = layout_3d("q", &results(&[0.1, 0.5, 0.3]));

        assert_eq!(layout.nodes.len(), 3);
        assert_eq!(layout.edges.len(), 3);
        assert!((norm(layout.nodes[0].position) - 0.5).abs() < 1e-9);
        assert!((norm(layout.nodes[2].position) - distance_for(2.0)).abs() < 1e-9);
        for pair in layout.nodes.windows(2) {
            assert!(norm(pair[0].position) <= norm(pair[1].position));
        }
    }

    #[test]
    fn single_result_sits_on_the_spiral_start() {
        let layout = layout_3d("q", &results(&[0.4]));
        let node = &layout.nodes[0];
        // u = 0.5, phi = pi / 4, theta = 0
        let phi = PI / 4.0;
        assert!((node.position.x - 0.5 * phi.sin()).abs() < 1e-9);
        assert!(node.position.y.abs() < 1e-9);
        assert!((node.position.z - 0.5 * phi.cos()).abs() < 1e-9);
        assert_eq!(node.size, 25.0);
        assert_eq!(node.color, 100.0);
        assert_eq!(node.label, "unknown\n100.0%");
    }

    #[test]
    fn marker_size_has_a_floor() {
        let layout = layout_3d("q", &results(&[0.1, 0.9]));
        assert_eq!(layout.nodes[1].size, 8.0);
    }

    #[test]
    fn query_label_is_truncated() {
        let long = "a".repeat(31);
        assert_eq!(layout_3d(&long, &[]).query.label, format!("{}...", "a".repeat(30)));
        assert_eq!(layout_3d("short", &[]).query.label, "short");
    }

    #[test]
    fn bar_chart_orders_by_relevance() {
        let chart = bar_chart(&results(&[0.1, 0.5]));
        let labels: Vec<&str> = chart.bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["100.0%", "2.0%"]);
        assert_eq!((chart.color_min, chart.color_max), (0.0, 100.0));
    }

    #[test]
    fn safe_file_stem_strips_reserved_characters() {
        assert_eq!(safe_file_stem(r#" what is "rust"? a/b\c*d:e<f>g|h "#), "what_is_rust_abcdefgh");
        assert_eq!(safe_file_stem(&"x".repeat(80)).chars().count(), 50);
        assert_eq!(safe_file_stem("???"), "");
    }

    #[tokio::test]
    async fn export_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = LayoutExporter::new(dir.path().join("search"));
        let ranked = results(&[0.1, 0.5]);

        let paths = exporter
            .export("red fruit?", "20240101_120000", &layout_3d("red fruit?", &ranked), &bar_chart(&ranked))
            .await
            .unwrap();

        assert!(paths.layout_path.ends_with("red_fruit_3d_layout_20240101_120000.json"));
        assert!(paths.bar_chart_path.ends_with("red_fruit_bar_chart_20240101_120000.json"));

        let saved: Layout3d =
            serde_json::from_slice(&std::fs::read(&paths.layout_path).unwrap()).unwrap();
        assert_eq!(saved.nodes.len(), 2);
    }

    #[tokio::test]
    async fn export_uses_fallback_stem_for_symbol_queries() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LayoutExporter::new(dir.path())
            .export("???", "ts", &layout_3d("???", &[]), &bar_chart(&[]))
            .await
            .unwrap();
        assert!(paths.layout_path.ends_with("search_3d_layout_ts.json"));
    }
}
