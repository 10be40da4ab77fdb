use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tuning knobs for delta computation.
///
/// The id conventions encoded here describe one producer (Matplotlib's SVG backend). They are
/// data, not SVG semantics, so every field can be overridden from JSON. Missing fields keep their
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeltaConfig {
    /// Regexes for ids the producer regenerates on every render (clip paths, marker defs).
    pub volatile_id_patterns: Vec<String>,
    /// Group kinds (`<kind>_<n>`) that partition the document into rendering layers.
    pub region_kinds: Vec<String>,
    /// Region kinds whose children are known to reuse ids between renders.
    pub legend_kinds: Vec<String>,
    /// Group kinds that classify the artist drawing their descendants.
    pub owner_kinds: Vec<String>,
    /// Group kinds rendered as a variable number of glyph nodes; diffed as whole subtrees.
    pub text_group_kinds: Vec<String>,
    /// Elements that never receive a synthetic id.
    pub skip_auto_id_tags: Vec<String>,
    /// Prefix used for synthetic ids when `<tag>_<n>` is already taken by the document.
    pub auto_id_prefix: String,
    /// Attributes never reported as changes.
    pub ignored_attributes: Vec<String>,
    /// Largest tolerated share of non-volatile ids that appear in only one of two frames.
    pub max_id_churn_ratio: f64,
    /// Share of the canvas extent that counts as "covers the canvas".
    pub blowup_canvas_fraction: f64,
    /// Minimum growth factor of an extent before a canvas-sized element counts as a blowup.
    pub blowup_min_growth: f64,
}

impl Default for DeltaConfig {
    fn default() -> Self {
        fn strings(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            volatile_id_patterns: strings(&[r"^p[0-9a-f]{6,}$", r"^m[0-9a-f]{6,}$"]),
            region_kinds: strings(&["figure", "axes", "legend"]),
            legend_kinds: strings(&["legend"]),
            owner_kinds: strings(&[
                "line2d",
                "patch",
                "PathCollection",
                "LineCollection",
                "PolyCollection",
                "FillBetweenPolyCollection",
                "QuadMesh",
                "image",
                "xtick",
                "ytick",
                "matplotlib.axis",
            ]),
            text_group_kinds: strings(&["text"]),
            skip_auto_id_tags: strings(&["svg", "defs", "style", "metadata", "title", "desc"]),
            auto_id_prefix: "mb_auto_".to_string(),
            ignored_attributes: strings(&["clip-path"]),
            max_id_churn_ratio: 0.05,
            blowup_canvas_fraction: 0.8,
            blowup_min_growth: 2.0,
        }
    }
}

impl DeltaConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        fn invalid(message: impl Into<String>) -> Error {
            Error::InvalidConfig {
                message: message.into(),
            }
        }

        if !(0.0..=1.0).contains(&self.max_id_churn_ratio) {
            return Err(invalid(format!(
                "max_id_churn_ratio must be within [0, 1], got {}",
                self.max_id_churn_ratio
            )));
        }
        if !(self.blowup_canvas_fraction > 0.0 && self.blowup_canvas_fraction <= 1.0) {
            return Err(invalid(format!(
                "blowup_canvas_fraction must be within (0, 1], got {}",
                self.blowup_canvas_fraction
            )));
        }
        if !(self.blowup_min_growth.is_finite() && self.blowup_min_growth >= 1.0) {
            return Err(invalid(format!(
                "blowup_min_growth must be a finite value >= 1, got {}",
                self.blowup_min_growth
            )));
        }
        if self.auto_id_prefix.is_empty() {
            return Err(invalid("auto_id_prefix must not be empty"));
        }
        Ok(())
    }
}
