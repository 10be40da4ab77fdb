//! Structural correspondence between the base frame and a later frame.
//!
//! Ids are only trusted as element identities when they resolve to one element in each frame,
//! under the same major region and owner-group kind, without a sudden jump to canvas size.
//! Anything else means the producer reused a numeric id counter, and the frame has to be shipped
//! whole.

use crate::classify::Classifier;
use crate::config::DeltaConfig;
use crate::dom::{NodeId, SvgDocument};
use crate::geometry::{self, Axis};
use crate::index::{IdIndex, Occurrence};
use std::collections::BTreeSet;

/// Why a frame could not be diffed against the base.
#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    IdChurn { churned: usize, total: usize },
    LegendChurn { id: String },
    AmbiguousId { id: String },
    TagMismatch { id: String, base: String, frame: String },
    RegionMismatch {
        id: String,
        base: Option<String>,
        frame: Option<String>,
    },
    OwnerMismatch {
        id: String,
        base: Option<String>,
        frame: Option<String>,
    },
    GeometryBlowup { id: String, axis: Axis },
    /// A rendered element exists only in the base frame.
    ElementRemoved { id: String },
    /// A rendered element exists only in the new frame.
    ElementAdded { id: String },
    /// Text sits after a child element, or around children whose text changed.
    MixedContent { id: String },
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn or_none(v: &Option<String>) -> &str {
            v.as_deref().unwrap_or("<none>")
        }

        match self {
            Mismatch::IdChurn { churned, total } => {
                write!(f, "{churned} of {total} ids appear in only one frame")
            }
            Mismatch::LegendChurn { id } => write!(f, "legend id `{id}` churned"),
            Mismatch::AmbiguousId { id } => write!(f, "id `{id}` is not unique"),
            Mismatch::TagMismatch { id, base, frame } => {
                write!(f, "id `{id}` changed element <{base}> -> <{frame}>")
            }
            Mismatch::RegionMismatch { id, base, frame } => write!(
                f,
                "id `{id}` moved region {} -> {}",
                or_none(base),
                or_none(frame)
            ),
            Mismatch::OwnerMismatch { id, base, frame } => write!(
                f,
                "id `{id}` changed owner group {} -> {}",
                or_none(base),
                or_none(frame)
            ),
            Mismatch::GeometryBlowup { id, axis } => {
                write!(f, "id `{id}` grew to canvas {axis}")
            }
            Mismatch::ElementRemoved { id } => write!(f, "rendered id `{id}` disappeared"),
            Mismatch::ElementAdded { id } => write!(f, "rendered id `{id}` appeared"),
            Mismatch::MixedContent { id } => {
                write!(f, "id `{id}` changed text around child elements")
            }
        }
    }
}

/// A trusted base/frame element pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pair<'a> {
    pub(crate) id: &'a str,
    pub(crate) base: NodeId,
    pub(crate) frame: NodeId,
    pub(crate) text_group: bool,
}

pub(crate) struct FrameMatcher<'c> {
    pub(crate) classifier: &'c Classifier,
    pub(crate) config: &'c DeltaConfig,
}

impl FrameMatcher<'_> {
    /// Pairs in frame document order, or the first reason the frame cannot be diffed.
    pub(crate) fn correspond<'a>(
        &self,
        base_doc: &SvgDocument,
        base: &IdIndex<'_>,
        frame_doc: &SvgDocument,
        frame: &IdIndex<'a>,
    ) -> Result<Vec<Pair<'a>>, Mismatch> {
        self.check_churn(base, frame)?;
        self.check_shared(base_doc, base, frame_doc, frame)?;

        let pairs = frame
            .ids()
            .iter()
            .filter(|id| !self.classifier.is_volatile(id))
            .filter_map(|&id| {
                let b = base.get(id)?.first()?;
                let f = frame.get(id)?.first()?;
                Some(Pair {
                    id,
                    base: b.node,
                    frame: f.node,
                    text_group: f.text_group,
                })
            })
            .collect();
        Ok(pairs)
    }

    fn check_churn(&self, base: &IdIndex<'_>, frame: &IdIndex<'_>) -> Result<(), Mismatch> {
        let stable = |ids: &[&str]| -> BTreeSet<String> {
            ids.iter()
                .filter(|id| !self.classifier.is_volatile(id))
                .map(|id| id.to_string())
                .collect()
        };
        let base_ids = stable(base.ids());
        let frame_ids = stable(frame.ids());

        let total = base_ids.union(&frame_ids).count();
        let churned: Vec<&String> = base_ids.symmetric_difference(&frame_ids).collect();
        if total == 0 || churned.is_empty() {
            return Ok(());
        }

        fn any_in_legend(occ: Option<&[Occurrence<'_>]>) -> bool {
            occ.is_some_and(|occ| occ.iter().any(|o| o.in_legend))
        }
        let in_legend = |id: &str| any_in_legend(base.get(id)) || any_in_legend(frame.get(id));
        if let Some(id) = churned.iter().find(|id| in_legend(id.as_str())) {
            return Err(Mismatch::LegendChurn { id: id.to_string() });
        }

        let ratio = churned.len() as f64 / total as f64;
        if ratio > self.config.max_id_churn_ratio {
            return Err(Mismatch::IdChurn {
                churned: churned.len(),
                total,
            });
        }

        // Sparse changes can neither create nor delete elements.
        let rendered_only_in = |ids: &[&str], other: &BTreeSet<String>, index: &IdIndex<'_>| {
            ids.iter()
                .filter(|id| !self.classifier.is_volatile(id) && !other.contains(**id))
                .find(|id| {
                    index
                        .get(id)
                        .is_some_and(|occ| occ.iter().any(|o| o.rendered))
                })
                .map(|id| id.to_string())
        };
        if let Some(id) = rendered_only_in(base.ids(), &frame_ids, base) {
            return Err(Mismatch::ElementRemoved { id });
        }
        if let Some(id) = rendered_only_in(frame.ids(), &base_ids, frame) {
            return Err(Mismatch::ElementAdded { id });
        }
        Ok(())
    }

    fn check_shared(
        &self,
        base_doc: &SvgDocument,
        base: &IdIndex<'_>,
        frame_doc: &SvgDocument,
        frame: &IdIndex<'_>,
    ) -> Result<(), Mismatch> {
        let canvas = geometry::canvas_size(frame_doc);

        for id in base.ids() {
            if self.classifier.is_volatile(id) {
                continue;
            }
            let (Some(b), Some(f)) = (base.get(id), frame.get(id)) else {
                continue;
            };
            let ([b], [f]) = (b, f) else {
                return Err(Mismatch::AmbiguousId { id: id.to_string() });
            };

            if b.tag != f.tag {
                return Err(Mismatch::TagMismatch {
                    id: id.to_string(),
                    base: b.tag.to_string(),
                    frame: f.tag.to_string(),
                });
            }
            if b.region != f.region {
                return Err(Mismatch::RegionMismatch {
                    id: id.to_string(),
                    base: b.region.map(str::to_string),
                    frame: f.region.map(str::to_string),
                });
            }
            if b.owner != f.owner {
                return Err(Mismatch::OwnerMismatch {
                    id: id.to_string(),
                    base: b.owner.map(str::to_string),
                    frame: f.owner.map(str::to_string),
                });
            }

            let Some(canvas) = canvas else {
                continue;
            };
            let bounds = base_doc
                .element(b.node)
                .and_then(geometry::element_bounds)
                .zip(frame_doc.element(f.node).and_then(geometry::element_bounds));
            if let Some((before, after)) = bounds {
                if let Some(axis) = geometry::blowup_axis(
                    before,
                    after,
                    canvas,
                    self.config.blowup_canvas_fraction,
                    self.config.blowup_min_growth,
                ) {
                    return Err(Mismatch::GeometryBlowup {
                        id: id.to_string(),
                        axis,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correspond(base: &str, frame: &str) -> Result<Vec<String>, Mismatch> {
        let config = DeltaConfig::default();
        let classifier = Classifier::new(&config).unwrap();
        let base_doc = SvgDocument::parse(base).unwrap();
        let frame_doc = SvgDocument::parse(frame).unwrap();
        let base_index = IdIndex::build(&base_doc, &classifier);
        let frame_index = IdIndex::build(&frame_doc, &classifier);
        let matcher = FrameMatcher {
            classifier: &classifier,
            config: &config,
        };
        matcher
            .correspond(&base_doc, &base_index, &frame_doc, &frame_index)
            .map(|pairs| pairs.iter().map(|p| p.id.to_string()).collect())
    }

    #[test]
    fn pairs_skip_volatile_and_unshared_ids() {
        let base = r#"<svg xmlns="http://www.w3.org/2000/svg"><g id="a"/><g id="p0123456"/></svg>"#;
        let frame = r#"<svg xmlns="http://www.w3.org/2000/svg"><g id="pabcdef0"/><g id="a"/></svg>"#;
        assert_eq!(correspond(base, frame).unwrap(), ["a"]);
    }

    #[test]
    fn churn_is_reported_before_per_id_checks() {
        let base = r#"<svg xmlns="http://www.w3.org/2000/svg"><g id="a"/><g id="a"/></svg>"#;
        let frame = r#"<svg xmlns="http://www.w3.org/2000/svg"><g id="b"/><g id="b"/></svg>"#;
        assert_eq!(
            correspond(base, frame).unwrap_err(),
            Mismatch::IdChurn {
                churned: 2,
                total: 2
            }
        );
    }

    #[test]
    fn rendered_churn_under_the_ratio_still_falls_back() {
        let stable: String = (0..60).map(|i| format!(r#"<g id="line2d_{i}"/>"#)).collect();
        let svg = |extra: &str| {
            format!(r#"<svg xmlns="http://www.w3.org/2000/svg">{stable}{extra}</svg>"#)
        };
        let gradient = |id: &str| format!(r#"<defs><linearGradient id="{id}"/></defs>"#);

        assert_eq!(
            correspond(&svg(""), &svg(r#"<path id="marker_dot"/>"#)).unwrap_err(),
            Mismatch::ElementAdded {
                id: "marker_dot".to_string()
            }
        );
        assert_eq!(
            correspond(&svg(r#"<path id="marker_dot"/>"#), &svg("")).unwrap_err(),
            Mismatch::ElementRemoved {
                id: "marker_dot".to_string()
            }
        );
        assert_eq!(
            correspond(&svg(&gradient("grad_a")), &svg(&gradient("grad_b")))
                .unwrap()
                .len(),
            60
        );
    }

    #[test]
    fn display_names_the_offending_id() {
        let m = Mismatch::RegionMismatch {
            id: "line2d_1".to_string(),
            base: Some("axes_1".to_string()),
            frame: None,
        };
        assert_eq!(m.to_string(), "id `line2d_1` moved region axes_1 -> <none>");
        let m = Mismatch::GeometryBlowup {
            id: "legend_frame".to_string(),
            axis: Axis::Vertical,
        };
        assert_eq!(m.to_string(), "id `legend_frame` grew to canvas height");
    }
}
