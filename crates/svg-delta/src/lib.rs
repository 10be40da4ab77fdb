#![forbid(unsafe_code)]

//! Sparse deltas between SVG animation frames.
//!
//! Given the ordered frames of an animation, [`DeltaComputer::compute`] returns the first frame
//! as a base document plus one [`DeltaRecord`] per later frame. A record either lists the
//! attribute/text changes of elements matched by id, or carries the whole frame (`fullSvg`) when
//! ids cannot be trusted to name the same element in both frames.
//!
//! Design goals:
//! - deterministic output (same frames, same bytes)
//! - correctness of the displayed frame over payload size: any doubt becomes a full-SVG record
//! - producer id conventions are configuration ([`DeltaConfig`]), not hard-coded SVG semantics

pub mod classify;
pub mod config;
pub mod delta;
pub mod dom;
pub mod error;
pub mod format;
pub mod geometry;
mod index;
pub mod matcher;
mod prepare;

pub use classify::Classifier;
pub use config::DeltaConfig;
pub use delta::{ChangeSet, DeltaPayload, DeltaRecord, ElementChanges};
pub use error::{Error, Result};
pub use format::DeltaMetadata;
pub use matcher::Mismatch;

use crate::index::IdIndex;
use crate::matcher::FrameMatcher;
use serde::Serialize;

/// Base document plus one record per frame after the first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaSet {
    #[serde(rename = "base")]
    pub base_svg: String,
    pub deltas: Vec<DeltaRecord>,
}

impl DeltaSet {
    /// Number of input frames, base included.
    pub fn frame_count(&self) -> usize {
        self.deltas.len() + 1
    }

    pub fn fallback_count(&self) -> usize {
        self.deltas.iter().filter(|d| d.is_fallback()).count()
    }
}

#[derive(Debug, Clone)]
pub struct DeltaComputer {
    config: DeltaConfig,
    classifier: Classifier,
}

impl DeltaComputer {
    pub fn new(config: DeltaConfig) -> Result<Self> {
        config.validate()?;
        let classifier = Classifier::new(&config)?;
        Ok(Self { config, classifier })
    }

    pub fn config(&self) -> &DeltaConfig {
        &self.config
    }

    /// Strips per-render noise and assigns synthetic ids, returning the serialized document.
    pub fn prepare(&self, svg: &str) -> Result<String> {
        Ok(prepare::prepare_document(svg, 0, &self.classifier)?.to_svg_string())
    }

    /// Diffs every frame after the first against the first.
    ///
    /// Every frame is parsed before any diffing starts, so a malformed frame anywhere in the
    /// sequence fails the whole call with [`Error::Parse`].
    pub fn compute<S: AsRef<str>>(&self, frames: &[S]) -> Result<DeltaSet> {
        let docs = frames
            .iter()
            .enumerate()
            .map(|(i, svg)| prepare::prepare_document(svg.as_ref(), i, &self.classifier))
            .collect::<Result<Vec<_>>>()?;
        let Some((base_doc, rest)) = docs.split_first() else {
            return Err(Error::NoFrames);
        };

        let base_index = IdIndex::build(base_doc, &self.classifier);
        let matcher = FrameMatcher {
            classifier: &self.classifier,
            config: &self.config,
        };

        let mut deltas = Vec::with_capacity(rest.len());
        for (offset, doc) in rest.iter().enumerate() {
            let frame = offset + 1;
            let index = IdIndex::build(doc, &self.classifier);
            let record = match matcher
                .correspond(base_doc, &base_index, doc, &index)
                .and_then(|pairs| delta::diff_pairs(base_doc, doc, &pairs, &self.classifier))
            {
                Ok(changes) => {
                    tracing::trace!(frame, changed = changes.len(), "frame diffed");
                    DeltaRecord::changes(frame, changes)
                }
                Err(reason) => {
                    tracing::debug!(frame, %reason, "falling back to full SVG");
                    DeltaRecord::full_svg(frame, doc.to_svg_string(), reason)
                }
            };
            deltas.push(record);
        }

        let set = DeltaSet {
            base_svg: base_doc.to_svg_string(),
            deltas,
        };
        tracing::debug!(
            frames = set.frame_count(),
            fallbacks = set.fallback_count(),
            "computed svg deltas"
        );
        Ok(set)
    }
}

/// [`DeltaComputer::compute`] with the default configuration.
pub fn compute_svg_deltas<S: AsRef<str>>(frames: &[S]) -> Result<DeltaSet> {
    DeltaComputer::new(DeltaConfig::default())?.compute(frames)
}

/// [`DeltaComputer::prepare`] with the default configuration.
pub fn prepare_svg(svg: &str) -> Result<String> {
    DeltaComputer::new(DeltaConfig::default())?.prepare(svg)
}
