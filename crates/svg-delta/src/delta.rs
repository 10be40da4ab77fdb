use crate::classify::Classifier;
use crate::dom::{NodeId, SvgDocument};
use crate::matcher::{Mismatch, Pair};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Change-set key replacing a whole text-group subtree.
pub const OUTER_HTML: &str = "outerHTML";
/// Change-set key replacing an element's text.
pub const TEXT_CONTENT: &str = "textContent";

/// Attribute key (Clark notation for namespaced attributes) -> new value, `None` for removal.
pub type ElementChanges = IndexMap<String, Option<String>>;
/// Element id -> changes, in frame document order.
pub type ChangeSet = IndexMap<String, ElementChanges>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeltaPayload {
    Changes(ChangeSet),
    FullSvg(String),
}

/// One frame after the base: either sparse changes or the whole document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaRecord {
    /// Index of the frame in the input sequence.
    pub frame: usize,
    #[serde(flatten)]
    pub payload: DeltaPayload,
    #[serde(skip)]
    fallback: Option<Mismatch>,
}

impl DeltaRecord {
    pub(crate) fn changes(frame: usize, changes: ChangeSet) -> Self {
        Self {
            frame,
            payload: DeltaPayload::Changes(changes),
            fallback: None,
        }
    }

    pub(crate) fn full_svg(frame: usize, svg: String, reason: Mismatch) -> Self {
        Self {
            frame,
            payload: DeltaPayload::FullSvg(svg),
            fallback: Some(reason),
        }
    }

    pub fn change_set(&self) -> Option<&ChangeSet> {
        match &self.payload {
            DeltaPayload::Changes(c) => Some(c),
            DeltaPayload::FullSvg(_) => None,
        }
    }

    pub fn full_svg_payload(&self) -> Option<&str> {
        match &self.payload {
            DeltaPayload::FullSvg(s) => Some(s),
            DeltaPayload::Changes(_) => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.payload, DeltaPayload::FullSvg(_))
    }

    /// Why the frame was shipped whole. Not part of the serialized record.
    pub fn fallback_reason(&self) -> Option<&Mismatch> {
        self.fallback.as_ref()
    }
}

/// Computes the change-set of a frame against the base over trusted pairs.
pub(crate) fn diff_pairs(
    base: &SvgDocument,
    frame: &SvgDocument,
    pairs: &[Pair<'_>],
    classifier: &Classifier,
) -> Result<ChangeSet, Mismatch> {
    let mut out = ChangeSet::new();
    for pair in pairs {
        let changes = if pair.text_group {
            diff_subtree(base, pair.base, frame, pair.frame)
        } else {
            diff_element(base, frame, pair, classifier)?
        };
        if !changes.is_empty() {
            out.insert(pair.id.to_string(), changes);
        }
    }
    Ok(out)
}

fn diff_subtree(
    base: &SvgDocument,
    base_node: NodeId,
    frame: &SvgDocument,
    frame_node: NodeId,
) -> ElementChanges {
    let mut changes = ElementChanges::new();
    let current = frame.node_to_string(frame_node);
    if current != base.node_to_string(base_node) {
        changes.insert(OUTER_HTML.to_string(), Some(current));
    }
    changes
}

fn diff_element(
    base: &SvgDocument,
    frame: &SvgDocument,
    pair: &Pair<'_>,
    classifier: &Classifier,
) -> Result<ElementChanges, Mismatch> {
    let mut changes = ElementChanges::new();
    let (Some(b), Some(f)) = (base.element(pair.base), frame.element(pair.frame)) else {
        return Ok(changes);
    };

    let tracked = |key: &str| key != "id" && !classifier.is_ignored_attribute(key);
    let base_attrs: BTreeMap<String, &str> = b
        .attrs
        .iter()
        .map(|a| (a.name.clark_key().into_owned(), a.value.as_str()))
        .collect();

    let mut seen = Vec::with_capacity(f.attrs.len());
    for a in &f.attrs {
        let key = a.name.clark_key().into_owned();
        seen.push(key.clone());
        if !tracked(key.as_str()) {
            continue;
        }
        match base_attrs.get(&key) {
            Some(old) if *old == a.value => {}
            // Volatile references point into the frame's own defs, which the base never sees.
            Some(old)
                if classifier.references_volatile(old)
                    && classifier.references_volatile(&a.value) => {}
            _ => {
                changes.insert(key, Some(a.value.clone()));
            }
        }
    }

    for a in &b.attrs {
        let key = a.name.clark_key();
        if tracked(&*key) && !seen.iter().any(|k| k.as_str() == &*key) {
            changes.insert(key.into_owned(), None);
        }
    }

    // `textContent` replaces every child, so it can only describe childless elements.
    let mixed = || Mismatch::MixedContent {
        id: pair.id.to_string(),
    };
    if frame.trailing_text(pair.frame) != base.trailing_text(pair.base) {
        return Err(mixed());
    }
    let text = frame.leading_text(pair.frame);
    if text != base.leading_text(pair.base) {
        if frame.has_child_elements(pair.frame) || base.has_child_elements(pair.base) {
            return Err(mixed());
        }
        changes.insert(TEXT_CONTENT.to_string(), Some(text));
    }
    Ok(changes)
}
