//! Frame preparation: strip per-render noise and give anonymous elements deterministic ids.
//!
//! Existing ids are never rewritten, and `url(#..)` references are left alone. Synthetic ids are
//! `<tag>_<n>` unless the document already uses that namespace for `<tag>`, in which case an
//! alternate prefix is chosen so synthetic and producer ids can never collide.

use crate::classify::Classifier;
use crate::dom::{DomError, NodeId, SvgDocument};
use crate::{Error, Result};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

fn re_xml_decl() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"(?i)<\?xml[^?]*\?>").unwrap())
}

fn re_doctype() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"(?i)<!DOCTYPE[^>]*>").unwrap())
}

fn strip_prolog(svg: &str) -> String {
    let s = re_xml_decl().replace_all(svg, "");
    re_doctype().replace_all(&s, "").into_owned()
}

/// Parses and prepares one frame. `frame` only labels errors.
pub(crate) fn prepare_document(
    svg: &str,
    frame: usize,
    classifier: &Classifier,
) -> Result<SvgDocument> {
    let cleaned = strip_prolog(svg);
    let mut doc = SvgDocument::parse(&cleaned).map_err(|e| match e {
        DomError::Xml(source) => Error::Parse { frame, source },
        DomError::NotSvg(found) => Error::MissingSvgRoot { frame, found },
    })?;

    drop_metadata(&mut doc);
    assign_synthetic_ids(&mut doc, classifier);
    Ok(doc)
}

fn drop_metadata(doc: &mut SvgDocument) {
    let metadata: Vec<NodeId> = doc
        .elements()
        .into_iter()
        .filter(|n| doc.element(*n).is_some_and(|el| el.tag() == "metadata"))
        .collect();
    for node in metadata {
        doc.detach(node);
    }
}

/// Anonymous, numberable elements in document order. Text groups are not entered.
fn anonymous_elements(doc: &SvgDocument, classifier: &Classifier) -> Vec<(NodeId, String)> {
    let mut out = Vec::new();
    let mut stack = vec![doc.root()];
    while let Some(node) = stack.pop() {
        let Some(el) = doc.element(node) else {
            continue;
        };
        match el.id() {
            Some(id) if classifier.is_text_group(id) => continue,
            Some(_) => {}
            None if classifier.skips_auto_id(el.tag()) => {}
            None => out.push((node, el.tag().to_string())),
        }
        stack.extend(doc.children(node).iter().rev().copied());
    }
    out
}

/// True when some id is `<prefix><tag>_<digits>`.
fn namespace_in_use(existing: &BTreeSet<String>, prefix: &str, tag: &str) -> bool {
    existing.iter().any(|id| {
        id.strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix(tag))
            .and_then(|rest| rest.strip_prefix('_'))
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    })
}

fn pick_prefix(existing: &BTreeSet<String>, tag: &str, alternate: &str) -> String {
    if !namespace_in_use(existing, "", tag) {
        return String::new();
    }
    if !namespace_in_use(existing, alternate, tag) {
        return alternate.to_string();
    }
    (1usize..)
        .map(|k| format!("{alternate}{k}_"))
        .find(|p| !namespace_in_use(existing, p, tag))
        .unwrap_or_default()
}

fn assign_synthetic_ids(doc: &mut SvgDocument, classifier: &Classifier) {
    let order = doc.elements();
    let existing: BTreeSet<String> = order
        .iter()
        .filter_map(|n| doc.element(*n).and_then(|el| el.id()))
        .map(str::to_string)
        .collect();

    let targets = anonymous_elements(doc, classifier);

    let mut used = existing.clone();
    let mut prefixes: BTreeMap<String, String> = BTreeMap::new();
    let mut counters: BTreeMap<String, usize> = BTreeMap::new();
    for (node, tag) in targets {
        let prefix = prefixes
            .entry(tag.clone())
            .or_insert_with(|| pick_prefix(&existing, &tag, classifier.auto_id_prefix()));
        let counter = counters.entry(tag.clone()).or_insert(0);
        let id = loop {
            let candidate = format!("{prefix}{tag}_{counter}");
            *counter += 1;
            if used.insert(candidate.clone()) {
                break candidate;
            }
        };
        doc.set_attr(node, "id", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeltaConfig;

    fn prepare(svg: &str) -> SvgDocument {
        let classifier = Classifier::new(&DeltaConfig::default()).unwrap();
        prepare_document(svg, 0, &classifier).unwrap()
    }

    fn ids(doc: &SvgDocument) -> Vec<String> {
        doc.elements()
            .into_iter()
            .filter_map(|n| doc.element(n).and_then(|el| el.id()).map(str::to_string))
            .collect()
    }

    #[test]
    fn strips_prolog_and_metadata() {
        let doc = prepare(concat!(
            r#"<?xml version="1.0" encoding="utf-8" standalone="no"?>"#,
            r#"<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">"#,
            r#"<svg xmlns="http://www.w3.org/2000/svg"><metadata><date>2024</date></metadata><g id="figure_1"/></svg>"#,
        ));
        let out = doc.to_svg_string();
        assert!(!out.contains("metadata"));
        assert!(!out.contains("<?xml"));
        assert!(out.contains(r#"<g id="figure_1"/>"#));
    }

    #[test]
    fn anonymous_elements_get_per_tag_counters() {
        let doc = prepare(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><defs><path/></defs><g><path/><rect/><path/></g></svg>"#,
        );
        assert_eq!(ids(&doc), ["path_0", "g_0", "path_1", "rect_0", "path_2"]);
    }

    #[test]
    fn switches_namespace_when_plain_ids_are_taken() {
        let doc = prepare(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><path id="path_0"/><path/><rect/></svg>"#,
        );
        assert_eq!(ids(&doc), ["path_0", "mb_auto_path_0", "rect_0"]);
    }

    #[test]
    fn alternate_namespace_is_also_checked() {
        let doc = prepare(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><path id="path_3"/><path id="mb_auto_path_0"/><path/></svg>"#,
        );
        assert_eq!(ids(&doc), ["path_3", "mb_auto_path_0", "mb_auto_1_path_0"]);
    }

    #[test]
    fn text_group_descendants_stay_anonymous() {
        let doc = prepare(
            r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><g id="text_1"><g><use xlink:href="#glyph"/></g></g><use xlink:href="#glyph"/></svg>"##,
        );
        assert_eq!(ids(&doc), ["text_1", "use_0"]);
    }

    #[test]
    fn malformed_input_reports_the_frame() {
        let classifier = Classifier::new(&DeltaConfig::default()).unwrap();
        let err = prepare_document("<svg><g></svg>", 4, &classifier).unwrap_err();
        assert!(matches!(err, Error::Parse { frame: 4, .. }));
    }
}
