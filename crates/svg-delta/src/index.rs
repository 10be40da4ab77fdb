use crate::classify::Classifier;
use crate::dom::{NodeId, SvgDocument};
use std::collections::BTreeMap;

/// Containers whose content is never painted directly.
const NON_RENDERING: &[&str] = &[
    "defs",
    "clipPath",
    "mask",
    "marker",
    "pattern",
    "symbol",
    "linearGradient",
    "radialGradient",
    "filter",
    "style",
    "title",
    "desc",
    "metadata",
];

/// Where an id sits in the tree, as far as correspondence checks care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Occurrence<'a> {
    pub(crate) node: NodeId,
    pub(crate) tag: &'a str,
    /// Id of the nearest major-region ancestor.
    pub(crate) region: Option<&'a str>,
    /// Kind of the nearest owner-group ancestor.
    pub(crate) owner: Option<&'a str>,
    pub(crate) in_legend: bool,
    pub(crate) text_group: bool,
    /// False for non-rendering containers and anything inside one.
    pub(crate) rendered: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct Scope<'a> {
    region: Option<&'a str>,
    owner: Option<&'a str>,
    in_legend: bool,
    in_resources: bool,
}

/// All ids of one frame. Descendants of text groups are not indexed.
#[derive(Debug, Default)]
pub(crate) struct IdIndex<'a> {
    by_id: BTreeMap<&'a str, Vec<Occurrence<'a>>>,
    order: Vec<&'a str>,
}

impl<'a> IdIndex<'a> {
    pub(crate) fn build(doc: &'a SvgDocument, classifier: &Classifier) -> Self {
        let mut index = Self::default();
        // Explicit stack: nesting depth is input-controlled.
        let mut stack = vec![(doc.root(), Scope::default())];
        while let Some((node, scope)) = stack.pop() {
            let Some(el) = doc.element(node) else {
                continue;
            };
            let mut child_scope = scope;
            child_scope.in_resources = scope.in_resources || NON_RENDERING.contains(&el.tag());

            if let Some(id) = el.id() {
                let text_group = classifier.is_text_group(id);
                let in_legend = scope.in_legend || classifier.is_legend(id);
                let entry = index.by_id.entry(id).or_default();
                if entry.is_empty() {
                    index.order.push(id);
                }
                entry.push(Occurrence {
                    node,
                    tag: el.tag(),
                    region: scope.region,
                    owner: scope.owner,
                    in_legend,
                    text_group,
                    rendered: !child_scope.in_resources,
                });

                if text_group {
                    continue;
                }
                if classifier.is_region(id) {
                    child_scope.region = Some(id);
                }
                if let Some(kind) = classifier.owner_kind(id) {
                    child_scope.owner = Some(kind);
                }
                child_scope.in_legend = in_legend;
            }

            stack.extend(doc.children(node).iter().rev().map(|c| (*c, child_scope)));
        }
        index
    }

    pub(crate) fn get(&self, id: &str) -> Option<&[Occurrence<'a>]> {
        self.by_id.get(id).map(Vec::as_slice)
    }

    /// Distinct ids in document order of their first occurrence.
    pub(crate) fn ids(&self) -> &[&'a str] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeltaConfig;

    #[test]
    fn records_region_owner_and_legend_scope() {
        let doc = SvgDocument::parse(concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg">"#,
            r#"<g id="axes_1"><g id="line2d_1"><path id="a"/></g>"#,
            r#"<g id="legend_1"><g id="patch_4"><path id="b"/></g></g></g>"#,
            r#"<g id="text_1"><path id="glyph"/></g>"#,
            "</svg>"
        ))
        .unwrap();
        let classifier = Classifier::new(&DeltaConfig::default()).unwrap();
        let index = IdIndex::build(&doc, &classifier);

        let a = index.get("a").unwrap()[0];
        assert_eq!(a.region, Some("axes_1"));
        assert_eq!(a.owner, Some("line2d"));
        assert!(!a.in_legend);

        let b = index.get("b").unwrap()[0];
        assert_eq!(b.region, Some("legend_1"));
        assert_eq!(b.owner, Some("patch"));
        assert!(b.in_legend);

        assert!(index.get("legend_1").unwrap()[0].in_legend);
        assert!(index.get("text_1").unwrap()[0].text_group);
        assert!(index.get("glyph").is_none());
        assert_eq!(
            index.ids(),
            ["axes_1", "line2d_1", "a", "legend_1", "patch_4", "b", "text_1"]
        );
    }

    #[test]
    fn duplicate_ids_keep_every_occurrence() {
        let doc = SvgDocument::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><g id="x"/><g id="x"/></svg>"#,
        )
        .unwrap();
        let classifier = Classifier::new(&DeltaConfig::default()).unwrap();
        let index = IdIndex::build(&doc, &classifier);
        assert_eq!(index.get("x").map(<[_]>::len), Some(2));
        assert_eq!(index.ids(), ["x"]);
    }

    #[test]
    fn resource_content_is_not_rendered() {
        let doc = SvgDocument::parse(concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg">"#,
            r#"<defs id="defs_1"><linearGradient id="grad"><stop id="s"/></linearGradient></defs>"#,
            r#"<clipPath id="clip"><rect id="r"/></clipPath>"#,
            r#"<g id="line2d_1"><path id="a"/></g>"#,
            "</svg>"
        ))
        .unwrap();
        let classifier = Classifier::new(&DeltaConfig::default()).unwrap();
        let index = IdIndex::build(&doc, &classifier);

        for id in ["defs_1", "grad", "s", "clip", "r"] {
            assert!(!index.get(id).unwrap()[0].rendered, "{id}");
        }
        assert!(index.get("line2d_1").unwrap()[0].rendered);
        assert!(index.get("a").unwrap()[0].rendered);
    }
}
