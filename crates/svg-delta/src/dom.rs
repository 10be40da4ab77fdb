//! Owned, mutable SVG tree.
//!
//! `roxmltree` gives us a strict, read-only parse. Preparation needs to add ids and drop
//! `<metadata>`, and the delta emitter needs to serialize subtrees, so the parsed document is
//! copied into a small index arena. Nodes are addressed by [`NodeId`]; detached nodes stay in the
//! arena but are no longer reachable from the root.

use std::borrow::Cow;
use std::fmt::Write as _;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            prefix: None,
            local: local.into(),
        }
    }

    /// Key used in delta change-sets: `{uri}local` for namespaced names, `local` otherwise.
    pub fn clark_key(&self) -> Cow<'_, str> {
        match &self.namespace {
            Some(ns) => Cow::Owned(format!("{{{ns}}}{}", self.local)),
            None => Cow::Borrowed(self.local.as_str()),
        }
    }

    fn qualified(&self) -> Cow<'_, str> {
        match &self.prefix {
            Some(p) => Cow::Owned(format!("{p}:{}", self.local)),
            None => Cow::Borrowed(self.local.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    /// Namespace declarations introduced on this element (prefix, uri).
    pub namespaces: Vec<(Option<String>, String)>,
    pub attrs: Vec<Attribute>,
    pub children: Vec<NodeId>,
}

impl Element {
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.namespace.is_none() && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id").filter(|v| !v.is_empty())
    }

    pub fn tag(&self) -> &str {
        &self.name.local
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    parent: Option<NodeId>,
    data: NodeData,
}

#[derive(Debug, thiserror::Error)]
pub enum DomError {
    #[error(transparent)]
    Xml(#[from] roxmltree::Error),
    #[error("root element is <{0}>")]
    NotSvg(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgDocument {
    nodes: Vec<Node>,
    root: NodeId,
}

impl SvgDocument {
    pub fn parse(text: &str) -> Result<Self, DomError> {
        let doc = roxmltree::Document::parse(text)?;
        let root = doc.root_element();
        if root.tag_name().name() != "svg" {
            return Err(DomError::NotSvg(root.tag_name().name().to_string()));
        }

        let mut out = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        // Explicit stack: nesting depth is input-controlled.
        let mut stack = vec![(root, None)];
        while let Some((node, parent)) = stack.pop() {
            let data = if node.is_element() {
                NodeData::Element(element_from(node))
            } else if node.is_text() {
                NodeData::Text(node.text().unwrap_or_default().to_string())
            } else {
                continue;
            };
            let id = out.push(parent, data);
            if let Some(NodeData::Element(el)) = parent.map(|p| &mut out.nodes[p.0].data) {
                el.children.push(id);
            }
            if node.is_element() {
                let children: Vec<_> = node.children().collect();
                stack.extend(children.into_iter().rev().map(|c| (c, Some(id))));
            }
        }
        Ok(out)
    }

    fn push(&mut self, parent: Option<NodeId>, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { parent, data });
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.0].data
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        match &self.nodes[node.0].data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[node.0].data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.element(node).map(|el| el.children.as_slice()).unwrap_or(&[])
    }

    /// Element nodes reachable from the root, in document (pre-)order.
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            let Some(el) = self.element(node) else {
                continue;
            };
            out.push(node);
            stack.extend(el.children.iter().rev().copied());
        }
        out
    }

    /// Text before the first child element, trimmed.
    pub fn leading_text(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            match self.data(*child) {
                NodeData::Text(t) => out.push_str(t),
                NodeData::Element(_) => break,
            }
        }
        out.trim().to_string()
    }

    /// Text after the first child element, trimmed and concatenated.
    pub fn trailing_text(&self, node: NodeId) -> String {
        let mut out = String::new();
        let mut seen_element = false;
        for child in self.children(node) {
            match self.data(*child) {
                NodeData::Text(t) if seen_element => out.push_str(t.trim()),
                NodeData::Text(_) => {}
                NodeData::Element(_) => seen_element = true,
            }
        }
        out
    }

    pub fn has_child_elements(&self, node: NodeId) -> bool {
        self.children(node)
            .iter()
            .any(|c| matches!(self.data(*c), NodeData::Element(_)))
    }

    /// Sets an un-namespaced attribute, replacing an existing value.
    pub fn set_attr(&mut self, node: NodeId, local: &str, value: impl Into<String>) {
        let Some(el) = self.element_mut(node) else {
            return;
        };
        let value = value.into();
        match el
            .attrs
            .iter_mut()
            .find(|a| a.name.namespace.is_none() && a.name.local == local)
        {
            Some(a) => a.value = value,
            None => el.attrs.push(Attribute {
                name: QName::local(local),
                value,
            }),
        }
    }

    /// Unlinks `node` from its parent. The root cannot be detached.
    pub fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if let Some(el) = self.element_mut(parent) {
            el.children.retain(|c| *c != node);
        }
        self.nodes[node.0].parent = None;
    }

    pub fn to_svg_string(&self) -> String {
        let mut out = String::new();
        self.write_node(self.root, &mut out);
        out
    }

    /// Serializes a single subtree. Namespace declarations made on ancestors are not repeated.
    pub fn node_to_string(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out);
        out
    }

    fn write_node(&self, node: NodeId, out: &mut String) {
        enum Step {
            Open(NodeId),
            Close(NodeId),
        }

        let mut stack = vec![Step::Open(node)];
        while let Some(step) = stack.pop() {
            let n = match step {
                Step::Open(n) => n,
                Step::Close(n) => {
                    if let Some(el) = self.element(n) {
                        out.push_str("</");
                        out.push_str(&el.name.qualified());
                        out.push('>');
                    }
                    continue;
                }
            };
            let el = match self.data(n) {
                NodeData::Text(t) => {
                    out.push_str(&escape_text(t));
                    continue;
                }
                NodeData::Element(el) => el,
            };

            out.push('<');
            out.push_str(&el.name.qualified());
            for (prefix, uri) in &el.namespaces {
                match prefix {
                    Some(p) => {
                        let _ = write!(out, r#" xmlns:{p}="{}""#, escape_attr(uri));
                    }
                    None => {
                        let _ = write!(out, r#" xmlns="{}""#, escape_attr(uri));
                    }
                }
            }
            for a in &el.attrs {
                let _ = write!(
                    out,
                    r#" {}="{}""#,
                    a.name.qualified(),
                    escape_attr(&a.value)
                );
            }
            if el.children.is_empty() {
                out.push_str("/>");
                continue;
            }
            out.push('>');
            stack.push(Step::Close(n));
            stack.extend(el.children.iter().rev().map(|c| Step::Open(*c)));
        }
    }
}

fn element_from(node: roxmltree::Node<'_, '_>) -> Element {
    let tag = node.tag_name();
    let name = QName {
        namespace: tag.namespace().map(str::to_string),
        prefix: tag.namespace().and_then(|uri| element_prefix(node, uri)),
        local: tag.name().to_string(),
    };
    let attrs = node
        .attributes()
        .map(|a| Attribute {
            name: QName {
                namespace: a.namespace().map(str::to_string),
                prefix: a.namespace().and_then(|uri| attribute_prefix(node, uri)),
                local: a.name().to_string(),
            },
            value: a.value().to_string(),
        })
        .collect();
    Element {
        name,
        namespaces: declared_namespaces(node),
        attrs,
        children: Vec::new(),
    }
}

fn element_prefix(node: roxmltree::Node<'_, '_>, uri: &str) -> Option<String> {
    if node
        .namespaces()
        .any(|ns| ns.name().is_none() && ns.uri() == uri)
    {
        return None;
    }
    attribute_prefix(node, uri)
}

fn attribute_prefix(node: roxmltree::Node<'_, '_>, uri: &str) -> Option<String> {
    if uri == XML_NS {
        return Some("xml".to_string());
    }
    node.namespaces()
        .find(|ns| ns.name().is_some() && ns.uri() == uri)
        .and_then(|ns| ns.name())
        .map(str::to_string)
}

fn declared_namespaces(node: roxmltree::Node<'_, '_>) -> Vec<(Option<String>, String)> {
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();

    node.namespaces()
        .filter(|ns| ns.name() != Some("xml"))
        .filter(|ns| !inherited.contains(&(ns.name(), ns.uri())))
        .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
        .collect()
}

fn escape_text(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

fn escape_attr(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}
