//! Tree helpers over `markup5ever_rcdom`
//!
//! The engine works on an [`RcDom`] built by html5ever. A fragment is parsed
//! inside a synthetic `<div id="ml-root">` so that the exact set of nodes the
//! caller handed in can be serialized back out, children only.
//!
//! Nodes are identified by address ([`node_key`]) for the lifetime of one
//! wrap call; the document keeps every handle alive so addresses are stable.

use crate::error::WrapError;
use html5ever::tendril::TendrilSink;
use html5ever::{
    ns, parse_document, serialize, serialize::SerializeOpts, serialize::TraversalScope,
    Attribute, LocalName, ParseOpts, QualName,
};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::default::Default;
use std::rc::Rc;

/// Id of the synthetic element every fragment is parsed inside
pub const ROOT_ID: &str = "ml-root";

/// Set of nodes, keyed by [`node_key`]
pub type NodeSet = HashSet<usize>;

/// Comments and raw-text elements, whose contents are never tags
static OPAQUE: Lazy<Regex> = Lazy::new(|| {
    let raw_text = [
        "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes", "noscript",
    ]
    .iter()
    .map(|tag| format!(r#"<{tag}\b(?:[^"'>]|"[^"]*"|'[^']*')*>.*?</{tag}\s*>"#))
    .collect::<Vec<_>>()
    .join("|");
    Regex::new(&format!(r"(?is)<!--.*?-->|{raw_text}")).expect("opaque pattern should compile")
});

static START_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<[A-Za-z][^\t\n\x0C\r />]*(?:[^"'>]|"[^"]*"|'[^']*')*>"#)
        .expect("start tag pattern should compile")
});

/// A parsed fragment: the owning document plus its synthetic root
pub struct Fragment {
    pub dom: RcDom,
    pub root: Handle,
}

impl Fragment {
    /// The document node, for document-wide queries
    pub fn document(&self) -> &Handle {
        &self.dom.document
    }
}

/// Parse an HTML fragment inside the synthetic root.
///
/// Fails when the root cannot be found afterwards, or when markup in the
/// fragment closed the root early and pushed nodes outside of it (a stray
/// `</div>`, `</body>`): serializing only the root would silently drop them.
///
/// Also fails when the tree holds fewer elements than the fragment has start
/// tags. Tags that are invalid in flow content (`<tr>`, `<td>` outside a
/// table, a nested `<body>`) are discarded by the tree builder while their
/// text survives.
pub fn parse_fragment(html: &str) -> Result<Fragment, WrapError> {
    let wrapped = format!("<div id=\"{}\">{}</div>", ROOT_ID, html);
    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(wrapped);

    let root = find_by_id(&dom.document, ROOT_ID)
        .ok_or_else(|| WrapError::Parse("synthetic root missing".to_string()))?;

    if let Some(container) = parent_of(&root) {
        if container.children.borrow().len() != 1 {
            return Err(WrapError::Parse(
                "fragment markup escaped the synthetic root".to_string(),
            ));
        }
    }

    let expected = count_start_tags(html);
    let built = count_elements(&root);
    if built < expected {
        return Err(WrapError::Parse(format!(
            "tree builder dropped markup ({built} elements for {expected} start tags)"
        )));
    }

    Ok(Fragment { dom, root })
}

/// Serialize the children of `root` (not `root` itself) to a string
pub fn serialize_children(root: &Handle) -> Result<String, WrapError> {
    let mut output = Vec::new();

    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };

    for child in root.children.borrow().iter() {
        let serializable = SerializableHandle::from(child.clone());
        serialize(&mut output, &serializable, opts.clone())?;
    }

    Ok(String::from_utf8(output)?)
}

/// Stable identity of a node within one document
pub fn node_key(node: &Handle) -> usize {
    Rc::as_ptr(node) as usize
}

/// Parent of `node`, if it is attached and the parent is still alive
pub fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take()?;
    let parent = weak.upgrade();
    node.parent.set(Some(weak));
    parent
}

/// Lowercase local name for element nodes, `None` for everything else
pub fn tag_name(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(&*name.local),
        _ => None,
    }
}

pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

/// Value of an attribute on an element node
pub fn attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == attr_name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

/// Whitespace-separated tokens of the `class` attribute
pub fn class_tokens(node: &Handle) -> Vec<String> {
    attr(node, "class")
        .map(|value| value.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn has_class(node: &Handle, class: &str) -> bool {
    attr(node, "class")
        .map(|value| value.split_whitespace().any(|token| token == class))
        .unwrap_or(false)
}

/// Contents of a text node
pub fn text_of(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// All element nodes under `root` (excluding `root`), in document order.
pub fn elements_in_order(root: &Handle) -> Vec<Handle> {
    let mut found = Vec::new();
    let mut stack: Vec<Handle> = root.children.borrow().iter().rev().cloned().collect();

    while let Some(node) = stack.pop() {
        if !is_element(&node) {
            continue;
        }
        stack.extend(node.children.borrow().iter().rev().cloned());
        found.push(node);
    }

    found
}

/// True when `node` or any element ancestor of it is in `set`
pub fn is_within(node: &Handle, set: &NodeSet) -> bool {
    if set.is_empty() {
        return false;
    }
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if !is_element(&candidate) {
            break;
        }
        if set.contains(&node_key(&candidate)) {
            return true;
        }
        current = parent_of(&candidate);
    }
    false
}

/// Replace `old` in `parent`'s child list with `replacements`, in order.
///
/// Returns false (and changes nothing) when `old` is not a child of `parent`.
pub fn replace_child(parent: &Handle, old: &Handle, replacements: Vec<Handle>) -> bool {
    let mut children = parent.children.borrow_mut();
    let Some(index) = children.iter().position(|child| Rc::ptr_eq(child, old)) else {
        return false;
    };

    for node in &replacements {
        node.parent.set(Some(Rc::downgrade(parent)));
    }
    old.parent.set(None);
    children.splice(index..index + 1, replacements);
    true
}

/// Append `child` to `parent`, setting the parent link
pub fn append(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// Create an HTML element with attributes
pub fn create_element(tag: &str, attrs: Vec<(&str, &str)>) -> Handle {
    let qual_name = QualName::new(None, ns!(html), LocalName::from(tag));
    let attributes = attrs
        .into_iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(name)),
            value: value.to_string().into(),
        })
        .collect();

    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Element {
            name: qual_name,
            attrs: RefCell::new(attributes),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: false,
        },
    })
}

/// Create a text node
pub fn create_text(text: &str) -> Handle {
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Text {
            contents: RefCell::new(text.to_string().into()),
        },
    })
}

/// Start tags in `html`, not counting anything inside comments or raw-text
/// elements (the raw-text element itself counts once)
fn count_start_tags(html: &str) -> usize {
    let mut count = 0;
    let mut last = 0;
    for opaque in OPAQUE.find_iter(html) {
        count += START_TAG.find_iter(&html[last..opaque.start()]).count();
        if !opaque.as_str().starts_with("<!") {
            count += 1;
        }
        last = opaque.end();
    }
    count + START_TAG.find_iter(&html[last..]).count()
}

/// Elements under `root` (excluding `root`), template contents included
fn count_elements(root: &Handle) -> usize {
    let mut count = 0;
    let mut stack: Vec<Handle> = root.children.borrow().iter().cloned().collect();

    while let Some(node) = stack.pop() {
        if let NodeData::Element {
            template_contents, ..
        } = &node.data
        {
            count += 1;
            if let Some(contents) = template_contents.borrow().as_ref() {
                stack.extend(contents.children.borrow().iter().cloned());
            }
            stack.extend(node.children.borrow().iter().cloned());
        }
    }

    count
}

fn find_by_id(start: &Handle, id: &str) -> Option<Handle> {
    elements_in_order(start)
        .into_iter()
        .find(|node| attr(node, "id").as_deref() == Some(id))
}
