//! An arena-backed DOM that lives entirely in Rust memory.
//!
//! [`MemoryDom`] implements [`HostDom`] closely enough for the patch engine (and its tests) to run natively,
//! including the form element properties the attribute special-casing relies on.
//! Markup is parsed with [`html5ever`].
//!
//! Nodes are never freed: removing a node only detaches it, like in a browser where something may still hold a reference.

use crate::host::{HostDom, Namespace, NodeKind, HTML_NAMESPACE, SVG_NAMESPACE};
use core::fmt::Write as _;
use html5ever::{parse_fragment, tendril::TendrilSink, LocalName, Namespace as NamespaceAtom, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tracing::{error, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

#[derive(Debug, Default)]
pub struct MemoryDom {
	nodes: Vec<NodeRecord>,
}

#[derive(Debug)]
struct NodeRecord {
	content: Content,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

#[derive(Debug)]
enum Content {
	Element(ElementData),
	Text(String),
	Comment(String),
}

#[derive(Debug)]
struct ElementData {
	local_name: String,
	namespace: Namespace,
	attributes: Vec<(String, String)>,
	/// The `value` property once it diverges from the attribute (`INPUT`, `TEXTAREA`).
	value: Option<String>,
	checked: bool,
	/// The selected `OPTION` of a `SELECT`.
	selected: Option<NodeId>,
}

const VOID_ELEMENTS: &[&str] = &["area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr"];

impl MemoryDom {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	fn record(&self, node: NodeId) -> &NodeRecord {
		&self.nodes[node.0 as usize]
	}

	fn record_mut(&mut self, node: NodeId) -> &mut NodeRecord {
		&mut self.nodes[node.0 as usize]
	}

	fn element(&self, node: NodeId) -> Option<&ElementData> {
		match &self.record(node).content {
			Content::Element(element) => Some(element),
			Content::Text(_) | Content::Comment(_) => None,
		}
	}

	fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
		match &mut self.record_mut(node).content {
			Content::Element(element) => Some(element),
			Content::Text(_) | Content::Comment(_) => None,
		}
	}

	fn push(&mut self, content: Content) -> NodeId {
		let id = NodeId(self.nodes.len() as u32);
		self.nodes.push(NodeRecord { content, parent: None, children: Vec::new() });
		id
	}

	fn detach(&mut self, node: NodeId) {
		if let Some(parent) = self.record_mut(node).parent.take() {
			self.record_mut(parent).children.retain(|&child| child != node);
		}
	}

	/// Physical child nodes, in order.
	#[must_use]
	pub fn child_nodes(&self, node: NodeId) -> &[NodeId] {
		&self.record(node).children
	}

	/// Concatenated data of all descendant text nodes.
	#[must_use]
	pub fn text_content(&self, node: NodeId) -> String {
		let mut text = String::new();
		self.collect_text(node, &mut text);
		text
	}

	fn collect_text(&self, node: NodeId, text: &mut String) {
		match &self.record(node).content {
			Content::Text(data) => text.push_str(data),
			Content::Comment(_) => (),
			Content::Element(_) => {
				for &child in &self.record(node).children {
					self.collect_text(child, text)
				}
			}
		}
	}

	/// Serializes the children of `node`, comments included.
	#[must_use]
	pub fn inner_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		for &child in &self.record(node).children {
			self.serialize(child, &mut html);
		}
		html
	}

	fn serialize(&self, node: NodeId, html: &mut String) {
		match &self.record(node).content {
			Content::Text(data) => html.push_str(&escape(data, false)),
			Content::Comment(data) => {
				let _ = write!(html, "<!--{}-->", data);
			}
			Content::Element(element) => {
				let _ = write!(html, "<{}", element.local_name);
				for (name, value) in &element.attributes {
					let _ = write!(html, " {}=\"{}\"", name, escape(value, true));
				}
				html.push('>');
				if element.namespace == Namespace::Html && VOID_ELEMENTS.contains(&element.local_name.as_str()) {
					return;
				}
				for &child in &self.record(node).children {
					self.serialize(child, html);
				}
				let _ = write!(html, "</{}>", element.local_name);
			}
		}
	}

	fn is_tag(&self, node: NodeId, tag_name: &str) -> bool {
		self.element(node).map_or(false, |element| element.namespace == Namespace::Html && element.local_name.eq_ignore_ascii_case(tag_name))
	}

	fn descendants(&self, node: NodeId) -> Vec<NodeId> {
		let mut descendants = Vec::new();
		let mut stack: Vec<NodeId> = self.record(node).children.iter().rev().copied().collect();
		while let Some(next) = stack.pop() {
			descendants.push(next);
			stack.extend(self.record(next).children.iter().rev().copied());
		}
		descendants
	}

	fn options(&self, select: NodeId) -> impl Iterator<Item = NodeId> + '_ {
		self.descendants(select).into_iter().filter(move |&node| self.is_tag(node, "option"))
	}

	fn option_value(&self, option: NodeId) -> String {
		self.attribute(&option, "value").unwrap_or_else(|| self.text_content(option))
	}

	fn import(&mut self, handle: &Handle) -> Option<NodeId> {
		match &handle.data {
			NodeData::Element { name, attrs, .. } => {
				let namespace = if &*name.ns == SVG_NAMESPACE { Namespace::Svg } else { Namespace::Html };
				let element = self.create_element(&name.local, namespace);
				for attribute in attrs.borrow().iter() {
					self.set_attribute(&element, &attribute.name.local, &attribute.value);
				}
				for child in handle.children.borrow().iter() {
					if let Some(child) = self.import(child) {
						self.insert_before(&element, &child, None);
					}
				}
				Some(element)
			}
			NodeData::Text { contents } => Some(self.create_text_node(&contents.borrow())),
			NodeData::Comment { contents } => Some(self.create_comment(contents)),
			NodeData::Document | NodeData::Doctype { .. } | NodeData::ProcessingInstruction { .. } => None,
		}
	}
}

fn escape(text: &str, attribute: bool) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' if !attribute => escaped.push_str("&lt;"),
			'>' if !attribute => escaped.push_str("&gt;"),
			'"' if attribute => escaped.push_str("&quot;"),
			c => escaped.push(c),
		}
	}
	escaped
}

impl HostDom for MemoryDom {
	type Node = NodeId;

	fn create_element(&mut self, tag_name: &str, namespace: Namespace) -> NodeId {
		self.push(Content::Element(ElementData {
			local_name: tag_name.to_owned(),
			namespace,
			attributes: Vec::new(),
			value: None,
			checked: false,
			selected: None,
		}))
	}

	fn create_text_node(&mut self, data: &str) -> NodeId {
		self.push(Content::Text(data.to_owned()))
	}

	fn create_comment(&mut self, data: &str) -> NodeId {
		self.push(Content::Comment(data.to_owned()))
	}

	fn node_kind(&self, node: &NodeId) -> NodeKind {
		match self.record(*node).content {
			Content::Element(_) => NodeKind::Element,
			Content::Text(_) => NodeKind::Text,
			Content::Comment(_) => NodeKind::Comment,
		}
	}

	fn tag_name(&self, element: &NodeId) -> String {
		match self.element(*element) {
			Some(ElementData { local_name, namespace: Namespace::Html, .. }) => local_name.to_ascii_uppercase(),
			Some(ElementData { local_name, namespace: Namespace::Svg, .. }) => local_name.clone(),
			None => String::new(),
		}
	}

	fn namespace(&self, element: &NodeId) -> Option<Namespace> {
		self.element(*element).map(|element| element.namespace)
	}

	fn parent_node(&self, node: &NodeId) -> Option<NodeId> {
		self.record(*node).parent
	}

	fn first_child(&self, node: &NodeId) -> Option<NodeId> {
		self.record(*node).children.first().copied()
	}

	fn last_child(&self, node: &NodeId) -> Option<NodeId> {
		self.record(*node).children.last().copied()
	}

	fn previous_sibling(&self, node: &NodeId) -> Option<NodeId> {
		let siblings = &self.record(self.record(*node).parent?).children;
		let index = siblings.iter().position(|sibling| sibling == node)?;
		index.checked_sub(1).map(|index| siblings[index])
	}

	fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
		let siblings = &self.record(self.record(*node).parent?).children;
		let index = siblings.iter().position(|sibling| sibling == node)?;
		siblings.get(index + 1).copied()
	}

	fn insert_before(&mut self, parent: &NodeId, child: &NodeId, reference: Option<&NodeId>) {
		self.detach(*child);
		let siblings = &mut self.record_mut(*parent).children;
		let index = match reference {
			None => siblings.len(),
			Some(reference) => match siblings.iter().position(|sibling| sibling == reference) {
				Some(index) => index,
				None => {
					error!("Reference node {:?} is not a child of {:?}. Appending instead.", reference, parent);
					siblings.len()
				}
			},
		};
		siblings.insert(index, *child);
		self.record_mut(*child).parent = Some(*parent);
	}

	fn remove(&mut self, node: &NodeId) {
		self.detach(*node)
	}

	fn attribute(&self, element: &NodeId, name: &str) -> Option<String> {
		self.element(*element)?.attributes.iter().find(|(n, _)| n == name).map(|(_, value)| value.clone())
	}

	fn set_attribute(&mut self, element: &NodeId, name: &str, value: &str) {
		let attributes = match self.element_mut(*element) {
			Some(element) => &mut element.attributes,
			None => return error!("Tried to set attribute {:?} on non-element {:?}.", name, element),
		};
		match attributes.iter_mut().find(|(n, _)| n == name) {
			Some((_, existing)) => value.clone_into(existing),
			None => attributes.push((name.to_owned(), value.to_owned())),
		}
	}

	fn remove_attribute(&mut self, element: &NodeId, name: &str) {
		if let Some(element) = self.element_mut(*element) {
			element.attributes.retain(|(n, _)| n != name)
		}
	}

	fn data(&self, node: &NodeId) -> String {
		match &self.record(*node).content {
			Content::Text(data) | Content::Comment(data) => data.clone(),
			Content::Element(_) => String::new(),
		}
	}

	fn set_data(&mut self, node: &NodeId, data: &str) {
		match &mut self.record_mut(*node).content {
			Content::Text(existing) | Content::Comment(existing) => data.clone_into(existing),
			Content::Element(_) => error!("Tried to set character data on element {:?}.", node),
		}
	}

	fn value(&self, element: &NodeId) -> String {
		let data = match self.element(*element) {
			Some(data) => data,
			None => return String::new(),
		};
		if self.is_tag(*element, "select") {
			// A single-selection `SELECT` without explicit selection shows its first option.
			let selected = data.selected.filter(|selected| self.options(*element).any(|option| option == *selected));
			return selected.or_else(|| self.options(*element).next()).map(|option| self.option_value(option)).unwrap_or_default();
		}
		if self.is_tag(*element, "option") {
			return self.option_value(*element);
		}
		if let Some(value) = &data.value {
			return value.clone();
		}
		if self.is_tag(*element, "textarea") {
			return self.text_content(*element);
		}
		self.attribute(element, "value").unwrap_or_default()
	}

	fn set_value(&mut self, element: &NodeId, value: Option<&str>) {
		if self.is_tag(*element, "select") {
			let selected = value.and_then(|value| self.options(*element).find(|&option| self.option_value(option) == value));
			trace!(?selected, "Selecting option.");
			if let Some(data) = self.element_mut(*element) {
				data.selected = selected;
			}
		} else if self.is_tag(*element, "option") {
			self.set_attribute(element, "value", value.unwrap_or_default());
		} else if let Some(data) = self.element_mut(*element) {
			data.value = Some(value.unwrap_or_default().to_owned());
		}
	}

	fn checked(&self, element: &NodeId) -> bool {
		self.element(*element).map_or(false, |element| element.checked)
	}

	fn set_checked(&mut self, element: &NodeId, checked: bool) {
		if let Some(element) = self.element_mut(*element) {
			element.checked = checked;
		}
	}

	fn parse_fragment(&mut self, markup: &str, namespace: Namespace) -> Vec<NodeId> {
		let context = match namespace {
			Namespace::Html => QualName::new(None, NamespaceAtom::from(HTML_NAMESPACE), LocalName::from("body")),
			Namespace::Svg => QualName::new(None, NamespaceAtom::from(SVG_NAMESPACE), LocalName::from("svg")),
		};
		let dom = parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new()).one(markup);

		// The fragment's nodes are the children of a synthetic root element.
		let document_children = dom.document.children.borrow();
		let nodes = match document_children.first() {
			Some(root) => root.children.borrow().iter().filter_map(|child| self.import(child)).collect(),
			None => Vec::new(),
		};
		nodes
	}
}
