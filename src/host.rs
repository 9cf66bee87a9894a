//! The DOM as seen by the patch engine.
//!
//! Everything here is infallible. The engine checks node kinds before it issues an operation,
//! and host implementations report platform failures their own way.

use core::{fmt::Debug, hash::Hash};

pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
	Html,
	Svg,
}

impl Namespace {
	#[must_use]
	pub fn uri(self) -> &'static str {
		match self {
			Namespace::Html => HTML_NAMESPACE,
			Namespace::Svg => SVG_NAMESPACE,
		}
	}
}

/// The physical kind of a node.
///
/// Comments double as logical containers, so they are the only node kind that can carry logical children
/// without having DOM children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
	Element,
	Text,
	Comment,
	/// Documents, fragments and anything else the engine never creates itself.
	Other,
}

pub trait HostDom {
	/// A cheap, comparable handle to one DOM node.
	type Node: Clone + Eq + Hash + Debug;

	fn create_element(&mut self, tag_name: &str, namespace: Namespace) -> Self::Node;
	fn create_text_node(&mut self, data: &str) -> Self::Node;
	fn create_comment(&mut self, data: &str) -> Self::Node;

	fn node_kind(&self, node: &Self::Node) -> NodeKind;
	/// The [***tagName***](https://developer.mozilla.org/en-US/docs/Web/API/Element/tagName), i.e. upper case for HTML elements.
	///
	/// Empty for anything that isn't an element.
	fn tag_name(&self, element: &Self::Node) -> String;
	fn namespace(&self, element: &Self::Node) -> Option<Namespace>;

	fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;
	fn first_child(&self, node: &Self::Node) -> Option<Self::Node>;
	fn last_child(&self, node: &Self::Node) -> Option<Self::Node>;
	fn previous_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
	fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

	/// Moves `child` into `parent` before `reference`, or to the end if `reference` is [`None`].
	fn insert_before(&mut self, parent: &Self::Node, child: &Self::Node, reference: Option<&Self::Node>);
	/// Detaches `node` from its parent, if any.
	fn remove(&mut self, node: &Self::Node);

	fn attribute(&self, element: &Self::Node, name: &str) -> Option<String>;
	fn set_attribute(&mut self, element: &Self::Node, name: &str, value: &str);
	fn remove_attribute(&mut self, element: &Self::Node, name: &str);

	/// Character data of text and comment nodes.
	fn data(&self, node: &Self::Node) -> String;
	fn set_data(&mut self, node: &Self::Node, data: &str);

	/// The `value` property of form elements.
	fn value(&self, element: &Self::Node) -> String;
	/// Sets the `value` property. [`None`] stands for JavaScript `null`.
	fn set_value(&mut self, element: &Self::Node, value: Option<&str>);
	fn checked(&self, element: &Self::Node) -> bool;
	fn set_checked(&mut self, element: &Self::Node, checked: bool);

	/// Parses `markup` as the content of an element in `namespace` and returns the detached top-level nodes.
	fn parse_fragment(&mut self, markup: &str, namespace: Namespace) -> Vec<Self::Node>;
}
