//! [`HostDom`] over the browser's DOM, and delegated event listeners on a [***Document***](https://developer.mozilla.org/en-US/docs/Web/API/Document).

use crate::{
	batch::RendererId,
	events::{DelegatedEvents, EventDispatch, GlobalListeners},
	host::{HostDom, Namespace, NodeKind, SVG_NAMESPACE},
	renderer::Renderer,
};
use core::{
	cell::{Cell, RefCell},
	hash::{Hash, Hasher},
};
use js_sys::{Function, Reflect};
use std::rc::{Rc, Weak};
use tracing::{error, instrument, trace, trace_span, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue, UnwrapThrowExt};
use web_sys::{CharacterData, Document, Element, HtmlInputElement, HtmlSelectElement, HtmlTemplateElement, HtmlTextAreaElement, Node};

/// Expando property holding a node's hash key.
const NODE_KEY_PROPERTY: &str = "__renderBatchDomKey";

thread_local! {
	static NEXT_NODE_KEY: Cell<u32> = Cell::new(1);
}

/// A [`web_sys::Node`] that can key hash maps.
///
/// Equality is JavaScript identity. Hashing uses a key that is stored on the node the first time it is hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebNode(pub Node);

impl WebNode {
	fn key(&self) -> u32 {
		let property = JsValue::from_str(NODE_KEY_PROPERTY);
		if let Some(key) = Reflect::get(&self.0, &property).ok().and_then(|key| key.as_f64()) {
			#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
			return key as u32;
		}

		let key = NEXT_NODE_KEY.with(|next| {
			let key = next.get();
			next.set(key.wrapping_add(1));
			key
		});
		if let Err(error) = Reflect::set(&self.0, &property, &JsValue::from(key)) {
			error!("Failed to store node key: {:?}", error);
		}
		key
	}
}

impl Hash for WebNode {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.key().hash(state);
	}
}

impl From<Node> for WebNode {
	fn from(node: Node) -> Self {
		Self(node)
	}
}

impl From<Element> for WebNode {
	fn from(element: Element) -> Self {
		Self(element.into())
	}
}

#[derive(Debug, Clone)]
pub struct WebDom {
	document: Document,
}

impl WebDom {
	#[must_use]
	pub fn new(document: Document) -> Self {
		Self { document }
	}

	/// Uses the current window's document.
	///
	/// # Panics
	///
	/// Throws into JavaScript if there is no window or document.
	#[must_use]
	pub fn from_window() -> Self {
		let document = web_sys::window()
			.expect_throw("render-batch-dom: No window found.")
			.document()
			.expect_throw("render-batch-dom: No document found.");
		Self::new(document)
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}

	fn take_children(parent: &Node) -> Vec<WebNode> {
		let mut nodes = Vec::new();
		while let Some(child) = parent.first_child() {
			if let Err(error) = parent.remove_child(&child) {
				error!("Failed to detach parsed node: {:?}", error);
				break;
			}
			nodes.push(WebNode(child));
		}
		nodes
	}
}

impl HostDom for WebDom {
	type Node = WebNode;

	fn create_element(&mut self, tag_name: &str, namespace: Namespace) -> WebNode {
		let element = match namespace {
			Namespace::Html => self.document.create_element(tag_name),
			Namespace::Svg => self.document.create_element_ns(Some(SVG_NAMESPACE), tag_name),
		};
		element.expect_throw("render-batch-dom: Failed to create element.").into()
	}

	fn create_text_node(&mut self, data: &str) -> WebNode {
		WebNode(self.document.create_text_node(data).into())
	}

	fn create_comment(&mut self, data: &str) -> WebNode {
		WebNode(self.document.create_comment(data).into())
	}

	fn node_kind(&self, node: &WebNode) -> NodeKind {
		match node.0.node_type() {
			Node::ELEMENT_NODE => NodeKind::Element,
			Node::TEXT_NODE => NodeKind::Text,
			Node::COMMENT_NODE => NodeKind::Comment,
			_ => NodeKind::Other,
		}
	}

	fn tag_name(&self, element: &WebNode) -> String {
		element.0.dyn_ref::<Element>().map(Element::tag_name).unwrap_or_default()
	}

	fn namespace(&self, element: &WebNode) -> Option<Namespace> {
		let element = element.0.dyn_ref::<Element>()?;
		Some(match element.namespace_uri() {
			Some(namespace) if namespace == SVG_NAMESPACE => Namespace::Svg,
			_ => Namespace::Html,
		})
	}

	fn parent_node(&self, node: &WebNode) -> Option<WebNode> {
		node.0.parent_node().map(WebNode)
	}

	fn first_child(&self, node: &WebNode) -> Option<WebNode> {
		node.0.first_child().map(WebNode)
	}

	fn last_child(&self, node: &WebNode) -> Option<WebNode> {
		node.0.last_child().map(WebNode)
	}

	fn previous_sibling(&self, node: &WebNode) -> Option<WebNode> {
		node.0.previous_sibling().map(WebNode)
	}

	fn next_sibling(&self, node: &WebNode) -> Option<WebNode> {
		node.0.next_sibling().map(WebNode)
	}

	fn insert_before(&mut self, parent: &WebNode, child: &WebNode, reference: Option<&WebNode>) {
		if let Err(error) = parent.0.insert_before(&child.0, reference.map(|reference| &reference.0)) {
			error!("Failed to insert {:?} into {:?}: {:?}", child, parent, error);
		}
	}

	fn remove(&mut self, node: &WebNode) {
		if let Some(parent) = node.0.parent_node() {
			if let Err(error) = parent.remove_child(&node.0) {
				error!("Failed to remove {:?}: {:?}", node, error);
			}
		}
	}

	fn attribute(&self, element: &WebNode, name: &str) -> Option<String> {
		element.0.dyn_ref::<Element>()?.get_attribute(name)
	}

	fn set_attribute(&mut self, element: &WebNode, name: &str, value: &str) {
		match element.0.dyn_ref::<Element>() {
			Some(element) => {
				if let Err(error) = element.set_attribute(name, value) {
					error!("Failed to set attribute {:?}: {:?}", name, error);
				}
			}
			None => warn!("Tried to set attribute {:?} on non-element {:?}.", name, element),
		}
	}

	fn remove_attribute(&mut self, element: &WebNode, name: &str) {
		if let Some(element) = element.0.dyn_ref::<Element>() {
			if let Err(error) = element.remove_attribute(name) {
				error!("Failed to remove attribute {:?}: {:?}", name, error);
			}
		}
	}

	fn data(&self, node: &WebNode) -> String {
		node.0.dyn_ref::<CharacterData>().map(CharacterData::data).unwrap_or_default()
	}

	fn set_data(&mut self, node: &WebNode, data: &str) {
		match node.0.dyn_ref::<CharacterData>() {
			Some(character_data) => character_data.set_data(data),
			None => warn!("Tried to set character data of {:?}.", node),
		}
	}

	fn value(&self, element: &WebNode) -> String {
		if let Some(input) = element.0.dyn_ref::<HtmlInputElement>() {
			input.value()
		} else if let Some(select) = element.0.dyn_ref::<HtmlSelectElement>() {
			select.value()
		} else if let Some(text_area) = element.0.dyn_ref::<HtmlTextAreaElement>() {
			text_area.value()
		} else {
			self.attribute(element, "value").unwrap_or_default()
		}
	}

	fn set_value(&mut self, element: &WebNode, value: Option<&str>) {
		let value = value.unwrap_or_default();
		if let Some(input) = element.0.dyn_ref::<HtmlInputElement>() {
			input.set_value(value);
		} else if let Some(select) = element.0.dyn_ref::<HtmlSelectElement>() {
			select.set_value(value);
		} else if let Some(text_area) = element.0.dyn_ref::<HtmlTextAreaElement>() {
			text_area.set_value(value);
		} else {
			warn!("Tried to set value property of {:?}.", element);
		}
	}

	fn checked(&self, element: &WebNode) -> bool {
		element.0.dyn_ref::<HtmlInputElement>().map_or(false, HtmlInputElement::checked)
	}

	fn set_checked(&mut self, element: &WebNode, checked: bool) {
		if let Some(input) = element.0.dyn_ref::<HtmlInputElement>() {
			input.set_checked(checked);
		}
	}

	fn parse_fragment(&mut self, markup: &str, namespace: Namespace) -> Vec<WebNode> {
		match namespace {
			Namespace::Html => {
				let template = self
					.document
					.create_element("template")
					.expect_throw("render-batch-dom: Failed to create template element.")
					.unchecked_into::<HtmlTemplateElement>();
				template.set_inner_html(markup);
				Self::take_children(&template.content())
			}
			Namespace::Svg => {
				let svg = self
					.document
					.create_element_ns(Some(SVG_NAMESPACE), "svg")
					.expect_throw("render-batch-dom: Failed to create svg element.");
				svg.set_inner_html(markup);
				Self::take_children(&svg)
			}
		}
	}
}

/// Adds and removes global listeners on one [***EventTarget***](https://developer.mozilla.org/en-US/docs/Web/API/EventTarget), all sharing one handler.
pub struct WebGlobalListeners {
	target: web_sys::EventTarget,
	common_handler: Closure<dyn Fn(web_sys::Event)>,
}

impl WebGlobalListeners {
	#[must_use]
	pub fn new(target: web_sys::EventTarget, common_handler: Closure<dyn Fn(web_sys::Event)>) -> Self {
		Self { target, common_handler }
	}

	fn function(&self) -> &Function {
		self.common_handler.as_ref().unchecked_ref::<Function>()
	}
}

impl GlobalListeners for WebGlobalListeners {
	#[instrument(skip(self))]
	fn add_global_listener(&mut self, event_name: &str, capture: bool) {
		let options = web_sys::AddEventListenerOptions::new();
		options.set_capture(capture);
		if let Err(error) = self.target.add_event_listener_with_callback_and_add_event_listener_options(event_name, self.function(), &options) {
			error!("Failed to add event listener {:?}: {:?}", event_name, error)
		}
	}

	#[instrument(skip(self))]
	fn remove_global_listener(&mut self, event_name: &str, capture: bool) {
		if let Err(error) = self.target.remove_event_listener_with_callback_and_bool(event_name, self.function(), capture) {
			error!("Failed to remove event listener {:?}: {:?}", event_name, error)
		}
	}
}

pub type WebEvents = DelegatedEvents<WebNode, WebGlobalListeners>;
pub type WebRenderer = Renderer<WebDom, WebEvents>;

/// Creates a renderer for `document` that listens for delegated events on it.
///
/// `on_event` receives every event with at least one handler. The renderer isn't borrowed during that call,
/// so it may apply render batches right away.
///
/// `preventDefault()` has already been called where requested.
pub fn new_web_renderer(id: RendererId, document: Document, on_event: impl Fn(RendererId, &EventDispatch, &web_sys::Event) + 'static) -> Rc<RefCell<WebRenderer>> {
	Rc::new_cyclic(|weak: &Weak<RefCell<WebRenderer>>| {
		let weak = weak.clone();
		let common_handler = Closure::wrap(Box::new(move |event: web_sys::Event| {
			let span = trace_span!("common_handler", renderer = id, event_type = %event.type_());
			let _enter = span.enter();

			let target = match event.target().and_then(|target| target.dyn_into::<Node>().ok()) {
				Some(target) => WebNode(target),
				None => return trace!("Event target isn't a node."),
			};

			let dispatch = {
				let renderer = match weak.upgrade() {
					Some(renderer) => renderer,
					None => return warn!("Received an event after the renderer was dropped."),
				};
				let renderer = match renderer.try_borrow() {
					Ok(renderer) => renderer,
					Err(_) => return error!("Received an event while the renderer was busy. Dropping it."),
				};
				let dispatch = renderer.events().dispatch(renderer.dom(), &target, &event.type_());
				dispatch
			};

			if dispatch.prevent_default {
				event.prevent_default();
			}
			if !dispatch.handlers.is_empty() {
				on_event(id, &dispatch, &event);
			}
		}) as Box<dyn Fn(web_sys::Event)>);

		let listeners = WebGlobalListeners::new(document.clone().into(), common_handler);
		RefCell::new(Renderer::new(id, WebDom::new(document), DelegatedEvents::new(listeners)))
	})
}
