//! Applies edit scripts to a [`LogicalTree`] and the DOM behind it.

use crate::{
	batch::{ComponentId, Edit, Frame, PermutationListEntry},
	error::{PatchError, Result},
	events::EventDelegator,
	host::{HostDom, Namespace, NodeKind},
	logical::LogicalTree,
	renderer::ComponentLocations,
};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;
use tracing::{error, instrument, trace, trace_span};

/// Attributes with this prefix configure event handling instead of appearing in the DOM.
pub const INTERNAL_ATTRIBUTE_PREFIX: &str = "__internal_";

/// The attribute that marks an element captured by reference.
#[must_use]
pub fn capture_id_attribute_name(capture_id: &str) -> String {
	format!("_bl_{}", capture_id)
}

pub fn apply_capture_id_to_element<H: HostDom>(dom: &mut H, element: &H::Node, capture_id: &str) {
	dom.set_attribute(element, &capture_id_attribute_name(capture_id), "");
}

/// Text and markup content as it appears in logs.
///
/// Content is user data and is only written out with the `"dangerous-logging"` feature.
pub(crate) struct Sensitive<'a>(pub &'a str);

impl Debug for Sensitive<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		if cfg!(feature = "dangerous-logging") {
			Debug::fmt(self.0, f)
		} else {
			write!(f, "<{} bytes>", self.0.len())
		}
	}
}

/// Where an edit script currently is.
struct Cursor<N> {
	parent: N,
	depth: usize,
	child_index: usize,
	root_offset: usize,
	permutations: Option<Vec<PermutationListEntry>>,
	#[cfg(feature = "log-paths")]
	path: Vec<usize>,
}

impl<N: Debug> Cursor<N> {
	fn new(parent: N, root_offset: usize) -> Self {
		Self {
			parent,
			depth: 0,
			child_index: root_offset,
			root_offset,
			permutations: None,
			#[cfg(feature = "log-paths")]
			path: Vec::new(),
		}
	}

	fn index(&self, sibling_index: u32) -> usize {
		self.child_index + sibling_index as usize
	}

	#[cfg_attr(not(feature = "log-paths"), allow(unused_variables))]
	fn step_in(&mut self, child: N, index: usize) {
		#[cfg(feature = "log-paths")]
		self.path.push(index);
		self.parent = child;
		self.depth += 1;
		self.child_index = 0;
	}

	fn step_out(&mut self, parent: N) {
		#[cfg(feature = "log-paths")]
		self.path.pop();
		self.parent = parent;
		self.depth -= 1;
		self.child_index = if self.depth == 0 { self.root_offset } else { 0 };
	}

	fn log_failure(&self, edit_index: usize, error: &PatchError) {
		#[cfg(feature = "log-paths")]
		error!(edit_index, depth = self.depth, path = ?self.path, parent = ?self.parent, "Edit failed: {}", error);
		#[cfg(not(feature = "log-paths"))]
		error!(edit_index, depth = self.depth, parent = ?self.parent, "Edit failed: {}", error);
	}
}

fn strip_on_prefix(event_name: &str) -> &str {
	event_name.strip_prefix("on").unwrap_or(event_name)
}

fn frame_at<'a>(frames: &[Frame<'a>], index: usize) -> Result<Frame<'a>> {
	frames
		.get(index)
		.copied()
		.ok_or_else(|| PatchError::reference(format!("frame index {} out of range ({} reference frames)", index, frames.len())))
}

/// Borrows everything one edit script touches.
pub struct TreePatcher<'r, H: HostDom, E> {
	pub dom: &'r mut H,
	pub tree: &'r mut LogicalTree<H::Node>,
	pub components: &'r mut ComponentLocations<H::Node>,
	/// `<select>` values that couldn't be applied yet because the matching `<option>` didn't exist.
	pub pending_select_values: &'r mut HashMap<H::Node, Option<String>>,
	pub events: &'r mut E,
}

impl<'r, H: HostDom, E: EventDelegator<H::Node>> TreePatcher<'r, H, E> {
	/// Applies `edits` to the logical children of `parent`, starting at `root_offset`.
	///
	/// # Errors
	///
	/// Stops at the first failing edit. Earlier edits stay applied.
	#[instrument(skip(self, edits, frames))]
	pub fn apply_edits(&mut self, component_id: ComponentId, parent: H::Node, root_offset: usize, edits: &[Edit<'_>], frames: &[Frame<'_>]) -> Result<()> {
		let mut cursor = Cursor::new(parent, root_offset);
		for (edit_index, edit) in edits.iter().enumerate() {
			let span = trace_span!("Applying edit", edit_index, edit_type = ?edit.edit_type());
			let _enter = span.enter();
			if let Err(error) = self.apply_edit(component_id, &mut cursor, edit, frames) {
				cursor.log_failure(edit_index, &error);
				return Err(error);
			}
		}

		if cursor.depth != 0 {
			return Err(PatchError::mismatch("apply_edits", format!("edit script ended {} level(s) deep", cursor.depth)));
		}
		if cursor.permutations.is_some() {
			return Err(PatchError::mismatch("apply_edits", "edit script ended inside a permutation list"));
		}
		Ok(())
	}

	fn apply_edit(&mut self, component_id: ComponentId, cursor: &mut Cursor<H::Node>, edit: &Edit<'_>, frames: &[Frame<'_>]) -> Result<()> {
		match *edit {
			Edit::PrependFrame { sibling_index, frame_index } => {
				let frame = frame_at(frames, frame_index as usize)?;
				self.insert_frame(component_id, &cursor.parent, cursor.index(sibling_index), frames, frame, frame_index as usize)?;
			}

			Edit::RemoveFrame { sibling_index } => self.remove_child(&cursor.parent, cursor.index(sibling_index))?,

			Edit::SetAttribute { sibling_index, frame_index } => {
				let frame = frame_at(frames, frame_index as usize)?;
				let element = self.element_child(&cursor.parent, cursor.index(sibling_index), "setAttribute")?;
				self.apply_attribute(component_id, &element, frame)?;
			}

			Edit::RemoveAttribute { sibling_index, name } => {
				let element = self.element_child(&cursor.parent, cursor.index(sibling_index), "removeAttribute")?;
				if !self.try_apply_special_property(&element, name, None)? {
					self.dom.remove_attribute(&element, name);
				}
			}

			Edit::UpdateText { sibling_index, frame_index } => {
				let content = match frame_at(frames, frame_index as usize)? {
					Frame::Text { content } => content,
					other => return Err(PatchError::mismatch("updateText", format!("frame {} is a {:?} frame", frame_index, other.frame_type()))),
				};
				let node = self.child(&cursor.parent, cursor.index(sibling_index))?;
				if self.dom.node_kind(&node) != NodeKind::Text {
					return Err(PatchError::mismatch("updateText", format!("cannot set text content on non-text child {:?}", node)));
				}
				trace!(content = ?Sensitive(content), "Updating text.");
				self.dom.set_data(&node, content);
			}

			Edit::UpdateMarkup { sibling_index, frame_index } => {
				let frame = frame_at(frames, frame_index as usize)?;
				let index = cursor.index(sibling_index);
				self.remove_child(&cursor.parent, index)?;
				self.insert_markup(&cursor.parent, index, frame)?;
			}

			Edit::StepIn { sibling_index } => {
				let index = cursor.index(sibling_index);
				let child = self.child(&cursor.parent, index)?;
				cursor.step_in(child, index);
			}

			Edit::StepOut => {
				if cursor.depth == 0 {
					return Err(PatchError::mismatch("stepOut", "already at the component's root"));
				}
				let parent = self
					.tree
					.parent(&cursor.parent)
					.cloned()
					.ok_or_else(|| PatchError::reference(format!("{:?} has no logical parent to step out to", cursor.parent)))?;
				cursor.step_out(parent);
			}

			Edit::PermutationListEntry {
				sibling_index,
				move_to_sibling_index,
			} => {
				let entry = PermutationListEntry {
					from: cursor.index(sibling_index),
					to: cursor.index(move_to_sibling_index),
				};
				cursor.permutations.get_or_insert_with(Vec::new).push(entry);
			}

			Edit::PermutationListEnd => {
				let moves = cursor
					.permutations
					.take()
					.ok_or_else(|| PatchError::mismatch("permutationListEnd", "no permutation list entries are pending"))?;
				self.tree.permute(self.dom, &cursor.parent, &moves)?;
			}
		}
		Ok(())
	}

	fn child(&self, parent: &H::Node, index: usize) -> Result<H::Node> {
		self.tree
			.child(parent, index)
			.cloned()
			.ok_or_else(|| PatchError::reference(format!("{:?} has no logical child at index {}", parent, index)))
	}

	/// Removes a logical child and drops whatever was kept for it and its descendants.
	fn remove_child(&mut self, parent: &H::Node, index: usize) -> Result<()> {
		let child = self.child(parent, index)?;
		let select = if self.dom.node_kind(&child) == NodeKind::Element && self.dom.tag_name(&child).eq_ignore_ascii_case("OPTION") {
			self.closest_ancestor_select(&child)
		} else {
			None
		};

		let removed = self.tree.remove(self.dom, parent, index)?;
		trace!(count = removed.len(), "Removed nodes.");
		for node in &removed {
			self.pending_select_values.remove(node);
			self.events.forget_element(node);
		}

		if let Some(select) = select {
			if let Some(value) = self.pending_select_values.get(&select).cloned() {
				trace!(?select, "Replaying pending select value after option removal.");
				self.try_apply_value_property(&select, value.as_deref());
			}
		}
		Ok(())
	}

	fn element_child(&self, parent: &H::Node, index: usize, operation: &'static str) -> Result<H::Node> {
		let child = self.child(parent, index)?;
		match self.dom.node_kind(&child) {
			NodeKind::Element => Ok(child),
			kind => Err(PatchError::mismatch(operation, format!("cannot apply attributes to non-element child {:?} ({:?})", child, kind))),
		}
	}

	/// Materializes `frame` (at `frame_index`) as logical child `child_index` of `parent`.
	///
	/// Returns how many logical children were inserted, which differs from one only for regions and captures.
	fn insert_frame(&mut self, component_id: ComponentId, parent: &H::Node, child_index: usize, frames: &[Frame<'_>], frame: Frame<'_>, frame_index: usize) -> Result<usize> {
		match frame {
			Frame::Element { subtree_length, name } => {
				self.insert_element(component_id, parent, child_index, frames, name, frame_index, subtree_length as usize)?;
				Ok(1)
			}

			Frame::Text { content } => {
				trace!(content = ?Sensitive(content), "Inserting text.");
				let text = self.dom.create_text_node(content);
				self.tree.insert(self.dom, &text, parent, child_index)?;
				Ok(1)
			}

			Frame::Attribute { .. } => Err(PatchError::mismatch("insertFrame", "attribute frames should only be present as leading children of element frames")),

			Frame::Component {
				component_id: child_component_id, ..
			} => {
				let container = self.tree.create_and_insert_container(self.dom, parent, child_index)?;
				trace!(child_component_id, ?container, "Inserted component container.");
				self.components.attach(child_component_id, container);
				Ok(1)
			}

			Frame::Region { subtree_length } => self.insert_frame_range(component_id, parent, child_index, frames, frame_index + 1, frame_index + subtree_length as usize),

			Frame::ElementReferenceCapture { capture_id } => match self.dom.node_kind(parent) {
				NodeKind::Element => {
					apply_capture_id_to_element(self.dom, parent, capture_id);
					Ok(0)
				}
				kind => Err(PatchError::mismatch("insertFrame", format!("reference capture frames can only be children of element frames, not {:?}", kind))),
			},

			Frame::ComponentReferenceCapture => Ok(0),

			Frame::Markup { .. } => {
				self.insert_markup(parent, child_index, frame)?;
				Ok(1)
			}
		}
	}

	/// Inserts `frames[start..end]` as consecutive logical children, skipping over each frame's descendants.
	fn insert_frame_range(&mut self, component_id: ComponentId, parent: &H::Node, mut child_index: usize, frames: &[Frame<'_>], start: usize, end: usize) -> Result<usize> {
		let original_child_index = child_index;
		let mut index = start;
		while index < end {
			let frame = frame_at(frames, index)?;
			child_index += self.insert_frame(component_id, parent, child_index, frames, frame, index)?;
			index += 1 + frame.descendant_count();
		}
		Ok(child_index - original_child_index)
	}

	#[allow(clippy::too_many_arguments)]
	fn insert_element(&mut self, component_id: ComponentId, parent: &H::Node, child_index: usize, frames: &[Frame<'_>], tag_name: &str, frame_index: usize, subtree_length: usize) -> Result<()> {
		let namespace = if tag_name == "svg" || LogicalTree::is_svg(&*self.dom, parent) {
			Namespace::Svg
		} else {
			Namespace::Html
		};
		let span = trace_span!("Inserting element", tag_name, ?namespace);
		let _enter = span.enter();

		let element = self.dom.create_element(tag_name, namespace);
		self.tree.wrap(&*self.dom, &element, false)?;
		self.tree.insert(self.dom, &element, parent, child_index)?;

		let end = frame_index + subtree_length;
		let mut descendant_index = frame_index + 1;
		while descendant_index < end {
			let descendant = frame_at(frames, descendant_index)?;
			if let Frame::Attribute { .. } = descendant {
				self.apply_attribute(component_id, &element, descendant)?;
				descendant_index += 1;
			} else {
				// Attributes come first, so everything from here on is a child.
				self.insert_frame_range(component_id, &element, 0, frames, descendant_index, end)?;
				break;
			}
		}

		// The options the value refers to exist only now.
		if self.dom.tag_name(&element).eq_ignore_ascii_case("SELECT") {
			if let Some(value) = self.pending_select_values.remove(&element) {
				self.dom.set_value(&element, value.as_deref());
			}
		}
		Ok(())
	}

	fn insert_markup(&mut self, parent: &H::Node, child_index: usize, frame: Frame<'_>) -> Result<()> {
		let content = match frame {
			Frame::Markup { content } => content,
			other => return Err(PatchError::mismatch("insertMarkup", format!("expected a markup frame, found {:?}", other.frame_type()))),
		};
		let namespace = if LogicalTree::is_svg(&*self.dom, parent) { Namespace::Svg } else { Namespace::Html };

		let container = self.tree.create_and_insert_container(self.dom, parent, child_index)?;
		// Empty markup would leave no nodes at all.
		let markup = if content.is_empty() { " " } else { content };
		let nodes = self.dom.parse_fragment(markup, namespace);
		trace!(content = ?Sensitive(content), count = nodes.len(), "Inserting markup.");
		for (index, node) in nodes.iter().enumerate() {
			self.tree.insert(self.dom, node, &container, index)?;
		}
		Ok(())
	}

	/// Applies one attribute frame to `element`.
	///
	/// Attributes with an event handler id become delegated listeners.
	fn apply_attribute(&mut self, component_id: ComponentId, element: &H::Node, frame: Frame<'_>) -> Result<()> {
		let (name, value, event_handler_id) = match frame {
			Frame::Attribute { name, value, event_handler_id } => (name, value, event_handler_id),
			other => return Err(PatchError::mismatch("applyAttribute", format!("expected an attribute frame, found {:?}", other.frame_type()))),
		};

		if event_handler_id != 0 {
			let event_name = match name.strip_prefix("on") {
				Some(event_name) if !event_name.is_empty() => event_name,
				_ => return Err(PatchError::reference(format!("attribute {:?} has an event handler id, but doesn't start with 'on'", name))),
			};
			trace!(event_name, event_handler_id, "Setting listener.");
			self.events.set_listener(element, event_name, event_handler_id, component_id);
			return Ok(());
		}

		if !self.try_apply_special_property(element, name, value)? {
			match value {
				Some(value) => self.dom.set_attribute(element, name, value),
				None => self.dom.remove_attribute(element, name),
			}
		}
		Ok(())
	}

	/// Handles attributes that map to properties or to event configuration.
	///
	/// Returns whether `name` was handled.
	fn try_apply_special_property(&mut self, element: &H::Node, name: &str, value: Option<&str>) -> Result<bool> {
		match name {
			"value" => Ok(self.try_apply_value_property(element, value)),
			"checked" => Ok(self.try_apply_checked_property(element, value)),
			_ => match name.strip_prefix(INTERNAL_ATTRIBUTE_PREFIX) {
				Some(internal_name) => {
					self.apply_internal_attribute(element, internal_name, value)?;
					Ok(true)
				}
				None => Ok(false),
			},
		}
	}

	fn try_apply_value_property(&mut self, element: &H::Node, value: Option<&str>) -> bool {
		let tag_name = self.dom.tag_name(element);
		if ["INPUT", "SELECT", "TEXTAREA"].iter().any(|form_tag| tag_name.eq_ignore_ascii_case(form_tag)) {
			self.dom.set_value(element, value);
			if tag_name.eq_ignore_ascii_case("SELECT") {
				// The matching option may not exist yet.
				match value {
					Some(value) if self.dom.value(element) != value => {
						self.pending_select_values.insert(element.clone(), Some(value.to_owned()));
					}
					_ => {
						self.pending_select_values.remove(element);
					}
				}
			}
			true
		} else if tag_name.eq_ignore_ascii_case("OPTION") {
			match value {
				Some(value) if !value.is_empty() => self.dom.set_attribute(element, "value", value),
				_ => self.dom.remove_attribute(element, "value"),
			}

			if let Some(select) = self.closest_ancestor_select(element) {
				if self.pending_select_values.get(&select).map(Option::as_deref) == Some(value) {
					trace!(?select, "Replaying pending select value.");
					self.try_apply_value_property(&select, value);
					self.pending_select_values.remove(&select);
				}
			}
			true
		} else {
			false
		}
	}

	fn try_apply_checked_property(&mut self, element: &H::Node, value: Option<&str>) -> bool {
		if self.dom.tag_name(element).eq_ignore_ascii_case("INPUT") {
			self.dom.set_checked(element, value.is_some());
			true
		} else {
			false
		}
	}

	fn closest_ancestor_select(&self, element: &H::Node) -> Option<H::Node> {
		let mut candidate = self.dom.parent_node(element);
		while let Some(node) = candidate {
			if self.dom.node_kind(&node) == NodeKind::Element && self.dom.tag_name(&node).eq_ignore_ascii_case("SELECT") {
				return Some(node);
			}
			candidate = self.dom.parent_node(&node);
		}
		None
	}

	fn apply_internal_attribute(&mut self, element: &H::Node, internal_name: &str, value: Option<&str>) -> Result<()> {
		let enabled = value.is_some();
		if let Some(event_name) = internal_name.strip_prefix("stopPropagation_") {
			self.events.set_stop_propagation(element, strip_on_prefix(event_name), enabled);
		} else if let Some(event_name) = internal_name.strip_prefix("preventDefault_") {
			self.events.set_prevent_default(element, strip_on_prefix(event_name), enabled);
		} else {
			return Err(PatchError::reference(format!("unsupported internal attribute {:?}", internal_name)));
		}
		Ok(())
	}
}
