//! Per-renderer state and render batch application.

use crate::{
	batch::{ComponentId, Edit, EventHandlerId, Frame, RenderBatch, RendererId},
	error::{PatchError, Result},
	events::EventDelegator,
	host::HostDom,
	logical::LogicalTree,
	patch::TreePatcher,
};
use core::{fmt::Debug, hash::Hash};
use hashbrown::HashMap;
use tracing::{instrument, trace, trace_span, warn};

/// Where each component's output goes: the logical element its first-level frames become children of.
#[derive(Debug)]
pub struct ComponentLocations<N> {
	locations: HashMap<ComponentId, N>,
}

impl<N> Default for ComponentLocations<N> {
	fn default() -> Self {
		Self { locations: HashMap::new() }
	}
}

impl<N: Clone + Eq + Hash + Debug> ComponentLocations<N> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Associates `component_id` with `anchor`. A previous association is overwritten.
	pub fn attach(&mut self, component_id: ComponentId, anchor: N) {
		if let Some(previous) = self.locations.insert(component_id, anchor) {
			warn!(component_id, ?previous, "Component was attached again. Overwriting its location.");
		}
	}

	#[must_use]
	pub fn get(&self, component_id: ComponentId) -> Option<&N> {
		self.locations.get(&component_id)
	}

	/// Forgets `component_id`. Its nodes stay where they are.
	pub fn dispose(&mut self, component_id: ComponentId) -> Option<N> {
		self.locations.remove(&component_id)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.locations.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.locations.is_empty()
	}
}

/// One renderer's view of the DOM: its logical tree, component locations and event wiring.
pub struct Renderer<H: HostDom, E> {
	id: RendererId,
	dom: H,
	tree: LogicalTree<H::Node>,
	components: ComponentLocations<H::Node>,
	/// Root components whose prerendered content is discarded on their first update.
	roots_to_clear: HashMap<ComponentId, H::Node>,
	pending_select_values: HashMap<H::Node, Option<String>>,
	events: E,
}

impl<H: HostDom, E: EventDelegator<H::Node>> Renderer<H, E> {
	pub fn new(id: RendererId, dom: H, events: E) -> Self {
		Self {
			id,
			dom,
			tree: LogicalTree::new(),
			components: ComponentLocations::new(),
			roots_to_clear: HashMap::new(),
			pending_select_values: HashMap::new(),
			events,
		}
	}

	#[must_use]
	pub fn id(&self) -> RendererId {
		self.id
	}

	pub fn dom(&self) -> &H {
		&self.dom
	}

	/// Direct access to the DOM, e.g. to set up root elements.
	///
	/// Changing the children of tracked nodes from here desynchronises the logical tree.
	pub fn dom_mut(&mut self) -> &mut H {
		&mut self.dom
	}

	pub fn tree(&self) -> &LogicalTree<H::Node> {
		&self.tree
	}

	pub fn components(&self) -> &ComponentLocations<H::Node> {
		&self.components
	}

	pub fn events(&self) -> &E {
		&self.events
	}

	pub fn events_mut(&mut self) -> &mut E {
		&mut self.events
	}

	/// Makes `element` the location of root component `component_id`.
	///
	/// Existing content of `element` is kept until the component's first update.
	///
	/// # Errors
	///
	/// Never for elements, but see [`LogicalTree::wrap`].
	#[instrument(skip(self))]
	pub fn attach_root_component_to_element(&mut self, component_id: ComponentId, element: H::Node) -> Result<()> {
		self.tree.wrap(&self.dom, &element, true)?;
		self.components.attach(component_id, element.clone());
		self.roots_to_clear.insert(component_id, element);
		Ok(())
	}

	/// Makes the prerendered range starting at comment `start` the location of root component `component_id`.
	///
	/// The range (up to and including `end`) is discarded on the component's first update.
	///
	/// # Errors
	///
	/// See [`LogicalTree::wrap_comment_range`].
	#[instrument(skip(self))]
	pub fn attach_root_component_to_logical_element(&mut self, component_id: ComponentId, start: H::Node, end: Option<H::Node>) -> Result<()> {
		self.tree.wrap_comment_range(&self.dom, &start, end.as_ref())?;
		self.components.attach(component_id, start.clone());
		self.roots_to_clear.insert(component_id, start);
		Ok(())
	}

	fn patcher(&mut self) -> TreePatcher<'_, H, E> {
		TreePatcher {
			dom: &mut self.dom,
			tree: &mut self.tree,
			components: &mut self.components,
			pending_select_values: &mut self.pending_select_values,
			events: &mut self.events,
		}
	}

	/// Applies one component's edit script.
	///
	/// # Errors
	///
	/// [`PatchError::ProtocolReference`] if the component has no location, otherwise whatever the first failing edit returns.
	#[instrument(skip(self, edits, frames))]
	pub fn update_component(&mut self, component_id: ComponentId, edits: &[Edit<'_>], frames: &[Frame<'_>]) -> Result<()> {
		let anchor = self
			.components
			.get(component_id)
			.cloned()
			.ok_or_else(|| PatchError::reference(format!("no element is currently associated with component {}", component_id)))?;

		if let Some(root) = self.roots_to_clear.remove(&component_id) {
			trace!(?root, "Clearing prerendered content.");
			match self.tree.end_sibling(&root).cloned() {
				Some(end) => self.tree.clear_between(&mut self.dom, &root, &end)?,
				None => self.tree.clear_element(&mut self.dom, &root),
			}
		}

		self.patcher().apply_edits(component_id, anchor, 0, edits, frames)
	}

	/// Forgets a component's location. Its DOM nodes are removed by its parent's edits, if at all.
	#[instrument(skip(self))]
	pub fn dispose_component(&mut self, component_id: ComponentId) {
		self.components.dispose(component_id);
		self.roots_to_clear.remove(&component_id);
	}

	#[instrument(skip(self))]
	pub fn dispose_event_handler(&mut self, handler_id: EventHandlerId) {
		self.events.remove_listener(handler_id);
	}

	/// Applies a whole batch: component updates in order, then disposals.
	///
	/// # Errors
	///
	/// Stops at the first failing component update, without processing disposals.
	pub fn render_batch(&mut self, batch: &RenderBatch<'_>) -> Result<()> {
		let span = trace_span!("Rendering batch", renderer = self.id, updates = batch.updated_components.len());
		let _enter = span.enter();

		for diff in batch.updated_components {
			self.update_component(diff.component_id, diff.edits, batch.reference_frames)?;
		}
		for &component_id in batch.disposed_component_ids {
			self.dispose_component(component_id);
		}
		for &handler_id in batch.disposed_event_handler_ids {
			self.dispose_event_handler(handler_id);
		}
		Ok(())
	}
}

/// All renderers of one page, by id.
pub struct Renderers<H: HostDom, E> {
	renderers: HashMap<RendererId, Renderer<H, E>>,
}

impl<H: HostDom, E> Default for Renderers<H, E> {
	fn default() -> Self {
		Self { renderers: HashMap::new() }
	}
}

impl<H: HostDom, E: EventDelegator<H::Node>> Renderers<H, E> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `renderer` under its id, returning any renderer it replaces.
	pub fn insert(&mut self, renderer: Renderer<H, E>) -> Option<Renderer<H, E>> {
		let replaced = self.renderers.insert(renderer.id(), renderer);
		if let Some(replaced) = &replaced {
			warn!(renderer = replaced.id(), "Replacing renderer.");
		}
		replaced
	}

	#[must_use]
	pub fn get(&self, renderer_id: RendererId) -> Option<&Renderer<H, E>> {
		self.renderers.get(&renderer_id)
	}

	pub fn get_mut(&mut self, renderer_id: RendererId) -> Option<&mut Renderer<H, E>> {
		self.renderers.get_mut(&renderer_id)
	}

	pub fn remove(&mut self, renderer_id: RendererId) -> Option<Renderer<H, E>> {
		self.renderers.remove(&renderer_id)
	}

	/// Routes `batch` to renderer `renderer_id`.
	///
	/// # Errors
	///
	/// [`PatchError::ProtocolReference`] if there's no such renderer, otherwise see [`Renderer::render_batch`].
	pub fn render_batch(&mut self, renderer_id: RendererId, batch: &RenderBatch<'_>) -> Result<()> {
		self.renderers
			.get_mut(&renderer_id)
			.ok_or_else(|| PatchError::reference(format!("there is no renderer with id {}", renderer_id)))?
			.render_batch(batch)
	}
}
