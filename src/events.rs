//! Event delegation.
//!
//! Elements never get listeners of their own. Instead, the patch engine reports which element should react to which
//! event with which server-side handler, and one global listener per event name resolves actual events against that
//! table. [`DelegatedEvents`] is the stock implementation of that table.

use crate::{
	batch::{ComponentId, EventHandlerId},
	host::HostDom,
	rc_hash_map::{CountSaturatedError, Decremented, RcHashMap},
};
use core::{fmt::Debug, hash::Hash};
use hashbrown::{HashMap, HashSet};
use tracing::{error, instrument, trace, warn};

/// Receives the event wiring that falls out of patching.
pub trait EventDelegator<N> {
	/// Makes `handler_id` the handler for `event_name` on `element`, replacing any previous one for that pair.
	///
	/// `event_name` has no `on` prefix.
	fn set_listener(&mut self, element: &N, event_name: &str, handler_id: EventHandlerId, component_id: ComponentId);
	/// Forgets a handler. Unknown ids are ignored, since a replaced handler is disposed only afterwards.
	fn remove_listener(&mut self, handler_id: EventHandlerId);
	fn set_stop_propagation(&mut self, element: &N, event_name: &str, value: bool);
	fn set_prevent_default(&mut self, element: &N, event_name: &str, value: bool);
	/// Drops everything kept for `element`, which has left the tree.
	///
	/// Its handlers stay registered until they are disposed.
	fn forget_element(&mut self, element: &N);
}

/// The per-event-name listeners [`DelegatedEvents`] keeps alive.
pub trait GlobalListeners {
	/// Called once an event name gains its first handler.
	///
	/// `capture` is set for events that don't bubble, which can only be observed at the root during the capture phase.
	fn add_global_listener(&mut self, event_name: &str, capture: bool);
	/// Called once an event name loses its last handler, with the same `capture` as when it was added.
	fn remove_global_listener(&mut self, event_name: &str, capture: bool);
}

/// No listeners at all, for when events are fed to [`DelegatedEvents::dispatch`] directly.
impl GlobalListeners for () {
	fn add_global_listener(&mut self, _: &str, _: bool) {}
	fn remove_global_listener(&mut self, _: &str, _: bool) {}
}

/// Events that don't bubble in the DOM.
///
/// Delegated handling still resolves them from the target upwards, but through a capturing listener.
pub const NON_BUBBLING_EVENTS: &[&str] = &[
	"abort",
	"blur",
	"canplay",
	"canplaythrough",
	"change",
	"cuechange",
	"durationchange",
	"emptied",
	"ended",
	"error",
	"focus",
	"load",
	"loadeddata",
	"loadedmetadata",
	"loadend",
	"loadstart",
	"mouseenter",
	"mouseleave",
	"pause",
	"play",
	"playing",
	"progress",
	"ratechange",
	"reset",
	"scroll",
	"seeked",
	"seeking",
	"stalled",
	"submit",
	"suspend",
	"timeupdate",
	"toggle",
	"unload",
	"volumechange",
	"waiting",
];

#[must_use]
pub fn is_non_bubbling(event_name: &str) -> bool {
	NON_BUBBLING_EVENTS.contains(&event_name)
}

#[derive(Debug, Clone)]
struct HandlerInfo<N> {
	element: N,
	event_name: String,
	component_id: ComponentId,
}

#[derive(Debug, Default)]
struct ElementEvents {
	handlers: HashMap<String, EventHandlerId>,
	stop_propagation: HashSet<String>,
	prevent_default: HashSet<String>,
}

impl ElementEvents {
	fn is_empty(&self) -> bool {
		self.handlers.is_empty() && self.stop_propagation.is_empty() && self.prevent_default.is_empty()
	}
}

/// One handler that should run for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTarget {
	pub handler_id: EventHandlerId,
	pub component_id: ComponentId,
}

/// The outcome of resolving one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDispatch {
	/// Innermost first.
	pub handlers: Vec<DispatchTarget>,
	/// Whether any element on the path asked for the browser's default action to be suppressed.
	pub prevent_default: bool,
}

/// Handler table with reference-counted global listeners.
pub struct DelegatedEvents<N, G = ()>
where
	N: Clone + Eq + Hash,
{
	handlers: HashMap<EventHandlerId, HandlerInfo<N>>,
	elements: HashMap<N, ElementEvents>,
	/// Counts handlers per event name. The value is the `capture` flag the global listener was added with.
	listener_counts: RcHashMap<String, u32, bool>,
	global_listeners: G,
}

impl<N: Clone + Eq + Hash + Debug> Default for DelegatedEvents<N> {
	fn default() -> Self {
		Self::new(())
	}
}

impl<N: Clone + Eq + Hash + Debug, G: GlobalListeners> DelegatedEvents<N, G> {
	#[must_use]
	pub fn new(global_listeners: G) -> Self {
		Self {
			handlers: HashMap::new(),
			elements: HashMap::new(),
			listener_counts: RcHashMap::new(),
			global_listeners,
		}
	}

	pub fn global_listeners(&self) -> &G {
		&self.global_listeners
	}

	/// How many handlers currently exist for `event_name`.
	#[must_use]
	pub fn listener_count(&self, event_name: &str) -> u32 {
		self.listener_counts.count(event_name).copied().unwrap_or(0)
	}

	#[must_use]
	pub fn handler_count(&self) -> usize {
		self.handlers.len()
	}

	/// How many elements have handlers or propagation flags.
	#[must_use]
	pub fn element_count(&self) -> usize {
		self.elements.len()
	}

	/// The handler `element` has for `event_name`, if any.
	#[must_use]
	pub fn handler(&self, element: &N, event_name: &str) -> Option<EventHandlerId> {
		self.elements.get(element)?.handlers.get(event_name).copied()
	}

	/// Resolves an event of type `event_name` on `target` to the handlers that should run, innermost first.
	///
	/// This walks physical parents, so handlers on elements outside the renderer's roots are never matched.
	/// Non-bubbling events only consider `target` itself.
	#[instrument(skip(self, dom))]
	pub fn dispatch<H: HostDom<Node = N>>(&self, dom: &H, target: &N, event_name: &str) -> EventDispatch {
		let bubbles = !is_non_bubbling(event_name);
		let mut dispatch = EventDispatch::default();
		let mut candidate = Some(target.clone());
		while let Some(element) = candidate {
			if let Some(events) = self.elements.get(&element) {
				if let Some(&handler_id) = events.handlers.get(event_name) {
					match self.handlers.get(&handler_id) {
						Some(info) => dispatch.handlers.push(DispatchTarget {
							handler_id,
							component_id: info.component_id,
						}),
						None => error!("Element lists handler {} which isn't registered.", handler_id),
					}
				}
				if events.prevent_default.contains(event_name) {
					dispatch.prevent_default = true;
				}
				if events.stop_propagation.contains(event_name) {
					trace!("Propagation stopped at {:?}.", element);
					break;
				}
			}
			candidate = if bubbles { dom.parent_node(&element) } else { None };
		}
		dispatch
	}

	fn flags(&mut self, element: &N, event_name: &str, select: fn(&mut ElementEvents) -> &mut HashSet<String>, value: bool) {
		if value {
			select(self.elements.entry(element.clone()).or_default()).insert(event_name.to_owned());
		} else if let Some(events) = self.elements.get_mut(element) {
			select(events).remove(event_name);
			if events.is_empty() {
				self.elements.remove(element);
			}
		}
	}
}

impl<N: Clone + Eq + Hash + Debug, G: GlobalListeners> EventDelegator<N> for DelegatedEvents<N, G> {
	#[instrument(skip(self))]
	fn set_listener(&mut self, element: &N, event_name: &str, handler_id: EventHandlerId, component_id: ComponentId) {
		let info = HandlerInfo {
			element: element.clone(),
			event_name: event_name.to_owned(),
			component_id,
		};

		let element_events = self.elements.entry(element.clone()).or_default();
		if let Some(previous) = element_events.handlers.insert(event_name.to_owned(), handler_id) {
			// Same element and event, so the listener count stays as is.
			trace!("Replacing handler {}.", previous);
			self.handlers.remove(&previous);
			self.handlers.insert(handler_id, info);
			return;
		}

		if let Some(stale) = self.handlers.insert(handler_id, info) {
			warn!("Handler {} was still registered for {:?}. Reusing its id.", handler_id, stale.element);
		}

		let global_listeners = &mut self.global_listeners;
		let added = self.listener_counts.increment_or_insert_with(event_name.to_owned(), |event_name| {
			let capture = is_non_bubbling(event_name);
			trace!(capture, "Adding global listener.");
			global_listeners.add_global_listener(event_name, capture);
			capture
		});
		if let Err(CountSaturatedError) = added {
			error!("Too many (more than 4 billion) handlers for one event name. Listener counting is now unreliable.");
		}
	}

	#[instrument(skip(self))]
	fn remove_listener(&mut self, handler_id: EventHandlerId) {
		let info = match self.handlers.remove(&handler_id) {
			Some(info) => info,
			None => return trace!("Handler isn't registered (anymore)."),
		};

		if let Some(element_events) = self.elements.get_mut(&info.element) {
			if element_events.handlers.get(&info.event_name) == Some(&handler_id) {
				element_events.handlers.remove(&info.event_name);
			}
			if element_events.is_empty() {
				self.elements.remove(&info.element);
			}
		}

		match self.listener_counts.decrement(info.event_name.as_str()) {
			Some(Decremented::Retained) => (),
			Some(Decremented::Released(capture)) => {
				trace!(capture, "Removing global listener.");
				self.global_listeners.remove_global_listener(&info.event_name, capture)
			}
			None => error!("No listener count for {:?}.", info.event_name),
		}
	}

	fn set_stop_propagation(&mut self, element: &N, event_name: &str, value: bool) {
		self.flags(element, event_name, |events| &mut events.stop_propagation, value)
	}

	fn set_prevent_default(&mut self, element: &N, event_name: &str, value: bool) {
		self.flags(element, event_name, |events| &mut events.prevent_default, value)
	}

	fn forget_element(&mut self, element: &N) {
		if let Some(events) = self.elements.remove(element) {
			trace!(?element, handlers = events.handlers.len(), "Forgot element.");
		}
	}
}
