//! A parent/children relation over DOM nodes that is independent of their physical nesting.
//!
//! Components whose output has no single wrapping element, raw markup blocks and comment-delimited prerendered
//! regions all need to behave as one node. The [`LogicalTree`] models them as *logical containers*:
//! [***Comment***](https://developer.mozilla.org/en-US/docs/Web/API/Comment)s that own logical children,
//! which are placed physically after the comment, as its following siblings.
//!
//! The relation lives in a side table keyed by node handle, so nothing is attached to host objects.

use crate::{
	batch::PermutationListEntry,
	error::{PatchError, Result},
	host::{HostDom, Namespace, NodeKind},
};
use core::{fmt::Debug, hash::Hash};
use hashbrown::HashMap;
use tracing::{error, instrument, trace, trace_span};

#[derive(Debug, Clone)]
struct LogicalRecord<N> {
	parent: Option<N>,
	children: Vec<N>,
	end_sibling: Option<N>,
}

impl<N> Default for LogicalRecord<N> {
	fn default() -> Self {
		Self { parent: None, children: Vec::new(), end_sibling: None }
	}
}

#[derive(Debug)]
pub struct LogicalTree<N: Clone + Eq + Hash> {
	records: HashMap<N, LogicalRecord<N>>,
}

impl<N: Clone + Eq + Hash + Debug> Default for LogicalTree<N> {
	fn default() -> Self {
		Self::new()
	}
}

impl<N: Clone + Eq + Hash + Debug> LogicalTree<N> {
	#[must_use]
	pub fn new() -> Self {
		Self { records: HashMap::new() }
	}

	/// Starts tracking `node` as a logical element.
	///
	/// New logical elements must start empty, as anything already inside would otherwise be silently discarded.
	/// The one sanctioned exception is a root element whose prerendered content is kept until its first render,
	/// which passes `allow_existing_contents`.
	///
	/// Nodes that are already tracked are left alone.
	///
	/// # Errors
	///
	/// Iff `node` has DOM children and `allow_existing_contents` is `false`.
	#[instrument(skip(self, dom))]
	pub fn wrap<H: HostDom<Node = N>>(&mut self, dom: &H, node: &N, allow_existing_contents: bool) -> Result<()> {
		if !allow_existing_contents && dom.first_child(node).is_some() {
			error!("Tried to wrap non-empty node.");
			return Err(PatchError::reference("New logical elements must start empty, or allow_existing_contents must be true"));
		}
		self.records.entry(node.clone()).or_default();
		Ok(())
	}

	/// Tracks a prerendered component range delimited by `start` and, optionally, `end`.
	///
	/// The physical parent of `start` becomes a logical element that, unless it already has logical children,
	/// adopts all of its current DOM children. `end` becomes `start`'s logical end sibling.
	///
	/// # Errors
	///
	/// Iff `start` isn't a comment or has no parent node.
	#[instrument(skip(self, dom))]
	pub fn wrap_comment_range<H: HostDom<Node = N>>(&mut self, dom: &H, start: &N, end: Option<&N>) -> Result<()> {
		if dom.node_kind(start) != NodeKind::Comment {
			return Err(PatchError::mismatch("wrap_comment_range", format!("start node {:?} is not a comment", start)));
		}
		let parent = dom.parent_node(start).ok_or_else(|| PatchError::reference(format!("start comment {:?} has no parent node", start)))?;

		let parent_record = self.records.entry(parent.clone()).or_default();
		if parent_record.children.is_empty() {
			let mut next = dom.first_child(&parent);
			while let Some(child) = next {
				next = dom.next_sibling(&child);
				parent_record.children.push(child);
			}
			for child in parent_record.children.clone() {
				self.records.entry(child).or_default().parent = Some(parent.clone());
			}
		}

		let start_record = self.records.entry(start.clone()).or_default();
		start_record.parent = Some(parent);
		start_record.end_sibling = end.cloned();
		Ok(())
	}

	#[must_use]
	pub fn is_tracked(&self, node: &N) -> bool {
		self.records.contains_key(node)
	}

	/// The logical parent of `node`, if it has one.
	#[must_use]
	pub fn parent(&self, node: &N) -> Option<&N> {
		self.records.get(node)?.parent.as_ref()
	}

	#[must_use]
	pub fn child(&self, parent: &N, index: usize) -> Option<&N> {
		self.records.get(parent)?.children.get(index)
	}

	/// The logical children of `node`. Empty if `node` isn't tracked.
	#[must_use]
	pub fn children(&self, node: &N) -> &[N] {
		self.records.get(node).map_or(&[], |record| &record.children)
	}

	/// The closing boundary of a comment-delimited range.
	#[must_use]
	pub fn end_sibling(&self, node: &N) -> Option<&N> {
		self.records.get(node)?.end_sibling.as_ref()
	}

	fn next_sibling(&self, node: &N) -> Option<&N> {
		let siblings = &self.records.get(self.parent(node)?)?.children;
		let index = siblings.iter().position(|sibling| sibling == node)?;
		siblings.get(index + 1)
	}

	/// The nearest physical element: `node` itself if it is one, otherwise its parent node.
	pub fn closest_dom_element<H: HostDom<Node = N>>(dom: &H, node: &N) -> Option<N> {
		match dom.node_kind(node) {
			NodeKind::Element => Some(node.clone()),
			NodeKind::Text | NodeKind::Comment | NodeKind::Other => dom.parent_node(node),
		}
	}

	#[must_use]
	pub fn is_svg<H: HostDom<Node = N>>(dom: &H, node: &N) -> bool {
		Self::closest_dom_element(dom, node).and_then(|element| dom.namespace(&element)) == Some(Namespace::Svg)
	}

	/// Creates an empty logical container and inserts it at `index`.
	///
	/// # Errors
	///
	/// See [`LogicalTree::insert`].
	pub fn create_and_insert_container<H: HostDom<Node = N>>(&mut self, dom: &mut H, parent: &N, index: usize) -> Result<N> {
		let container = dom.create_comment("!");
		self.insert(dom, &container, parent, index)?;
		Ok(container)
	}

	/// Inserts `child` as `parent`'s logical child at `index`, placing it physically in the matching spot.
	///
	/// # Errors
	///
	/// - [`PatchError::UnsupportedOperation`] if `child` already has a logical parent, or is a logical container with logical children.
	/// - [`PatchError::ProtocolReference`] if `parent` isn't tracked.
	/// - [`PatchError::StructuralMismatch`] if `index` is past the end of `parent`'s children.
	#[instrument(skip(self, dom))]
	pub fn insert<H: HostDom<Node = N>>(&mut self, dom: &mut H, child: &N, parent: &N, index: usize) -> Result<()> {
		if let Some(record) = self.records.get(child) {
			// Both are easy to support, but nothing in the protocol needs them.
			if dom.node_kind(child) == NodeKind::Comment && !record.children.is_empty() {
				return Err(PatchError::UnsupportedOperation("inserting non-empty logical container"));
			}
			if record.parent.is_some() {
				return Err(PatchError::UnsupportedOperation("moving existing logical children"));
			}
		}

		let sibling_count = match self.records.get(parent) {
			Some(record) => record.children.len(),
			None => return Err(PatchError::reference(format!("insertion parent {:?} is not a logical element", parent))),
		};

		if index < sibling_count {
			let next_sibling = self.children(parent)[index].clone();
			let physical_parent = dom
				.parent_node(&next_sibling)
				.ok_or_else(|| PatchError::reference(format!("logical sibling {:?} is detached", next_sibling)))?;
			dom.insert_before(&physical_parent, child, Some(&next_sibling));
		} else if index == sibling_count {
			self.append_dom_node(dom, child, parent)?;
		} else {
			return Err(PatchError::mismatch("insert", format!("index {} is past the end of {} logical children", index, sibling_count)));
		}

		if let Some(record) = self.records.get_mut(parent) {
			record.children.insert(index, child.clone());
		}
		self.records.entry(child.clone()).or_default().parent = Some(parent.clone());
		Ok(())
	}

	/// Puts `child` physically at the end of `parent`'s logical range, without touching the logical relation.
	fn append_dom_node<H: HostDom<Node = N>>(&self, dom: &mut H, child: &N, parent: &N) -> Result<()> {
		match dom.node_kind(parent) {
			NodeKind::Element | NodeKind::Other => {
				dom.insert_before(parent, child, None);
				Ok(())
			}
			NodeKind::Comment => {
				if let Some(next_sibling) = self.next_sibling(parent) {
					// Appending to a container means going right before the container's successor.
					let physical_parent = dom
						.parent_node(next_sibling)
						.ok_or_else(|| PatchError::reference(format!("logical sibling {:?} is detached", next_sibling)))?;
					dom.insert_before(&physical_parent, child, Some(next_sibling));
					Ok(())
				} else {
					let grandparent = self
						.parent(parent)
						.ok_or_else(|| PatchError::reference(format!("logical container {:?} has neither a next sibling nor a parent", parent)))?
						.clone();
					self.append_dom_node(dom, child, &grandparent)
				}
			}
			NodeKind::Text => Err(PatchError::mismatch("append", format!("{:?} is a text node and can't have children", parent))),
		}
	}

	/// Removes `parent`'s logical child at `index` from both the logical tree and the DOM.
	///
	/// Logical containers take their logical descendants with them.
	///
	/// Returns the removed node along with every logical descendant that was forgotten, descendants first.
	///
	/// # Errors
	///
	/// Iff there is no such child.
	#[instrument(skip(self, dom))]
	pub fn remove<H: HostDom<Node = N>>(&mut self, dom: &mut H, parent: &N, index: usize) -> Result<Vec<N>> {
		let child = match self.records.get_mut(parent) {
			Some(record) if index < record.children.len() => record.children.remove(index),
			Some(record) => return Err(PatchError::reference(format!("no logical child at index {} (of {})", index, record.children.len()))),
			None => return Err(PatchError::reference(format!("{:?} is not a logical element", parent))),
		};

		let mut removed = Vec::new();
		if dom.node_kind(&child) == NodeKind::Comment {
			while !self.children(&child).is_empty() {
				removed.extend(self.remove(dom, &child, 0)?);
			}
		}

		dom.remove(&child);
		self.forget(&child, &mut removed);
		Ok(removed)
	}

	/// Drops the records of `node` and its logical descendants, collecting them into `forgotten`.
	fn forget(&mut self, node: &N, forgotten: &mut Vec<N>) {
		if let Some(record) = self.records.remove(node) {
			for child in &record.children {
				self.forget(child, forgotten)
			}
		}
		forgotten.push(node.clone());
	}

	/// Removes all DOM children of `element`, which must not have logical children yet.
	///
	/// This is how prerendered content of root elements is discarded.
	#[instrument(skip(self, dom))]
	pub fn clear_element<H: HostDom<Node = N>>(&mut self, dom: &mut H, element: &N) {
		debug_assert!(self.children(element).is_empty(), "Cleared element already has logical children");
		let mut forgotten = Vec::new();
		while let Some(child) = dom.first_child(element) {
			dom.remove(&child);
			self.forget(&child, &mut forgotten);
		}
		trace!(count = forgotten.len(), "Discarded prerendered nodes.");
	}

	/// Removes the logical siblings following `start` up to and including `end`.
	///
	/// `start` remains as a plain logical container.
	///
	/// # Errors
	///
	/// Iff `start` has no logical parent or `end` isn't one of its later siblings.
	#[instrument(skip(self, dom))]
	pub fn clear_between<H: HostDom<Node = N>>(&mut self, dom: &mut H, start: &N, end: &N) -> Result<()> {
		let parent = self.parent(start).ok_or_else(|| PatchError::reference("can't clear between nodes: the start node does not have a logical parent"))?.clone();
		let siblings = self.children(&parent);
		let remove_start = siblings.iter().position(|sibling| sibling == start).map(|index| index + 1);
		let end_index = siblings.iter().position(|sibling| sibling == end);
		let (remove_start, end_index) = match (remove_start, end_index) {
			(Some(remove_start), Some(end_index)) if end_index >= remove_start => (remove_start, end_index),
			_ => return Err(PatchError::reference(format!("{:?} is not a later logical sibling of {:?}", end, start))),
		};

		for _ in remove_start..=end_index {
			self.remove(dom, &parent, remove_start)?;
		}

		if let Some(record) = self.records.get_mut(start) {
			record.end_sibling = None;
		}
		dom.set_data(start, "!");
		Ok(())
	}

	/// The last DOM node, in depth-first order, that belongs to `node`'s logical subtree.
	///
	/// The whole subtree lies physically between `node` and the returned node, inclusive.
	fn last_dom_node_in_range<H: HostDom<Node = N>>(&self, dom: &H, node: &N) -> Result<N> {
		if dom.node_kind(node) == NodeKind::Element {
			return Ok(node.clone());
		}

		if let Some(next_sibling) = self.next_sibling(node) {
			return dom
				.previous_sibling(next_sibling)
				.ok_or_else(|| PatchError::mismatch("permute", format!("logical sibling {:?} has no previous DOM sibling", next_sibling)));
		}

		let parent = self.parent(node).ok_or_else(|| PatchError::reference(format!("{:?} has no logical parent", node)))?;
		match dom.node_kind(parent) {
			NodeKind::Element | NodeKind::Other => dom.last_child(parent).ok_or_else(|| PatchError::mismatch("permute", format!("{:?} has no DOM children", parent))),
			NodeKind::Comment | NodeKind::Text => self.last_dom_node_in_range(dom, parent),
		}
	}

	/// Reorders `parent`'s logical children, keeping DOM node identity.
	///
	/// `moves` must be a valid permutation: distinct `from` indices whose set equals the set of `to` indices.
	/// All moves happen simultaneously, i.e. indices refer to the order before the call.
	///
	/// # Errors
	///
	/// Iff an index is out of range or the DOM doesn't match the logical tree.
	#[instrument(skip(self, dom))]
	pub fn permute<H: HostDom<Node = N>>(&mut self, dom: &mut H, parent: &N, moves: &[PermutationListEntry]) -> Result<()> {
		let siblings = self.children(parent).to_vec();
		let sibling = |index: usize| siblings.get(index).ok_or_else(|| PatchError::reference(format!("permutation index {} out of range ({} children)", index, siblings.len())));

		// Each phase must run to completion before the next, since every later one relies on pre-move positions.

		// 1. Track which DOM ranges to move.
		let mut ranges = Vec::with_capacity(moves.len());
		for entry in moves {
			let start = sibling(entry.from)?.clone();
			let end = self.last_dom_node_in_range(dom, &start)?;
			ranges.push((start, end));
		}

		// 2. Mark destinations.
		let mut markers = Vec::with_capacity(moves.len());
		for entry in moves {
			let insert_before = sibling(entry.to)?;
			let physical_parent = dom
				.parent_node(insert_before)
				.ok_or_else(|| PatchError::reference(format!("logical sibling {:?} is detached", insert_before)))?;
			let marker = dom.create_comment("marker");
			dom.insert_before(&physical_parent, &marker, Some(insert_before));
			markers.push((physical_parent, marker));
		}

		// 3. Move ranges in front of their markers.
		for ((start, end), (physical_parent, marker)) in ranges.iter().zip(&markers) {
			let span = trace_span!("Moving range", ?start, ?end);
			let _enter = span.enter();
			let mut next_to_move = Some(start.clone());
			while let Some(node) = next_to_move {
				next_to_move = dom.next_sibling(&node);
				dom.insert_before(physical_parent, &node, Some(marker));
				if &node == end {
					break;
				}
			}
			dom.remove(marker);
		}

		// 4. Update the logical order.
		if let Some(record) = self.records.get_mut(parent) {
			for (entry, (start, _)) in moves.iter().zip(ranges) {
				record.children[entry.to] = start;
			}
		}
		trace!("Permuted {} logical children.", moves.len());
		Ok(())
	}
}
