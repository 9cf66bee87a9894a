//! The read-only query surface over render batches.
//!
//! Decoding the wire layout is left to the transport. What arrives here is already split into [`Edit`]s,
//! which address siblings relative to the currently open logical parent, and a flattened pre-order array of
//! [`Frame`]s that edits refer to by index.

use crate::error::PatchError;
use core::convert::TryFrom;

pub type ComponentId = u32;
pub type EventHandlerId = u64;
pub type RendererId = u32;

/// One step of an edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit<'a> {
	/// Materializes `frames[frame_index]` (and its descendants) as a new sibling.
	PrependFrame { sibling_index: u32, frame_index: u32 },
	RemoveFrame { sibling_index: u32 },
	SetAttribute { sibling_index: u32, frame_index: u32 },
	RemoveAttribute { sibling_index: u32, name: &'a str },
	UpdateText { sibling_index: u32, frame_index: u32 },
	/// Replaces a markup block wholesale.
	UpdateMarkup { sibling_index: u32, frame_index: u32 },
	StepIn { sibling_index: u32 },
	StepOut,
	/// One move of a keyed reorder. Entries accumulate until [`Edit::PermutationListEnd`].
	PermutationListEntry { sibling_index: u32, move_to_sibling_index: u32 },
	PermutationListEnd,
}

/// One node of the flattened render tree.
///
/// Frames carrying a `subtree_length` own the following `subtree_length - 1` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
	/// Attribute frames directly follow their element frame, before any other descendants.
	Element { subtree_length: u32, name: &'a str },
	Text { content: &'a str },
	/// `event_handler_id` is `0` for plain attributes.
	///
	/// A missing `value` means the attribute is absent (boolean `false`).
	Attribute { name: &'a str, value: Option<&'a str>, event_handler_id: EventHandlerId },
	Component { subtree_length: u32, component_id: ComponentId },
	/// Transparent grouping: its descendants are spliced into the surrounding parent.
	Region { subtree_length: u32 },
	ElementReferenceCapture { capture_id: &'a str },
	ComponentReferenceCapture,
	Markup { content: &'a str },
}

impl<'a> Edit<'a> {
	#[must_use]
	pub fn edit_type(&self) -> EditType {
		match self {
			Edit::PrependFrame { .. } => EditType::PrependFrame,
			Edit::RemoveFrame { .. } => EditType::RemoveFrame,
			Edit::SetAttribute { .. } => EditType::SetAttribute,
			Edit::RemoveAttribute { .. } => EditType::RemoveAttribute,
			Edit::UpdateText { .. } => EditType::UpdateText,
			Edit::UpdateMarkup { .. } => EditType::UpdateMarkup,
			Edit::StepIn { .. } => EditType::StepIn,
			Edit::StepOut => EditType::StepOut,
			Edit::PermutationListEntry { .. } => EditType::PermutationListEntry,
			Edit::PermutationListEnd => EditType::PermutationListEnd,
		}
	}
}

impl<'a> Frame<'a> {
	#[must_use]
	pub fn frame_type(&self) -> FrameType {
		match self {
			Frame::Element { .. } => FrameType::Element,
			Frame::Text { .. } => FrameType::Text,
			Frame::Attribute { .. } => FrameType::Attribute,
			Frame::Component { .. } => FrameType::Component,
			Frame::Region { .. } => FrameType::Region,
			Frame::ElementReferenceCapture { .. } => FrameType::ElementReferenceCapture,
			Frame::ComponentReferenceCapture => FrameType::ComponentReferenceCapture,
			Frame::Markup { .. } => FrameType::Markup,
		}
	}

	/// How many frames after this one belong to its subtree.
	///
	/// Only element, component and region frames have descendants.
	#[must_use]
	pub fn descendant_count(&self) -> usize {
		match *self {
			Frame::Element { subtree_length, .. } | Frame::Component { subtree_length, .. } | Frame::Region { subtree_length } => (subtree_length as usize).saturating_sub(1),
			Frame::Text { .. } | Frame::Attribute { .. } | Frame::ElementReferenceCapture { .. } | Frame::ComponentReferenceCapture | Frame::Markup { .. } => 0,
		}
	}
}

/// Raw edit tags as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EditType {
	UpdateText = 1,
	SetAttribute = 2,
	RemoveAttribute = 3,
	PrependFrame = 4,
	RemoveFrame = 5,
	StepIn = 6,
	StepOut = 7,
	UpdateMarkup = 8,
	PermutationListEntry = 9,
	PermutationListEnd = 10,
}

impl TryFrom<u8> for EditType {
	type Error = PatchError;

	fn try_from(tag: u8) -> Result<Self, Self::Error> {
		Ok(match tag {
			1 => EditType::UpdateText,
			2 => EditType::SetAttribute,
			3 => EditType::RemoveAttribute,
			4 => EditType::PrependFrame,
			5 => EditType::RemoveFrame,
			6 => EditType::StepIn,
			7 => EditType::StepOut,
			8 => EditType::UpdateMarkup,
			9 => EditType::PermutationListEntry,
			10 => EditType::PermutationListEnd,
			tag => return Err(PatchError::UnknownVariant { kind: "edit", tag }),
		})
	}
}

/// Raw frame tags as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
	Element = 1,
	Text = 2,
	Attribute = 3,
	Component = 4,
	Region = 5,
	ElementReferenceCapture = 6,
	ComponentReferenceCapture = 7,
	Markup = 8,
}

impl TryFrom<u8> for FrameType {
	type Error = PatchError;

	fn try_from(tag: u8) -> Result<Self, Self::Error> {
		Ok(match tag {
			1 => FrameType::Element,
			2 => FrameType::Text,
			3 => FrameType::Attribute,
			4 => FrameType::Component,
			5 => FrameType::Region,
			6 => FrameType::ElementReferenceCapture,
			7 => FrameType::ComponentReferenceCapture,
			8 => FrameType::Markup,
			tag => return Err(PatchError::UnknownVariant { kind: "frame", tag }),
		})
	}
}

/// A single move in a keyed reorder, in absolute child indices of the open parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermutationListEntry {
	pub from: usize,
	pub to: usize,
}

/// One component's share of a [`RenderBatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentDiff<'a> {
	pub component_id: ComponentId,
	pub edits: &'a [Edit<'a>],
}

/// Everything the server sends for one render cycle of one renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderBatch<'a> {
	pub updated_components: &'a [ComponentDiff<'a>],
	pub reference_frames: &'a [Frame<'a>],
	pub disposed_component_ids: &'a [ComponentId],
	pub disposed_event_handler_ids: &'a [EventHandlerId],
}
