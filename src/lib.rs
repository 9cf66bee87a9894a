#![doc(html_root_url = "https://docs.rs/render-batch-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod batch;
pub mod error;
pub mod events;
pub mod host;
pub mod logical;
pub mod memory;
pub mod patch;
pub mod rc_hash_map;
pub mod renderer;
pub mod web;

pub use batch::{ComponentDiff, ComponentId, Edit, EventHandlerId, Frame, RenderBatch, RendererId};
pub use error::{PatchError, Result};
pub use events::{DelegatedEvents, EventDelegator};
pub use host::HostDom;
pub use logical::LogicalTree;
pub use memory::MemoryDom;
pub use patch::TreePatcher;
pub use renderer::{ComponentLocations, Renderer, Renderers};
