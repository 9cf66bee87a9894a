use core::fmt::{self, Display, Formatter};

/// Fatal failure while applying an edit script.
///
/// Edit scripts are generated by a trusted peer against the tree state it believes the client has,
/// so none of these are transient: each one signals that client and server have desynchronised.
///
/// Errors abort the remainder of the current batch. Edits applied before the failing one are **not** rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
	/// An edit targeted a node of the wrong physical kind, or the edit stream's nesting is inconsistent.
	StructuralMismatch {
		/// What was being attempted.
		operation: &'static str,
		/// What was found instead.
		detail: String,
	},
	/// A raw edit or frame tag outside the closed set.
	UnknownVariant {
		/// `"edit"` or `"frame"`.
		kind: &'static str,
		tag: u8,
	},
	/// Deliberately unimplemented tree operation.
	UnsupportedOperation(&'static str),
	/// A component, node, frame or event handler the edit refers to doesn't exist or is malformed.
	ProtocolReference(String),
}

impl Display for PatchError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			PatchError::StructuralMismatch { operation, detail } => write!(f, "Structural mismatch during {}: {}", operation, detail),
			PatchError::UnknownVariant { kind, tag } => write!(f, "Unknown {} type: {}", kind, tag),
			PatchError::UnsupportedOperation(operation) => write!(f, "Not implemented: {}", operation),
			PatchError::ProtocolReference(detail) => write!(f, "Invalid reference: {}", detail),
		}
	}
}

impl std::error::Error for PatchError {}

pub type Result<T, E = PatchError> = core::result::Result<T, E>;

impl PatchError {
	pub(crate) fn mismatch(operation: &'static str, detail: impl Into<String>) -> Self {
		Self::StructuralMismatch { operation, detail: detail.into() }
	}

	pub(crate) fn reference(detail: impl Into<String>) -> Self {
		Self::ProtocolReference(detail.into())
	}
}
