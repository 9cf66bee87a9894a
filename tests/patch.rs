use core::convert::TryFrom;
use hashbrown::HashMap;
use render_batch_dom::{
	batch::{EditType, FrameType},
	host::{HostDom, Namespace},
	memory::NodeId,
	renderer::ComponentLocations,
	DelegatedEvents, Edit, Frame, LogicalTree, MemoryDom, PatchError, Renderer, TreePatcher,
};

const ROOT: u32 = 1;

type TestRenderer = Renderer<MemoryDom, DelegatedEvents<NodeId>>;

fn renderer() -> (TestRenderer, NodeId) {
	let mut dom = MemoryDom::new();
	let root = dom.create_element("div", Namespace::Html);
	let mut renderer = Renderer::new(0, dom, DelegatedEvents::default());
	renderer.attach_root_component_to_element(ROOT, root).unwrap();
	(renderer, root)
}

fn html(renderer: &TestRenderer, node: NodeId) -> String {
	renderer.dom().inner_html(node)
}

fn child(renderer: &TestRenderer, parent: NodeId, index: usize) -> NodeId {
	*renderer.tree().child(&parent, index).unwrap()
}

#[test]
fn prepend_then_remove() {
	let (mut renderer, root) = renderer();
	let frames = [Frame::Text { content: "hello" }];

	renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }], &frames).unwrap();
	assert_eq!(html(&renderer, root), "hello");

	renderer.update_component(ROOT, &[Edit::RemoveFrame { sibling_index: 0 }], &frames).unwrap();
	assert_eq!(html(&renderer, root), "");
	assert!(renderer.tree().children(&root).is_empty());
}

#[test]
fn prepend_then_remove_element() {
	let (mut renderer, root) = renderer();
	let frames = [Frame::Element { subtree_length: 1, name: "div" }];

	renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }], &frames).unwrap();
	let div = child(&renderer, root, 0);
	assert_eq!(renderer.dom().child_nodes(root), &[div]);
	assert_eq!(html(&renderer, root), "<div></div>");

	renderer.update_component(ROOT, &[Edit::RemoveFrame { sibling_index: 0 }], &frames).unwrap();
	assert!(renderer.tree().children(&root).is_empty());
	assert!(renderer.dom().child_nodes(root).is_empty());
	assert!(!renderer.tree().is_tracked(&div));
}

#[test]
fn element_prepended_before_text() {
	let (mut renderer, root) = renderer();
	let frames = [Frame::Text { content: "A" }, Frame::Element { subtree_length: 1, name: "span" }];

	renderer
		.update_component(
			ROOT,
			&[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }, Edit::PrependFrame { sibling_index: 0, frame_index: 1 }],
			&frames,
		)
		.unwrap();

	let span = child(&renderer, root, 0);
	let a = child(&renderer, root, 1);
	assert_eq!(renderer.dom().tag_name(&span), "SPAN");
	assert_eq!(renderer.dom().data(&a), "A");
	assert_eq!(renderer.dom().child_nodes(root), &[span, a]);
	assert_eq!(html(&renderer, root), "<span></span>A");
}

#[test]
fn element_with_attributes_and_children() {
	let (mut renderer, root) = renderer();
	let frames = [
		Frame::Element { subtree_length: 6, name: "p" },
		Frame::Attribute { name: "class", value: Some("greeting"), event_handler_id: 0 },
		Frame::Attribute { name: "hidden", value: None, event_handler_id: 0 },
		Frame::Text { content: "Hello, " },
		Frame::Element { subtree_length: 2, name: "b" },
		Frame::Text { content: "world" },
	];
	renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }], &frames).unwrap();

	assert_eq!(html(&renderer, root), r#"<p class="greeting">Hello, <b>world</b></p>"#);
	let paragraph = child(&renderer, root, 0);
	assert_eq!(renderer.tree().children(&paragraph).len(), 2);
}

#[test]
fn region_is_transparent() {
	let (mut renderer, root) = renderer();
	let frames = [
		Frame::Region { subtree_length: 4 },
		Frame::Text { content: "a" },
		Frame::Text { content: "b" },
		Frame::Text { content: "c" },
		Frame::Text { content: "d" },
	];
	renderer
		.update_component(
			ROOT,
			&[
				Edit::PrependFrame { sibling_index: 0, frame_index: 0 },
				// The region took three slots.
				Edit::PrependFrame { sibling_index: 3, frame_index: 4 },
			],
			&frames,
		)
		.unwrap();

	assert_eq!(renderer.tree().children(&root).len(), 4);
	assert_eq!(html(&renderer, root), "abcd");
}

#[test]
fn step_in_and_out() {
	let (mut renderer, root) = renderer();
	let frames = [
		Frame::Element { subtree_length: 1, name: "ul" },
		Frame::Element { subtree_length: 2, name: "li" },
		Frame::Text { content: "x" },
		Frame::Text { content: "after" },
	];
	renderer
		.update_component(
			ROOT,
			&[
				Edit::PrependFrame { sibling_index: 0, frame_index: 0 },
				Edit::StepIn { sibling_index: 0 },
				Edit::PrependFrame { sibling_index: 0, frame_index: 1 },
				Edit::StepOut,
				Edit::PrependFrame { sibling_index: 1, frame_index: 3 },
			],
			&frames,
		)
		.unwrap();

	assert_eq!(html(&renderer, root), "<ul><li>x</li></ul>after");
}

#[test]
fn step_out_at_root_is_a_mismatch() {
	let (mut renderer, _) = renderer();
	assert!(matches!(renderer.update_component(ROOT, &[Edit::StepOut], &[]), Err(PatchError::StructuralMismatch { .. })));
}

#[test]
fn unbalanced_script_is_a_mismatch() {
	let (mut renderer, root) = renderer();
	let frames = [Frame::Element { subtree_length: 1, name: "ul" }];
	let result = renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }, Edit::StepIn { sibling_index: 0 }], &frames);

	assert!(matches!(result, Err(PatchError::StructuralMismatch { .. })));
	assert_eq!(html(&renderer, root), "<ul></ul>");
}

#[test]
fn set_attribute_on_text_is_fatal() {
	let (mut renderer, root) = renderer();
	let frames = [
		Frame::Text { content: "a" },
		Frame::Attribute { name: "class", value: Some("x"), event_handler_id: 0 },
		Frame::Text { content: "never" },
	];
	let result = renderer.update_component(
		ROOT,
		&[
			Edit::PrependFrame { sibling_index: 0, frame_index: 0 },
			Edit::SetAttribute { sibling_index: 0, frame_index: 1 },
			Edit::PrependFrame { sibling_index: 1, frame_index: 2 },
		],
		&frames,
	);

	assert!(matches!(result, Err(PatchError::StructuralMismatch { .. })));
	// No rollback, but nothing after the failing edit either.
	assert_eq!(html(&renderer, root), "a");
}

#[test]
fn set_and_remove_attribute() {
	let (mut renderer, root) = renderer();
	let frames = [
		Frame::Element { subtree_length: 1, name: "span" },
		Frame::Attribute { name: "title", value: Some("tip"), event_handler_id: 0 },
	];
	renderer
		.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }, Edit::SetAttribute { sibling_index: 0, frame_index: 1 }], &frames)
		.unwrap();
	assert_eq!(html(&renderer, root), r#"<span title="tip"></span>"#);

	renderer.update_component(ROOT, &[Edit::RemoveAttribute { sibling_index: 0, name: "title" }], &frames).unwrap();
	assert_eq!(html(&renderer, root), "<span></span>");
}

#[test]
fn update_text() {
	let (mut renderer, root) = renderer();
	let frames = [Frame::Text { content: "before" }, Frame::Text { content: "after" }];
	renderer
		.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }, Edit::UpdateText { sibling_index: 0, frame_index: 1 }], &frames)
		.unwrap();
	assert_eq!(html(&renderer, root), "after");
}

#[test]
fn update_text_on_element_is_a_mismatch() {
	let (mut renderer, _) = renderer();
	let frames = [Frame::Element { subtree_length: 1, name: "span" }, Frame::Text { content: "text" }];
	let result = renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }, Edit::UpdateText { sibling_index: 0, frame_index: 1 }], &frames);
	assert!(matches!(result, Err(PatchError::StructuralMismatch { .. })));
}

#[test]
fn markup_is_replaced_wholesale() {
	let (mut renderer, root) = renderer();
	let frames = [Frame::Markup { content: "<b>x</b>y" }, Frame::Markup { content: "<i>z</i>" }];

	renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }], &frames).unwrap();
	assert_eq!(html(&renderer, root), "<!--!--><b>x</b>y");
	let container = child(&renderer, root, 0);
	assert_eq!(renderer.tree().children(&container).len(), 2);

	renderer.update_component(ROOT, &[Edit::UpdateMarkup { sibling_index: 0, frame_index: 1 }], &frames).unwrap();
	assert_eq!(html(&renderer, root), "<!--!--><i>z</i>");
	assert_eq!(renderer.tree().children(&root).len(), 1);
}

#[test]
fn empty_markup_becomes_a_space() {
	let (mut renderer, root) = renderer();
	renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }], &[Frame::Markup { content: "" }]).unwrap();
	assert_eq!(html(&renderer, root), "<!--!--> ");
}

#[test]
fn svg_namespace_is_inherited() {
	let (mut renderer, root) = renderer();
	let frames = [
		Frame::Element { subtree_length: 3, name: "svg" },
		Frame::Element { subtree_length: 1, name: "circle" },
		Frame::Markup { content: "<rect></rect>" },
		Frame::Element { subtree_length: 1, name: "div" },
	];
	renderer
		.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }, Edit::PrependFrame { sibling_index: 1, frame_index: 3 }], &frames)
		.unwrap();

	let svg = child(&renderer, root, 0);
	let circle = child(&renderer, svg, 0);
	let markup = child(&renderer, svg, 1);
	let rect = child(&renderer, markup, 0);
	let div = child(&renderer, root, 1);

	let dom = renderer.dom();
	assert_eq!(dom.namespace(&svg), Some(Namespace::Svg));
	assert_eq!(dom.namespace(&circle), Some(Namespace::Svg));
	assert_eq!(dom.namespace(&rect), Some(Namespace::Svg));
	assert_eq!(dom.namespace(&div), Some(Namespace::Html));
}

#[test]
fn select_value_is_replayed_when_its_option_arrives() {
	let (mut renderer, root) = renderer();
	let frames = [
		Frame::Element { subtree_length: 8, name: "select" },
		Frame::Attribute { name: "value", value: Some("b"), event_handler_id: 0 },
		Frame::Element { subtree_length: 3, name: "option" },
		Frame::Attribute { name: "value", value: Some("a"), event_handler_id: 0 },
		Frame::Text { content: "A" },
		Frame::Element { subtree_length: 3, name: "option" },
		Frame::Attribute { name: "value", value: Some("b"), event_handler_id: 0 },
		Frame::Text { content: "B" },
	];
	renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }], &frames).unwrap();

	let select = child(&renderer, root, 0);
	assert_eq!(renderer.dom().value(&select), "b");
}

#[test]
fn select_value_set_before_options_exist() {
	let (mut renderer, root) = renderer();
	let frames = [
		Frame::Element { subtree_length: 1, name: "select" },
		Frame::Attribute { name: "value", value: Some("b"), event_handler_id: 0 },
		Frame::Element { subtree_length: 2, name: "option" },
		Frame::Attribute { name: "value", value: Some("a"), event_handler_id: 0 },
		Frame::Element { subtree_length: 2, name: "option" },
		Frame::Attribute { name: "value", value: Some("b"), event_handler_id: 0 },
	];
	renderer
		.update_component(
			ROOT,
			&[
				Edit::PrependFrame { sibling_index: 0, frame_index: 0 },
				Edit::SetAttribute { sibling_index: 0, frame_index: 1 },
				Edit::StepIn { sibling_index: 0 },
				Edit::PrependFrame { sibling_index: 0, frame_index: 2 },
				Edit::PrependFrame { sibling_index: 1, frame_index: 4 },
				Edit::StepOut,
			],
			&frames,
		)
		.unwrap();

	let select = child(&renderer, root, 0);
	assert_eq!(renderer.dom().value(&select), "b");
}

#[test]
fn matched_select_value_is_not_deferred() {
	let mut dom = MemoryDom::new();
	let root = dom.create_element("div", Namespace::Html);
	let mut tree = LogicalTree::new();
	tree.wrap(&dom, &root, false).unwrap();
	let mut components = ComponentLocations::new();
	let mut pending_select_values = HashMap::new();
	let mut events = DelegatedEvents::default();
	let mut patcher = TreePatcher {
		dom: &mut dom,
		tree: &mut tree,
		components: &mut components,
		pending_select_values: &mut pending_select_values,
		events: &mut events,
	};

	let frames = [
		Frame::Element { subtree_length: 5, name: "select" },
		Frame::Element { subtree_length: 2, name: "option" },
		Frame::Attribute { name: "value", value: Some("a"), event_handler_id: 0 },
		Frame::Element { subtree_length: 2, name: "option" },
		Frame::Attribute { name: "value", value: Some("b"), event_handler_id: 0 },
		Frame::Attribute { name: "value", value: Some("b"), event_handler_id: 0 },
		Frame::Attribute { name: "value", value: Some("zzz"), event_handler_id: 0 },
	];
	patcher
		.apply_edits(
			ROOT,
			root,
			0,
			&[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }, Edit::SetAttribute { sibling_index: 0, frame_index: 5 }],
			&frames,
		)
		.unwrap();
	assert!(patcher.pending_select_values.is_empty());

	patcher.apply_edits(ROOT, root, 0, &[Edit::SetAttribute { sibling_index: 0, frame_index: 6 }], &frames).unwrap();
	assert_eq!(patcher.pending_select_values.len(), 1);

	patcher.apply_edits(ROOT, root, 0, &[Edit::RemoveFrame { sibling_index: 0 }], &frames).unwrap();
	assert!(patcher.pending_select_values.is_empty());
	assert!(dom.child_nodes(root).is_empty());
}

#[test]
fn option_removal_replays_pending_select_value() {
	let (mut renderer, root) = renderer();
	let frames = [
		Frame::Element { subtree_length: 7, name: "select" },
		Frame::Element { subtree_length: 2, name: "option" },
		Frame::Attribute { name: "value", value: Some("a"), event_handler_id: 0 },
		Frame::Element { subtree_length: 2, name: "option" },
		Frame::Attribute { name: "value", value: Some("b"), event_handler_id: 0 },
		Frame::Element { subtree_length: 2, name: "option" },
		Frame::Attribute { name: "value", value: Some("x"), event_handler_id: 0 },
		Frame::Attribute { name: "value", value: Some("c"), event_handler_id: 0 },
		Frame::Element { subtree_length: 2, name: "option" },
		Frame::Attribute { name: "value", value: Some("c"), event_handler_id: 0 },
	];
	renderer
		.update_component(
			ROOT,
			&[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }, Edit::SetAttribute { sibling_index: 0, frame_index: 7 }],
			&frames,
		)
		.unwrap();
	let select = child(&renderer, root, 0);

	// Something other than the renderer picks an option.
	renderer.dom_mut().set_value(&select, Some("x"));
	assert_eq!(renderer.dom().value(&select), "x");

	renderer
		.update_component(ROOT, &[Edit::StepIn { sibling_index: 0 }, Edit::RemoveFrame { sibling_index: 1 }, Edit::StepOut], &frames)
		.unwrap();
	assert_eq!(renderer.dom().value(&select), "a");

	renderer
		.update_component(ROOT, &[Edit::StepIn { sibling_index: 0 }, Edit::PrependFrame { sibling_index: 2, frame_index: 8 }, Edit::StepOut], &frames)
		.unwrap();
	assert_eq!(renderer.dom().value(&select), "c");
}

#[test]
fn removal_forgets_event_configuration() {
	let (mut renderer, root) = renderer();
	let frames = [
		Frame::Element { subtree_length: 4, name: "div" },
		Frame::Attribute { name: "__internal_stopPropagation_onclick", value: Some(""), event_handler_id: 0 },
		Frame::Element { subtree_length: 2, name: "button" },
		Frame::Attribute { name: "onclick", value: None, event_handler_id: 5 },
	];
	renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }], &frames).unwrap();
	assert_eq!(renderer.events().element_count(), 2);

	renderer.update_component(ROOT, &[Edit::RemoveFrame { sibling_index: 0 }], &frames).unwrap();
	assert_eq!(renderer.events().element_count(), 0);
	assert_eq!(renderer.events().handler_count(), 1);
	assert_eq!(renderer.events().listener_count("click"), 1);

	renderer.dispose_event_handler(5);
	assert_eq!(renderer.events().handler_count(), 0);
	assert_eq!(renderer.events().listener_count("click"), 0);
}

#[test]
fn input_properties() {
	let (mut renderer, root) = renderer();
	let frames = [
		Frame::Element { subtree_length: 3, name: "input" },
		Frame::Attribute { name: "value", value: Some("typed"), event_handler_id: 0 },
		Frame::Attribute { name: "checked", value: Some(""), event_handler_id: 0 },
	];
	renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }], &frames).unwrap();

	let input = child(&renderer, root, 0);
	assert_eq!(renderer.dom().value(&input), "typed");
	assert!(renderer.dom().checked(&input));
	// Properties, not attributes.
	assert_eq!(html(&renderer, root), "<input>");

	renderer.update_component(ROOT, &[Edit::RemoveAttribute { sibling_index: 0, name: "checked" }], &frames).unwrap();
	assert!(!renderer.dom().checked(&input));
}

#[test]
fn child_components_get_containers() {
	let (mut renderer, root) = renderer();
	let frames = [
		Frame::Component { subtree_length: 1, component_id: 2 },
		Frame::Text { content: "child" },
		Frame::Text { content: "tail" },
		Frame::Text { content: "more" },
	];
	renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }], &frames).unwrap();
	let container = child(&renderer, root, 0);
	assert_eq!(renderer.components().get(2), Some(&container));

	renderer.update_component(2, &[Edit::PrependFrame { sibling_index: 0, frame_index: 1 }], &frames).unwrap();
	renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 1, frame_index: 2 }], &frames).unwrap();
	renderer.update_component(2, &[Edit::PrependFrame { sibling_index: 1, frame_index: 3 }], &frames).unwrap();

	assert_eq!(html(&renderer, root), "<!--!-->childmoretail");
}

#[test]
fn element_reference_capture() {
	let (mut renderer, root) = renderer();
	let frames = [Frame::Element { subtree_length: 2, name: "div" }, Frame::ElementReferenceCapture { capture_id: "abc" }, Frame::ComponentReferenceCapture];
	renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }], &frames).unwrap();
	assert_eq!(html(&renderer, root), r#"<div _bl_abc=""></div>"#);

	// Component reference captures have no client-side effect.
	renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 1, frame_index: 2 }], &frames).unwrap();
	assert_eq!(renderer.tree().children(&root).len(), 1);
}

#[test]
fn reference_capture_needs_an_element_parent() {
	let (mut renderer, _) = renderer();
	let frames = [Frame::Component { subtree_length: 1, component_id: 2 }, Frame::ElementReferenceCapture { capture_id: "abc" }];
	renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }], &frames).unwrap();
	assert!(matches!(
		renderer.update_component(2, &[Edit::PrependFrame { sibling_index: 0, frame_index: 1 }], &frames),
		Err(PatchError::StructuralMismatch { .. })
	));
}

#[test]
fn stray_attribute_frame_is_a_mismatch() {
	let (mut renderer, _) = renderer();
	let frames = [Frame::Attribute { name: "class", value: Some("x"), event_handler_id: 0 }];
	assert!(matches!(
		renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }], &frames),
		Err(PatchError::StructuralMismatch { .. })
	));
}

#[test]
fn event_handler_attributes_become_listeners() {
	let (mut renderer, root) = renderer();
	let frames = [
		Frame::Element { subtree_length: 2, name: "button" },
		Frame::Attribute { name: "onclick", value: None, event_handler_id: 7 },
		Frame::Attribute { name: "click", value: None, event_handler_id: 8 },
	];
	renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }], &frames).unwrap();

	let button = child(&renderer, root, 0);
	assert_eq!(renderer.events().handler(&button, "click"), Some(7));
	assert_eq!(renderer.events().listener_count("click"), 1);
	assert_eq!(html(&renderer, root), "<button></button>");

	assert!(matches!(
		renderer.update_component(ROOT, &[Edit::SetAttribute { sibling_index: 0, frame_index: 2 }], &frames),
		Err(PatchError::ProtocolReference(_))
	));
}

#[test]
fn internal_attributes_configure_events() {
	let (mut renderer, root) = renderer();
	let frames = [
		Frame::Element { subtree_length: 3, name: "a" },
		Frame::Attribute { name: "__internal_preventDefault_onclick", value: Some(""), event_handler_id: 0 },
		Frame::Attribute { name: "onclick", value: None, event_handler_id: 3 },
		Frame::Attribute { name: "__internal_unknown", value: Some(""), event_handler_id: 0 },
	];
	renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }], &frames).unwrap();

	let link = child(&renderer, root, 0);
	let dispatch = renderer.events().dispatch(renderer.dom(), &link, "click");
	assert!(dispatch.prevent_default);
	assert_eq!(dispatch.handlers.len(), 1);
	assert_eq!(html(&renderer, root), "<a></a>");

	renderer.update_component(ROOT, &[Edit::RemoveAttribute { sibling_index: 0, name: "__internal_preventDefault_onclick" }], &frames).unwrap();
	assert!(!renderer.events().dispatch(renderer.dom(), &link, "click").prevent_default);

	assert!(matches!(
		renderer.update_component(ROOT, &[Edit::SetAttribute { sibling_index: 0, frame_index: 3 }], &frames),
		Err(PatchError::ProtocolReference(_))
	));
}

#[test]
fn permutation_list() {
	let (mut renderer, root) = renderer();
	let frames = [Frame::Text { content: "a" }, Frame::Text { content: "b" }, Frame::Text { content: "c" }];
	renderer
		.update_component(
			ROOT,
			&[
				Edit::PrependFrame { sibling_index: 0, frame_index: 0 },
				Edit::PrependFrame { sibling_index: 1, frame_index: 1 },
				Edit::PrependFrame { sibling_index: 2, frame_index: 2 },
			],
			&frames,
		)
		.unwrap();
	let b = child(&renderer, root, 1);

	renderer
		.update_component(
			ROOT,
			&[
				Edit::PermutationListEntry { sibling_index: 0, move_to_sibling_index: 2 },
				Edit::PermutationListEntry { sibling_index: 2, move_to_sibling_index: 0 },
				Edit::PermutationListEnd,
			],
			&frames,
		)
		.unwrap();

	assert_eq!(html(&renderer, root), "cba");
	assert_eq!(child(&renderer, root, 1), b);
}

#[test]
fn malformed_permutation_lists() {
	let (mut renderer, _) = renderer();
	assert!(matches!(renderer.update_component(ROOT, &[Edit::PermutationListEnd], &[]), Err(PatchError::StructuralMismatch { .. })));

	let frames = [Frame::Text { content: "a" }];
	assert!(matches!(
		renderer.update_component(
			ROOT,
			&[Edit::PrependFrame { sibling_index: 0, frame_index: 0 }, Edit::PermutationListEntry { sibling_index: 0, move_to_sibling_index: 0 }],
			&frames
		),
		Err(PatchError::StructuralMismatch { .. })
	));
}

#[test]
fn missing_frame_is_a_reference_error() {
	let (mut renderer, _) = renderer();
	assert!(matches!(
		renderer.update_component(ROOT, &[Edit::PrependFrame { sibling_index: 0, frame_index: 5 }], &[]),
		Err(PatchError::ProtocolReference(_))
	));
}

#[test]
fn root_offset_shifts_top_level_indices_only() {
	let mut dom = MemoryDom::new();
	let root = dom.create_element("div", Namespace::Html);
	let mut tree = LogicalTree::new();
	tree.wrap(&dom, &root, false).unwrap();
	let existing = dom.create_text_node("x");
	tree.insert(&mut dom, &existing, &root, 0).unwrap();

	let mut components = ComponentLocations::new();
	let mut pending_select_values = HashMap::new();
	let mut events = DelegatedEvents::default();
	let mut patcher = TreePatcher {
		dom: &mut dom,
		tree: &mut tree,
		components: &mut components,
		pending_select_values: &mut pending_select_values,
		events: &mut events,
	};

	let frames = [
		Frame::Text { content: "y" },
		Frame::Element { subtree_length: 1, name: "p" },
		Frame::Text { content: "inside" },
	];
	patcher
		.apply_edits(
			ROOT,
			root,
			1,
			&[
				Edit::PrependFrame { sibling_index: 0, frame_index: 0 },
				Edit::PrependFrame { sibling_index: 1, frame_index: 1 },
				Edit::StepIn { sibling_index: 1 },
				Edit::PrependFrame { sibling_index: 0, frame_index: 2 },
				Edit::StepOut,
			],
			&frames,
		)
		.unwrap();

	assert_eq!(dom.inner_html(root), "xy<p>inside</p>");
}

#[test]
fn unknown_tags() {
	assert_eq!(EditType::try_from(4_u8), Ok(EditType::PrependFrame));
	assert_eq!(FrameType::try_from(8_u8), Ok(FrameType::Markup));
	assert_eq!(EditType::try_from(42_u8), Err(PatchError::UnknownVariant { kind: "edit", tag: 42 }));
	assert_eq!(FrameType::try_from(0_u8), Err(PatchError::UnknownVariant { kind: "frame", tag: 0 }));
}
