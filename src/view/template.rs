use std::cell::{Cell, OnceCell, Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::cleanup::TemplateCleanup;
use crate::output::OutputAliases;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Container,
    ElementContainer,
    Text,
}

impl NodeKind {
    /// Nodes that can carry native listeners.
    pub fn is_element_like(self) -> bool {
        !matches!(self, NodeKind::Text)
    }
}

/// Static, per-template node description.
#[derive(Debug)]
pub struct TNode {
    pub index: usize,
    pub kind: NodeKind,
    pub component_host: bool,
    /// Indices into the owning view's directive storage.
    pub directives: Vec<usize>,
    outputs: OnceCell<OutputAliases>,
}

impl TNode {
    fn with_kind(index: usize, kind: NodeKind) -> Self {
        Self {
            index,
            kind,
            component_host: false,
            directives: Vec::new(),
            outputs: OnceCell::new(),
        }
    }

    pub fn element(index: usize) -> Self {
        Self::with_kind(index, NodeKind::Element)
    }

    pub fn container(index: usize) -> Self {
        Self::with_kind(index, NodeKind::Container)
    }

    pub fn element_container(index: usize) -> Self {
        Self::with_kind(index, NodeKind::ElementContainer)
    }

    pub fn text(index: usize) -> Self {
        Self::with_kind(index, NodeKind::Text)
    }

    pub fn with_directives(mut self, directives: impl IntoIterator<Item = usize>) -> Self {
        self.directives = directives.into_iter().collect();
        self
    }

    pub fn as_component_host(mut self) -> Self {
        self.component_host = true;
        self
    }

    pub fn cached_outputs(&self) -> Option<&OutputAliases> {
        self.outputs.get()
    }

    /// Store the alias table; the first stored value wins.
    pub(crate) fn cache_outputs(&self, aliases: OutputAliases) -> &OutputAliases {
        self.outputs.get_or_init(|| aliases)
    }
}

/// Progress of a template's one-time first creation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstPassState {
    Pending,
    Running,
    Complete,
}

/// Data shared by every instance of one template.
///
/// The cleanup log is written only while the first pass runs and is read-only
/// afterwards.
#[derive(Debug)]
pub struct TemplateDescriptor {
    name: String,
    nodes: Vec<TNode>,
    cleanup: RefCell<TemplateCleanup>,
    state: Cell<FirstPassState>,
}

impl TemplateDescriptor {
    pub fn new(name: impl Into<String>, nodes: impl IntoIterator<Item = TNode>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            nodes: nodes.into_iter().collect(),
            cleanup: RefCell::new(TemplateCleanup::default()),
            state: Cell::new(FirstPassState::Pending),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self, index: usize) -> Option<&TNode> {
        self.nodes.iter().find(|node| node.index == index)
    }

    pub fn first_pass_state(&self) -> FirstPassState {
        self.state.get()
    }

    pub fn cleanup(&self) -> Ref<'_, TemplateCleanup> {
        self.cleanup.borrow()
    }

    pub(crate) fn cleanup_mut(&self) -> RefMut<'_, TemplateCleanup> {
        self.cleanup.borrow_mut()
    }

    pub(crate) fn set_first_pass_state(&self, state: FirstPassState) {
        self.state.set(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_nodes_are_not_element_like() {
        assert!(NodeKind::Element.is_element_like());
        assert!(NodeKind::Container.is_element_like());
        assert!(NodeKind::ElementContainer.is_element_like());
        assert!(!NodeKind::Text.is_element_like());
    }

    #[test]
    fn output_cache_keeps_first_value() {
        let node = TNode::element(0);
        assert!(node.cached_outputs().is_none());

        let mut first = OutputAliases::new();
        first.insert("change".to_string(), Vec::new());
        node.cache_outputs(first);
        node.cache_outputs(OutputAliases::new());

        assert!(node.cached_outputs().unwrap().contains_key("change"));
    }

    #[test]
    fn lookup_by_node_index() {
        let template = TemplateDescriptor::new("t", [TNode::text(0), TNode::element(2)]);
        assert_eq!(template.node(2).map(|n| n.kind), Some(NodeKind::Element));
        assert!(template.node(1).is_none());
        assert_eq!(template.first_pass_state(), FirstPassState::Pending);
    }
}
