use std::collections::HashMap;

/// Stable handle for one element node in a monitored document. Allocated by
/// the document, never reused within a document's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Element kinds whose text content is scanned, mirroring the monitored
/// selector of the host page.
pub const MONITORED_KINDS: &[&str] = &["p", "li", "span", "h1", "h2", "h3", "strong", "em"];

#[must_use]
pub fn is_monitored_kind(kind: &str) -> bool {
    MONITORED_KINDS.iter().any(|candidate| *candidate == kind)
}

/// One document mutation, as delivered by the host in batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Structural change. `removed` must list every detached node in the
    /// removed subtrees, not just the subtree roots; the producer flattens
    /// them because a detached node can no longer be walked via the document.
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// Text content of `target` changed in place.
    CharacterData { target: NodeId },
}

/// Raw interaction kinds that qualify as user activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown,
    MouseDown,
    TouchStart,
}

/// Everything the host dispatches at the engine, in host dispatch order.
#[derive(Debug, Clone)]
pub enum DocumentEvent {
    Mutations(Vec<Mutation>),
    Visibility { hidden: bool },
    Input(InputEvent),
}

/// Read-only view of the monitored document. The engine never mutates the
/// tree; it only reads text and structure while evaluating nodes.
pub trait DocumentView {
    fn kind_of(&self, id: NodeId) -> Option<&str>;

    /// Rendered text of the node: its own text followed by every
    /// descendant's, in document order. `None` once the node is detached.
    fn text_of(&self, id: NodeId) -> Option<String>;

    fn parent_of(&self, id: NodeId) -> Option<NodeId>;

    /// Children in document order.
    fn children_of(&self, id: NodeId) -> Vec<NodeId>;

    /// Every monitored element currently in the document, document order.
    fn monitored_nodes(&self) -> Vec<NodeId>;
}

/// `root` (if monitored) plus its monitored descendants, document order.
pub fn monitored_subtree<D: DocumentView + ?Sized>(doc: &D, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if doc.kind_of(id).is_some_and(is_monitored_kind) {
            out.push(id);
        }
        let mut children = doc.children_of(id);
        children.reverse();
        stack.extend(children);
    }
    out
}

/// Nearest monitored element at or above `id`, the evaluation target for a
/// character-data change.
pub fn nearest_monitored<D: DocumentView + ?Sized>(doc: &D, id: NodeId) -> Option<NodeId> {
    let mut current = Some(id);
    while let Some(node) = current {
        if doc.kind_of(node).is_some_and(is_monitored_kind) {
            return Some(node);
        }
        current = doc.parent_of(node);
    }
    None
}

#[derive(Debug)]
struct NodeData {
    kind: String,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// In-memory document tree used by the host process and by tests to drive
/// the engine with synthetic mutation batches.
#[derive(Debug)]
pub struct MemoryDocument {
    nodes: HashMap<NodeId, NodeData>,
    root: NodeId,
    next_id: u64,
}

impl MemoryDocument {
    #[must_use]
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            NodeData {
                kind: "body".to_string(),
                text: String::new(),
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            nodes,
            root,
            next_id: 1,
        }
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Appends a child element; returns its handle. A missing parent is a
    /// caller bug and panics (the producer owns the tree).
    pub fn append_child(
        &mut self,
        parent: NodeId,
        kind: impl Into<String>,
        text: impl Into<String>,
    ) -> NodeId {
        assert!(self.nodes.contains_key(&parent), "unknown parent node");
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            NodeData {
                kind: kind.into(),
                text: text.into(),
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        if let Some(parent_data) = self.nodes.get_mut(&parent) {
            parent_data.children.push(id);
        }
        id
    }

    /// Replaces the node's own text. Returns false for a detached node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.text = text.into();
                true
            }
            None => false,
        }
    }

    /// Detaches `id` and its subtree. Returns every detached node id, the
    /// flattened list a `ChildList` removal mutation carries.
    pub fn remove(&mut self, id: NodeId) -> Vec<NodeId> {
        if id == self.root || !self.nodes.contains_key(&id) {
            return Vec::new();
        }
        if let Some(parent) = self.nodes.get(&id).and_then(|node| node.parent) {
            if let Some(parent_data) = self.nodes.get_mut(&parent) {
                parent_data.children.retain(|child| *child != id);
            }
        }
        let mut detached = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                detached.push(current);
                stack.extend(node.children);
            }
        }
        detached
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentView for MemoryDocument {
    fn kind_of(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|node| node.kind.as_str())
    }

    fn text_of(&self, id: NodeId) -> Option<String> {
        let node = self.nodes.get(&id)?;
        let mut out = node.text.clone();
        let mut stack: Vec<NodeId> = node.children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if let Some(child) = self.nodes.get(&current) {
                out.push_str(&child.text);
                stack.extend(child.children.iter().rev().copied());
            }
        }
        Some(out)
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    fn monitored_nodes(&self) -> Vec<NodeId> {
        monitored_subtree(self, self.root)
    }
}
