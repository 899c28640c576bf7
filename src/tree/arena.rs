//! Arena-backed element tree for one page.
//!
//! All nodes of a page live in a single vector owned by the tree; parent,
//! child and sibling links are indices into it. Dropping the tree drops
//! every node. Parent links exist for diagnostics and traversal only.

use crate::lexer::Position;

use super::Element;

/// Unique identifier for a node in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u32);

impl ElementId {
    /// Sentinel value for no node.
    pub const NONE: ElementId = ElementId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

#[derive(Debug)]
pub struct ElementNode {
    pub element: Element,
    pub position: Position,
    pub parent: ElementId,
    pub first_child: ElementId,
    pub last_child: ElementId,
    pub next_sibling: ElementId,
}

impl ElementNode {
    fn new(element: Element, position: Position) -> Self {
        Self {
            element,
            position,
            parent: ElementId::NONE,
            first_child: ElementId::NONE,
            last_child: ElementId::NONE,
            next_sibling: ElementId::NONE,
        }
    }
}

/// The element tree of one page. The first node is the root (a header or
/// a footnote).
#[derive(Debug)]
pub struct ElementTree {
    nodes: Vec<ElementNode>,
}

impl ElementTree {
    /// Create a tree holding only `root`.
    pub fn new(root: Element, position: Position) -> Self {
        Self {
            nodes: vec![ElementNode::new(root, position)],
        }
    }

    pub fn root(&self) -> ElementId {
        ElementId(0)
    }

    pub fn get(&self, id: ElementId) -> Option<&ElementNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut ElementNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.get(id).map(|n| &n.element)
    }

    pub fn parent(&self, id: ElementId) -> ElementId {
        self.get(id).map(|n| n.parent).unwrap_or(ElementId::NONE)
    }

    /// Allocate `element` and append it as the last child of `parent`.
    pub fn append(&mut self, parent: ElementId, element: Element, position: Position) -> ElementId {
        let child = ElementId(self.nodes.len() as u32);
        let mut node = ElementNode::new(element, position);
        node.parent = parent;
        self.nodes.push(node);

        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(ElementId::NONE);
        if let Some(last) = self.get_mut(last_child) {
            last.next_sibling = child;
        }
        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
        child
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the root exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn children(&self, parent: ElementId) -> ChildrenIter<'_> {
        let first = self.get(parent).map(|n| n.first_child).unwrap_or(ElementId::NONE);
        ChildrenIter {
            tree: self,
            current: first,
        }
    }

    /// Visit every node depth-first in document order. Each node is seen
    /// once on the way down and once on the way back up. Stops at the
    /// first error.
    pub fn walk<E>(
        &self,
        visit: &mut dyn FnMut(Visit, ElementId, &ElementNode) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut stack = vec![(self.root(), Visit::Enter)];
        while let Some((id, step)) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            visit(step, id, node)?;
            if step == Visit::Leave {
                continue;
            }
            stack.push((id, Visit::Leave));
            // Push children in reverse order for left-to-right traversal
            let mut children: Vec<_> = self.children(id).collect();
            children.reverse();
            stack.extend(children.into_iter().map(|c| (c, Visit::Enter)));
        }
        Ok(())
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        let mut current = self.parent(id);
        std::iter::from_fn(move || {
            if current.is_none() {
                return None;
            }
            let out = current;
            current = self.parent(current);
            Some(out)
        })
    }
}

/// Which side of a node [`ElementTree::walk`] is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Enter,
    Leave,
}

/// Iterator over children of a node.
pub struct ChildrenIter<'a> {
    tree: &'a ElementTree,
    current: ElementId,
}

impl Iterator for ChildrenIter<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self
            .tree
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(ElementId::NONE);
        Some(id)
    }
}
