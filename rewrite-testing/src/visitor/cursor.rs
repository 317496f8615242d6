use std::sync::Arc;

use crate::tree::{Block, ClassDeclaration, MethodDeclaration, Statement, Tree};

/// Path from the compilation unit down to the node being visited.
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    stack: Vec<Tree>,
}

impl Cursor {
    pub(crate) fn push(&mut self, tree: Tree) {
        self.stack.push(tree);
    }

    pub(crate) fn pop(&mut self) {
        self.stack.pop();
    }

    /// The node being visited.
    pub fn value(&self) -> Option<&Tree> {
        self.stack.last()
    }

    pub fn parent(&self) -> Option<&Tree> {
        self.stack.iter().rev().nth(1)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Enclosing nodes, innermost first, the current node excluded.
    pub fn ancestors(&self) -> impl Iterator<Item = &Tree> {
        self.stack.iter().rev().skip(1)
    }

    pub fn first_enclosing_class(&self) -> Option<Arc<ClassDeclaration>> {
        self.ancestors().find_map(|t| t.clone().into_class())
    }

    pub fn first_enclosing_method(&self) -> Option<Arc<MethodDeclaration>> {
        self.ancestors().find_map(|t| t.clone().into_method())
    }

    pub fn first_enclosing_block(&self) -> Option<Arc<Block>> {
        self.ancestors().find_map(|t| match t {
            Tree::Block(b) | Tree::Statement(Statement::Block(b)) => Some(b.clone()),
            _ => None,
        })
    }

    /// Whether the current node sits directly in a block's statement list.
    pub fn is_statement(&self) -> bool {
        matches!(self.value(), Some(Tree::Statement(_)))
    }

    pub fn path(&self) -> String {
        self.stack.iter().map(Tree::kind).collect::<Vec<_>>().join(" > ")
    }
}
