//! Root-to-node paths through a thread

use std::rc::Rc;
use tracing::warn;

use crate::data::{EntityId, Result};
use crate::entity::Entity;
use crate::tree::node::SubmissionTreeNode;
use crate::tree::traversal::Resolver;

/// One path from a thread's root down to some reply, with every entity
/// resolved. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub root: Entity,
    pub stems: Vec<Entity>,
}

impl Branch {
    pub fn new(root: Entity) -> Self {
        Self {
            root,
            stems: Vec::new(),
        }
    }

    /// A copy of this branch with `stem` appended.
    pub fn extended(&self, stem: Entity) -> Self {
        let mut branch = self.clone();
        branch.stems.push(stem);
        branch
    }

    /// The deepest entity.
    pub fn leaf(&self) -> &Entity {
        self.stems.last().unwrap_or(&self.root)
    }

    /// Number of replies below the root.
    pub fn depth(&self) -> usize {
        self.stems.len()
    }

    pub fn ids(&self) -> Vec<&EntityId> {
        std::iter::once(&self.root)
            .chain(self.stems.iter())
            .map(Entity::id)
            .collect()
    }
}

/// Pre-order iterator over the branches of one or more trees.
///
/// Yields the branch ending at each node, root first. Every item is an
/// independent copy. A node that cannot be resolved is yielded as an error and
/// its subtree is skipped.
pub struct DfsBranches<'n, 'r> {
    stack: Vec<(&'n SubmissionTreeNode, usize, Option<Rc<Branch>>)>,
    resolver: Resolver<'r>,
}

impl<'n, 'r> DfsBranches<'n, 'r> {
    pub(crate) fn new(roots: &'n [SubmissionTreeNode], resolver: Resolver<'r>) -> Self {
        Self {
            stack: roots.iter().rev().map(|root| (root, 0, None)).collect(),
            resolver,
        }
    }
}

impl Iterator for DfsBranches<'_, '_> {
    type Item = Result<Branch>;

    fn next(&mut self) -> Option<Self::Item> {
        let (node, depth, parent) = self.stack.pop()?;

        let entity = match self.resolver.resolve(node.id(), depth) {
            Ok(entity) => entity,
            Err(error) => {
                warn!(id = %node.id(), depth, error = %error, "cannot resolve node, skipping its subtree");
                return Some(Err(error));
            }
        };
        let branch = match parent {
            Some(parent) => parent.extended(entity),
            None => Branch::new(entity),
        };

        if !node.children().is_empty() {
            let shared = Rc::new(branch.clone());
            for child in node.children().iter().rev() {
                self.stack.push((child, depth + 1, Some(Rc::clone(&shared))));
            }
        }
        Some(Ok(branch))
    }
}
