//! Discussion-thread nodes

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::data::EntityId;
use crate::entity::Entity;
use crate::tree::branch::DfsBranches;
use crate::tree::traversal::{depth_first, Context, Resolver, TreeNode, Traversal};

/// Attribute holding a submission's creation time in Unix seconds.
pub const CREATED_UTC: &str = "created_utc";

/// Persisted form of a node: `{"id": ..., "kids": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub id: EntityId,
    #[serde(default)]
    pub kids: Vec<SerializedNode>,
}

impl SerializedNode {
    pub fn leaf(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            kids: Vec::new(),
        }
    }
}

/// One submission or comment in a thread. Holds only identifiers; entities
/// are resolved on demand during traversals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionTreeNode {
    pub(crate) id: EntityId,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<SubmissionTreeNode>,
    pub(crate) active: bool,
}

impl TreeNode for SubmissionTreeNode {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}

impl SubmissionTreeNode {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            children: Vec::new(),
            active: false,
        }
    }

    pub fn with_children(id: impl Into<EntityId>, children: Vec<SubmissionTreeNode>) -> Self {
        let mut node = Self::new(id);
        for child in children {
            node.add_child(child);
        }
        node
    }

    pub fn from_serializable(serialized: &SerializedNode) -> Self {
        Self::with_children(
            serialized.id.clone(),
            serialized.kids.iter().map(Self::from_serializable).collect(),
        )
    }

    pub fn add_child(&mut self, mut child: SubmissionTreeNode) {
        child.parent = Some(self.id.clone());
        self.children.push(child);
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn parent(&self) -> Option<&EntityId> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[SubmissionTreeNode] {
        &self.children
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The node with `id` in this subtree, this node included.
    pub fn get_descendant(&self, id: &EntityId) -> Option<&SubmissionTreeNode> {
        let mut traversal = Traversal::<Self, Option<&Self>, Option<&Self>>::new(
            || None,
            |found, below| found.or(below),
            |ctx, found| if ctx.id() == id { Some(ctx.node) } else { found },
        );
        depth_first(self, &mut traversal, &Resolver::structural()).flatten()
    }

    pub fn contains_descendant(&self, id: &EntityId) -> bool {
        self.get_descendant(id).is_some()
    }

    /// The node whose child has `id`, if `id` is below this node.
    pub fn get_parent_of_descendant(&self, id: &EntityId) -> Option<&SubmissionTreeNode> {
        let mut traversal = Traversal::<Self, Option<&Self>, Option<&Self>>::new(
            || None,
            |found, below| found.or(below),
            |ctx, found| {
                if ctx.node.children.iter().any(|child| child.id == *id) {
                    Some(ctx.node)
                } else {
                    found
                }
            },
        );
        depth_first(self, &mut traversal, &Resolver::structural()).flatten()
    }

    pub fn to_serializable(&self) -> SerializedNode {
        let mut traversal = Traversal::<Self, Vec<SerializedNode>, SerializedNode>::collecting(|ctx, kids| SerializedNode {
            id: ctx.id().clone(),
            kids,
        });
        depth_first(self, &mut traversal, &Resolver::structural())
            .unwrap_or_else(|| SerializedNode::leaf(self.id.clone()))
    }

    /// Number of nodes in this subtree.
    pub fn len(&self) -> usize {
        let mut traversal = Traversal::<Self, usize, usize>::new(|| 1, |count, below| count + below, |_, count| count);
        depth_first(self, &mut traversal, &Resolver::structural()).unwrap_or(1)
    }

    /// Identifiers in pre-order.
    pub fn iter_ids(&self) -> impl Iterator<Item = &EntityId> + '_ {
        self.ids_where(|_| true).into_iter()
    }

    /// Identifiers of active nodes, in pre-order.
    pub fn active_ids(&self) -> Vec<&EntityId> {
        self.ids_where(|node| node.active)
    }

    fn ids_where(&self, keep: impl Fn(&Self) -> bool) -> Vec<&EntityId> {
        let mut traversal = Traversal::<Self, Vec<&EntityId>, Vec<&EntityId>>::new(
            Vec::new,
            |mut ids, below| {
                ids.extend(below);
                ids
            },
            |ctx, below| {
                let mut ids = Vec::with_capacity(below.len() + 1);
                if keep(ctx.node) {
                    ids.push(ctx.id());
                }
                ids.extend(below);
                ids
            },
        );
        depth_first(self, &mut traversal, &Resolver::structural()).unwrap_or_default()
    }

    /// Every root-to-node path ending at an active node, walking only through
    /// active nodes.
    pub fn collect_active_branches(&self) -> Vec<Vec<EntityId>> {
        let mut traversal = Traversal::<Self, Vec<Vec<EntityId>>, Vec<Vec<EntityId>>>::new(
            Vec::new,
            |mut branches, below| {
                branches.extend(below);
                branches
            },
            |ctx, below| {
                let mut branches = Vec::with_capacity(below.len() + 1);
                branches.push(vec![ctx.id().clone()]);
                for path in below {
                    let mut branch = Vec::with_capacity(path.len() + 1);
                    branch.push(ctx.id().clone());
                    branch.extend(path);
                    branches.push(branch);
                }
                branches
            },
        )
        .with_filter(|ctx| ctx.node.active);
        depth_first(self, &mut traversal, &Resolver::structural()).unwrap_or_default()
    }

    /// Drops every descendant whose entity fails `checker` or cannot be
    /// resolved, with its subtree. Returns whether this node itself passed;
    /// if not, nothing is removed and the caller should drop it.
    pub fn clean(&mut self, checker: &dyn Fn(&Entity) -> bool, resolver: &Resolver<'_>) -> bool {
        let mut failed = HashSet::new();
        {
            let mut traversal = Traversal::<Self, (), ()>::new(|| (), |_, _| (), |_, _| ()).with_filter(|ctx| {
                let passes = match ctx.resolved_entity() {
                    Ok(entity) => checker(entity),
                    Err(error) => {
                        warn!(id = %ctx.id(), error = %error, "cannot resolve node, removing it");
                        false
                    }
                };
                if !passes {
                    failed.insert(ctx.id().clone());
                }
                passes
            });
            depth_first(&*self, &mut traversal, resolver);
        }

        if failed.contains(&self.id) {
            return false;
        }
        if !failed.is_empty() {
            let before = self.len();
            self.prune(&failed);
            debug!(root = %self.id, removed = before - self.len(), "cleaned subtree");
        }
        true
    }

    /// Marks active every node whose entity was created before `time`,
    /// reading the Unix timestamp in `time_attribute`. Subtrees below a node
    /// that is not earlier are not visited. Returns how many nodes qualified.
    pub fn activate_before_time(
        &mut self,
        time_attribute: &str,
        time: DateTime<Utc>,
        resolver: &Resolver<'_>,
    ) -> usize {
        let mut qualified = HashSet::new();
        {
            let mut traversal = Traversal::<Self, (), ()>::new(
                || (),
                |_, _| (),
                |ctx, _| {
                    qualified.insert(ctx.id().clone());
                },
            )
            .with_filter(|ctx| created_before(ctx, time_attribute, time));
            depth_first(&*self, &mut traversal, resolver);
        }

        self.for_each_mut(&mut |node| {
            if qualified.contains(&node.id) {
                node.active = true;
            }
        });
        qualified.len()
    }

    pub fn deactivate_all(&mut self) {
        self.for_each_mut(&mut |node| node.active = false);
    }

    /// Appends `child` under the node with id `parent`. Returns false if there
    /// is no such node.
    pub(crate) fn attach(&mut self, parent: &EntityId, child: SubmissionTreeNode) -> bool {
        let mut child = Some(child);
        self.for_each_mut(&mut |node| {
            if node.id == *parent {
                if let Some(child) = child.take() {
                    node.add_child(child);
                }
            }
        });
        child.is_none()
    }

    pub fn iter_dfs_branches<'n, 'r>(&'n self, resolver: Resolver<'r>) -> DfsBranches<'n, 'r> {
        DfsBranches::new(std::slice::from_ref(self), resolver)
    }

    pub(crate) fn prune(&mut self, remove: &HashSet<EntityId>) {
        self.children.retain(|child| !remove.contains(&child.id));
        for child in &mut self.children {
            child.prune(remove);
        }
    }

    fn for_each_mut(&mut self, f: &mut dyn FnMut(&mut SubmissionTreeNode)) {
        f(self);
        for child in &mut self.children {
            child.for_each_mut(f);
        }
    }
}

fn created_before(ctx: &Context<'_, '_, SubmissionTreeNode>, time_attribute: &str, time: DateTime<Utc>) -> bool {
    let entity = match ctx.resolved_entity() {
        Ok(entity) => entity,
        Err(error) => {
            debug!(id = %ctx.id(), error = %error, "cannot resolve node, leaving it inactive");
            return false;
        }
    };
    match entity.value(time_attribute).and_then(|value| value.as_int()) {
        Some(seconds) => Utc
            .timestamp_opt(seconds, 0)
            .single()
            .map_or(false, |created| created < time),
        None => {
            debug!(id = %ctx.id(), attribute = time_attribute, "no timestamp, leaving node inactive");
            false
        }
    }
}
