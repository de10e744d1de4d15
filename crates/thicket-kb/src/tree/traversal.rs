//! The depth-first traversal every tree operation is built on

use std::cell::OnceCell;
use std::fmt;

use crate::data::{CoreError, EntityId, LoaderError, Result};
use crate::entity::{Entity, EntityFactory};

/// A node of an identifier tree.
pub trait TreeNode: Sized {
    fn id(&self) -> &EntityId;
    fn children(&self) -> &[Self];
}

/// Turns node identifiers into entities: the root factory at depth 0, the
/// reply factory below it.
#[derive(Clone, Copy, Default)]
pub struct Resolver<'f> {
    root: Option<&'f dyn EntityFactory>,
    reply: Option<&'f dyn EntityFactory>,
}

impl<'f> Resolver<'f> {
    pub fn new(root: &'f dyn EntityFactory, reply: &'f dyn EntityFactory) -> Self {
        Self {
            root: Some(root),
            reply: Some(reply),
        }
    }

    /// Same factory at every depth.
    pub fn uniform(factory: &'f dyn EntityFactory) -> Self {
        Self::new(factory, factory)
    }

    /// Resolves nothing; for traversals that only look at identifiers.
    pub fn structural() -> Self {
        Self::default()
    }

    pub fn resolve(&self, id: &EntityId, depth: usize) -> Result<Entity> {
        let factory = if depth == 0 { self.root } else { self.reply };
        factory
            .ok_or(CoreError::Loader(LoaderError::MissingSource("entity factory")))?
            .load(id)
    }
}

impl fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("root", &self.root.is_some())
            .field("reply", &self.reply.is_some())
            .finish()
    }
}

/// What a traversal hook sees of the current node.
pub struct Context<'n, 'r, N> {
    pub node: &'n N,
    pub depth: usize,
    resolver: &'r Resolver<'r>,
    entity: OnceCell<Entity>,
}

impl<'n, 'r, N: TreeNode> Context<'n, 'r, N> {
    fn new(node: &'n N, depth: usize, resolver: &'r Resolver<'r>) -> Self {
        Self {
            node,
            depth,
            resolver,
            entity: OnceCell::new(),
        }
    }

    pub fn id(&self) -> &'n EntityId {
        self.node.id()
    }

    /// The node's entity, resolved on first use and reused by later hooks on
    /// the same node. Failures are not cached.
    pub fn resolved_entity(&self) -> Result<&Entity> {
        if let Some(entity) = self.entity.get() {
            return Ok(entity);
        }
        let entity = self.resolver.resolve(self.node.id(), self.depth)?;
        Ok(self.entity.get_or_init(|| entity))
    }
}

type FilterFn<'a, 'n, N> = Box<dyn FnMut(&Context<'n, '_, N>) -> bool + 'a>;
type VisitFn<'a, 'n, N, A, R> = Box<dyn FnMut(&Context<'n, '_, N>, A) -> R + 'a>;

/// Hooks of one traversal.
///
/// `filter` runs before a node's children; `false` drops the whole subtree.
/// Child results are folded with `reduce`, starting from `init`, and `visit`
/// turns the fold into the node's result.
pub struct Traversal<'a, 'n, N, A, R> {
    filter: Option<FilterFn<'a, 'n, N>>,
    init: Box<dyn FnMut() -> A + 'a>,
    reduce: Box<dyn FnMut(A, R) -> A + 'a>,
    visit: VisitFn<'a, 'n, N, A, R>,
}

impl<'a, 'n, N: TreeNode, A, R> Traversal<'a, 'n, N, A, R> {
    pub fn new(
        init: impl FnMut() -> A + 'a,
        reduce: impl FnMut(A, R) -> A + 'a,
        visit: impl FnMut(&Context<'n, '_, N>, A) -> R + 'a,
    ) -> Self {
        Self {
            filter: None,
            init: Box::new(init),
            reduce: Box::new(reduce),
            visit: Box::new(visit),
        }
    }

    pub fn with_filter(mut self, filter: impl FnMut(&Context<'n, '_, N>) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }
}

impl<'a, 'n, N: TreeNode, R: 'a> Traversal<'a, 'n, N, Vec<R>, R> {
    /// Children's results collected in order.
    pub fn collecting(visit: impl FnMut(&Context<'n, '_, N>, Vec<R>) -> R + 'a) -> Self {
        Self::new(Vec::new, |mut acc: Vec<R>, r| {
            acc.push(r);
            acc
        }, visit)
    }
}

/// Post-order depth-first traversal of `node` and its descendants.
///
/// Returns `None` when the filter rejects `node` itself.
pub fn depth_first<'n, N: TreeNode, A, R>(
    node: &'n N,
    traversal: &mut Traversal<'_, 'n, N, A, R>,
    resolver: &Resolver<'_>,
) -> Option<R> {
    walk(node, 0, traversal, resolver)
}

fn walk<'n, N: TreeNode, A, R>(
    node: &'n N,
    depth: usize,
    traversal: &mut Traversal<'_, 'n, N, A, R>,
    resolver: &Resolver<'_>,
) -> Option<R> {
    let context = Context::new(node, depth, resolver);
    if let Some(filter) = traversal.filter.as_mut() {
        if !filter(&context) {
            return None;
        }
    }

    let mut acc = (traversal.init)();
    for child in node.children() {
        if let Some(result) = walk(child, depth + 1, traversal, resolver) {
            acc = (traversal.reduce)(acc, result);
        }
    }
    Some((traversal.visit)(&context, acc))
}
