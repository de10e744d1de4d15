//! A collection of discussion threads

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use crate::data::{EntityId, Result, SubmissionForestError};
use crate::entity::Entity;
use crate::tree::branch::DfsBranches;
use crate::tree::node::{SerializedNode, SubmissionTreeNode};
use crate::tree::traversal::Resolver;

/// Threads keyed by nothing but their root identifiers.
///
/// Identifiers are expected to be unique across the whole forest. Lookups
/// that find an identifier under more than one root fail with
/// [`SubmissionForestError::Ambiguous`] rather than picking one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionForest {
    roots: Vec<SubmissionTreeNode>,
}

impl SubmissionForest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_roots(roots: Vec<SubmissionTreeNode>) -> Self {
        Self { roots }
    }

    pub fn from_serializable(serialized: &[SerializedNode]) -> Self {
        Self::from_roots(serialized.iter().map(SubmissionTreeNode::from_serializable).collect())
    }

    pub fn to_serializable(&self) -> Vec<SerializedNode> {
        self.roots.iter().map(SubmissionTreeNode::to_serializable).collect()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let serialized: Vec<SerializedNode> = serde_json::from_str(json)?;
        Ok(Self::from_serializable(&serialized))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_serializable())?)
    }

    pub fn roots(&self) -> &[SubmissionTreeNode] {
        &self.roots
    }

    /// Index of the only root containing `id`.
    fn root_index_of(&self, id: &EntityId) -> std::result::Result<Option<usize>, SubmissionForestError> {
        let matches: Vec<usize> = self
            .roots
            .iter()
            .enumerate()
            .filter(|(_, root)| root.contains_descendant(id))
            .map(|(index, _)| index)
            .collect();
        match matches.as_slice() {
            [] => Ok(None),
            [index] => Ok(Some(*index)),
            _ => Err(SubmissionForestError::Ambiguous {
                id: id.clone(),
                roots: matches.len(),
            }),
        }
    }

    pub fn contains_descendant(&self, id: &EntityId) -> std::result::Result<bool, SubmissionForestError> {
        Ok(self.root_index_of(id)?.is_some())
    }

    pub fn get_descendant(
        &self,
        id: &EntityId,
    ) -> std::result::Result<Option<&SubmissionTreeNode>, SubmissionForestError> {
        Ok(self
            .root_index_of(id)?
            .and_then(|index| self.roots[index].get_descendant(id)))
    }

    pub fn get_parent_of_descendant(
        &self,
        id: &EntityId,
    ) -> std::result::Result<Option<&SubmissionTreeNode>, SubmissionForestError> {
        Ok(self
            .root_index_of(id)?
            .and_then(|index| self.roots[index].get_parent_of_descendant(id)))
    }

    /// Fails on the first identifier that appears more than once.
    pub fn validate(&self) -> std::result::Result<(), SubmissionForestError> {
        let mut seen: BTreeMap<&EntityId, (usize, usize)> = BTreeMap::new();
        for root in &self.roots {
            let mut in_root = HashSet::new();
            for id in root.iter_ids() {
                let (occurrences, roots) = seen.entry(id).or_default();
                *occurrences += 1;
                if in_root.insert(id) {
                    *roots += 1;
                }
            }
        }

        for (id, (occurrences, roots)) in seen {
            if roots > 1 {
                return Err(SubmissionForestError::Ambiguous { id: id.clone(), roots });
            }
            if occurrences > 1 {
                return Err(SubmissionForestError::DuplicateId(id.clone()));
            }
        }
        Ok(())
    }

    pub fn add_root(&mut self, id: impl Into<EntityId>) -> std::result::Result<(), SubmissionForestError> {
        let id = id.into();
        if self.root_index_of(&id)?.is_some() {
            return Err(SubmissionForestError::DuplicateId(id));
        }
        self.roots.push(SubmissionTreeNode::new(id));
        Ok(())
    }

    /// Adds `child` as the last reply to `parent`.
    pub fn attach(
        &mut self,
        parent: &EntityId,
        child: impl Into<EntityId>,
    ) -> std::result::Result<(), SubmissionForestError> {
        let child = child.into();
        if self.root_index_of(&child)?.is_some() {
            return Err(SubmissionForestError::DuplicateId(child));
        }
        let index = self
            .root_index_of(parent)?
            .ok_or_else(|| SubmissionForestError::UnknownNode(parent.clone()))?;

        if self.roots[index].attach(parent, SubmissionTreeNode::new(child)) {
            Ok(())
        } else {
            Err(SubmissionForestError::UnknownNode(parent.clone()))
        }
    }

    /// Removes the nodes with the given ids and their subtrees. Ids that are
    /// not in the forest are skipped. Returns how many ids were removed.
    pub fn remove_ids(&mut self, ids: &[EntityId]) -> std::result::Result<usize, SubmissionForestError> {
        let mut removed = 0;
        for id in ids {
            let Some(index) = self.root_index_of(id)? else {
                debug!(%id, "not in forest, nothing to remove");
                continue;
            };
            if self.roots[index].id() == id {
                self.roots.remove(index);
            } else {
                self.roots[index].prune(&HashSet::from([id.clone()]));
            }
            removed += 1;
        }
        Ok(removed)
    }

    /// Drops every node whose entity fails `checker` or cannot be resolved,
    /// together with its subtree. Returns how many nodes were removed.
    pub fn clean(&mut self, checker: impl Fn(&Entity) -> bool, resolver: &Resolver<'_>) -> usize {
        let before = self.len();
        self.roots.retain_mut(|root| root.clean(&checker, resolver));
        let removed = before - self.len();
        info!(removed, remaining = before - removed, "cleaned forest");
        removed
    }

    /// See [`SubmissionTreeNode::activate_before_time`].
    pub fn activate_before_time(
        &mut self,
        time_attribute: &str,
        time: DateTime<Utc>,
        resolver: &Resolver<'_>,
    ) -> usize {
        self.roots
            .iter_mut()
            .map(|root| root.activate_before_time(time_attribute, time, resolver))
            .sum()
    }

    pub fn collect_active_branches(&self) -> Vec<Vec<EntityId>> {
        self.roots
            .iter()
            .flat_map(SubmissionTreeNode::collect_active_branches)
            .collect()
    }

    pub fn deactivate_all(&mut self) {
        for root in &mut self.roots {
            root.deactivate_all();
        }
    }

    pub fn active_ids(&self) -> Vec<&EntityId> {
        self.roots.iter().flat_map(SubmissionTreeNode::active_ids).collect()
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.roots.iter().map(SubmissionTreeNode::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Identifiers in pre-order, root by root.
    pub fn iter_ids(&self) -> impl Iterator<Item = &EntityId> + '_ {
        self.roots.iter().flat_map(SubmissionTreeNode::iter_ids)
    }

    /// Branches of every thread, lazily resolved. Each call starts over.
    pub fn iter_dfs_branches<'n, 'r>(&'n self, resolver: Resolver<'r>) -> DfsBranches<'n, 'r> {
        DfsBranches::new(&self.roots, resolver)
    }
}
