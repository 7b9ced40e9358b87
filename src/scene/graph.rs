//! Arena view of the model hierarchy.
//!
//! Models refer to their parent by name. [`SceneGraph`] resolves those names
//! once into indices into [`crate::Scene::models`], so later passes walk plain
//! `usize` links instead of looking names up again.

use std::collections::HashMap;

use glam::Mat4;

use super::Model;
use crate::util::{Error, Result};

/// Resolved parent links, depths and name lookup.
#[derive(Clone, Debug, Default)]
pub struct SceneGraph {
    parents: Vec<Option<usize>>,
    depths: Vec<usize>,
    by_name: HashMap<String, usize>,
}

impl SceneGraph {
    /// Resolve the parent links of `models`.
    ///
    /// Fails on a parent name that is not in the list or on a parent cycle.
    /// If two models share a name the first one wins.
    pub fn build(models: &[Model]) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(models.len());
        for (index, model) in models.iter().enumerate() {
            by_name.entry(model.name.clone()).or_insert(index);
        }

        let parents = models
            .iter()
            .map(|model| match &model.parent {
                None => Ok(None),
                Some(parent) => by_name
                    .get(parent)
                    .copied()
                    .map(Some)
                    .ok_or_else(|| Error::UnresolvedParent {
                        model: model.name.clone(),
                        parent: parent.clone(),
                    }),
            })
            .collect::<Result<Vec<_>>>()?;

        // Depth of a node is the number of links to a root; a walk longer
        // than the model count can only come from a cycle.
        let mut depths = Vec::with_capacity(models.len());
        for (index, model) in models.iter().enumerate() {
            let mut depth = 0;
            let mut cur = parents[index];
            while let Some(p) = cur {
                depth += 1;
                if depth > models.len() {
                    return Err(Error::CyclicParent(model.name.clone()));
                }
                cur = parents[p];
            }
            depths.push(depth);
        }

        Ok(Self { parents, depths, by_name })
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Parent index of a node.
    #[inline]
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents.get(index).copied().flatten()
    }

    /// Number of ancestors of a node.
    #[inline]
    pub fn depth(&self, index: usize) -> usize {
        self.depths.get(index).copied().unwrap_or(0)
    }

    /// Index of a model by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Direct children of a node, in model order.
    pub fn children(&self, index: usize) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| self.parents[i] == Some(index))
            .collect()
    }

    /// Nodes without a parent, in model order.
    pub fn roots(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.parents[i].is_none()).collect()
    }

    /// All nodes ordered by depth, ties kept in model order.
    ///
    /// Every parent comes before its children.
    pub fn topological_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| self.depths[i]);
        order
    }

    /// Ancestor chain of a node, nearest first.
    pub fn ancestors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.parent(index), move |&i| self.parent(i))
    }

    /// Transform of a node relative to the scene root.
    pub fn world_matrix(&self, models: &[Model], index: usize) -> Mat4 {
        let mut m = models[index].transform.to_matrix();
        for a in self.ancestors(index) {
            m = models[a].transform.to_matrix() * m;
        }
        m
    }
}
