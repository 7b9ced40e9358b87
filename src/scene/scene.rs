//! The decoded document.

use std::collections::BTreeMap;

use super::{Animation, Material, Model, ModelKind, SceneGraph};
use crate::util::{BBox3f, Result};

/// Models, materials, skeleton and animation of one MSH document.
///
/// The order of [`Scene::models`] is the model-index space used by vertex
/// weights after decode.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    /// Scene name (`SINF`/`NAME`).
    pub name: String,
    pub models: Vec<Model>,
    pub materials: BTreeMap<String, Material>,
    /// Name hashes of the skeleton bones (`SKL2`).
    pub skeleton: Vec<u32>,
    pub animation: Option<Animation>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Index of a model by name.
    pub fn model_index(&self, name: &str) -> Option<usize> {
        self.models.iter().position(|m| m.name == name)
    }

    /// Model by name.
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Index of the first model whose name hashes to `crc`.
    pub fn find_by_hash(&self, crc: u32) -> Option<usize> {
        self.models.iter().position(|m| m.crc() == crc)
    }

    /// Resolve the parent graph.
    pub fn graph(&self) -> Result<SceneGraph> {
        SceneGraph::build(&self.models)
    }

    /// Indices of all models referenced by a vertex weight, sorted.
    ///
    /// Only meaningful for weights in the model-index space (no bone map).
    pub fn weighted_bones(&self) -> Vec<usize> {
        let mut bones: Vec<usize> = self
            .models
            .iter()
            .filter(|m| m.bone_map.is_none())
            .flat_map(|m| m.segments())
            .filter_map(|s| s.weights.as_ref())
            .flatten()
            .flatten()
            .map(|w| w.bone as usize)
            .collect();
        bones.sort_unstable();
        bones.dedup();
        bones
    }

    /// Append the hash of every weighted bone missing from the skeleton.
    ///
    /// Returns the number of hashes added.
    pub fn infer_skeleton_from_weights(&mut self) -> usize {
        let mut added = 0;
        for index in self.weighted_bones() {
            let Some(model) = self.models.get(index) else {
                continue;
            };
            let crc = model.crc();
            if !self.skeleton.contains(&crc) {
                self.skeleton.push(crc);
                added += 1;
            }
        }
        added
    }

    /// Drop skeleton hashes that name a skinned model.
    ///
    /// Returns the number of hashes removed.
    pub fn remove_skinned_from_skeleton(&mut self) -> usize {
        let before = self.skeleton.len();
        let models = &self.models;
        self.skeleton.retain(|&crc| {
            let skinned = models.iter().any(|m| m.kind == ModelKind::Skin && m.crc() == crc);
            if skinned {
                tracing::warn!(crc, "skinned model listed in skeleton, removed");
            }
            !skinned
        });
        before - self.skeleton.len()
    }

    /// Bounds of all geometry in scene space.
    pub fn bounds(&self) -> Result<BBox3f> {
        let graph = self.graph()?;
        let mut bbox = BBox3f::EMPTY;
        for (index, model) in self.models.iter().enumerate() {
            if model.segments().is_empty() {
                continue;
            }
            let world = graph.world_matrix(&self.models, index);
            for p in model.segments().iter().flat_map(|s| s.positions.iter()) {
                bbox.expand_by_point(world.transform_point3(*p));
            }
        }
        Ok(bbox)
    }

    /// Total number of vertices in the scene.
    pub fn num_vertices(&self) -> usize {
        self.models.iter().map(Model::num_vertices).sum()
    }
}
