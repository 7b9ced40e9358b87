//! Skeleton extraction.
//!
//! A document's node graph mixes bones with null transforms, meshes and
//! collision helpers. [`refine_skeleton`] keeps only the bones and folds the
//! transforms of skipped ancestors into the bones below them, so each refined
//! bone's transform is relative to its nearest bone ancestor.

use crate::scene::{ModelTransform, Scene};
use crate::util::{Error, Result};

/// A bone of the refined hierarchy.
#[derive(Clone, Debug, PartialEq)]
pub struct RefinedBone {
    pub name: String,
    /// Index into [`Scene::models`].
    pub model_index: usize,
    /// Index into the refined bone list.
    pub parent: Option<usize>,
    /// Transform relative to the parent bone, or to the scene root.
    pub transform: ModelTransform,
}

/// Extract the bone hierarchy of a decoded scene.
///
/// Bones are the models named by the skeleton plus every model a vertex
/// weight references. They are returned parents first (by depth, ties in
/// model order). A bone's transform composes the local transforms of every
/// non-bone ancestor between it and its parent bone; the transform of a
/// parentless ancestor is not included.
pub fn refine_skeleton(scene: &Scene) -> Result<Vec<RefinedBone>> {
    let models = &scene.models;
    let graph = scene.graph()?;

    let mut is_bone = vec![false; models.len()];
    for (index, model) in models.iter().enumerate() {
        if scene.skeleton.contains(&model.crc()) {
            is_bone[index] = true;
        }
    }
    for index in scene.weighted_bones() {
        if let Some(flag) = is_bone.get_mut(index) {
            *flag = true;
        }
    }

    let order: Vec<usize> = graph
        .topological_order()
        .into_iter()
        .filter(|&i| is_bone[i])
        .collect();

    // Model index -> refined index, filled as bones are emitted.
    let mut refined_index = vec![None; models.len()];
    let mut bones = Vec::with_capacity(order.len());

    for &index in &order {
        let mut transform = models[index].transform.to_matrix();
        let mut parent = None;
        let mut cur = graph.parent(index);
        let mut steps = 0;

        while let Some(p) = cur {
            steps += 1;
            if steps > models.len() {
                return Err(Error::CyclicParent(models[index].name.clone()));
            }
            if is_bone[p] {
                parent = refined_index[p];
                break;
            }
            match graph.parent(p) {
                // Scene root reached, its transform stays out.
                None => break,
                Some(next) => {
                    transform = models[p].transform.to_matrix() * transform;
                    cur = Some(next);
                }
            }
        }

        refined_index[index] = Some(bones.len());
        bones.push(RefinedBone {
            name: models[index].name.clone(),
            model_index: index,
            parent,
            transform: ModelTransform::from_matrix(&transform),
        });
    }

    tracing::debug!(bones = bones.len(), models = models.len(), "refined skeleton");
    Ok(bones)
}
