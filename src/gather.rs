//! Export rules for turning host scene objects into models.
//!
//! A host application (a DCC tool, a level editor) describes its objects as
//! [`HostNode`]s and [`HostArmature`]s; [`gather_models`] applies the naming
//! and shape conventions the game expects and produces [`Model`]s ready for
//! encoding. Everything host-specific, such as evaluating modifiers or
//! converting coordinate spaces, happens before this point.

use std::collections::HashSet;

use glam::Vec3;

use crate::geom::{assemble_segments, TriangulatedMesh};
use crate::scene::{
    Animation, BoneFrames, CollisionPrimitive, CollisionShape, Model, ModelKind, ModelTransform,
    RotationFrame, TranslationFrame,
};
use crate::util::{Error, Result};

/// Kind of host object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HostObjectType {
    /// Anything with a surface (meshes, curves, text).
    Mesh,
    #[default]
    Empty,
    Armature,
    Camera,
    Light,
    Other,
}

impl HostObjectType {
    pub fn is_mesh(self) -> bool {
        self == Self::Mesh
    }

    /// Types dropped unless they parent something.
    pub fn is_skipped(self) -> bool {
        matches!(self, Self::Camera | Self::Light)
    }
}

/// A host object.
#[derive(Clone, Debug)]
pub struct HostNode {
    pub name: String,
    pub parent: Option<String>,
    /// Local transform. For nodes attached to a bone, relative to that bone.
    pub transform: ModelTransform,
    pub object_type: HostObjectType,
    pub mesh: Option<TriangulatedMesh>,
    pub vertex_groups: Vec<String>,
    /// Bounding dimensions, used for collision primitives.
    pub dimensions: Vec3,
    /// World scale, baked into the vertex positions.
    pub world_scale: Vec3,
    /// Bone of the parent armature this node is attached to.
    pub parent_bone: Option<String>,
}

impl HostNode {
    /// Node of the given type with identity transform.
    pub fn new(name: impl Into<String>, object_type: HostObjectType) -> Self {
        Self {
            name: name.into(),
            parent: None,
            transform: ModelTransform::IDENTITY,
            object_type,
            mesh: None,
            vertex_groups: Vec::new(),
            dimensions: Vec3::ZERO,
            world_scale: Vec3::ONE,
            parent_bone: None,
        }
    }
}

/// A bone of a host armature.
#[derive(Clone, Debug)]
pub struct HostBone {
    pub name: String,
    pub parent: Option<String>,
    /// Transform relative to the parent bone, or to the armature.
    pub transform: ModelTransform,
}

/// A host armature. It is not exported itself; its bones are.
#[derive(Clone, Debug)]
pub struct HostArmature {
    pub name: String,
    pub parent: Option<String>,
    pub bones: Vec<HostBone>,
}

/// Options for [`gather_models`].
#[derive(Clone, Debug, Default)]
pub struct GatherOptions {
    /// Export every object as a null, keeping only the hierarchy and bones.
    pub skeleton_only: bool,
}

/// Model type of a host object.
pub fn model_kind(node: &HostNode) -> ModelKind {
    match (node.object_type.is_mesh(), node.vertex_groups.is_empty()) {
        (true, false) => ModelKind::Skin,
        (true, true) => ModelKind::Static,
        _ => ModelKind::Null,
    }
}

/// Whether the game should not render a host object.
pub fn is_hidden(node: &HostNode) -> bool {
    let name = node.name.to_lowercase();
    const PREFIXES: [&str; 3] = ["sv_", "p_", "collision"];
    const SUFFIXES: [&str; 4] = ["_lod2", "_lod3", "_lowrez", "_lowres"];
    PREFIXES.iter().any(|p| name.starts_with(p))
        || !node.object_type.is_mesh()
        || SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Whether a host object is a collision primitive (`p_` prefix).
pub fn is_collision_primitive(name: &str) -> bool {
    name.to_lowercase().starts_with("p_")
}

/// Primitive shape named in an object name.
pub fn collision_shape(name: &str) -> Result<CollisionShape> {
    let lower = name.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    if has(&["sphere", "sphr", "spr"]) {
        Ok(CollisionShape::Sphere)
    } else if has(&["cylinder", "cyln", "cyl"]) {
        Ok(CollisionShape::Cylinder)
    } else if has(&["box", "cube", "cuboid"]) {
        Ok(CollisionShape::Box)
    } else {
        Err(Error::InvalidModel(format!(
            "'{name}' has no primitive type in its name"
        )))
    }
}

fn is_close(a: f32, b: f32, rel_tol: f32) -> bool {
    (a - b).abs() <= rel_tol * a.abs().max(b.abs())
}

/// Collision primitive of a `p_` object from its name and dimensions.
pub fn collision_primitive(name: &str, dimensions: Vec3) -> Result<CollisionPrimitive> {
    let mut prim = CollisionPrimitive::new(collision_shape(name)?);
    let d = dimensions;
    match prim.shape {
        CollisionShape::Sphere => {
            // 5% slack for low-subdivision spheres.
            if !(is_close(d.x, d.y, 0.05) && is_close(d.x, d.z, 0.05)) {
                return Err(Error::InvalidModel(format!(
                    "'{name}' is a sphere primitive but its dimensions are not uniform"
                )));
            }
            prim.radius = d.max_element() * 0.5;
        }
        CollisionShape::Cylinder => {
            if !is_close(d.x, d.y, 0.001) {
                return Err(Error::InvalidModel(format!(
                    "'{name}' is a cylinder primitive but its X and Y dimensions differ"
                )));
            }
            prim.radius = d.x * 0.5;
            prim.height = d.z;
        }
        CollisionShape::Box => {
            prim.radius = d.x * 0.5;
            prim.height = d.z * 0.5;
            prim.length = d.y * 0.5;
        }
    }
    Ok(prim)
}

/// Reject LOD suffixes the game ignores (`_lod1`, `_lod4`..`_lod9`).
pub fn check_lod_suffix(name: &str) -> Result<()> {
    let lower = name.to_lowercase();
    let bad = std::iter::once(1)
        .chain(4..10)
        .any(|i| lower.ends_with(&format!("_lod{i}")));
    if bad {
        return Err(Error::InvalidModel(format!(
            "'{name}' has an unknown LOD suffix"
        )));
    }
    Ok(())
}

/// Turn host objects into models.
///
/// Armatures expand into one Bone model per bone; objects parented to an
/// armature are re-parented to the armature's parent. Cameras and lights are
/// dropped unless another object names them as parent.
pub fn gather_models(
    nodes: &[HostNode],
    armatures: &[HostArmature],
    opts: &GatherOptions,
) -> Result<Vec<Model>> {
    let parents: HashSet<&str> = nodes.iter().filter_map(|n| n.parent.as_deref()).collect();
    let armature_parent = |name: &str| -> Option<Option<String>> {
        armatures
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.parent.clone())
    };

    let mut models = Vec::with_capacity(nodes.len());
    for node in nodes {
        if node.object_type == HostObjectType::Armature {
            continue;
        }
        if node.object_type.is_skipped() && !parents.contains(node.name.as_str()) {
            tracing::debug!(name = %node.name, "skipping host object");
            continue;
        }
        check_lod_suffix(&node.name)?;

        let mut model = Model::new(node.name.clone());
        model.kind = if opts.skeleton_only { ModelKind::Null } else { model_kind(node) };
        model.hidden = is_hidden(node);
        model.transform = node.transform;
        model.parent = match (&node.parent_bone, &node.parent) {
            (Some(bone), _) => Some(bone.clone()),
            (None, Some(parent)) => armature_parent(parent).unwrap_or_else(|| Some(parent.clone())),
            (None, None) => None,
        };

        if model.kind.has_geometry() {
            let mesh = node.mesh.as_ref().ok_or_else(|| {
                Error::InvalidModel(format!("'{}' is a mesh object without mesh data", node.name))
            })?;
            let mut segments = assemble_segments(mesh)?;
            if node.world_scale != Vec3::ONE {
                for p in segments.iter_mut().flat_map(|s| s.positions.iter_mut()) {
                    *p *= node.world_scale;
                }
            }
            model.geometry = Some(segments);
            if !node.vertex_groups.is_empty() {
                model.bone_map = Some(node.vertex_groups.clone());
            }
        }

        if is_collision_primitive(&node.name) {
            model.collision_primitive = Some(collision_primitive(&node.name, node.dimensions)?);
        }
        models.push(model);
    }

    for armature in armatures {
        check_lod_suffix(&armature.name)?;
        models.extend(expand_armature(armature));
    }

    tracing::debug!(models = models.len(), "gathered models");
    Ok(models)
}

/// One Bone model per armature bone. Root bones attach to the armature's parent.
pub fn expand_armature(armature: &HostArmature) -> Vec<Model> {
    armature
        .bones
        .iter()
        .map(|bone| {
            let mut model = Model::new(bone.name.clone())
                .with_kind(ModelKind::Bone)
                .with_transform(bone.transform);
            model.parent = bone.parent.clone().or_else(|| armature.parent.clone());
            model
        })
        .collect()
}

/// Sample an armature animation over an inclusive frame range.
///
/// `sample` returns the pose of a keyed bone, relative to its parent bone,
/// at a frame. The scene root gets identity keys on every frame.
pub fn gather_animation<F>(
    start: i32,
    end: i32,
    root_name: &str,
    keyed_bones: &[String],
    mut sample: F,
) -> Result<Animation>
where
    F: FnMut(i32, &str) -> Result<ModelTransform>,
{
    if start < 0 || end < start {
        return Err(Error::InvalidModel(format!(
            "invalid animation frame range {start}..={end}"
        )));
    }
    let mut anim = Animation::new(start, end);
    let root_crc = msh_crc::crc(root_name);
    anim.bone_frames.insert(root_crc, BoneFrames::default());
    for bone in keyed_bones {
        anim.bone_frames.insert(msh_crc::crc(bone), BoneFrames::default());
    }

    for frame in start..=end {
        let index = frame as u32;
        let push = |frames: &mut BoneFrames, pose: ModelTransform| {
            frames.translations.push(TranslationFrame { index, translation: pose.translation });
            frames.rotations.push(RotationFrame { index, rotation: pose.rotation });
        };
        if let Some(frames) = anim.bone_frames.get_mut(&root_crc) {
            push(frames, ModelTransform::IDENTITY);
        }
        for bone in keyed_bones {
            let pose = sample(frame, bone)?;
            if let Some(frames) = anim.bone_frames.get_mut(&msh_crc::crc(bone)) {
                push(frames, pose);
            }
        }
    }
    Ok(anim)
}
