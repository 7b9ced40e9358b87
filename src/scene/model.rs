//! Model nodes and geometry segments (`MODL`, `SEGM`).

use glam::{Mat4, Quat, Vec2, Vec3};
use smallvec::SmallVec;

use crate::util::{Error, Result};

/// Model type (`MTYP`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Transform only.
    #[default]
    Null,
    /// Skinned mesh.
    Skin,
    /// Bone.
    Bone,
    /// Static mesh.
    Static,
}

impl ModelKind {
    /// Wire value.
    pub const fn to_u32(self) -> u32 {
        match self {
            Self::Null => 0,
            Self::Skin => 1,
            Self::Bone => 3,
            Self::Static => 4,
        }
    }

    /// True for kinds that carry geometry.
    pub const fn has_geometry(self) -> bool {
        matches!(self, Self::Skin | Self::Static)
    }
}

impl TryFrom<u32> for ModelKind {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Null),
            1 => Ok(Self::Skin),
            3 => Ok(Self::Bone),
            4 => Ok(Self::Static),
            _ => Err(Error::InvalidEnumValue { kind: "model type", value }),
        }
    }
}

/// Local transform relative to the parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelTransform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl ModelTransform {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Create a transform.
    pub const fn new(translation: Vec3, rotation: Quat) -> Self {
        Self { translation, rotation }
    }

    /// As a 4x4 matrix.
    #[inline]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    /// Decompose a matrix, discarding scale.
    pub fn from_matrix(m: &Mat4) -> Self {
        let (_scale, rotation, translation) = m.to_scale_rotation_translation();
        Self { translation, rotation }
    }
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Collision primitive shape (`SWCI`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollisionShape {
    Sphere,
    Cylinder,
    Box,
}

impl CollisionShape {
    /// Wire value.
    pub const fn to_u32(self) -> u32 {
        match self {
            Self::Sphere => 0,
            Self::Cylinder => 2,
            Self::Box => 4,
        }
    }
}

impl TryFrom<u32> for CollisionShape {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Sphere),
            2 => Ok(Self::Cylinder),
            4 => Ok(Self::Box),
            _ => Err(Error::InvalidEnumValue { kind: "collision shape", value }),
        }
    }
}

/// Collision primitive attached to a model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionPrimitive {
    pub shape: CollisionShape,
    pub radius: f32,
    pub height: f32,
    pub length: f32,
}

impl CollisionPrimitive {
    /// Primitive with all dimensions zeroed.
    pub fn new(shape: CollisionShape) -> Self {
        Self {
            shape,
            radius: 0.0,
            height: 0.0,
            length: 0.0,
        }
    }
}

/// One bone influence on a vertex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexWeight {
    pub weight: f32,
    /// Bone index. See [`Model::bone_map`] for the index space.
    pub bone: u32,
}

impl VertexWeight {
    pub const fn new(weight: f32, bone: u32) -> Self {
        Self { weight, bone }
    }
}

/// Influences of one vertex.
pub type WeightSet = SmallVec<[VertexWeight; 4]>;

/// Geometry of one material within a model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometrySegment {
    /// Name of the material in [`crate::Scene::materials`].
    pub material_name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub texcoords: Vec<Vec2>,
    /// RGBA colours, index-aligned with positions.
    pub colors: Option<Vec<[f32; 4]>>,
    /// Bone influences, index-aligned with positions.
    pub weights: Option<Vec<WeightSet>>,
    pub triangles: Vec<[u32; 3]>,
    pub triangle_strips: Vec<Vec<u32>>,
    /// Source polygons (fans), decode and gather only.
    pub polygons: Vec<Vec<u32>>,
}

impl GeometrySegment {
    /// Create an empty segment for a material.
    pub fn new(material_name: impl Into<String>) -> Self {
        Self {
            material_name: material_name.into(),
            ..Self::default()
        }
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// True if any topology is present.
    pub fn has_topology(&self) -> bool {
        !self.triangles.is_empty() || !self.triangle_strips.is_empty() || !self.polygons.is_empty()
    }

    /// Triangles of the segment, from the explicit list or unrolled strips.
    ///
    /// Strips alternate winding; triangles repeating a vertex are dropped.
    pub fn triangle_list(&self) -> Vec<[u32; 3]> {
        let mut out = self.triangles.clone();
        for strip in &self.triangle_strips {
            out.extend(crate::geom::strip_triangles(strip));
        }
        out
    }

    /// Check the segment invariants.
    pub fn validate(&self) -> Result<()> {
        let count = self.positions.len();
        if count == 0 {
            if self.has_topology() {
                return Err(Error::degenerate(format!(
                    "segment '{}' has topology but no vertices",
                    self.material_name
                )));
            }
            return Ok(());
        }

        let indices = self
            .triangles
            .iter()
            .flatten()
            .chain(self.triangle_strips.iter().flatten())
            .chain(self.polygons.iter().flatten());
        for &index in indices {
            if index as usize >= count {
                return Err(Error::index("vertex", index, count));
            }
        }

        if let Some(weights) = &self.weights {
            if weights.len() != count {
                return Err(Error::degenerate(format!(
                    "segment '{}' has {} weight sets for {} vertices",
                    self.material_name,
                    weights.len(),
                    count
                )));
            }
        }
        Ok(())
    }
}

/// A node of the scene graph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
    pub name: String,
    /// Parent model name, `None` for the scene root.
    pub parent: Option<String>,
    pub kind: ModelKind,
    pub hidden: bool,
    pub transform: ModelTransform,
    pub geometry: Option<Vec<GeometrySegment>>,
    /// Vertex group names of a skinned model.
    ///
    /// When present, [`VertexWeight::bone`] in this model's segments indexes
    /// this list and the encoder resolves the names to models. When absent,
    /// it indexes [`crate::Scene::models`] directly (the state after decode).
    pub bone_map: Option<Vec<String>>,
    pub collision_primitive: Option<CollisionPrimitive>,
}

impl Model {
    /// Create a null model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the parent name (builder style).
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the kind (builder style).
    pub fn with_kind(mut self, kind: ModelKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the local transform (builder style).
    pub fn with_transform(mut self, transform: ModelTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Name hash.
    #[inline]
    pub fn crc(&self) -> u32 {
        msh_crc::crc(&self.name)
    }

    /// Geometry segments (empty if none).
    pub fn segments(&self) -> &[GeometrySegment] {
        self.geometry.as_deref().unwrap_or(&[])
    }

    /// Total vertex count over all segments.
    pub fn num_vertices(&self) -> usize {
        self.segments().iter().map(GeometrySegment::num_vertices).sum()
    }
}
