//! Segment assembly from triangulated host meshes.
//!
//! Hosts describe meshes per loop (face corner): a vertex shared by several
//! faces can carry a different normal, UV or colour in each. The MSH format
//! stores one attribute set per vertex, so every distinct combination becomes
//! its own segment vertex and identical ones are merged.

use std::collections::{BTreeSet, HashMap};

use glam::{Vec2, Vec3};

use crate::chunk::MAX_VERTEX_COUNT;
use crate::scene::{GeometrySegment, WeightSet};
use crate::util::{Error, Result};

/// A triangle of a host mesh, referencing vertices and loops.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopTriangle {
    pub vertices: [u32; 3],
    pub loops: [u32; 3],
    pub material_index: usize,
    /// Source polygon in [`TriangulatedMesh::polygons`].
    pub polygon_index: usize,
    /// Smooth shading, use the vertex or loop normal.
    pub smooth: bool,
    /// Face normal, used when flat shaded.
    pub normal: Vec3,
}

/// A source polygon, as parallel vertex and loop lists.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshPolygon {
    pub vertices: Vec<u32>,
    pub loops: Vec<u32>,
}

/// Host mesh after triangulation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangulatedMesh {
    pub positions: Vec<Vec3>,
    pub vertex_normals: Vec<Vec3>,
    /// Custom split normals per loop.
    pub loop_normals: Option<Vec<Vec3>>,
    pub loop_uvs: Option<Vec<Vec2>>,
    pub loop_colors: Option<Vec<[f32; 4]>>,
    /// Influences per vertex, indexing the owning model's vertex groups.
    pub vertex_weights: Option<Vec<WeightSet>>,
    pub triangles: Vec<LoopTriangle>,
    pub polygons: Vec<MeshPolygon>,
    /// Material name per material slot.
    pub material_names: Vec<String>,
    /// Treat every face as smooth shaded.
    pub auto_smooth: bool,
}

impl TriangulatedMesh {
    /// Rebuild a host mesh from segments, one loop per segment vertex.
    ///
    /// Each segment becomes a material slot; each triangle becomes a
    /// single-triangle polygon.
    pub fn from_segments(segments: &[GeometrySegment]) -> Self {
        let mut mesh = TriangulatedMesh {
            auto_smooth: true,
            ..Self::default()
        };
        let has_uvs = segments.iter().any(|s| !s.texcoords.is_empty());
        let has_colors = segments.iter().any(|s| s.colors.is_some());
        let has_weights = segments.iter().any(|s| s.weights.is_some());
        let mut uvs = Vec::new();
        let mut colors = Vec::new();
        let mut weights = Vec::new();

        for (material_index, seg) in segments.iter().enumerate() {
            let base = mesh.positions.len() as u32;
            let n = seg.positions.len();
            mesh.material_names.push(seg.material_name.clone());
            mesh.positions.extend_from_slice(&seg.positions);
            mesh.vertex_normals
                .extend((0..n).map(|i| seg.normals.get(i).copied().unwrap_or(Vec3::ZERO)));
            if has_uvs {
                uvs.extend((0..n).map(|i| seg.texcoords.get(i).copied().unwrap_or(Vec2::ZERO)));
            }
            if has_colors {
                colors.extend((0..n).map(|i| {
                    seg.colors
                        .as_ref()
                        .and_then(|c| c.get(i).copied())
                        .unwrap_or([1.0; 4])
                }));
            }
            if has_weights {
                weights.extend((0..n).map(|i| {
                    seg.weights
                        .as_ref()
                        .and_then(|w| w.get(i).cloned())
                        .unwrap_or_default()
                }));
            }

            for tri in seg.triangle_list() {
                let corners = tri.map(|i| base + i);
                let [a, b, c] = corners.map(|i| mesh.positions[i as usize]);
                mesh.triangles.push(LoopTriangle {
                    vertices: corners,
                    loops: corners,
                    material_index,
                    polygon_index: mesh.polygons.len(),
                    smooth: true,
                    normal: (b - a).cross(c - a).normalize_or_zero(),
                });
                mesh.polygons.push(MeshPolygon {
                    vertices: corners.to_vec(),
                    loops: corners.to_vec(),
                });
            }
        }

        mesh.loop_uvs = has_uvs.then_some(uvs);
        mesh.loop_colors = has_colors.then_some(colors);
        mesh.vertex_weights = has_weights.then_some(weights);
        mesh
    }

    /// Number of material slots (at least one).
    pub fn material_count(&self) -> usize {
        self.material_names.len().max(1)
    }
}

/// Exact bit pattern of every attribute of one segment vertex.
type VertexKey = Vec<u32>;

/// Per-material state while assembling.
#[derive(Default)]
struct SegmentBuilder {
    segment: GeometrySegment,
    cache: HashMap<VertexKey, u32>,
    remap: HashMap<(u32, u32), u32>,
    polygons: BTreeSet<usize>,
}

/// Split a mesh into one deduplicated segment per material.
///
/// Two corners merge only when position, chosen normal, UV, colour and
/// weights are bitwise equal. Source polygons are re-emitted with remapped
/// indices. Segments without triangles are dropped.
pub fn assemble_segments(mesh: &TriangulatedMesh) -> Result<Vec<GeometrySegment>> {
    let mut builders: Vec<SegmentBuilder> = (0..mesh.material_count())
        .map(|i| {
            let mut b = SegmentBuilder::default();
            b.segment.material_name = mesh.material_names.get(i).cloned().unwrap_or_default();
            if mesh.loop_colors.is_some() {
                b.segment.colors = Some(Vec::new());
            }
            if mesh.vertex_weights.is_some() {
                b.segment.weights = Some(Vec::new());
            }
            b
        })
        .collect();

    for tri in &mesh.triangles {
        let builder = builders
            .get_mut(tri.material_index)
            .ok_or_else(|| Error::index("material slot", tri.material_index as u32, mesh.material_count()))?;
        builder.polygons.insert(tri.polygon_index);
        let mut corners = [0u32; 3];
        for k in 0..3 {
            corners[k] = add_vertex(mesh, builder, tri, k)?;
        }
        builder.segment.triangles.push(corners);
    }

    let mut segments = Vec::with_capacity(builders.len());
    for mut builder in builders {
        if builder.segment.triangles.is_empty() {
            continue;
        }
        for &p in &builder.polygons {
            let poly = mesh
                .polygons
                .get(p)
                .ok_or_else(|| Error::index("polygon", p as u32, mesh.polygons.len()))?;
            let remapped = poly
                .vertices
                .iter()
                .zip(&poly.loops)
                .map(|(&v, &l)| {
                    builder.remap.get(&(v, l)).copied().ok_or_else(|| {
                        Error::degenerate(format!("polygon {p} corner ({v}, {l}) is not on any triangle"))
                    })
                })
                .collect::<Result<Vec<u32>>>()?;
            builder.segment.polygons.push(remapped);
        }
        tracing::debug!(
            material = %builder.segment.material_name,
            vertices = builder.segment.positions.len(),
            triangles = builder.segment.triangles.len(),
            "assembled segment"
        );
        segments.push(builder.segment);
    }
    Ok(segments)
}

fn add_vertex(
    mesh: &TriangulatedMesh,
    builder: &mut SegmentBuilder,
    tri: &LoopTriangle,
    corner: usize,
) -> Result<u32> {
    let v = tri.vertices[corner];
    let l = tri.loops[corner];
    let vi = v as usize;
    let li = l as usize;

    let position = *mesh
        .positions
        .get(vi)
        .ok_or_else(|| Error::index("vertex", v, mesh.positions.len()))?;
    let normal = if tri.smooth || mesh.auto_smooth {
        match &mesh.loop_normals {
            Some(n) => loop_attr(n, l)?,
            None => mesh.vertex_normals.get(vi).copied().unwrap_or(Vec3::ZERO),
        }
    } else {
        tri.normal
    };
    let uv = match &mesh.loop_uvs {
        Some(uvs) => Some(loop_attr(uvs, l)?),
        None => None,
    };
    let color = match &mesh.loop_colors {
        Some(colors) => Some(loop_attr(colors, l)?),
        None => None,
    };
    let weights = match &mesh.vertex_weights {
        Some(w) => Some(
            w.get(vi)
                .ok_or_else(|| Error::index("weighted vertex", v, w.len()))?,
        ),
        None => None,
    };

    let mut key: VertexKey = Vec::with_capacity(16);
    key.extend_from_slice(&bytemuck::cast::<Vec3, [u32; 3]>(position));
    key.extend_from_slice(&bytemuck::cast::<Vec3, [u32; 3]>(normal));
    if let Some(uv) = uv {
        key.extend_from_slice(&bytemuck::cast::<Vec2, [u32; 2]>(uv));
    }
    if let Some(color) = color {
        key.extend_from_slice(&bytemuck::cast::<[f32; 4], [u32; 4]>(color));
    }
    if let Some(set) = weights {
        for w in set {
            key.push(w.bone);
            key.push(w.weight.to_bits());
        }
    }

    if let Some(&index) = builder.cache.get(&key) {
        builder.remap.insert((v, l), index);
        return Ok(index);
    }

    let seg = &mut builder.segment;
    let index = seg.positions.len();
    if index >= MAX_VERTEX_COUNT {
        return Err(Error::degenerate(format!(
            "segment '{}' needs more than {} vertices, split the mesh",
            seg.material_name, MAX_VERTEX_COUNT
        )));
    }
    let index = index as u32;
    seg.positions.push(position);
    seg.normals.push(normal);
    seg.texcoords.push(uv.unwrap_or(Vec2::ZERO));
    if let (Some(colors), Some(color)) = (seg.colors.as_mut(), color) {
        colors.push(color);
    }
    if let (Some(out), Some(set)) = (seg.weights.as_mut(), weights) {
        out.push(set.clone());
    }

    builder.cache.insert(key, index);
    builder.remap.insert((v, l), index);
    Ok(index)
}

fn loop_attr<T: Copy>(values: &[T], l: u32) -> Result<T> {
    values
        .get(l as usize)
        .copied()
        .ok_or_else(|| Error::index("loop", l, values.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::VertexWeight;
    use smallvec::smallvec;

    /// Unit quad split into two flat triangles, loops numbered per corner.
    fn quad(smooth: bool) -> TriangulatedMesh {
        let up = Vec3::Z;
        TriangulatedMesh {
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vertex_normals: vec![up; 4],
            loop_uvs: Some(vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ]),
            triangles: vec![
                LoopTriangle {
                    vertices: [0, 1, 2],
                    loops: [0, 1, 2],
                    material_index: 0,
                    polygon_index: 0,
                    smooth,
                    normal: up,
                },
                LoopTriangle {
                    vertices: [0, 2, 3],
                    loops: [0, 2, 3],
                    material_index: 0,
                    polygon_index: 0,
                    smooth,
                    normal: up,
                },
            ],
            polygons: vec![MeshPolygon {
                vertices: vec![0, 1, 2, 3],
                loops: vec![0, 1, 2, 3],
            }],
            material_names: vec!["mat".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_shared_corners_merge() {
        let segments = assemble_segments(&quad(true)).unwrap();
        assert_eq!(segments.len(), 1);
        let seg = &segments[0];
        assert_eq!(seg.material_name, "mat");
        assert_eq!(seg.positions.len(), 4);
        assert_eq!(seg.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(seg.polygons, vec![vec![0, 1, 2, 3]]);
        assert!(seg.validate().is_ok());
    }

    #[test]
    fn test_differing_uvs_split() {
        let mut mesh = quad(true);
        // Second triangle sees vertex 0 through a loop with another UV.
        mesh.loop_uvs.as_mut().unwrap().push(Vec2::new(0.5, 0.5));
        mesh.triangles[1].loops = [4, 2, 3];
        mesh.polygons[0].loops = vec![0, 1, 2, 3];
        let segments = assemble_segments(&mesh).unwrap();
        assert_eq!(segments[0].positions.len(), 5);
        assert_eq!(segments[0].triangles[1], [3, 2, 4]);
    }

    #[test]
    fn test_flat_uses_face_normal() {
        let mut mesh = quad(false);
        mesh.triangles[1].normal = -Vec3::Z;
        let seg = &assemble_segments(&mesh).unwrap()[0];
        // Corners 0 and 2 are shared but the face normals differ.
        assert_eq!(seg.positions.len(), 6);
        assert_eq!(seg.normals[3], -Vec3::Z);
    }

    #[test]
    fn test_weights_are_part_of_key() {
        let mut mesh = quad(true);
        let w: WeightSet = smallvec![VertexWeight::new(1.0, 0)];
        mesh.vertex_weights = Some(vec![w; 4]);
        let seg = &assemble_segments(&mesh).unwrap()[0];
        assert_eq!(seg.weights.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn test_empty_material_dropped() {
        let mut mesh = quad(true);
        mesh.material_names.push("unused".to_string());
        let segments = assemble_segments(&mesh).unwrap();
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_bad_material_slot() {
        let mut mesh = quad(true);
        mesh.triangles[0].material_index = 3;
        assert!(matches!(
            assemble_segments(&mesh),
            Err(Error::UnsupportedIndex { .. })
        ));
    }

    #[test]
    fn test_idempotent() {
        let first = assemble_segments(&quad(true)).unwrap();
        let second = assemble_segments(&TriangulatedMesh::from_segments(&first)).unwrap();
        assert_eq!(first[0].positions, second[0].positions);
        assert_eq!(first[0].normals, second[0].normals);
        assert_eq!(first[0].texcoords, second[0].texcoords);
        assert_eq!(first[0].triangles, second[0].triangles);
    }
}
