//! [`Scene`] to chunk tree.

use std::borrow::Cow;
use std::collections::HashMap;

use glam::{Quat, Vec3};

use crate::chunk::{ChunkTag, ChunkWriter, TEXTURE_SLOT_TAGS};
use crate::geom::{assemble_segments, build_envelope, encode_strips, envelope_slots, stripify};
use crate::scene::{GeometrySegment, Material, Model, Scene, WeightSet};
use crate::util::{pack_color, BBox3f, Error, Result};

use super::anim::write_anm2;
use super::{EncodeOptions, MeshProvider};

/// Scene name written when neither the options nor the scene carry one.
const DEFAULT_SCENE_NAME: &str = "Scene";

/// Encode a scene with default options.
pub fn encode(scene: &Scene, meshes: &dyn MeshProvider) -> Result<Vec<u8>> {
    encode_opts(scene, meshes, &EncodeOptions::default())
}

/// Encode a scene.
///
/// Static and Skin models without geometry get segments assembled from
/// `meshes`. The parent graph is checked before anything is written.
pub fn encode_opts(scene: &Scene, meshes: &dyn MeshProvider, opts: &EncodeOptions) -> Result<Vec<u8>> {
    scene.graph()?;

    let material_index: HashMap<&str, u32> = scene
        .materials
        .keys()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i as u32))
        .collect();

    let mut prepared = Vec::with_capacity(scene.models.len());
    for model in &scene.models {
        prepared.push(prepare_model(scene, model, meshes, opts)?);
    }

    let mut bbox = BBox3f::EMPTY;
    if prepared.iter().any(|p| !p.segments.is_empty()) {
        let graph = scene.graph()?;
        for (index, p) in prepared.iter().enumerate() {
            let world = graph.world_matrix(&scene.models, index);
            for pos in p.segments.iter().flat_map(|s| s.positions.iter()) {
                bbox.expand_by_point(world.transform_point3(*pos));
            }
        }
    }

    let name = opts
        .scene_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .or_else(|| (!scene.name.is_empty()).then_some(scene.name.as_str()))
        .unwrap_or(DEFAULT_SCENE_NAME);

    let mut w = ChunkWriter::new();
    w.child(ChunkTag::Hedr, |w| {
        w.child(ChunkTag::Msh2, |w| {
            write_sinf(w, scene, name, &bbox, opts)?;
            write_matl(w, scene.materials.values())?;
            for (index, (model, p)) in scene.models.iter().zip(&prepared).enumerate() {
                write_modl(w, model, index, p, &material_index, opts)?;
            }
            Ok(())
        })?;

        if !scene.skeleton.is_empty() {
            w.child(ChunkTag::Skl2, |w| {
                w.write_u32(scene.skeleton.len() as u32)?;
                for &crc in &scene.skeleton {
                    w.write_u32(crc)?;
                    for _ in 0..4 {
                        w.write_u32(0)?;
                    }
                }
                Ok(())
            })?;
        }

        if let Some(anim) = &scene.animation {
            write_anm2(w, anim)?;
        }
        w.child(ChunkTag::Cl1l, |_| Ok(()))
    })?;

    let bytes = w.into_bytes();
    tracing::debug!(
        name,
        models = scene.models.len(),
        materials = scene.materials.len(),
        size = bytes.len(),
        "encoded scene"
    );
    Ok(bytes)
}

/// Geometry of a model as it will be written.
struct PreparedModel<'a> {
    segments: Cow<'a, [GeometrySegment]>,
    /// Per-segment weights in model-index space.
    weights: Vec<Option<Vec<WeightSet>>>,
    /// Distinct weighted model indices.
    envelope: Vec<u32>,
}

fn prepare_model<'a>(
    scene: &Scene,
    model: &'a Model,
    meshes: &dyn MeshProvider,
    opts: &EncodeOptions,
) -> Result<PreparedModel<'a>> {
    let segments: Cow<'a, [GeometrySegment]> = match &model.geometry {
        Some(segments) => Cow::Borrowed(segments.as_slice()),
        None if model.kind.has_geometry() => match meshes.mesh(model)? {
            Some(mesh) => Cow::Owned(assemble_segments(&mesh)?),
            None => Cow::Borrowed(&[]),
        },
        None => Cow::Borrowed(&[]),
    };

    for seg in segments.iter() {
        seg.validate()?;
        if seg.positions.len() > opts.max_vertex_count {
            return Err(Error::degenerate(format!(
                "segment '{}' of model '{}' has {} vertices, the limit is {}",
                seg.material_name,
                model.name,
                seg.positions.len(),
                opts.max_vertex_count
            )));
        }
        if !scene.materials.contains_key(&seg.material_name) {
            return Err(Error::UnknownMaterial(seg.material_name.clone()));
        }
    }

    // Bone map indices go through the vertex group names.
    let bones: Option<Vec<u32>> = match &model.bone_map {
        Some(groups) => Some(
            groups
                .iter()
                .map(|group| {
                    scene.model_index(group).map(|i| i as u32).ok_or_else(|| {
                        Error::InvalidModel(format!(
                            "vertex group '{}' of '{}' names no model",
                            group, model.name
                        ))
                    })
                })
                .collect::<Result<_>>()?,
        ),
        None => None,
    };

    let mut weights = Vec::with_capacity(segments.len());
    for seg in segments.iter() {
        let Some(raw) = &seg.weights else {
            weights.push(None);
            continue;
        };
        let mut resolved = raw.clone();
        for w in resolved.iter_mut().flatten() {
            w.bone = match &bones {
                Some(bones) => *bones
                    .get(w.bone as usize)
                    .ok_or_else(|| Error::index("vertex group", w.bone, bones.len()))?,
                None if (w.bone as usize) < scene.models.len() => w.bone,
                None => return Err(Error::index("model", w.bone, scene.models.len())),
            };
        }
        weights.push(Some(resolved));
    }
    let envelope = build_envelope(weights.iter().flatten().flatten());

    Ok(PreparedModel { segments, weights, envelope })
}

fn write_sinf(
    w: &mut ChunkWriter,
    scene: &Scene,
    name: &str,
    bbox: &BBox3f,
    opts: &EncodeOptions,
) -> Result<()> {
    let (start, end, fps) = match &scene.animation {
        Some(anim) => (anim.start_index, anim.end_index, anim.framerate),
        None => (0, 1, opts.frame_rate),
    };
    let (center, extents, radius) = if bbox.is_empty() {
        (Vec3::ZERO, Vec3::ZERO, 0.0)
    } else {
        (bbox.center(), bbox.half_extents(), bbox.radius())
    };

    w.child(ChunkTag::Sinf, |w| {
        w.string_child(ChunkTag::Name, name)?;
        w.child(ChunkTag::Fram, |w| {
            w.write_i32(start)?;
            w.write_i32(end)?;
            w.write_f32(fps)
        })?;
        w.child(ChunkTag::Bbox, |w| {
            w.write_quat(Quat::IDENTITY)?;
            w.write_vec3(center)?;
            w.write_vec3(extents)?;
            w.write_f32(radius)
        })
    })
}

fn write_matl<'a>(w: &mut ChunkWriter, materials: impl ExactSizeIterator<Item = &'a Material>) -> Result<()> {
    w.child(ChunkTag::Matl, |w| {
        w.write_u32(materials.len() as u32)?;
        for mat in materials {
            w.child(ChunkTag::Matd, |w| {
                w.string_child(ChunkTag::Name, &mat.name)?;
                w.child(ChunkTag::Data, |w| {
                    w.write_f32_slice(&mat.diffuse_color)?;
                    w.write_f32_slice(&mat.specular_color)?;
                    w.write_f32_slice(&mat.ambient_color)?;
                    w.write_f32(mat.specular_exponent)
                })?;
                w.child(ChunkTag::Atrb, |w| {
                    w.write_u8(mat.flags)?;
                    w.write_u8(mat.rendertype)?;
                    w.write_u8(mat.data[0])?;
                    w.write_u8(mat.data[1])
                })?;
                for (tag, texture) in TEXTURE_SLOT_TAGS.iter().zip(&mat.textures) {
                    if let Some(texture) = texture {
                        w.string_child(*tag, texture)?;
                    }
                }
                Ok(())
            })?;
        }
        Ok(())
    })
}

fn write_modl(
    w: &mut ChunkWriter,
    model: &Model,
    index: usize,
    prepared: &PreparedModel<'_>,
    material_index: &HashMap<&str, u32>,
    opts: &EncodeOptions,
) -> Result<()> {
    w.child(ChunkTag::Modl, |w| {
        w.child(ChunkTag::Mtyp, |w| w.write_u32(model.kind.to_u32()))?;
        w.child(ChunkTag::Mndx, |w| w.write_u32(index as u32 + 1))?;
        w.string_child(ChunkTag::Name, &model.name)?;
        if let Some(parent) = model.parent.as_deref().filter(|p| !p.is_empty()) {
            w.string_child(ChunkTag::Prnt, parent)?;
        }
        if model.hidden {
            w.child(ChunkTag::Flgs, |w| w.write_u32(1))?;
        }
        w.child(ChunkTag::Tran, |w| {
            w.write_vec3(Vec3::ONE)?;
            w.write_quat(model.transform.rotation)?;
            w.write_vec3(model.transform.translation)
        })?;

        if !prepared.segments.is_empty() {
            w.child(ChunkTag::Geom, |w| {
                for (seg, weights) in prepared.segments.iter().zip(&prepared.weights) {
                    let mati = material_index
                        .get(seg.material_name.as_str())
                        .copied()
                        .ok_or_else(|| Error::UnknownMaterial(seg.material_name.clone()))?;
                    write_segm(w, seg, mati, weights.as_deref(), &prepared.envelope, opts)?;
                }
                if !prepared.envelope.is_empty() {
                    w.child(ChunkTag::Envl, |w| {
                        w.write_u32(prepared.envelope.len() as u32)?;
                        for &bone in &prepared.envelope {
                            w.write_u32(bone + 1)?;
                        }
                        Ok(())
                    })?;
                }
                Ok(())
            })?;
        }

        if let Some(prim) = &model.collision_primitive {
            w.child(ChunkTag::Swci, |w| {
                w.write_u32(prim.shape.to_u32())?;
                w.write_f32(prim.radius)?;
                w.write_f32(prim.height)?;
                w.write_f32(prim.length)
            })?;
        }
        Ok(())
    })?;

    tracing::debug!(
        name = %model.name,
        kind = ?model.kind,
        segments = prepared.segments.len(),
        "wrote model"
    );
    Ok(())
}

fn write_segm(
    w: &mut ChunkWriter,
    seg: &GeometrySegment,
    material_index: u32,
    weights: Option<&[WeightSet]>,
    envelope: &[u32],
    opts: &EncodeOptions,
) -> Result<()> {
    w.child(ChunkTag::Segm, |w| {
        w.child(ChunkTag::Mati, |w| w.write_u32(material_index))?;

        w.child(ChunkTag::Posl, |w| {
            w.write_u32(seg.positions.len() as u32)?;
            seg.positions.iter().try_for_each(|&p| w.write_vec3(p))
        })?;

        if let Some(weights) = weights {
            let slots = envelope_slots(weights, envelope)?;
            w.child(ChunkTag::Wght, |w| {
                w.write_u32(slots.len() as u32)?;
                for (slot, weight) in slots.iter().flatten() {
                    w.write_u32(*slot)?;
                    w.write_f32(*weight)?;
                }
                Ok(())
            })?;
        }

        if !seg.normals.is_empty() {
            w.child(ChunkTag::Nrml, |w| {
                w.write_u32(seg.normals.len() as u32)?;
                seg.normals.iter().try_for_each(|&n| w.write_vec3(n))
            })?;
        }

        if let Some(colors) = &seg.colors {
            w.child(ChunkTag::Clrl, |w| {
                w.write_u32(colors.len() as u32)?;
                colors.iter().try_for_each(|&c| w.write_u32(pack_color(c)))
            })?;
        }

        if !seg.texcoords.is_empty() {
            w.child(ChunkTag::Uv0l, |w| {
                w.write_u32(seg.texcoords.len() as u32)?;
                seg.texcoords.iter().try_for_each(|&uv| w.write_vec2(uv))
            })?;
        }

        if !seg.polygons.is_empty() {
            w.child(ChunkTag::Ndxl, |w| {
                w.write_u32(seg.polygons.len() as u32)?;
                for poly in &seg.polygons {
                    w.write_u16(u16::try_from(poly.len()).map_err(|_| {
                        Error::degenerate(format!("polygon with {} corners", poly.len()))
                    })?)?;
                    poly.iter().try_for_each(|&i| w.write_u16(narrow_index(i)?))?;
                }
                Ok(())
            })?;
        }

        if opts.triangle_strips {
            let strips = if seg.triangles.is_empty() {
                seg.triangle_strips.clone()
            } else {
                stripify(&seg.triangle_list())
            };
            let raw = encode_strips(&strips)?;
            w.child(ChunkTag::Strp, |w| {
                w.write_u32(raw.len() as u32)?;
                raw.iter().try_for_each(|&i| w.write_u16(i))
            })
        } else {
            let triangles = seg.triangle_list();
            w.child(ChunkTag::Ndxt, |w| {
                w.write_u32(triangles.len() as u32)?;
                triangles.iter().flatten().try_for_each(|&i| w.write_u16(narrow_index(i)?))
            })
        }
    })
}

/// Vertex index as written in `NDXL`/`NDXT`.
fn narrow_index(index: u32) -> Result<u16> {
    u16::try_from(index).map_err(|_| {
        Error::degenerate(format!("vertex index {} does not fit a 16-bit index list", index))
    })
}
