//! Decoding hand-built documents.

use glam::{Vec2, Vec3};

use msh::chunk::{ChunkTag, ChunkWriter, FourCC};
use msh::scene::{ModelKind, VertexWeight};
use msh::{decode, Error, Result};

fn mtyp(w: &mut ChunkWriter, kind: ModelKind) -> Result<()> {
    w.child(ChunkTag::Mtyp, |w| w.write_u32(kind.to_u32()))
}

fn mndx(w: &mut ChunkWriter, index: u32) -> Result<()> {
    w.child(ChunkTag::Mndx, |w| w.write_u32(index))
}

fn matl(w: &mut ChunkWriter, names: &[&str]) -> Result<()> {
    w.child(ChunkTag::Matl, |w| {
        w.write_u32(names.len() as u32)?;
        for name in names {
            w.child(ChunkTag::Matd, |w| w.string_child(ChunkTag::Name, name))?;
        }
        Ok(())
    })
}

fn posl(w: &mut ChunkWriter, positions: &[Vec3]) -> Result<()> {
    w.child(ChunkTag::Posl, |w| {
        w.write_u32(positions.len() as u32)?;
        positions.iter().try_for_each(|&p| w.write_vec3(p))
    })
}

fn skl2(w: &mut ChunkWriter, bones: &[&str]) -> Result<()> {
    w.child(ChunkTag::Skl2, |w| {
        w.write_u32(bones.len() as u32)?;
        for bone in bones {
            w.write_u32(msh::crc(bone))?;
            w.write_bytes(&[0; 16])?;
        }
        Ok(())
    })
}

fn null_model(w: &mut ChunkWriter, name: &str, index: u32, kind: ModelKind) -> Result<()> {
    w.child(ChunkTag::Modl, |w| {
        mtyp(w, kind)?;
        mndx(w, index)?;
        w.string_child(ChunkTag::Name, name)
    })
}

fn triangle_document() -> Vec<u8> {
    let mut w = ChunkWriter::new();
    w.child(ChunkTag::Hedr, |w| {
        w.child(ChunkTag::Msh2, |w| {
            w.child(ChunkTag::Sinf, |w| w.string_child(ChunkTag::Name, "tri_scene"))?;
            matl(w, &["tri_mat"])?;
            w.child(ChunkTag::Modl, |w| {
                mtyp(w, ModelKind::Static)?;
                mndx(w, 1)?;
                w.string_child(ChunkTag::Name, "tri")?;
                w.child(ChunkTag::Geom, |w| {
                    w.child(ChunkTag::Segm, |w| {
                        w.child(ChunkTag::Mati, |w| w.write_u32(0))?;
                        posl(w, &[Vec3::ZERO, Vec3::X, Vec3::Y])?;
                        w.child(ChunkTag::Nrml, |w| {
                            w.write_u32(3)?;
                            (0..3).try_for_each(|_| w.write_vec3(Vec3::Z))
                        })?;
                        w.child(ChunkTag::Uv0l, |w| {
                            w.write_u32(3)?;
                            [Vec2::ZERO, Vec2::X, Vec2::Y].iter().try_for_each(|&uv| w.write_vec2(uv))
                        })?;
                        w.child(ChunkTag::Ndxt, |w| {
                            w.write_u32(1)?;
                            [0u16, 1, 2].iter().try_for_each(|&i| w.write_u16(i))
                        })
                    })
                })
            })
        })?;
        w.child(ChunkTag::Cl1l, |_| Ok(()))
    })
    .unwrap();
    w.into_bytes()
}

#[test]
fn test_single_static_triangle() {
    let scene = decode(&triangle_document()).unwrap();

    assert_eq!(scene.name, "tri_scene");
    assert_eq!(scene.models.len(), 1);
    assert!(scene.materials.contains_key("tri_mat"));

    let model = &scene.models[0];
    assert_eq!(model.name, "tri");
    assert_eq!(model.kind, ModelKind::Static);
    assert_eq!(model.parent, None);

    let seg = &model.segments()[0];
    assert_eq!(seg.material_name, "tri_mat");
    assert_eq!(seg.positions, vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
    assert_eq!(seg.normals, vec![Vec3::Z; 3]);
    assert_eq!(seg.texcoords, vec![Vec2::ZERO, Vec2::X, Vec2::Y]);
    assert_eq!(seg.triangles, vec![[0, 1, 2]]);
    assert!(seg.weights.is_none());
    assert!(scene.skeleton.is_empty());
    assert!(scene.animation.is_none());
}

#[test]
fn test_strip_with_single_restart_flag() {
    let mut w = ChunkWriter::new();
    w.child(ChunkTag::Msh2, |w| {
        matl(w, &["m"])?;
        w.child(ChunkTag::Modl, |w| {
            mtyp(w, ModelKind::Static)?;
            w.string_child(ChunkTag::Name, "strip")?;
            w.child(ChunkTag::Geom, |w| {
                w.child(ChunkTag::Segm, |w| {
                    w.child(ChunkTag::Mati, |w| w.write_u32(0))?;
                    posl(w, &[Vec3::ZERO; 5])?;
                    w.child(ChunkTag::Strp, |w| {
                        w.write_u32(5)?;
                        [0u16, 1, 2, 0x8003, 4].iter().try_for_each(|&i| w.write_u16(i))
                    })
                })
            })
        })
    })
    .unwrap();

    let scene = decode(&w.into_bytes()).unwrap();
    let seg = &scene.models[0].segments()[0];
    assert_eq!(seg.triangle_strips, vec![vec![0, 1, 2], vec![2, 3, 4]]);
    assert_eq!(seg.triangle_list(), vec![[0, 1, 2], [2, 3, 4]]);
}

/// Bones declared with indices 5, 12 and 7, and a skin weighted through an
/// envelope listing them in that order.
fn skinned_document(skeleton: &[&str]) -> Vec<u8> {
    let mut w = ChunkWriter::new();
    w.child(ChunkTag::Hedr, |w| {
        w.child(ChunkTag::Msh2, |w| {
            matl(w, &["skin_mat"])?;
            null_model(w, "bone_a", 5, ModelKind::Bone)?;
            null_model(w, "bone_b", 12, ModelKind::Bone)?;
            null_model(w, "bone_c", 7, ModelKind::Bone)?;
            w.child(ChunkTag::Modl, |w| {
                mtyp(w, ModelKind::Skin)?;
                mndx(w, 1)?;
                w.string_child(ChunkTag::Name, "body")?;
                w.string_child(ChunkTag::Prnt, "bone_a")?;
                w.child(ChunkTag::Geom, |w| {
                    w.child(ChunkTag::Segm, |w| {
                        w.child(ChunkTag::Mati, |w| w.write_u32(0))?;
                        posl(w, &[Vec3::ZERO, Vec3::X])?;
                        w.child(ChunkTag::Wght, |w| {
                            w.write_u32(2)?;
                            // Vertex 0: fully on envelope slot 1.
                            w.write_u32(1)?;
                            w.write_f32(1.0)?;
                            for _ in 0..3 {
                                w.write_u32(0)?;
                                w.write_f32(0.0)?;
                            }
                            // Vertex 1: split between slots 0 and 2.
                            w.write_u32(0)?;
                            w.write_f32(0.25)?;
                            w.write_u32(2)?;
                            w.write_f32(0.75)?;
                            for _ in 0..2 {
                                w.write_u32(0)?;
                                w.write_f32(0.0)?;
                            }
                            Ok(())
                        })
                    })?;
                    w.child(ChunkTag::Envl, |w| {
                        w.write_u32(3)?;
                        [5u32, 12, 7].iter().try_for_each(|&i| w.write_u32(i))
                    })
                })
            })
        })?;
        skl2(w, skeleton)?;
        w.child(ChunkTag::Cl1l, |_| Ok(()))
    })
    .unwrap();
    w.into_bytes()
}

#[test]
fn test_envelope_resolution() {
    let scene = decode(&skinned_document(&[])).unwrap();
    let body = scene.model("body").unwrap();
    let weights = body.segments()[0].weights.as_ref().unwrap();

    // Raw index 1 -> envelope entry 12 -> bone_b, the second model.
    assert_eq!(weights[0].as_slice(), &[VertexWeight::new(1.0, 1)]);
    assert_eq!(scene.models[1].name, "bone_b");
    assert_eq!(
        weights[1].as_slice(),
        &[VertexWeight::new(0.25, 0), VertexWeight::new(0.75, 2)]
    );
}

#[test]
fn test_weights_index_models_by_position() {
    let scene = decode(&skinned_document(&[])).unwrap();
    let mut bones: Vec<&str> = scene
        .weighted_bones()
        .into_iter()
        .map(|i| scene.models[i].name.as_str())
        .collect();
    bones.sort_unstable();
    assert_eq!(bones, vec!["bone_a", "bone_b", "bone_c"]);
}

#[test]
fn test_skin_removed_from_skeleton() {
    let scene = decode(&skinned_document(&["bone_a", "body", "bone_b"])).unwrap();
    assert_eq!(scene.skeleton, vec![msh::crc("bone_a"), msh::crc("bone_b")]);
}

#[test]
fn test_refined_skeleton_of_decoded_scene() {
    let scene = decode(&skinned_document(&["bone_a"])).unwrap();
    let bones = msh::refine_skeleton(&scene).unwrap();
    let names: Vec<&str> = bones.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["bone_a", "bone_b", "bone_c"]);
    assert!(bones.iter().all(|b| b.parent.is_none()));
}

#[test]
fn test_envelope_index_out_of_range() {
    let mut w = ChunkWriter::new();
    w.child(ChunkTag::Msh2, |w| {
        matl(w, &["m"])?;
        w.child(ChunkTag::Modl, |w| {
            mtyp(w, ModelKind::Skin)?;
            w.string_child(ChunkTag::Name, "body")?;
            w.child(ChunkTag::Geom, |w| {
                w.child(ChunkTag::Segm, |w| {
                    w.child(ChunkTag::Mati, |w| w.write_u32(0))?;
                    posl(w, &[Vec3::ZERO])?;
                    w.child(ChunkTag::Wght, |w| {
                        w.write_u32(1)?;
                        w.write_u32(3)?;
                        w.write_f32(1.0)?;
                        for _ in 0..3 {
                            w.write_u32(0)?;
                            w.write_f32(0.0)?;
                        }
                        Ok(())
                    })
                })?;
                w.child(ChunkTag::Envl, |w| {
                    w.write_u32(1)?;
                    w.write_u32(1)
                })
            })
        })
    })
    .unwrap();

    assert!(matches!(
        decode(&w.into_bytes()),
        Err(Error::UnsupportedIndex { kind: "envelope", index: 3, len: 1 })
    ));
}

#[test]
fn test_unknown_chunks_skipped() {
    let mut w = ChunkWriter::new();
    let junk = ChunkTag::from(FourCC(*b"ZZZZ"));
    w.child(ChunkTag::Hedr, |w| {
        w.child(junk, |w| w.write_bytes(&[0xAB; 13]))?;
        w.child(ChunkTag::Msh2, |w| {
            w.child(junk, |w| w.write_u32(7))?;
            null_model(w, "root", 1, ModelKind::Null)?;
            w.child(ChunkTag::Modl, |w| {
                w.string_child(ChunkTag::Name, "child")?;
                w.child(junk, |w| w.write_f32(1.0))?;
                w.string_child(ChunkTag::Prnt, "root")
            })
        })?;
        w.child(ChunkTag::Bln2, |w| w.write_u32(0))?;
        w.child(ChunkTag::Cl1l, |_| Ok(()))
    })
    .unwrap();

    let scene = decode(&w.into_bytes()).unwrap();
    assert_eq!(scene.models.len(), 2);
    assert_eq!(scene.models[1].parent.as_deref(), Some("root"));
}

#[test]
fn test_odd_chunk_size_padding() {
    // Hand-written bytes: a NAME chunk with an odd payload and a pad byte.
    let mut modl = Vec::new();
    modl.extend_from_slice(b"NAME");
    modl.extend_from_slice(&3u32.to_le_bytes());
    modl.extend_from_slice(b"ab\0\0");
    modl.extend_from_slice(b"MTYP");
    modl.extend_from_slice(&4u32.to_le_bytes());
    modl.extend_from_slice(&3u32.to_le_bytes());

    let mut msh2 = Vec::new();
    msh2.extend_from_slice(b"MODL");
    msh2.extend_from_slice(&(modl.len() as u32).to_le_bytes());
    msh2.extend_from_slice(&modl);

    let mut doc = Vec::new();
    doc.extend_from_slice(b"MSH2");
    doc.extend_from_slice(&(msh2.len() as u32).to_le_bytes());
    doc.extend_from_slice(&msh2);

    let scene = decode(&doc).unwrap();
    assert_eq!(scene.models[0].name, "ab");
    assert_eq!(scene.models[0].kind, ModelKind::Bone);
}

#[test]
fn test_truncated_documents() {
    let bytes = triangle_document();
    for len in [12, bytes.len() / 2, bytes.len() - 5] {
        assert!(
            matches!(decode(&bytes[..len]), Err(Error::Truncated { .. })),
            "prefix of {} bytes",
            len
        );
    }
}

#[test]
fn test_positions_required_for_topology() {
    let mut w = ChunkWriter::new();
    w.child(ChunkTag::Msh2, |w| {
        matl(w, &["m"])?;
        w.child(ChunkTag::Modl, |w| {
            w.child(ChunkTag::Geom, |w| {
                w.child(ChunkTag::Segm, |w| {
                    w.child(ChunkTag::Mati, |w| w.write_u32(0))?;
                    w.child(ChunkTag::Ndxt, |w| {
                        w.write_u32(1)?;
                        [0u16, 1, 2].iter().try_for_each(|&i| w.write_u16(i))
                    })
                })
            })
        })
    })
    .unwrap();

    assert!(matches!(
        decode(&w.into_bytes()),
        Err(Error::DegenerateGeometry(_))
    ));
}

#[test]
fn test_trailing_partial_header() {
    let mut w = ChunkWriter::new();
    w.child(ChunkTag::Msh2, |_| Ok(())).unwrap();
    let mut bytes = w.into_bytes();
    bytes.extend_from_slice(b"SKL2\x10\x00");

    assert!(matches!(decode(&bytes), Err(Error::Truncated { .. })));
}

#[test]
fn test_near_zero_weights_dropped() {
    let mut w = ChunkWriter::new();
    w.child(ChunkTag::Msh2, |w| {
        matl(w, &["skin_mat"])?;
        null_model(w, "bone_a", 5, ModelKind::Bone)?;
        null_model(w, "bone_b", 12, ModelKind::Bone)?;
        null_model(w, "bone_c", 7, ModelKind::Bone)?;
        w.child(ChunkTag::Modl, |w| {
            mtyp(w, ModelKind::Skin)?;
            mndx(w, 1)?;
            w.string_child(ChunkTag::Name, "body")?;
            w.child(ChunkTag::Geom, |w| {
                w.child(ChunkTag::Segm, |w| {
                    w.child(ChunkTag::Mati, |w| w.write_u32(0))?;
                    posl(w, &[Vec3::ZERO])?;
                    w.child(ChunkTag::Wght, |w| {
                        w.write_u32(1)?;
                        for (slot, weight) in [(0u32, 1e-6f32), (1, 2e-6), (2, 0.5), (0, 0.0)] {
                            w.write_u32(slot)?;
                            w.write_f32(weight)?;
                        }
                        Ok(())
                    })
                })?;
                w.child(ChunkTag::Envl, |w| {
                    w.write_u32(3)?;
                    [5u32, 12, 7].iter().try_for_each(|&i| w.write_u32(i))
                })
            })
        })
    })
    .unwrap();

    let scene = decode(&w.into_bytes()).unwrap();
    let weights = scene.model("body").unwrap().segments()[0].weights.as_ref().unwrap();
    assert_eq!(
        weights[0].as_slice(),
        &[VertexWeight::new(2e-6, 1), VertexWeight::new(0.5, 2)]
    );
}
