//! Chunk tree to [`Scene`].

use crate::chunk::{ChunkReader, ChunkTag, MIN_WEIGHT, TEXTURE_SLOT_TAGS, WEIGHTS_PER_VERTEX};
use crate::geom::{decode_strips, remap_weights, resolve_envelope, ModelIndexRemap};
use crate::scene::{
    CollisionPrimitive, CollisionShape, GeometrySegment, Material, Model, ModelKind,
    ModelTransform, Scene, VertexWeight, WeightSet,
};
use crate::util::{unpack_color, Error, Result};

use super::anim::read_anm2;

/// Decode a document.
///
/// The document is normally a single `HEDR` chunk; a bare sequence of its
/// children is accepted too. Unknown chunks are skipped at every level.
pub fn decode(bytes: &[u8]) -> Result<Scene> {
    let mut decoder = Decoder::default();
    let mut doc = ChunkReader::new(bytes);

    if doc.has_more() && doc.peek_next_tag()? == ChunkTag::Hedr {
        let mut hedr = doc.enter_child()?;
        decoder.read_document(&mut hedr)?;
    } else {
        decoder.read_document(&mut doc)?;
    }
    decoder.finish()
}

/// State of one decode call.
#[derive(Default)]
struct Decoder {
    scene: Scene,
    /// Material names in `MATL` order, for `MATI`.
    material_order: Vec<String>,
    remap: ModelIndexRemap,
}

impl Decoder {
    fn read_document(&mut self, r: &mut ChunkReader<'_>) -> Result<()> {
        while r.has_more() {
            match r.peek_next_tag()? {
                ChunkTag::Msh2 => self.read_msh2(&mut r.enter_child()?)?,
                ChunkTag::Skl2 => {
                    let mut skl2 = r.enter_child()?;
                    let count = skl2.read_u32()?;
                    for _ in 0..count {
                        let crc = skl2.read_u32()?;
                        skl2.skip(16)?;
                        self.scene.skeleton.push(crc);
                    }
                }
                ChunkTag::Anm2 => {
                    let anim = read_anm2(&mut r.enter_child()?)?;
                    self.scene.animation = Some(anim);
                }
                tag => {
                    tracing::trace!(%tag, "skipping document chunk");
                    r.skip_child()?;
                }
            }
        }
        Ok(())
    }

    fn read_msh2(&mut self, msh2: &mut ChunkReader<'_>) -> Result<()> {
        while msh2.has_more() {
            match msh2.peek_next_tag()? {
                ChunkTag::Sinf => {
                    let mut sinf = msh2.enter_child()?;
                    while sinf.has_more() {
                        let mut child = sinf.enter_child()?;
                        if child.tag() == Some(ChunkTag::Name) {
                            self.scene.name = child.read_string()?;
                        }
                    }
                }
                ChunkTag::Matl => self.read_matl(&mut msh2.enter_child()?)?,
                ChunkTag::Modl => {
                    let model = self.read_modl(&mut msh2.enter_child()?)?;
                    tracing::debug!(
                        name = %model.name,
                        kind = ?model.kind,
                        segments = model.segments().len(),
                        "read model"
                    );
                    self.scene.models.push(model);
                }
                tag => {
                    tracing::trace!(%tag, "skipping mesh chunk");
                    msh2.skip_child()?;
                }
            }
        }
        Ok(())
    }

    fn read_matl(&mut self, matl: &mut ChunkReader<'_>) -> Result<()> {
        let count = matl.read_u32()?;
        for _ in 0..count {
            let mut matd = matl.enter_child()?;
            if matd.tag() != Some(ChunkTag::Matd) {
                continue;
            }
            let material = read_matd(&mut matd)?;
            self.material_order.push(material.name.clone());
            self.scene.materials.insert(material.name.clone(), material);
        }
        Ok(())
    }

    fn read_modl(&mut self, modl: &mut ChunkReader<'_>) -> Result<Model> {
        let mut model = Model::default();

        while modl.has_more() {
            let tag = modl.peek_next_tag()?;
            let mut child = modl.enter_child()?;
            match tag {
                ChunkTag::Mtyp => model.kind = ModelKind::try_from(child.read_u32()?)?,
                ChunkTag::Mndx => {
                    let declared = child.read_u32()?;
                    self.remap.insert(declared, self.scene.models.len())?;
                }
                ChunkTag::Name => model.name = child.read_string()?,
                ChunkTag::Prnt => {
                    let parent = child.read_string()?;
                    model.parent = (!parent.is_empty()).then_some(parent);
                }
                ChunkTag::Flgs => model.hidden = child.read_u32()? != 0,
                ChunkTag::Tran => {
                    child.skip(12)?;
                    let rotation = child.read_quat()?;
                    let translation = child.read_vec3()?;
                    model.transform = ModelTransform::new(translation, rotation);
                }
                ChunkTag::Geom => model.geometry = Some(self.read_geom(&mut child)?),
                ChunkTag::Swci => {
                    let mut prim = CollisionPrimitive::new(CollisionShape::try_from(child.read_u32()?)?);
                    prim.radius = child.read_f32()?;
                    prim.height = child.read_f32()?;
                    prim.length = child.read_f32()?;
                    model.collision_primitive = Some(prim);
                }
                tag => tracing::trace!(%tag, "skipping model chunk"),
            }
        }
        Ok(model)
    }

    fn read_geom(&self, geom: &mut ChunkReader<'_>) -> Result<Vec<GeometrySegment>> {
        let mut segments = Vec::new();
        let mut envelope: Vec<u32> = Vec::new();

        while geom.has_more() {
            match geom.peek_next_tag()? {
                ChunkTag::Segm => segments.push(self.read_segm(&mut geom.enter_child()?)?),
                ChunkTag::Envl => {
                    let mut envl = geom.enter_child()?;
                    let count = envl.read_u32()? as usize;
                    envelope.extend(envl.read_u32_vec(count)?);
                }
                tag => {
                    tracing::trace!(%tag, "skipping geometry chunk");
                    geom.skip_child()?;
                }
            }
        }

        if !envelope.is_empty() {
            for weights in segments.iter_mut().filter_map(|s| s.weights.as_mut()) {
                resolve_envelope(weights, &envelope)?;
            }
        }
        Ok(segments)
    }

    fn read_segm(&self, segm: &mut ChunkReader<'_>) -> Result<GeometrySegment> {
        let mut seg = GeometrySegment::default();
        let mut positions_read = false;

        while segm.has_more() {
            let tag = segm.peek_next_tag()?;
            let mut c = segm.enter_child()?;
            match tag {
                ChunkTag::Mati => {
                    let index = c.read_u32()?;
                    seg.material_name = self
                        .material_order
                        .get(index as usize)
                        .cloned()
                        .ok_or_else(|| Error::index("material", index, self.material_order.len()))?;
                }
                ChunkTag::Posl => {
                    let count = c.read_u32()?;
                    seg.positions = (0..count).map(|_| c.read_vec3()).collect::<Result<_>>()?;
                    positions_read = true;
                }
                ChunkTag::Nrml => {
                    let declared = c.read_u32()? as usize;
                    let count = if positions_read { seg.positions.len() } else { declared };
                    seg.normals = (0..count).map(|_| c.read_vec3()).collect::<Result<_>>()?;
                }
                ChunkTag::Clrl => {
                    let count = c.read_u32()? as usize;
                    let packed = c.read_u32_vec(count)?;
                    seg.colors = Some(packed.into_iter().map(unpack_color).collect());
                }
                ChunkTag::Uv0l => {
                    let count = c.read_u32()?;
                    seg.texcoords = (0..count).map(|_| c.read_vec2()).collect::<Result<_>>()?;
                }
                ChunkTag::Ndxl => {
                    let count = c.read_u32()?;
                    for _ in 0..count {
                        let len = c.read_u16()? as usize;
                        let polygon = c.read_u16_vec(len)?;
                        seg.polygons.push(polygon.into_iter().map(u32::from).collect());
                    }
                }
                ChunkTag::Ndxt => {
                    let count = c.read_u32()? as usize;
                    let flat = c.read_u16_vec(count.saturating_mul(3))?;
                    seg.triangles = flat
                        .chunks_exact(3)
                        .map(|t| [u32::from(t[0]), u32::from(t[1]), u32::from(t[2])])
                        .collect();
                }
                ChunkTag::Strp => {
                    let count = c.read_u32()? as usize;
                    seg.triangle_strips = decode_strips(&c.read_u16_vec(count)?)?;
                }
                ChunkTag::Wght => {
                    let count = c.read_u32()?;
                    let mut weights = Vec::new();
                    for _ in 0..count {
                        let mut set = WeightSet::new();
                        for _ in 0..WEIGHTS_PER_VERTEX {
                            let bone = c.read_u32()?;
                            let weight = c.read_f32()?;
                            if weight > MIN_WEIGHT {
                                set.push(VertexWeight::new(weight, bone));
                            }
                        }
                        weights.push(set);
                    }
                    seg.weights = Some(weights);
                }
                tag => tracing::trace!(%tag, "skipping segment chunk"),
            }
        }

        seg.validate()?;
        tracing::debug!(
            material = %seg.material_name,
            vertices = seg.positions.len(),
            triangles = seg.triangles.len(),
            strips = seg.triangle_strips.len(),
            "read segment"
        );
        Ok(seg)
    }

    /// Resolve weights to model positions, repair the skeleton and check
    /// the parent graph.
    fn finish(mut self) -> Result<Scene> {
        for model in &mut self.scene.models {
            let Some(segments) = model.geometry.as_mut() else {
                continue;
            };
            for weights in segments.iter_mut().filter_map(|s| s.weights.as_mut()) {
                remap_weights(weights, &self.remap)?;
            }
        }

        self.scene.remove_skinned_from_skeleton();
        self.scene.graph()?;
        Ok(self.scene)
    }
}

fn read_matd(matd: &mut ChunkReader<'_>) -> Result<Material> {
    let mut mat = Material::default();
    while matd.has_more() {
        let tag = matd.peek_next_tag()?;
        let mut c = matd.enter_child()?;
        match tag {
            ChunkTag::Name => mat.name = c.read_string()?,
            ChunkTag::Data => {
                mat.diffuse_color = c.read_f32_array::<4>()?;
                mat.specular_color = c.read_f32_array::<4>()?;
                mat.ambient_color = c.read_f32_array::<4>()?;
                mat.specular_exponent = c.read_f32()?;
            }
            ChunkTag::Atrb => {
                mat.flags = c.read_u8()?;
                mat.rendertype = c.read_u8()?;
                mat.data = [c.read_u8()?, c.read_u8()?];
            }
            tag => match TEXTURE_SLOT_TAGS.iter().position(|&t| t == tag) {
                Some(slot) => mat.textures[slot] = Some(c.read_string()?),
                None => tracing::trace!(%tag, "skipping material chunk"),
            },
        }
    }
    Ok(mat)
}
