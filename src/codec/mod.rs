//! Scene encoding and decoding.
//!
//! [`decode`] turns a document into a [`Scene`]; [`encode`] writes one back.
//! Both run single-threaded and keep no state between calls, so independent
//! documents can be processed in parallel.

mod anim;
mod decode;
mod encode;

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::chunk::MAX_VERTEX_COUNT;
use crate::geom::TriangulatedMesh;
use crate::scene::{Model, Scene, DEFAULT_FRAMERATE};
use crate::util::{Error, Result};

pub use decode::decode;
pub use encode::{encode, encode_opts};

/// Options for reading files.
#[derive(Clone, Debug)]
pub struct ReadOptions {
    /// Memory-map the file instead of reading it into a buffer.
    /// Ignored without the `mmap` feature.
    pub use_mmap: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { use_mmap: true }
    }
}

/// Options for encoding.
#[derive(Clone, Debug)]
pub struct EncodeOptions {
    /// Write `STRP` triangle strips instead of `NDXT` triangle lists.
    pub triangle_strips: bool,
    /// Name written into `SINF`; the scene name when `None`.
    pub scene_name: Option<String>,
    /// Frame rate written into `SINF`/`FRAM` when the scene has no animation.
    pub frame_rate: f32,
    /// Largest vertex count accepted per segment.
    pub max_vertex_count: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            triangle_strips: true,
            scene_name: None,
            frame_rate: DEFAULT_FRAMERATE,
            max_vertex_count: MAX_VERTEX_COUNT,
        }
    }
}

/// Source of mesh data for models that carry no geometry yet.
///
/// The encoder asks for a mesh for every Static or Skin model whose
/// `geometry` is `None` and assembles segments from what it gets.
pub trait MeshProvider {
    fn mesh(&self, model: &Model) -> Result<Option<TriangulatedMesh>>;
}

/// Provider without any meshes.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoMeshes;

impl MeshProvider for NoMeshes {
    fn mesh(&self, _model: &Model) -> Result<Option<TriangulatedMesh>> {
        Ok(None)
    }
}

/// Meshes keyed by model name.
impl MeshProvider for HashMap<String, TriangulatedMesh> {
    fn mesh(&self, model: &Model) -> Result<Option<TriangulatedMesh>> {
        Ok(self.get(&model.name).cloned())
    }
}

/// Read and decode a file, memory-mapped.
pub fn read_file(path: impl AsRef<Path>) -> Result<Scene> {
    read_file_opts(path, &ReadOptions::default())
}

/// Read and decode a file.
pub fn read_file_opts(path: impl AsRef<Path>, opts: &ReadOptions) -> Result<Scene> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })?;
    let size = file.metadata()?.len();
    tracing::debug!(path = %path.display(), size, mmap = opts.use_mmap, "reading");

    #[cfg(feature = "mmap")]
    {
        if opts.use_mmap && size > 0 {
            // Safety: the map is read-only and dropped before returning.
            let mmap = unsafe { memmap2::Mmap::map(&file) }
                .map_err(|e| Error::MmapFailed(e.to_string()))?;
            return decode(&mmap);
        }
    }

    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

/// Encode a scene and write it to a file.
pub fn write_file(
    path: impl AsRef<Path>,
    scene: &Scene,
    meshes: &dyn MeshProvider,
    opts: &EncodeOptions,
) -> Result<()> {
    let bytes = encode_opts(scene, meshes, opts)?;
    std::fs::write(path.as_ref(), &bytes)?;
    tracing::debug!(path = %path.as_ref().display(), size = bytes.len(), "written");
    Ok(())
}
