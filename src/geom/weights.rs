//! Bone weight index spaces.
//!
//! On the wire a `WGHT` entry indexes the segment's `ENVL` table, whose
//! entries are declared model indices (`MNDX`). Decoding resolves both steps
//! so weights end up indexing [`crate::Scene::models`]; encoding builds the
//! envelope back from the bones a model actually uses.

use std::collections::HashMap;

use crate::chunk::WEIGHTS_PER_VERTEX;
use crate::scene::WeightSet;
use crate::util::{Error, Result};

/// Declared model index (`MNDX`) to position in the decoded model list.
///
/// Owned by a single decode call.
#[derive(Clone, Debug, Default)]
pub struct ModelIndexRemap {
    map: HashMap<u32, usize>,
}

impl ModelIndexRemap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that declared index `declared` was appended at `position`.
    pub fn insert(&mut self, declared: u32, position: usize) -> Result<()> {
        if self.map.insert(declared, position).is_some() {
            return Err(Error::DuplicateModelIndex(declared));
        }
        Ok(())
    }

    /// Position of a declared index.
    pub fn resolve(&self, declared: u32) -> Result<usize> {
        self.map
            .get(&declared)
            .copied()
            .ok_or_else(|| Error::index("model", declared, self.map.len()))
    }

    /// Number of recorded indices.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Replace each raw `WGHT` index with its `ENVL` entry.
pub fn resolve_envelope(weights: &mut [WeightSet], envelope: &[u32]) -> Result<()> {
    for w in weights.iter_mut().flatten() {
        w.bone = *envelope
            .get(w.bone as usize)
            .ok_or_else(|| Error::index("envelope", w.bone, envelope.len()))?;
    }
    Ok(())
}

/// Replace each declared model index with its position in the model list.
pub fn remap_weights(weights: &mut [WeightSet], remap: &ModelIndexRemap) -> Result<()> {
    for w in weights.iter_mut().flatten() {
        w.bone = u32::try_from(remap.resolve(w.bone)?)
            .map_err(|_| Error::index("model", w.bone, remap.len()))?;
    }
    Ok(())
}

/// Keep the strongest [`WEIGHTS_PER_VERTEX`] influences, renormalised.
///
/// Returns the (possibly unchanged) set and whether anything was dropped.
pub fn limit_influences(set: &WeightSet) -> (WeightSet, bool) {
    if set.len() <= WEIGHTS_PER_VERTEX {
        return (set.clone(), false);
    }
    let mut sorted: WeightSet = set.clone();
    sorted.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    sorted.truncate(WEIGHTS_PER_VERTEX);
    let total: f32 = sorted.iter().map(|w| w.weight).sum();
    if total > 0.0 {
        for w in &mut sorted {
            w.weight /= total;
        }
    }
    (sorted, true)
}

/// Distinct bones of a model's weights, ascending.
pub fn build_envelope<'a>(sets: impl IntoIterator<Item = &'a WeightSet>) -> Vec<u32> {
    let mut envelope: Vec<u32> = sets.into_iter().flatten().map(|w| w.bone).collect();
    envelope.sort_unstable();
    envelope.dedup();
    envelope
}

/// Weights rewritten as `(envelope slot, weight)` pairs.
///
/// Each vertex gets exactly [`WEIGHTS_PER_VERTEX`] pairs, zero-padded. Sets
/// with more influences keep the strongest ones, with a warning.
pub fn envelope_slots(
    weights: &[WeightSet],
    envelope: &[u32],
) -> Result<Vec<[(u32, f32); WEIGHTS_PER_VERTEX]>> {
    let mut truncated = 0usize;
    let mut out = Vec::with_capacity(weights.len());
    for set in weights {
        let (set, dropped) = limit_influences(set);
        truncated += usize::from(dropped);
        let mut slots = [(0u32, 0f32); WEIGHTS_PER_VERTEX];
        for (slot, w) in slots.iter_mut().zip(set.iter()) {
            let local = envelope
                .binary_search(&w.bone)
                .map_err(|_| Error::index("envelope bone", w.bone, envelope.len()))?;
            *slot = (local as u32, w.weight);
        }
        out.push(slots);
    }

    if truncated > 0 {
        tracing::warn!(
            vertices = truncated,
            "more than {} bone influences per vertex, kept the strongest",
            WEIGHTS_PER_VERTEX
        );
    }
    Ok(out)
}
