//! Triangle strips.
//!
//! `STRP` stores all strips of a segment as one u16 stream. The top bit
//! ([`STRIP_FLAG`]) marks restarts: a well-formed stream flags the first two
//! indices of every strip. Some exporters flag only the index where a new
//! strip begins; the decoder reads such a single flag as a restart that
//! continues from the vertex before it.

use std::collections::HashMap;

use crate::chunk::{MAX_VERTEX_COUNT, STRIP_FLAG, STRIP_INDEX_MASK};
use crate::util::{Error, Result};

/// Split a flagged `STRP` stream into strips.
///
/// Strips shorter than three indices are dropped. A stream that ends on an
/// unpaired flag cannot be split and is rejected.
pub fn decode_strips(raw: &[u16]) -> Result<Vec<Vec<u32>>> {
    if raw.len() < 2 {
        return Ok(Vec::new());
    }

    let flagged = |i: usize| raw[i] & STRIP_FLAG != 0;
    let index = |i: usize| u32::from(raw[i] & STRIP_INDEX_MASK);

    let mut strips = Vec::new();
    let mut current = vec![index(0), index(1)];
    let mut latch = false;

    for i in 2..raw.len() {
        if flagged(i) {
            if flagged(i - 1) {
                // Flag pair: the previous index opened the next strip.
                current.pop();
                strips.push(std::mem::replace(&mut current, vec![index(i - 1), index(i)]));
                latch = false;
            } else {
                current.push(index(i));
                latch = true;
            }
        } else if latch {
            // Single flag: restart from the vertex before it.
            current.pop();
            let next = vec![index(i - 2), index(i - 1), index(i)];
            strips.push(std::mem::replace(&mut current, next));
            latch = false;
        } else {
            current.push(index(i));
        }
    }

    if latch {
        return Err(Error::degenerate(format!(
            "strip stream of {} indices ends on an unpaired restart flag",
            raw.len()
        )));
    }
    strips.push(current);
    strips.retain(|s| s.len() >= 3);
    Ok(strips)
}

/// Flatten strips into a `STRP` stream, flagging the first two indices of each.
pub fn encode_strips(strips: &[Vec<u32>]) -> Result<Vec<u16>> {
    let mut out = Vec::with_capacity(strips.iter().map(Vec::len).sum());
    for strip in strips {
        if strip.len() < 3 {
            return Err(Error::degenerate(format!("strip of {} indices", strip.len())));
        }
        for (i, &index) in strip.iter().enumerate() {
            if index as usize >= MAX_VERTEX_COUNT {
                return Err(Error::index("strip vertex", index, MAX_VERTEX_COUNT));
            }
            let value = index as u16;
            out.push(if i < 2 { value | STRIP_FLAG } else { value });
        }
    }
    Ok(out)
}

/// Unroll one strip into triangles.
///
/// Odd triangles swap their first two vertices to keep the winding. Triangles
/// repeating a vertex are dropped.
pub fn strip_triangles(strip: &[u32]) -> Vec<[u32; 3]> {
    strip
        .windows(3)
        .enumerate()
        .map(|(i, w)| {
            if i % 2 == 0 {
                [w[0], w[1], w[2]]
            } else {
                [w[1], w[0], w[2]]
            }
        })
        .filter(|t| !is_degenerate(t))
        .collect()
}

/// All triangles of a strip list.
pub fn strips_to_triangles(strips: &[Vec<u32>]) -> Vec<[u32; 3]> {
    strips.iter().flat_map(|s| strip_triangles(s)).collect()
}

#[inline]
fn is_degenerate(t: &[u32; 3]) -> bool {
    t[0] == t[1] || t[1] == t[2] || t[0] == t[2]
}

/// Greedily chain triangles into strips.
///
/// Each strip grows while an unused triangle shares its trailing edge with the
/// winding the next strip position requires. Degenerate input triangles are
/// skipped. Unrolling the result with [`strip_triangles`] yields every input
/// triangle once, possibly rotated.
pub fn stripify(triangles: &[[u32; 3]]) -> Vec<Vec<u32>> {
    // Directed edge (a -> b) in cyclic order -> (triangle, opposite vertex).
    let mut edges: HashMap<(u32, u32), Vec<(usize, u32)>> = HashMap::new();
    for (t, tri) in triangles.iter().enumerate() {
        if is_degenerate(tri) {
            continue;
        }
        for k in 0..3 {
            edges
                .entry((tri[k], tri[(k + 1) % 3]))
                .or_default()
                .push((t, tri[(k + 2) % 3]));
        }
    }

    let mut used: Vec<bool> = triangles.iter().map(is_degenerate).collect();
    let find = |used: &[bool], a: u32, b: u32| -> Option<(usize, u32)> {
        edges
            .get(&(a, b))
            .and_then(|list| list.iter().copied().find(|&(t, _)| !used[t]))
    };

    let mut strips = Vec::new();
    for start in 0..triangles.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let tri = triangles[start];

        // Prefer the rotation whose trailing edge continues the strip.
        let rotations = [
            [tri[0], tri[1], tri[2]],
            [tri[1], tri[2], tri[0]],
            [tri[2], tri[0], tri[1]],
        ];
        let first = rotations
            .iter()
            .copied()
            .find(|r| find(&used, r[2], r[1]).is_some())
            .unwrap_or(rotations[0]);

        let mut strip = first.to_vec();
        loop {
            let n = strip.len();
            // Triangle number n - 2 is odd when n is odd.
            let edge = if n % 2 == 0 {
                (strip[n - 2], strip[n - 1])
            } else {
                (strip[n - 1], strip[n - 2])
            };
            match find(&used, edge.0, edge.1) {
                Some((t, opposite)) => {
                    used[t] = true;
                    strip.push(opposite);
                }
                None => break,
            }
        }
        strips.push(strip);
    }
    strips
}

#[cfg(test)]
mod tests {
    use super::*;

    const F: u16 = STRIP_FLAG;

    /// Rotate a triangle so its smallest index comes first.
    fn canonical(t: [u32; 3]) -> [u32; 3] {
        let k = (0..3).min_by_key(|&k| t[k]).unwrap_or(0);
        [t[k], t[(k + 1) % 3], t[(k + 2) % 3]]
    }

    fn sorted(tris: impl IntoIterator<Item = [u32; 3]>) -> Vec<[u32; 3]> {
        let mut v: Vec<_> = tris.into_iter().map(canonical).collect();
        v.sort();
        v
    }

    #[test]
    fn test_single_flag_restart() {
        let strips = decode_strips(&[0, 1, 2, 0x8003, 4]).unwrap();
        assert_eq!(strips, vec![vec![0, 1, 2], vec![2, 3, 4]]);
    }

    #[test]
    fn test_flag_pairs() {
        let raw = [F, F | 1, 2, 3, F | 4, F | 5, 6];
        let strips = decode_strips(&raw).unwrap();
        assert_eq!(strips, vec![vec![0, 1, 2, 3], vec![4, 5, 6]]);
    }

    #[test]
    fn test_short_and_empty() {
        assert!(decode_strips(&[]).unwrap().is_empty());
        assert!(decode_strips(&[F, F | 1]).unwrap().is_empty());
        // Leading pair followed by another pair: first strip too short.
        let strips = decode_strips(&[F, F | 1, F | 2, F | 3, 4]).unwrap();
        assert_eq!(strips, vec![vec![2, 3, 4]]);
    }

    #[test]
    fn test_unpaired_trailing_flag() {
        assert!(matches!(
            decode_strips(&[F, F | 1, 2, F | 3]),
            Err(Error::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_encode_flags_first_two() {
        let raw = encode_strips(&[vec![0, 1, 2], vec![3, 4, 5, 6]]).unwrap();
        assert_eq!(raw, vec![F, F | 1, 2, F | 3, F | 4, 5, 6]);
        assert_eq!(
            decode_strips(&raw).unwrap(),
            vec![vec![0, 1, 2], vec![3, 4, 5, 6]]
        );
        assert!(encode_strips(&[vec![0, 1]]).is_err());
        assert!(encode_strips(&[vec![0, 1, 40000]]).is_err());
    }

    #[test]
    fn test_strip_winding() {
        assert_eq!(
            strip_triangles(&[0, 1, 2, 3, 4]),
            vec![[0, 1, 2], [2, 1, 3], [2, 3, 4]]
        );
        // Swap-padding triangles are dropped.
        assert_eq!(strip_triangles(&[0, 1, 2, 2, 3]), vec![[0, 1, 2]]);
    }

    #[test]
    fn test_stripify_quad_grid() {
        // 3x2 grid of quads, two triangles each, consistent winding.
        let mut tris = Vec::new();
        for y in 0..2u32 {
            for x in 0..3u32 {
                let a = y * 4 + x;
                let (b, c, d) = (a + 1, a + 5, a + 4);
                tris.push([a, b, c]);
                tris.push([a, c, d]);
            }
        }
        let strips = stripify(&tris);
        assert!(strips.len() < tris.len());
        assert_eq!(sorted(strips_to_triangles(&strips)), sorted(tris));
    }

    #[test]
    fn test_stripify_skips_degenerate() {
        let strips = stripify(&[[0, 1, 2], [3, 3, 4]]);
        assert_eq!(strips_to_triangles(&strips), vec![[0, 1, 2]]);
    }

    #[test]
    fn test_strip_list_equivalence() {
        let tris = vec![[0, 1, 2], [2, 1, 3], [2, 3, 4], [5, 6, 7]];
        let raw = encode_strips(&stripify(&tris)).unwrap();
        let decoded = decode_strips(&raw).unwrap();
        assert_eq!(sorted(strips_to_triangles(&decoded)), sorted(tris));
    }
}
