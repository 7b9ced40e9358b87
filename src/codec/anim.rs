//! `ANM2` animation chunks.

use crate::chunk::{ChunkReader, ChunkTag, ChunkWriter, CYCLE_NAME_SIZE};
use crate::scene::{Animation, BoneFrames, RotationFrame, TranslationFrame};
use crate::util::{Error, Result};

/// Key type written into `KFR3`.
const KEY_TYPE_LINEAR: u32 = 0;

pub(super) fn read_anm2(anm2: &mut ChunkReader<'_>) -> Result<Animation> {
    let mut anim = Animation::new(0, 0);
    let mut has_cycle = false;

    while anm2.has_more() {
        match anm2.peek_next_tag()? {
            ChunkTag::Cycl => {
                let mut cycl = anm2.enter_child()?;
                let count = cycl.read_u32()?;
                for i in 0..count {
                    let name = cycl.read_fixed_string(CYCLE_NAME_SIZE)?;
                    let framerate = cycl.read_f32()?;
                    let play_style = cycl.read_u32()?;
                    let first = cycl.read_i32()?;
                    let last = cycl.read_i32()?;
                    if i == 0 {
                        anim.name = name;
                        anim.framerate = framerate;
                        anim.play_style = play_style;
                        anim.start_index = first;
                        anim.end_index = last;
                        has_cycle = true;
                    } else {
                        tracing::debug!(%name, "ignoring extra animation cycle");
                    }
                }
            }
            ChunkTag::Kfr3 => {
                let mut kfr3 = anm2.enter_child()?;
                let bones = kfr3.read_u32()?;
                for _ in 0..bones {
                    let crc = kfr3.read_u32()?;
                    let _key_type = kfr3.read_u32()?;
                    let num_translations = kfr3.read_u32()?;
                    let num_rotations = kfr3.read_u32()?;

                    let mut frames = BoneFrames::default();
                    for _ in 0..num_translations {
                        frames.translations.push(TranslationFrame {
                            index: kfr3.read_u32()?,
                            translation: kfr3.read_vec3()?,
                        });
                    }
                    for _ in 0..num_rotations {
                        frames.rotations.push(RotationFrame {
                            index: kfr3.read_u32()?,
                            rotation: kfr3.read_quat()?,
                        });
                    }
                    anim.bone_frames.insert(crc, frames);
                }
            }
            tag => {
                tracing::trace!(%tag, "skipping animation chunk");
                anm2.skip_child()?;
            }
        }
    }

    if !has_cycle {
        if let Some((lo, hi)) = anim.key_range() {
            let frame = |index: u32| {
                i32::try_from(index).map_err(|_| Error::index("key frame", index, i32::MAX as usize))
            };
            anim.start_index = frame(lo)?;
            anim.end_index = frame(hi)?;
        }
    }
    tracing::debug!(
        name = %anim.name,
        bones = anim.bone_frames.len(),
        frames = anim.num_frames(),
        "read animation"
    );
    Ok(anim)
}

pub(super) fn write_anm2(w: &mut ChunkWriter, anim: &Animation) -> Result<()> {
    w.child(ChunkTag::Anm2, |w| {
        w.child(ChunkTag::Cycl, |w| {
            w.write_u32(1)?;
            w.write_fixed_string(&anim.name, CYCLE_NAME_SIZE)?;
            w.write_f32(anim.framerate)?;
            w.write_u32(anim.play_style)?;
            w.write_i32(anim.start_index)?;
            w.write_i32(anim.end_index)
        })?;

        w.child(ChunkTag::Kfr3, |w| {
            w.write_u32(anim.bone_frames.len() as u32)?;
            for (&crc, frames) in &anim.bone_frames {
                w.write_u32(crc)?;
                w.write_u32(KEY_TYPE_LINEAR)?;
                w.write_u32(frames.translations.len() as u32)?;
                w.write_u32(frames.rotations.len() as u32)?;
                for f in &frames.translations {
                    w.write_u32(f.index)?;
                    w.write_vec3(f.translation)?;
                }
                for f in &frames.rotations {
                    w.write_u32(f.index)?;
                    w.write_quat(f.rotation)?;
                }
            }
            Ok(())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    fn sample() -> Animation {
        let mut anim = Animation::new(0, 2);
        anim.name = "walk".to_string();
        anim.play_style = 1;
        let frames = BoneFrames {
            translations: (0..3)
                .map(|i| TranslationFrame { index: i, translation: Vec3::splat(i as f32) })
                .collect(),
            rotations: vec![RotationFrame { index: 1, rotation: Quat::from_rotation_x(0.5) }],
        };
        anim.bone_frames.insert(msh_crc::crc("bone_a"), frames);
        anim
    }

    #[test]
    fn test_anm2_roundtrip() {
        let anim = sample();
        let mut w = ChunkWriter::new();
        write_anm2(&mut w, &anim).unwrap();
        let bytes = w.into_bytes();

        let mut doc = ChunkReader::new(&bytes);
        let mut anm2 = doc.enter_child().unwrap();
        assert_eq!(anm2.tag(), Some(ChunkTag::Anm2));
        assert_eq!(read_anm2(&mut anm2).unwrap(), anim);
    }

    #[test]
    fn test_range_from_keys_without_cycle() {
        let anim = sample();
        let mut w = ChunkWriter::new();
        w.child(ChunkTag::Anm2, |w| {
            w.child(ChunkTag::Kfr3, |w| {
                w.write_u32(1)?;
                w.write_u32(msh_crc::crc("bone_a"))?;
                w.write_u32(KEY_TYPE_LINEAR)?;
                w.write_u32(1)?;
                w.write_u32(0)?;
                w.write_u32(4)?;
                w.write_vec3(Vec3::ZERO)
            })
        })
        .unwrap();
        let bytes = w.into_bytes();
        let mut doc = ChunkReader::new(&bytes);
        let read = read_anm2(&mut doc.enter_child().unwrap()).unwrap();
        assert_eq!((read.start_index, read.end_index), (4, 4));
        assert_ne!(read, anim);
    }

    #[test]
    fn test_extreme_cycle_bounds() {
        let mut w = ChunkWriter::new();
        w.child(ChunkTag::Anm2, |w| {
            w.child(ChunkTag::Cycl, |w| {
                w.write_u32(1)?;
                w.write_fixed_string("span", CYCLE_NAME_SIZE)?;
                w.write_f32(30.0)?;
                w.write_u32(0)?;
                w.write_i32(i32::MIN)?;
                w.write_i32(i32::MAX)
            })
        })
        .unwrap();
        let bytes = w.into_bytes();
        let mut doc = ChunkReader::new(&bytes);
        let read = read_anm2(&mut doc.enter_child().unwrap()).unwrap();
        assert_eq!((read.start_index, read.end_index), (i32::MIN, i32::MAX));
        assert_eq!(read.num_frames() as u64, 1u64 << 32);
    }

    #[test]
    fn test_key_index_beyond_i32() {
        let mut w = ChunkWriter::new();
        w.child(ChunkTag::Anm2, |w| {
            w.child(ChunkTag::Kfr3, |w| {
                w.write_u32(1)?;
                w.write_u32(msh_crc::crc("bone_a"))?;
                w.write_u32(KEY_TYPE_LINEAR)?;
                w.write_u32(1)?;
                w.write_u32(0)?;
                w.write_u32(u32::MAX)?;
                w.write_vec3(Vec3::ZERO)
            })
        })
        .unwrap();
        let bytes = w.into_bytes();
        let mut doc = ChunkReader::new(&bytes);
        assert!(matches!(
            read_anm2(&mut doc.enter_child().unwrap()),
            Err(Error::UnsupportedIndex { kind: "key frame", .. })
        ));
    }
}
