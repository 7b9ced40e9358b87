//! Animation keyframes (`ANM2`).

use std::collections::BTreeMap;

use glam::{Quat, Vec3};

/// Default animation name written into `CYCL`.
pub const DEFAULT_ANIMATION_NAME: &str = "fullanimation";

/// Default frame rate written into `CYCL`.
pub const DEFAULT_FRAMERATE: f32 = 29.97;

/// Translation key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TranslationFrame {
    pub index: u32,
    pub translation: Vec3,
}

/// Rotation key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotationFrame {
    pub index: u32,
    pub rotation: Quat,
}

/// Keys of one bone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoneFrames {
    pub translations: Vec<TranslationFrame>,
    pub rotations: Vec<RotationFrame>,
}

impl BoneFrames {
    /// Smallest and largest frame index over both key lists.
    pub fn frame_range(&self) -> Option<(u32, u32)> {
        let indices = self
            .translations
            .iter()
            .map(|f| f.index)
            .chain(self.rotations.iter().map(|f| f.index));
        indices.fold(None, |range, i| match range {
            None => Some((i, i)),
            Some((lo, hi)) => Some((lo.min(i), hi.max(i))),
        })
    }
}

/// One animation cycle with keys per bone name hash.
#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    pub name: String,
    pub framerate: f32,
    pub play_style: u32,
    pub start_index: i32,
    pub end_index: i32,
    /// Keys keyed by [`crate::crc`] of the bone name.
    pub bone_frames: BTreeMap<u32, BoneFrames>,
}

impl Animation {
    /// Empty animation over an inclusive frame range.
    pub fn new(start_index: i32, end_index: i32) -> Self {
        Self {
            name: DEFAULT_ANIMATION_NAME.to_string(),
            framerate: DEFAULT_FRAMERATE,
            play_style: 0,
            start_index,
            end_index,
            bone_frames: BTreeMap::new(),
        }
    }

    /// Number of frames in the inclusive range.
    pub fn num_frames(&self) -> usize {
        let frames = i64::from(self.end_index) - i64::from(self.start_index) + 1;
        usize::try_from(frames).unwrap_or(0)
    }

    /// Keys of a bone by name.
    pub fn frames_for(&self, bone_name: &str) -> Option<&BoneFrames> {
        self.bone_frames.get(&msh_crc::crc(bone_name))
    }

    /// Frame range covered by the keys, if there are any.
    pub fn key_range(&self) -> Option<(u32, u32)> {
        self.bone_frames
            .values()
            .filter_map(BoneFrames::frame_range)
            .reduce(|(lo, hi), (l, h)| (lo.min(l), hi.max(h)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_ranges() {
        let mut anim = Animation::new(0, 9);
        assert_eq!(anim.num_frames(), 10);
        assert_eq!(anim.key_range(), None);

        let frames = BoneFrames {
            translations: vec![TranslationFrame { index: 2, translation: Vec3::ZERO }],
            rotations: vec![
                RotationFrame { index: 1, rotation: Quat::IDENTITY },
                RotationFrame { index: 7, rotation: Quat::IDENTITY },
            ],
        };
        anim.bone_frames.insert(msh_crc::crc("bone_root"), frames);
        assert_eq!(anim.key_range(), Some((1, 7)));
        assert!(anim.frames_for("BONE_ROOT").is_some());
    }

    #[test]
    fn test_empty_range() {
        assert_eq!(Animation::new(5, 4).num_frames(), 0);
        assert_eq!(Animation::new(i32::MAX, i32::MIN).num_frames(), 0);
    }

    #[test]
    fn test_full_i32_range() {
        let anim = Animation::new(i32::MIN, i32::MAX);
        assert_eq!(anim.num_frames() as u64, 1u64 << 32);
    }
}
