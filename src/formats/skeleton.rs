//! Types for working with bone hierarchies and skeletal animations in .skeleton files.
//!
//! Bones are stored before the links to their parents,
//! so every parent link can be resolved by handle when it is read.
//! Imported skeletons have their binding pose set from the stored bone transforms.
use std::collections::BTreeMap;
use std::io::{Seek, Write};

use glam::{Mat4, Quat, Vec3};
use tracing::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::chunk::{expect_file_header, write_file_header, ChunkHeader, ChunkReader};
use crate::cursor::Cursor;
use crate::export::ChunkWriter;
use crate::{Error, Result};

/// The only supported skeleton serializer version.
pub const SKELETON_VERSION: &str = "[Serializer_v1.10]";

/// Chunk tags for skeleton files.
pub mod chunk_ids {
    pub const BONE: u16 = 0x2000;
    pub const BONE_PARENT: u16 = 0x3000;
    pub const ANIMATION: u16 = 0x4000;
    pub const ANIMATION_TRACK: u16 = 0x4100;
    pub const ANIMATION_TRACK_KEYFRAME: u16 = 0x4110;
    pub const ATTACHMENT_POINT: u16 = 0x6000;
}

use chunk_ids::*;

/// The rest transforms of a bone captured by [Skeleton::set_binding_pose].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindingPose {
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
    /// Transforms from model space to the bone's space in the binding pose.
    pub inverse_derived_transform: Mat4,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub handle: u16,
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
    /// The handle of the parent bone or [None] for root bones.
    pub parent: Option<u16>,
    pub binding_pose: Option<BindingPose>,
}

impl Bone {
    pub fn new(name: impl Into<String>, handle: u16) -> Self {
        Self {
            name: name.into(),
            handle,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            scale: Vec3::ONE,
            parent: None,
            binding_pose: None,
        }
    }

    /// The transform relative to the parent bone.
    pub fn local_transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation, self.position)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TransformKeyFrame {
    pub time: f32,
    pub rotation: Quat,
    pub translation: Vec3,
    pub scale: Vec3,
}

/// Keyframes for a single bone.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTrack {
    pub bone_handle: u16,
    pub keyframes: Vec<TransformKeyFrame>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub name: String,
    pub length: f32,
    pub tracks: Vec<NodeTrack>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentPoint {
    pub name: String,
    pub parent_handle: u16,
    pub position: Vec3,
    pub orientation: Quat,
}

/// The data associated with a .skeleton file.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Skeleton {
    pub bones: Vec<Bone>,
    pub animations: Vec<Animation>,
    pub attachment_points: Vec<AttachmentPoint>,
}

impl Skeleton {
    pub fn bone(&self, handle: u16) -> Option<&Bone> {
        self.bones.iter().find(|b| b.handle == handle)
    }

    pub fn bone_mut(&mut self, handle: u16) -> Option<&mut Bone> {
        self.bones.iter_mut().find(|b| b.handle == handle)
    }

    pub fn bone_by_name(&self, name: &str) -> Option<&Bone> {
        self.bones.iter().find(|b| b.name == name)
    }

    pub fn root_bones(&self) -> impl Iterator<Item = &Bone> {
        self.bones.iter().filter(|b| b.parent.is_none())
    }

    pub fn animation(&self, name: &str) -> Option<&Animation> {
        self.animations.iter().find(|a| a.name == name)
    }

    /// Computes the model space transform of the bone with `handle` by accumulating parent transforms.
    /// Returns [None] if a bone in the chain is missing or the chain contains a cycle.
    pub fn derived_transform(&self, handle: u16) -> Option<Mat4> {
        derived_transform(&self.bones, &handle_indices(&self.bones), handle)
    }

    /// Stores the current transform of every bone as its binding pose.
    pub fn set_binding_pose(&mut self) -> Result<()> {
        let indices = handle_indices(&self.bones);
        let inverse_transforms = self
            .bones
            .iter()
            .map(|b| {
                derived_transform(&self.bones, &indices, b.handle)
                    .map(|t| t.inverse())
                    .ok_or_else(|| {
                        Error::ConstraintViolation(format!(
                            "Bone {:?} has an invalid parent chain.",
                            b.name
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        for (bone, inverse_derived_transform) in self.bones.iter_mut().zip(inverse_transforms) {
            bone.binding_pose = Some(BindingPose {
                position: bone.position,
                orientation: bone.orientation,
                scale: bone.scale,
                inverse_derived_transform,
            });
        }
        Ok(())
    }

    /// Links the bone with `handle` to `parent_handle` after checking that both exist
    /// and that the link does not create a cycle.
    pub fn set_parent(&mut self, handle: u16, parent_handle: u16) -> Result<()> {
        let indices = handle_indices(&self.bones);
        link_parent(&mut self.bones, &indices, handle, parent_handle)
    }
}

/// Maps each handle to the index of the first bone using it.
fn handle_indices(bones: &[Bone]) -> BTreeMap<u16, usize> {
    bones
        .iter()
        .enumerate()
        .rev()
        .map(|(i, b)| (b.handle, i))
        .collect()
}

fn derived_transform(
    bones: &[Bone],
    indices: &BTreeMap<u16, usize>,
    handle: u16,
) -> Option<Mat4> {
    let mut bone = &bones[*indices.get(&handle)?];
    let mut transform = bone.local_transform();

    for _ in 0..bones.len() {
        match bone.parent {
            Some(parent) => {
                bone = &bones[*indices.get(&parent)?];
                transform = bone.local_transform() * transform;
            }
            None => return Some(transform),
        }
    }
    None
}

fn link_parent(
    bones: &mut [Bone],
    indices: &BTreeMap<u16, usize>,
    handle: u16,
    parent_handle: u16,
) -> Result<()> {
    if !indices.contains_key(&parent_handle) {
        return Err(Error::ConstraintViolation(format!(
            "Parent bone {} does not exist.",
            parent_handle
        )));
    }

    // Existing chains are at most one link per bone unless they already contain a cycle.
    let mut ancestor = Some(parent_handle);
    for _ in 0..=bones.len() {
        match ancestor {
            Some(current) if current == handle => {
                return Err(Error::ConstraintViolation(format!(
                    "Linking bone {} to parent {} creates a cycle.",
                    handle, parent_handle
                )))
            }
            Some(current) => ancestor = indices.get(&current).and_then(|&i| bones[i].parent),
            None => break,
        }
    }
    if ancestor.is_some() {
        return Err(Error::ConstraintViolation(format!(
            "The parent chain of bone {} contains a cycle.",
            parent_handle
        )));
    }

    let index = *indices.get(&handle).ok_or_else(|| {
        Error::ConstraintViolation(format!("Bone {} does not exist.", handle))
    })?;
    bones[index].parent = Some(parent_handle);
    Ok(())
}

pub(crate) fn read_skeleton(data: &[u8]) -> Result<Skeleton> {
    let mut reader = ChunkReader::new(data);
    expect_file_header(&mut reader, SKELETON_VERSION)?;

    let mut skeleton = Skeleton::default();
    let mut indices = BTreeMap::new();
    reader.read_child_chunks(
        data.len(),
        &[BONE, BONE_PARENT, ANIMATION, ATTACHMENT_POINT],
        |r, header| {
            trace!("Reading skeleton chunk {:#06X}", header.tag);
            match header.tag {
                BONE => {
                    let bone = read_bone(r, &header)?;
                    if indices.contains_key(&bone.handle) {
                        return Err(Error::ConstraintViolation(format!(
                            "Bone handle {} is used more than once.",
                            bone.handle
                        )));
                    }
                    indices.insert(bone.handle, skeleton.bones.len());
                    skeleton.bones.push(bone);
                }
                BONE_PARENT => {
                    let handle = r.cursor().read_u16()?;
                    let parent_handle = r.cursor().read_u16()?;
                    link_parent(&mut skeleton.bones, &indices, handle, parent_handle)?;
                }
                ANIMATION => {
                    let animation = read_animation(r, &header, &indices)?;
                    skeleton.animations.push(animation);
                }
                ATTACHMENT_POINT => {
                    let attachment_point = read_attachment_point(r.cursor())?;
                    if !indices.contains_key(&attachment_point.parent_handle) {
                        return Err(Error::ConstraintViolation(format!(
                            "Attachment point {:?} refers to missing bone {}.",
                            attachment_point.name, attachment_point.parent_handle
                        )));
                    }
                    skeleton.attachment_points.push(attachment_point);
                }
                _ => (),
            }
            Ok(())
        },
    )?;

    skeleton.set_binding_pose()?;
    Ok(skeleton)
}

/// Reads an optional trailing scale, which is only present if the chunk is long enough.
fn read_optional_scale(r: &mut ChunkReader, header: &ChunkHeader) -> Result<Vec3> {
    if r.remaining_in(header) >= 12 {
        r.cursor().read_vec3()
    } else {
        Ok(Vec3::ONE)
    }
}

fn read_bone(r: &mut ChunkReader, header: &ChunkHeader) -> Result<Bone> {
    let c = r.cursor();
    let name = c.read_line()?;
    let handle = c.read_u16()?;
    let position = c.read_vec3()?;
    let orientation = c.read_quat()?;
    let scale = read_optional_scale(r, header)?;

    Ok(Bone {
        name,
        handle,
        position,
        orientation,
        scale,
        parent: None,
        binding_pose: None,
    })
}

fn read_animation(
    r: &mut ChunkReader,
    header: &ChunkHeader,
    bone_indices: &BTreeMap<u16, usize>,
) -> Result<Animation> {
    let name = r.cursor().read_line()?;
    let length = r.cursor().read_f32()?;

    let mut tracks = Vec::new();
    r.read_child_chunks(header.end(), &[ANIMATION_TRACK], |r, track| {
        let bone_handle = r.cursor().read_u16()?;
        if !bone_indices.contains_key(&bone_handle) {
            return Err(Error::ConstraintViolation(format!(
                "Animation {:?} has a track for missing bone {}.",
                name, bone_handle
            )));
        }

        let mut keyframes = Vec::new();
        r.read_child_chunks(track.end(), &[ANIMATION_TRACK_KEYFRAME], |r, keyframe| {
            let time = r.cursor().read_f32()?;
            let rotation = r.cursor().read_quat()?;
            let translation = r.cursor().read_vec3()?;
            let scale = read_optional_scale(r, &keyframe)?;
            keyframes.push(TransformKeyFrame {
                time,
                rotation,
                translation,
                scale,
            });
            Ok(())
        })?;

        tracks.push(NodeTrack {
            bone_handle,
            keyframes,
        });
        Ok(())
    })?;

    Ok(Animation {
        name,
        length,
        tracks,
    })
}

fn read_attachment_point(c: &mut Cursor) -> Result<AttachmentPoint> {
    Ok(AttachmentPoint {
        name: c.read_line()?,
        parent_handle: c.read_u16()?,
        position: c.read_vec3()?,
        orientation: c.read_quat()?,
    })
}

pub(crate) fn write_skeleton<W: Write + Seek>(skeleton: &Skeleton, writer: &mut W) -> Result<()> {
    let mut w = ChunkWriter::new(writer);
    write_file_header(&mut w, SKELETON_VERSION)?;

    for bone in &skeleton.bones {
        w.chunk(BONE, |w| {
            w.write_line(&bone.name)?;
            w.write_u16(bone.handle)?;
            w.write_vec3(bone.position)?;
            w.write_quat(bone.orientation)?;
            if bone.scale != Vec3::ONE {
                w.write_vec3(bone.scale)?;
            }
            Ok(())
        })?;
    }

    for bone in &skeleton.bones {
        if let Some(parent) = bone.parent {
            w.chunk(BONE_PARENT, |w| {
                w.write_u16(bone.handle)?;
                w.write_u16(parent)
            })?;
        }
    }

    for animation in &skeleton.animations {
        w.chunk(ANIMATION, |w| {
            w.write_line(&animation.name)?;
            w.write_f32(animation.length)?;
            for track in &animation.tracks {
                w.chunk(ANIMATION_TRACK, |w| {
                    w.write_u16(track.bone_handle)?;
                    for keyframe in &track.keyframes {
                        w.chunk(ANIMATION_TRACK_KEYFRAME, |w| {
                            w.write_f32(keyframe.time)?;
                            w.write_quat(keyframe.rotation)?;
                            w.write_vec3(keyframe.translation)?;
                            if keyframe.scale != Vec3::ONE {
                                w.write_vec3(keyframe.scale)?;
                            }
                            Ok(())
                        })?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })?;
    }

    for attachment_point in &skeleton.attachment_points {
        w.chunk(ATTACHMENT_POINT, |w| {
            w.write_line(&attachment_point.name)?;
            w.write_u16(attachment_point.parent_handle)?;
            w.write_vec3(attachment_point.position)?;
            w.write_quat(attachment_point.orientation)
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_hex_eq;
    use approx::assert_relative_eq;
    use hexlit::hex;
    use std::io::Cursor as IoCursor;

    fn two_bones() -> Skeleton {
        let mut root = Bone::new("root", 0);
        root.position = Vec3::new(0.0, 1.0, 0.0);
        let mut child = Bone::new("child", 1);
        child.position = Vec3::new(0.0, 2.0, 0.0);
        child.parent = Some(0);

        Skeleton {
            bones: vec![root, child],
            ..Default::default()
        }
    }

    #[test]
    fn read_bone_without_scale() {
        let data = hex!(
            "0010 5B53657269616C697A65725F76312E31305D 0A
             0020 26000000 61 0A 0500
                 0000803F 00000000 00000000
                 00000000 00000000 00000000 0000803F"
        );
        let skeleton = read_skeleton(&data).unwrap();
        let bone = &skeleton.bones[0];
        assert_eq!("a", bone.name);
        assert_eq!(5, bone.handle);
        assert_eq!(Vec3::new(1.0, 0.0, 0.0), bone.position);
        assert_eq!(Quat::IDENTITY, bone.orientation);
        assert_eq!(Vec3::ONE, bone.scale);
        assert!(bone.binding_pose.is_some());
    }

    #[test]
    fn read_bone_with_scale() {
        let data = hex!(
            "0010 5B53657269616C697A65725F76312E31305D 0A
             0020 32000000 61 0A 0500
                 00000000 00000000 00000000
                 00000000 00000000 00000000 0000803F
                 00000040 00000040 00000040"
        );
        let skeleton = read_skeleton(&data).unwrap();
        assert_eq!(Vec3::splat(2.0), skeleton.bones[0].scale);
    }

    #[test]
    fn read_parent_before_bone() {
        let data = hex!(
            "0010 5B53657269616C697A65725F76312E31305D 0A
             0030 0A000000 0100 0000"
        );
        assert!(matches!(
            read_skeleton(&data),
            Err(Error::ConstraintViolation(_))
        ));
    }

    #[test]
    fn read_wrong_version() {
        let data = hex!("0010 5B53657269616C697A65725F76312E30305D 0A");
        assert!(matches!(
            read_skeleton(&data),
            Err(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn write_bone_omits_unit_scale() {
        let mut writer = IoCursor::new(Vec::new());
        let skeleton = Skeleton {
            bones: vec![Bone::new("a", 5)],
            ..Default::default()
        };
        write_skeleton(&skeleton, &mut writer).unwrap();

        assert_hex_eq!(
            writer.get_ref(),
            &hex!(
                "0010 5B53657269616C697A65725F76312E31305D 0A
                 0020 26000000 61 0A 0500
                     00000000 00000000 00000000
                     00000000 00000000 00000000 0000803F"
            )
        );
    }

    #[test]
    fn set_parent_rejects_cycle() {
        let mut skeleton = two_bones();
        assert!(matches!(
            skeleton.set_parent(0, 1),
            Err(Error::ConstraintViolation(_))
        ));
        assert!(skeleton.set_parent(1, 1).is_err());
        assert!(skeleton.set_parent(1, 7).is_err());
    }

    #[test]
    fn derived_transform_accumulates_parents() {
        let skeleton = two_bones();
        let position = skeleton
            .derived_transform(1)
            .unwrap()
            .transform_point3(Vec3::ZERO);
        assert_relative_eq!(0.0, position.x);
        assert_relative_eq!(3.0, position.y);
        assert_relative_eq!(0.0, position.z);
        assert_eq!(None, skeleton.derived_transform(9));
    }

    #[test]
    fn binding_pose_inverts_derived_transform() {
        let mut skeleton = two_bones();
        skeleton.set_binding_pose().unwrap();

        let binding = skeleton.bone(1).unwrap().binding_pose.unwrap();
        assert_eq!(Vec3::new(0.0, 2.0, 0.0), binding.position);
        let origin = binding
            .inverse_derived_transform
            .transform_point3(Vec3::new(0.0, 3.0, 0.0));
        assert_relative_eq!(0.0, origin.length(), epsilon = 1e-6);
    }

    #[test]
    fn read_long_bone_chain() {
        let count = 1000u16;
        let mut skeleton = Skeleton::default();
        for handle in 0..count {
            let mut bone = Bone::new(format!("bone{}", handle), handle);
            bone.position = Vec3::new(0.0, 1.0, 0.0);
            bone.parent = handle.checked_sub(1);
            skeleton.bones.push(bone);
        }

        let mut writer = IoCursor::new(Vec::new());
        write_skeleton(&skeleton, &mut writer).unwrap();
        let skeleton = read_skeleton(writer.get_ref()).unwrap();

        assert_eq!(1, skeleton.root_bones().count());
        assert_eq!(Some(count - 2), skeleton.bone(count - 1).unwrap().parent);
        let tip = skeleton
            .derived_transform(count - 1)
            .unwrap()
            .transform_point3(Vec3::ZERO);
        assert_relative_eq!(count as f32, tip.y);
    }

    #[test]
    fn read_parent_cycle() {
        // Bone 0 links to 1 and then bone 1 links back to 0.
        let data = hex!(
            "0010 5B53657269616C697A65725F76312E31305D 0A
             0020 26000000 61 0A 0000
                 00000000 00000000 00000000
                 00000000 00000000 00000000 0000803F
             0020 26000000 62 0A 0100
                 00000000 00000000 00000000
                 00000000 00000000 00000000 0000803F
             0030 0A000000 0000 0100
             0030 0A000000 0100 0000"
        );
        assert!(matches!(
            read_skeleton(&data),
            Err(Error::ConstraintViolation(_))
        ));
    }

    #[test]
    fn bone_lookup() {
        let skeleton = two_bones();
        assert_eq!(1, skeleton.bone_by_name("child").unwrap().handle);
        assert_eq!(
            vec!["root"],
            skeleton.root_bones().map(|b| b.name.as_str()).collect::<Vec<_>>()
        );
    }
}
