use std::io::Cursor;

use approx::assert_relative_eq;
use glam::{Quat, Vec3};
use ogre_lib::formats::skeleton::*;
use ogre_lib::{export_skeleton, import_skeleton, Error};
use pretty_assertions::assert_eq;

fn arm_skeleton() -> Skeleton {
    let mut shoulder = Bone::new("shoulder", 0);
    shoulder.position = Vec3::new(0.0, 1.5, 0.0);

    let mut elbow = Bone::new("elbow", 1);
    elbow.position = Vec3::new(1.0, 0.0, 0.0);
    elbow.orientation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
    elbow.parent = Some(0);

    let mut hand = Bone::new("hand", 2);
    hand.position = Vec3::new(0.5, 0.0, 0.0);
    hand.scale = Vec3::new(2.0, 2.0, 2.0);
    hand.parent = Some(1);

    Skeleton {
        bones: vec![shoulder, elbow, hand],
        animations: vec![Animation {
            name: "wave".into(),
            length: 1.0,
            tracks: vec![NodeTrack {
                bone_handle: 1,
                keyframes: vec![
                    TransformKeyFrame {
                        time: 0.0,
                        rotation: Quat::IDENTITY,
                        translation: Vec3::ZERO,
                        scale: Vec3::ONE,
                    },
                    TransformKeyFrame {
                        time: 0.5,
                        rotation: Quat::from_rotation_y(0.5),
                        translation: Vec3::new(0.0, 0.25, 0.0),
                        scale: Vec3::new(1.0, 1.5, 1.0),
                    },
                ],
            }],
        }],
        attachment_points: vec![AttachmentPoint {
            name: "weapon".into(),
            parent_handle: 2,
            position: Vec3::new(0.0, 0.0, 0.1),
            orientation: Quat::IDENTITY,
        }],
    }
}

fn write(skeleton: &Skeleton) -> Vec<u8> {
    let mut writer = Cursor::new(Vec::new());
    export_skeleton(skeleton, &mut writer).unwrap();
    writer.into_inner()
}

#[test]
fn read_write_skeleton() {
    let mut skeleton = arm_skeleton();
    skeleton.set_binding_pose().unwrap();

    let data = write(&skeleton);
    let new_skeleton = import_skeleton(&mut Cursor::new(&data)).unwrap();
    assert_eq!(skeleton, new_skeleton);

    // The binding pose is recomputed on read, so writing again is 1:1.
    assert_eq!(data, write(&new_skeleton));
}

#[test]
fn read_skeleton_derived_transforms() {
    let skeleton = Skeleton::from_bytes(&write(&arm_skeleton())).unwrap();

    // The elbow rotates the hand's offset from +X to +Y.
    let hand = skeleton.derived_transform(2).unwrap();
    let origin = hand.transform_point3(Vec3::ZERO);
    assert_relative_eq!(1.0, origin.x, epsilon = 1e-6);
    assert_relative_eq!(2.0, origin.y, epsilon = 1e-6);
    assert_relative_eq!(0.0, origin.z, epsilon = 1e-6);

    let binding_pose = skeleton.bone(2).unwrap().binding_pose.unwrap();
    let local = binding_pose.inverse_derived_transform.transform_point3(origin);
    assert_relative_eq!(0.0, local.length(), epsilon = 1e-6);
}

#[test]
fn read_skeleton_hierarchy() {
    let skeleton = Skeleton::from_bytes(&write(&arm_skeleton())).unwrap();

    assert_eq!(
        vec!["shoulder"],
        skeleton.root_bones().map(|b| b.name.as_str()).collect::<Vec<_>>()
    );
    assert_eq!(Some(1), skeleton.bone_by_name("hand").unwrap().parent);
    assert_eq!(2, skeleton.animation("wave").unwrap().tracks[0].keyframes.len());
    assert!(skeleton.animation("idle").is_none());
}

#[test]
fn read_track_for_missing_bone() {
    let mut skeleton = arm_skeleton();
    skeleton.animations[0].tracks[0].bone_handle = 7;

    let result = Skeleton::from_bytes(&write(&skeleton));
    assert!(matches!(result, Err(Error::ConstraintViolation(_))));
}

#[test]
fn read_attachment_point_missing_bone() {
    let mut skeleton = arm_skeleton();
    skeleton.attachment_points[0].parent_handle = 9;

    let result = Skeleton::from_bytes(&write(&skeleton));
    assert!(matches!(result, Err(Error::ConstraintViolation(_))));
}

#[test]
fn read_duplicate_bone_handles() {
    let mut skeleton = arm_skeleton();
    skeleton.bones[2].handle = 1;
    skeleton.bones[2].parent = None;
    skeleton.attachment_points.clear();

    let result = Skeleton::from_bytes(&write(&skeleton));
    assert!(matches!(result, Err(Error::ConstraintViolation(_))));
}

#[test]
fn read_truncated_skeleton() {
    let data = write(&arm_skeleton());
    let result = Skeleton::from_bytes(&data[..data.len() - 1]);
    assert!(matches!(result, Err(Error::OutOfBounds { .. })));
}
