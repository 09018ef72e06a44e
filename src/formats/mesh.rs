//! Types for working with mesh data in .mesh files.
//!
//! # File Differences
//! Three serializer versions are supported for reading.
//! Version [MeshVersion::V1_30] stores vertices using vertex declarations and interleaved buffers.
//! The legacy versions [MeshVersion::V1_20] and [MeshVersion::V1_10] store each attribute as a separate stream.
//! Version [MeshVersion::V1_10] also stores texture coordinates with the V axis flipped.
//! All versions are converted to the same [Mesh] representation when reading.
//!
//! # Examples
/*!
```rust no_run
use ogre_lib::formats::mesh::Mesh;

let mesh = Mesh::from_file("ogrehead.mesh")?;
for sub_mesh in &mesh.sub_meshes {
    println!("{} {}", sub_mesh.material_name, sub_mesh.indices.len());
}
# Ok::<(), Box<dyn std::error::Error>>(())
```
 */
use std::collections::BTreeMap;

use glam::{Quat, Vec3, Vec4};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

mod read;
pub mod vertex;
mod write;

pub(crate) use read::{read_dependency_info, read_mesh};
pub(crate) use write::write_mesh;

pub use vertex::{
    VertexBuffer, VertexData, VertexElement, VertexElementSemantic, VertexElementType,
};

/// Chunk tags for mesh files.
pub mod chunk_ids {
    pub const MESH: u16 = 0x3000;
    pub const SUBMESH: u16 = 0x4000;
    pub const SUBMESH_OPERATION: u16 = 0x4010;
    pub const SUBMESH_BONE_ASSIGNMENT: u16 = 0x4100;
    pub const SUBMESH_TEXTURE_ALIAS: u16 = 0x4200;
    pub const GEOMETRY: u16 = 0x5000;
    pub const GEOMETRY_VERTEX_DECLARATION: u16 = 0x5100;
    pub const GEOMETRY_VERTEX_ELEMENT: u16 = 0x5110;
    pub const GEOMETRY_VERTEX_BUFFER: u16 = 0x5200;
    pub const GEOMETRY_VERTEX_BUFFER_DATA: u16 = 0x5210;
    /// Normals for [crate::formats::mesh::MeshVersion::V1_20] and older.
    pub const GEOMETRY_NORMALS: u16 = 0x5100;
    /// Packed colours for [crate::formats::mesh::MeshVersion::V1_20] and older.
    pub const GEOMETRY_COLOURS: u16 = 0x5200;
    /// A texture coordinate set for [crate::formats::mesh::MeshVersion::V1_20] and older.
    pub const GEOMETRY_TEXCOORDS: u16 = 0x5300;
    pub const MESH_SKELETON_LINK: u16 = 0x6000;
    pub const MESH_BONE_ASSIGNMENT: u16 = 0x7000;
    pub const MESH_LOD: u16 = 0x8000;
    pub const MESH_LOD_USAGE: u16 = 0x8100;
    pub const MESH_LOD_MANUAL: u16 = 0x8110;
    pub const MESH_LOD_GENERATED: u16 = 0x8120;
    pub const MESH_BOUNDS: u16 = 0x9000;
    pub const SUBMESH_NAME_TABLE: u16 = 0xA000;
    pub const SUBMESH_NAME_TABLE_ELEMENT: u16 = 0xA100;
    pub const EDGE_LISTS: u16 = 0xB000;
    pub const EDGE_LIST_LOD: u16 = 0xB100;
    pub const EDGE_GROUP: u16 = 0xB110;
    pub const POSES: u16 = 0xC000;
    pub const POSE: u16 = 0xC100;
    pub const POSE_VERTEX: u16 = 0xC111;
    pub const ANIMATIONS: u16 = 0xD000;
    pub const ANIMATION: u16 = 0xD100;
    pub const ANIMATION_TRACK: u16 = 0xD110;
    pub const ANIMATION_MORPH_KEYFRAME: u16 = 0xD111;
    pub const ANIMATION_POSE_KEYFRAME: u16 = 0xD112;
    pub const ANIMATION_POSE_REF: u16 = 0xD113;
    pub const ATTACHMENT_POINT: u16 = 0xE000;
    pub const DEPENDENCY_INFO: u16 = 0xE100;
    pub const DEPENDENCY_MESHES: u16 = 0xE101;
    pub const DEPENDENCY_SKELETONS: u16 = 0xE102;
    pub const DEPENDENCY_MATERIALS: u16 = 0xE103;
}

/// The serializer version written to the file header.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshVersion {
    V1_30,
    V1_20,
    V1_10,
}

impl MeshVersion {
    /// The version used for writing unless otherwise specified.
    pub const CURRENT: Self = Self::V1_30;

    /// The version string stored in the file header.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1_30 => "[MeshSerializer_v1.30]",
            Self::V1_20 => "[MeshSerializer_v1.20]",
            Self::V1_10 => "[MeshSerializer_v1.10]",
        }
    }

    /// Parses a version string from the file header.
    pub fn from_version_string(version: &str) -> Option<Self> {
        match version {
            "[MeshSerializer_v1.30]" => Some(Self::V1_30),
            "[MeshSerializer_v1.20]" => Some(Self::V1_20),
            "[MeshSerializer_v1.10]" => Some(Self::V1_10),
            _ => None,
        }
    }

    /// Legacy versions store separate position, normal, colour, and texture coordinate streams.
    pub fn has_vertex_declarations(self) -> bool {
        matches!(self, Self::V1_30)
    }

    /// Version 1.10 stores texture coordinates with `v' = 1 - v`.
    pub fn flips_texture_v(self) -> bool {
        matches!(self, Self::V1_10)
    }
}

impl Default for MeshVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl std::fmt::Display for MeshVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for [Mesh::write_with_options].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshWriteOptions {
    pub version: MeshVersion,
    /// Write a dependency info chunk before the mesh chunk.
    pub dependency_info: bool,
}

impl Default for MeshWriteOptions {
    fn default() -> Self {
        Self {
            version: MeshVersion::CURRENT,
            dependency_info: true,
        }
    }
}

/// Vertex indices with a fixed width.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Indices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl Default for Indices {
    fn default() -> Self {
        Self::U16(Vec::new())
    }
}

impl Indices {
    /// Picks the smallest index width that can address `vertex_count` vertices.
    pub fn new(indices: Vec<u32>, vertex_count: u32) -> Self {
        if vertex_count <= u16::MAX as u32 && indices.iter().all(|i| *i <= u16::MAX as u32) {
            Self::U16(indices.into_iter().map(|i| i as u16).collect())
        } else {
            Self::U32(indices)
        }
    }

    /// Picks 16 bit indices if every index fits.
    pub fn from_u32(indices: Vec<u32>) -> Self {
        let vertex_count = indices.iter().max().map(|i| i + 1).unwrap_or(0);
        Self::new(indices, vertex_count)
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_32bit(&self) -> bool {
        matches!(self, Self::U32(_))
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = u32> + '_> {
        match self {
            Self::U16(v) => Box::new(v.iter().map(|i| *i as u32)),
            Self::U32(v) => Box::new(v.iter().copied()),
        }
    }

    pub fn to_u32(&self) -> Vec<u32> {
        self.iter().collect()
    }
}

/// The primitive type used to render a [SubMesh].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum OperationType {
    PointList = 1,
    LineList = 2,
    LineStrip = 3,
    TriangleList = 4,
    TriangleStrip = 5,
    TriangleFan = 6,
}

impl Default for OperationType {
    fn default() -> Self {
        Self::TriangleList
    }
}

impl TryFrom<u16> for OperationType {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            1 => Ok(Self::PointList),
            2 => Ok(Self::LineList),
            3 => Ok(Self::LineStrip),
            4 => Ok(Self::TriangleList),
            5 => Ok(Self::TriangleStrip),
            6 => Ok(Self::TriangleFan),
            _ => Err(Error::ConstraintViolation(format!(
                "Unrecognized operation type {}.",
                value
            ))),
        }
    }
}

/// The influence of a single bone on a vertex.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneWeight {
    pub bone_index: u16,
    pub weight: f32,
}

/// Bone influences keyed by vertex index.
/// A vertex may have any number of influences.
pub type BoneAssignments = BTreeMap<u32, Vec<BoneWeight>>;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureAlias {
    pub alias_name: String,
    pub texture_name: String,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubMesh {
    /// The name from the sub mesh name table if present.
    pub name: Option<String>,
    pub material_name: String,
    /// The dedicated vertices for this sub mesh or [None] if the mesh's shared vertices are used.
    pub vertex_data: Option<VertexData>,
    pub indices: Indices,
    pub operation_type: OperationType,
    pub bone_assignments: BoneAssignments,
    /// Generated index buffers for each LOD usage after the first level.
    pub lod_face_data: Vec<Indices>,
    pub texture_aliases: Vec<TextureAlias>,
}

impl SubMesh {
    pub fn uses_shared_vertices(&self) -> bool {
        self.vertex_data.is_none()
    }

    /// The vertices referenced by [SubMesh::indices].
    pub fn vertices<'a>(&'a self, mesh: &'a Mesh) -> Option<&'a VertexData> {
        self.vertex_data
            .as_ref()
            .or(mesh.shared_vertex_data.as_ref())
    }

    /// Computes the axis aligned bounding box of every vertex referenced by the indices.
    /// Returns [None] if there are no indices.
    pub fn bounding_box(&self, mesh: &Mesh) -> Result<Option<BoundingBox>> {
        let vertices = self.vertices(mesh).ok_or_else(|| {
            Error::ConstraintViolation(
                "The sub mesh uses shared vertices, but the mesh has no shared vertices.".into(),
            )
        })?;

        let mut bounds: Option<BoundingBox> = None;
        for index in self.indices.iter() {
            let position = vertices.position(index)?;
            bounds = Some(match bounds {
                Some(b) => BoundingBox {
                    min: b.min.min(position),
                    max: b.max.max(position),
                },
                None => BoundingBox {
                    min: position,
                    max: position,
                },
            });
        }
        Ok(bounds)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

/// The bounding volumes for the entire mesh.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
    pub radius: f32,
}

/// A level of detail after the full detail level.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct LodUsage {
    /// The squared view depth at which this level is used.
    pub from_depth_squared: f32,
    /// The mesh loaded for this level if the LOD is manual.
    pub manual_mesh_name: Option<String>,
}

/// The level of detail chain. The full detail level is implicit.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshLod {
    /// Levels reference separate mesh files instead of generated index buffers.
    pub manual: bool,
    pub usages: Vec<LodUsage>,
}

impl MeshLod {
    /// The number of levels including the full detail level.
    pub fn level_count(&self) -> usize {
        self.usages.len() + 1
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeTriangle {
    pub index_set: u32,
    pub vertex_set: u32,
    pub vertex_indices: [u32; 3],
    pub shared_vertex_indices: [u32; 3],
    /// The unnormalized face normal with the plane distance in w.
    pub normal: Vec4,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub triangle_indices: [u32; 2],
    pub vertex_indices: [u32; 2],
    pub shared_vertex_indices: [u32; 2],
    pub degenerate: bool,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeGroup {
    pub vertex_set: u32,
    pub edges: Vec<Edge>,
}

/// Precomputed connectivity used for stencil shadows.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EdgeData {
    pub triangles: Vec<EdgeTriangle>,
    pub edge_groups: Vec<EdgeGroup>,
}

/// A set of vertex offsets applied to a target's positions.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pose {
    pub name: String,
    /// `0` for the shared vertices or `n` for the vertices of sub mesh `n - 1`.
    pub target: u16,
    pub vertex_offsets: BTreeMap<u32, Vec3>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MorphKeyFrame {
    pub time: f32,
    /// The position of every vertex in the target.
    pub positions: Vec<Vec3>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseRef {
    /// The index into [Mesh::poses].
    pub pose_index: u16,
    pub influence: f32,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PoseKeyFrame {
    pub time: f32,
    pub pose_refs: Vec<PoseRef>,
}

/// The keyframes of a track. Each track animates either full positions or blended poses.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum VertexKeyFrames {
    Morph(Vec<MorphKeyFrame>),
    Pose(Vec<PoseKeyFrame>),
}

impl VertexKeyFrames {
    /// The track type stored in the file.
    pub fn animation_type(&self) -> u16 {
        match self {
            Self::Morph(_) => 1,
            Self::Pose(_) => 2,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAnimationTrack {
    /// `0` for the shared vertices or `n` for the vertices of sub mesh `n - 1`.
    pub target: u16,
    pub keyframes: VertexKeyFrames,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAnimation {
    pub name: String,
    pub length: f32,
    pub tracks: Vec<VertexAnimationTrack>,
}

/// A named transform relative to a bone for attaching other objects.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentPoint {
    pub name: String,
    pub parent_bone: Option<String>,
    pub position: Vec3,
    pub orientation: Quat,
}

/// The other files a mesh refers to.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DependencyInfo {
    pub meshes: Vec<String>,
    pub materials: Vec<String>,
    pub skeletons: Vec<String>,
}

/// The data associated with a .mesh file.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    /// Vertices used by every [SubMesh] with [SubMesh::uses_shared_vertices].
    pub shared_vertex_data: Option<VertexData>,
    pub sub_meshes: Vec<SubMesh>,
    /// The path of the linked .skeleton file.
    pub skeleton_name: Option<String>,
    /// Bone influences for [Mesh::shared_vertex_data].
    pub bone_assignments: BoneAssignments,
    pub lod: MeshLod,
    pub bounds: Option<Bounds>,
    /// Edge data keyed by LOD level. Manual levels have no edge data.
    pub edge_lists: BTreeMap<u16, EdgeData>,
    pub poses: Vec<Pose>,
    pub animations: Vec<VertexAnimation>,
    pub attachment_points: Vec<AttachmentPoint>,
}

impl Mesh {
    /// Tries to read the dependency info from the start of `data` without reading the rest of the mesh.
    /// Returns [None] if the file has no dependency info.
    pub fn read_dependency_info(data: &[u8]) -> Result<Option<DependencyInfo>> {
        read_dependency_info(data)
    }

    /// Writes the mesh using `options` instead of the defaults used by [Mesh::write].
    pub fn write_with_options<W: std::io::Write + std::io::Seek>(
        &self,
        writer: &mut W,
        options: &MeshWriteOptions,
    ) -> Result<()> {
        write_mesh(self, writer, options)
    }

    /// The vertices animated by a pose or track with the given `target`.
    pub fn target_vertex_data(&self, target: u16) -> Option<&VertexData> {
        match target {
            0 => self.shared_vertex_data.as_ref(),
            n => self
                .sub_meshes
                .get(n as usize - 1)
                .and_then(|s| s.vertex_data.as_ref()),
        }
    }

    /// Collects the files referenced by this mesh.
    /// Manual LOD meshes, materials, and the skeleton are each listed once in order of first use.
    /// Mesh names on generated LOD usages are ignored since they are never written.
    pub fn dependency_info(&self) -> DependencyInfo {
        fn push_unique(values: &mut Vec<String>, value: &str) {
            if !value.is_empty() && !values.iter().any(|v| v == value) {
                values.push(value.to_string());
            }
        }

        let mut info = DependencyInfo::default();
        if self.lod.manual {
            for usage in &self.lod.usages {
                if let Some(name) = &usage.manual_mesh_name {
                    push_unique(&mut info.meshes, name);
                }
            }
        }
        for sub_mesh in &self.sub_meshes {
            push_unique(&mut info.materials, &sub_mesh.material_name);
        }
        if let Some(name) = &self.skeleton_name {
            push_unique(&mut info.skeletons, name);
        }
        info
    }

    /// Calculates bounds enclosing every vertex referenced by a sub mesh.
    /// The radius is the distance from the origin to the furthest vertex.
    /// Returns [None] if no vertices are referenced.
    pub fn calculate_bounds(&self) -> Result<Option<Bounds>> {
        let mut bounds: Option<Bounds> = None;
        for sub_mesh in &self.sub_meshes {
            let vertices = match sub_mesh.vertices(self) {
                Some(vertices) => vertices,
                None => continue,
            };

            for index in sub_mesh.indices.iter() {
                let position = vertices.position(index)?;
                let length = position.length();
                bounds = Some(match bounds {
                    Some(b) => Bounds {
                        min: b.min.min(position),
                        max: b.max.max(position),
                        radius: b.radius.max(length),
                    },
                    None => Bounds {
                        min: position,
                        max: position,
                        radius: length,
                    },
                });
            }
        }
        Ok(bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_mesh() -> Mesh {
        let mut vertex_data = VertexData::new(3);
        vertex_data
            .add_float_element(
                VertexElementSemantic::Position,
                0,
                &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            )
            .unwrap();

        Mesh {
            sub_meshes: vec![SubMesh {
                material_name: "mat".into(),
                vertex_data: Some(vertex_data),
                indices: Indices::new(vec![0, 1, 2], 3),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn version_strings() {
        for version in [MeshVersion::V1_30, MeshVersion::V1_20, MeshVersion::V1_10] {
            assert_eq!(
                Some(version),
                MeshVersion::from_version_string(version.as_str())
            );
        }
        assert_eq!(None, MeshVersion::from_version_string("[MeshSerializer_v1.40]"));
        assert!(MeshVersion::V1_10.flips_texture_v());
        assert!(!MeshVersion::V1_20.flips_texture_v());
    }

    #[test]
    fn indices_width_selection() {
        assert_eq!(Indices::U16(vec![0, 1, 2]), Indices::new(vec![0, 1, 2], 3));
        assert!(Indices::new(vec![0, 1, 2], 70000).is_32bit());
        assert!(Indices::from_u32(vec![0, 65536]).is_32bit());
        assert!(!Indices::from_u32(vec![0, 65535]).is_32bit());
    }

    #[test]
    fn indices_iter() {
        assert_eq!(vec![3, 4], Indices::U16(vec![3, 4]).to_u32());
        assert_eq!(vec![70000], Indices::U32(vec![70000]).to_u32());
    }

    #[test]
    fn sub_mesh_bounding_box() {
        let mesh = triangle_mesh();
        assert_eq!(
            Some(BoundingBox {
                min: Vec3::new(0.0, 0.0, 0.0),
                max: Vec3::new(1.0, 1.0, 0.0)
            }),
            mesh.sub_meshes[0].bounding_box(&mesh).unwrap()
        );
    }

    #[test]
    fn sub_mesh_bounding_box_missing_shared_vertices() {
        let mesh = Mesh {
            sub_meshes: vec![SubMesh::default()],
            ..Default::default()
        };
        assert!(mesh.sub_meshes[0].bounding_box(&mesh).is_err());
    }

    #[test]
    fn calculate_bounds_radius() {
        let bounds = triangle_mesh().calculate_bounds().unwrap().unwrap();
        assert_eq!(Vec3::new(1.0, 1.0, 0.0), bounds.max);
        assert_eq!(1.0, bounds.radius);
    }

    #[test]
    fn dependency_info_unique_names() {
        let mut mesh = triangle_mesh();
        mesh.sub_meshes.push(SubMesh {
            material_name: "mat".into(),
            ..Default::default()
        });
        mesh.skeleton_name = Some("a.skeleton".into());
        mesh.lod = MeshLod {
            manual: true,
            usages: vec![LodUsage {
                from_depth_squared: 100.0,
                manual_mesh_name: Some("low.mesh".into()),
            }],
        };

        assert_eq!(
            DependencyInfo {
                meshes: vec!["low.mesh".into()],
                materials: vec!["mat".into()],
                skeletons: vec!["a.skeleton".into()],
            },
            mesh.dependency_info()
        );
    }

    #[test]
    fn dependency_info_ignores_generated_lod_names() {
        let mut mesh = triangle_mesh();
        mesh.lod = MeshLod {
            manual: false,
            usages: vec![LodUsage {
                from_depth_squared: 100.0,
                manual_mesh_name: Some("low.mesh".into()),
            }],
        };
        assert!(mesh.dependency_info().meshes.is_empty());
    }

    #[test]
    fn target_vertex_data() {
        let mesh = triangle_mesh();
        assert!(mesh.target_vertex_data(0).is_none());
        assert_eq!(3, mesh.target_vertex_data(1).unwrap().vertex_count);
        assert!(mesh.target_vertex_data(2).is_none());
    }
}
