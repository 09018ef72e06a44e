use std::collections::BTreeMap;

use tracing::{trace, warn};

use super::chunk_ids::*;
use super::*;
use crate::chunk::{read_file_header, ChunkHeader, ChunkReader};
use crate::cursor::Cursor;

pub(crate) fn read_mesh(data: &[u8]) -> Result<Mesh> {
    let mut reader = ChunkReader::new(data);
    let version = read_mesh_version(&mut reader)?;
    let grammar = MeshGrammar { version };

    let mut mesh = None;
    reader.read_child_chunks(data.len(), &[MESH, DEPENDENCY_INFO], |r, header| {
        match header.tag {
            MESH => {
                if mesh.is_some() {
                    return Err(Error::ConstraintViolation(format!(
                        "Found a second mesh chunk at offset {}.",
                        header.offset
                    )));
                }
                mesh = Some(grammar.read_mesh(r, &header)?);
            }
            // The dependency info is derived from the mesh itself.
            DEPENDENCY_INFO => trace!("Skipping dependency info at offset {}", header.offset),
            _ => (),
        }
        Ok(())
    })?;

    mesh.ok_or(Error::UnexpectedChunk {
        expected: MESH,
        found: None,
        offset: data.len(),
    })
}

/// Reads only the header and an optional dependency info chunk immediately following it.
pub(crate) fn read_dependency_info(data: &[u8]) -> Result<Option<DependencyInfo>> {
    let mut reader = ChunkReader::new(data);
    read_mesh_version(&mut reader)?;

    match reader.next_chunk_in(&[DEPENDENCY_INFO])? {
        Some(header) => {
            let info = reader.read_chunk_body(&header, |r| read_dependency_lists(r, &header))?;
            Ok(Some(info))
        }
        None => Ok(None),
    }
}

fn read_mesh_version(reader: &mut ChunkReader) -> Result<MeshVersion> {
    let version_string = read_file_header(reader)?;
    let version = MeshVersion::from_version_string(&version_string).ok_or_else(|| {
        Error::MalformedHeader(format!("Unsupported mesh version {:?}.", version_string))
    })?;

    if version != MeshVersion::CURRENT {
        warn!(
            "Reading mesh version {}. Resave the mesh to upgrade to {}.",
            version,
            MeshVersion::CURRENT
        );
    }
    trace!(
        "Selected mesh grammar for {}: vertex declarations {}, flipped texture v {}",
        version,
        version.has_vertex_declarations(),
        version.flips_texture_v()
    );
    Ok(version)
}

fn read_dependency_lists(r: &mut ChunkReader, header: &ChunkHeader) -> Result<DependencyInfo> {
    let mut info = DependencyInfo::default();
    r.read_child_chunks(
        header.end(),
        &[DEPENDENCY_MESHES, DEPENDENCY_MATERIALS, DEPENDENCY_SKELETONS],
        |r, child| {
            let names = read_packed_strings(r.cursor())?;
            match child.tag {
                DEPENDENCY_MESHES => info.meshes = names,
                DEPENDENCY_MATERIALS => info.materials = names,
                DEPENDENCY_SKELETONS => info.skeletons = names,
                _ => (),
            }
            Ok(())
        },
    )?;
    Ok(info)
}

fn read_packed_strings(c: &mut Cursor) -> Result<Vec<String>> {
    let count = c.read_u32()?;
    let mut names = Vec::new();
    for _ in 0..count {
        names.push(c.read_packed_string()?);
    }
    Ok(names)
}

fn read_indices(c: &mut Cursor, count: u32, is_32bit: bool) -> Result<Indices> {
    if is_32bit {
        c.read_u32_array(count as usize).map(Indices::U32)
    } else {
        c.read_u16_array(count as usize).map(Indices::U16)
    }
}

fn validate_indices(indices: &Indices, vertex_count: u32) -> Result<()> {
    match indices.iter().find(|i| *i >= vertex_count) {
        Some(index) => Err(Error::ConstraintViolation(format!(
            "Index {} is out of range for {} vertices.",
            index, vertex_count
        ))),
        None => Ok(()),
    }
}

fn insert_bone_assignment(c: &mut Cursor, assignments: &mut BoneAssignments) -> Result<()> {
    let vertex_index = c.read_u32()?;
    let bone_index = c.read_u16()?;
    let weight = c.read_f32()?;
    assignments.entry(vertex_index).or_default().push(BoneWeight { bone_index, weight });
    Ok(())
}

/// The mesh chunk grammar for a specific file version.
/// Only geometry is stored differently between versions.
struct MeshGrammar {
    version: MeshVersion,
}

impl MeshGrammar {
    fn read_mesh(&self, r: &mut ChunkReader, header: &ChunkHeader) -> Result<Mesh> {
        // The skeletally animated flag is redundant with the skeleton link.
        let _skeletally_animated = r.cursor().read_bool()?;

        let mut mesh = Mesh::default();
        let mut names = BTreeMap::new();
        r.read_child_chunks(
            header.end(),
            &[
                GEOMETRY,
                SUBMESH,
                MESH_SKELETON_LINK,
                MESH_BONE_ASSIGNMENT,
                MESH_LOD,
                MESH_BOUNDS,
                SUBMESH_NAME_TABLE,
                EDGE_LISTS,
                POSES,
                ANIMATIONS,
                ATTACHMENT_POINT,
            ],
            |r, child| {
                match child.tag {
                    GEOMETRY => mesh.shared_vertex_data = Some(self.read_geometry(r, &child)?),
                    SUBMESH => {
                        let sub_mesh =
                            self.read_sub_mesh(r, &child, mesh.shared_vertex_data.as_ref())?;
                        mesh.sub_meshes.push(sub_mesh);
                    }
                    MESH_SKELETON_LINK => mesh.skeleton_name = Some(r.cursor().read_line()?),
                    MESH_BONE_ASSIGNMENT => {
                        insert_bone_assignment(r.cursor(), &mut mesh.bone_assignments)?
                    }
                    MESH_LOD => read_mesh_lod(r, &child, &mut mesh)?,
                    MESH_BOUNDS => mesh.bounds = Some(read_bounds(r.cursor())?),
                    SUBMESH_NAME_TABLE => read_name_table(r, &child, &mut names)?,
                    EDGE_LISTS => read_edge_lists(r, &child, &mut mesh.edge_lists)?,
                    POSES => read_poses(r, &child, &mut mesh)?,
                    ANIMATIONS => read_animations(r, &child, &mut mesh)?,
                    ATTACHMENT_POINT => mesh.attachment_points.push(read_attachment_point(r.cursor())?),
                    _ => (),
                }
                Ok(())
            },
        )?;

        for (index, name) in names {
            let sub_mesh = mesh.sub_meshes.get_mut(index as usize).ok_or_else(|| {
                Error::ConstraintViolation(format!(
                    "Sub mesh name {:?} refers to missing sub mesh {}.",
                    name, index
                ))
            })?;
            sub_mesh.name = Some(name);
        }

        Ok(mesh)
    }

    fn read_sub_mesh(
        &self,
        r: &mut ChunkReader,
        header: &ChunkHeader,
        shared_vertex_data: Option<&VertexData>,
    ) -> Result<SubMesh> {
        let c = r.cursor();
        let material_name = c.read_line()?;
        let use_shared_vertices = c.read_bool()?;
        let index_count = c.read_u32()?;
        let is_32bit = c.read_bool()?;
        let indices = read_indices(c, index_count, is_32bit)?;

        let vertex_data = if use_shared_vertices {
            None
        } else {
            let geometry = r.expect_child_chunk(header.end(), GEOMETRY)?;
            Some(r.read_chunk_body(&geometry, |r| self.read_geometry(r, &geometry))?)
        };

        let vertex_count = match (&vertex_data, shared_vertex_data) {
            (Some(vertex_data), _) => vertex_data.vertex_count,
            (None, Some(shared)) => shared.vertex_count,
            (None, None) => {
                return Err(Error::ConstraintViolation(format!(
                    "Sub mesh at offset {} uses shared vertices, but the mesh has no shared geometry.",
                    header.offset
                )))
            }
        };
        validate_indices(&indices, vertex_count)?;

        let mut sub_mesh = SubMesh {
            name: None,
            material_name,
            vertex_data,
            indices,
            operation_type: OperationType::default(),
            bone_assignments: BoneAssignments::new(),
            lod_face_data: Vec::new(),
            texture_aliases: Vec::new(),
        };

        r.read_child_chunks(
            header.end(),
            &[
                SUBMESH_OPERATION,
                SUBMESH_BONE_ASSIGNMENT,
                SUBMESH_TEXTURE_ALIAS,
            ],
            |r, child| {
                let c = r.cursor();
                match child.tag {
                    SUBMESH_OPERATION => {
                        sub_mesh.operation_type = OperationType::try_from(c.read_u16()?)?
                    }
                    SUBMESH_BONE_ASSIGNMENT => {
                        insert_bone_assignment(c, &mut sub_mesh.bone_assignments)?
                    }
                    SUBMESH_TEXTURE_ALIAS => sub_mesh.texture_aliases.push(TextureAlias {
                        alias_name: c.read_line()?,
                        texture_name: c.read_line()?,
                    }),
                    _ => (),
                }
                Ok(())
            },
        )?;

        Ok(sub_mesh)
    }

    fn read_geometry(&self, r: &mut ChunkReader, header: &ChunkHeader) -> Result<VertexData> {
        match self.version {
            MeshVersion::V1_30 => read_geometry(r, header),
            MeshVersion::V1_20 => read_legacy_geometry(r, header, false),
            MeshVersion::V1_10 => read_legacy_geometry(r, header, true),
        }
    }
}

fn read_geometry(r: &mut ChunkReader, header: &ChunkHeader) -> Result<VertexData> {
    let mut vertex_data = VertexData::new(r.cursor().read_u32()?);
    r.read_child_chunks(
        header.end(),
        &[GEOMETRY_VERTEX_DECLARATION, GEOMETRY_VERTEX_BUFFER],
        |r, child| {
            match child.tag {
                GEOMETRY_VERTEX_DECLARATION => {
                    vertex_data.elements = read_vertex_declaration(r, &child)?
                }
                GEOMETRY_VERTEX_BUFFER => {
                    let (bind_index, buffer) = read_vertex_buffer(r, &child, &vertex_data)?;
                    vertex_data.buffers.insert(bind_index, buffer);
                }
                _ => (),
            }
            Ok(())
        },
    )?;

    for element in &vertex_data.elements {
        if !vertex_data.buffers.contains_key(&element.source) {
            return Err(Error::UnexpectedChunk {
                expected: GEOMETRY_VERTEX_BUFFER,
                found: None,
                offset: header.end(),
            });
        }
    }

    Ok(vertex_data)
}

fn read_vertex_declaration(
    r: &mut ChunkReader,
    header: &ChunkHeader,
) -> Result<Vec<VertexElement>> {
    let mut elements = Vec::new();
    r.read_child_chunks(header.end(), &[GEOMETRY_VERTEX_ELEMENT], |r, _| {
        let c = r.cursor();
        elements.push(VertexElement {
            source: c.read_u16()?,
            element_type: VertexElementType::try_from(c.read_u16()?)?,
            semantic: VertexElementSemantic::try_from(c.read_u16()?)?,
            offset: c.read_u16()?,
            index: c.read_u16()?,
        });
        Ok(())
    })?;
    Ok(elements)
}

fn read_vertex_buffer(
    r: &mut ChunkReader,
    header: &ChunkHeader,
    vertex_data: &VertexData,
) -> Result<(u16, VertexBuffer)> {
    let bind_index = r.cursor().read_u16()?;
    let vertex_size = r.cursor().read_u16()?;

    let declared_size = vertex_data.declared_vertex_size(bind_index);
    if declared_size == 0 {
        return Err(Error::ConstraintViolation(format!(
            "Vertex buffer {} is not referenced by the vertex declaration.",
            bind_index
        )));
    }
    if vertex_size as usize != declared_size {
        return Err(Error::ConstraintViolation(format!(
            "Vertex buffer {} has a stride of {} bytes, but the declaration requires {} bytes.",
            bind_index, vertex_size, declared_size
        )));
    }

    let data_header = r.expect_child_chunk(header.end(), GEOMETRY_VERTEX_BUFFER_DATA)?;
    let size = vertex_data.vertex_count as usize * vertex_size as usize;
    let data = r.read_chunk_body(&data_header, |r| Ok(r.cursor().read_bytes(size)?.to_vec()))?;

    Ok((bind_index, VertexBuffer { vertex_size, data }))
}

/// Reads the separate attribute streams used before vertex declarations.
/// Each stream is converted to an element with its own buffer.
fn read_legacy_geometry(
    r: &mut ChunkReader,
    header: &ChunkHeader,
    flip_texture_v: bool,
) -> Result<VertexData> {
    let vertex_count = r.cursor().read_u32()?;
    let mut vertex_data = VertexData::new(vertex_count);

    let positions = r.cursor().read_bytes(vertex_count as usize * 12)?.to_vec();
    vertex_data.add_element_bytes(
        VertexElementSemantic::Position,
        0,
        VertexElementType::Float3,
        positions,
    )?;

    let mut texture_coordinate_set = 0;
    r.read_child_chunks(
        header.end(),
        &[GEOMETRY_NORMALS, GEOMETRY_COLOURS, GEOMETRY_TEXCOORDS],
        |r, child| {
            let c = r.cursor();
            match child.tag {
                GEOMETRY_NORMALS => {
                    let normals = c.read_bytes(vertex_count as usize * 12)?.to_vec();
                    vertex_data.add_element_bytes(
                        VertexElementSemantic::Normal,
                        0,
                        VertexElementType::Float3,
                        normals,
                    )?;
                }
                GEOMETRY_COLOURS => {
                    let colours = c.read_bytes(vertex_count as usize * 4)?.to_vec();
                    vertex_data.add_element_bytes(
                        VertexElementSemantic::Diffuse,
                        0,
                        VertexElementType::Colour,
                        colours,
                    )?;
                }
                GEOMETRY_TEXCOORDS => {
                    let dimensions = c.read_u16()? as usize;
                    let element_type = VertexElementType::float(dimensions).ok_or_else(|| {
                        Error::ConstraintViolation(format!(
                            "Texture coordinates cannot have {} dimensions.",
                            dimensions
                        ))
                    })?;

                    let mut values = c.read_f32_array(vertex_count as usize * dimensions)?;
                    if flip_texture_v && dimensions >= 2 {
                        for uv in values.chunks_exact_mut(dimensions) {
                            uv[1] = 1.0 - uv[1];
                        }
                    }

                    let mut bytes = Vec::with_capacity(values.len() * 4);
                    for value in values {
                        bytes.extend_from_slice(&value.to_le_bytes());
                    }
                    vertex_data.add_element_bytes(
                        VertexElementSemantic::TextureCoordinates,
                        texture_coordinate_set,
                        element_type,
                        bytes,
                    )?;
                    texture_coordinate_set += 1;
                }
                _ => (),
            }
            Ok(())
        },
    )?;

    Ok(vertex_data)
}

fn read_mesh_lod(r: &mut ChunkReader, header: &ChunkHeader, mesh: &mut Mesh) -> Result<()> {
    let level_count = r.cursor().read_u16()?;
    let manual = r.cursor().read_bool()?;
    if level_count == 0 {
        return Err(Error::ConstraintViolation(
            "The LOD chain must contain the full detail level.".into(),
        ));
    }

    mesh.lod = MeshLod {
        manual,
        usages: Vec::new(),
    };
    for sub_mesh in &mut mesh.sub_meshes {
        sub_mesh.lod_face_data.clear();
    }

    let sub_meshes = &mut mesh.sub_meshes;
    let usages = &mut mesh.lod.usages;
    r.read_child_chunks(header.end(), &[MESH_LOD_USAGE], |r, usage| {
        let from_depth_squared = r.cursor().read_f32()?;

        let manual_mesh_name = if manual {
            let manual_header = r.expect_child_chunk(usage.end(), MESH_LOD_MANUAL)?;
            Some(r.read_chunk_body(&manual_header, |r| r.cursor().read_line())?)
        } else {
            // Generated levels store one index buffer per sub mesh in order.
            for sub_mesh in sub_meshes.iter_mut() {
                let generated = r.expect_child_chunk(usage.end(), MESH_LOD_GENERATED)?;
                let indices = r.read_chunk_body(&generated, |r| {
                    let c = r.cursor();
                    let index_count = c.read_u32()?;
                    let is_32bit = c.read_bool()?;
                    read_indices(c, index_count, is_32bit)
                })?;
                sub_mesh.lod_face_data.push(indices);
            }
            None
        };

        usages.push(LodUsage {
            from_depth_squared,
            manual_mesh_name,
        });
        Ok(())
    })?;

    if mesh.lod.level_count() != level_count as usize {
        return Err(Error::ConstraintViolation(format!(
            "Expected {} LOD levels but found {}.",
            level_count,
            mesh.lod.level_count()
        )));
    }
    Ok(())
}

fn read_bounds(c: &mut Cursor) -> Result<Bounds> {
    Ok(Bounds {
        min: c.read_vec3()?,
        max: c.read_vec3()?,
        radius: c.read_f32()?,
    })
}

fn read_name_table(
    r: &mut ChunkReader,
    header: &ChunkHeader,
    names: &mut BTreeMap<u16, String>,
) -> Result<()> {
    r.read_child_chunks(header.end(), &[SUBMESH_NAME_TABLE_ELEMENT], |r, _| {
        let c = r.cursor();
        let index = c.read_u16()?;
        let name = c.read_line()?;
        names.insert(index, name);
        Ok(())
    })
}

fn read_edge_lists(
    r: &mut ChunkReader,
    header: &ChunkHeader,
    edge_lists: &mut BTreeMap<u16, EdgeData>,
) -> Result<()> {
    r.read_child_chunks(header.end(), &[EDGE_LIST_LOD], |r, lod| {
        let lod_index = r.cursor().read_u16()?;
        let manual = r.cursor().read_bool()?;
        if manual {
            // Manual levels get their edges from the referenced mesh.
            return Ok(());
        }

        let edge_data = read_edge_data(r, &lod)?;
        edge_lists.insert(lod_index, edge_data);
        Ok(())
    })
}

fn read_edge_data(r: &mut ChunkReader, header: &ChunkHeader) -> Result<EdgeData> {
    let c = r.cursor();
    let triangle_count = c.read_u32()?;
    let group_count = c.read_u32()?;

    let mut triangles = Vec::new();
    for _ in 0..triangle_count {
        let index_set = c.read_u32()?;
        let vertex_set = c.read_u32()?;
        let vertex_indices = [c.read_u32()?, c.read_u32()?, c.read_u32()?];
        let shared_vertex_indices = [c.read_u32()?, c.read_u32()?, c.read_u32()?];
        let normal = c.read_vec4()?;
        triangles.push(EdgeTriangle {
            index_set,
            vertex_set,
            vertex_indices,
            shared_vertex_indices,
            normal,
        });
    }

    let mut edge_groups = Vec::new();
    r.read_child_chunks(header.end(), &[EDGE_GROUP], |r, _| {
        let c = r.cursor();
        let vertex_set = c.read_u32()?;
        let edge_count = c.read_u32()?;
        let mut edges = Vec::new();
        for _ in 0..edge_count {
            edges.push(Edge {
                triangle_indices: [c.read_u32()?, c.read_u32()?],
                vertex_indices: [c.read_u32()?, c.read_u32()?],
                shared_vertex_indices: [c.read_u32()?, c.read_u32()?],
                degenerate: c.read_bool()?,
            });
        }
        edge_groups.push(EdgeGroup { vertex_set, edges });
        Ok(())
    })?;

    if edge_groups.len() != group_count as usize {
        return Err(Error::ConstraintViolation(format!(
            "Expected {} edge groups but found {}.",
            group_count,
            edge_groups.len()
        )));
    }

    Ok(EdgeData {
        triangles,
        edge_groups,
    })
}

fn target_vertex_count(mesh: &Mesh, target: u16) -> Result<u32> {
    mesh.target_vertex_data(target)
        .map(|v| v.vertex_count)
        .ok_or_else(|| {
            Error::ConstraintViolation(format!("Target {} has no vertex data.", target))
        })
}

fn read_poses(r: &mut ChunkReader, header: &ChunkHeader, mesh: &mut Mesh) -> Result<()> {
    let mut poses = Vec::new();
    r.read_child_chunks(header.end(), &[POSE], |r, pose_header| {
        let name = r.cursor().read_line()?;
        let target = r.cursor().read_u16()?;
        let vertex_count = target_vertex_count(mesh, target)?;

        let mut vertex_offsets = BTreeMap::new();
        r.read_child_chunks(pose_header.end(), &[POSE_VERTEX], |r, _| {
            let c = r.cursor();
            let vertex_index = c.read_u32()?;
            let offset = c.read_vec3()?;
            if vertex_index >= vertex_count {
                return Err(Error::ConstraintViolation(format!(
                    "Pose {:?} offsets vertex {}, but the target has {} vertices.",
                    name, vertex_index, vertex_count
                )));
            }
            vertex_offsets.insert(vertex_index, offset);
            Ok(())
        })?;

        poses.push(Pose {
            name,
            target,
            vertex_offsets,
        });
        Ok(())
    })?;

    mesh.poses.extend(poses);
    Ok(())
}

fn read_animations(r: &mut ChunkReader, header: &ChunkHeader, mesh: &mut Mesh) -> Result<()> {
    let mut animations = Vec::new();
    r.read_child_chunks(header.end(), &[ANIMATION], |r, animation| {
        let name = r.cursor().read_line()?;
        let length = r.cursor().read_f32()?;

        let mut tracks = Vec::new();
        r.read_child_chunks(animation.end(), &[ANIMATION_TRACK], |r, track| {
            tracks.push(read_animation_track(r, &track, mesh)?);
            Ok(())
        })?;

        animations.push(VertexAnimation {
            name,
            length,
            tracks,
        });
        Ok(())
    })?;

    mesh.animations.extend(animations);
    Ok(())
}

fn read_animation_track(
    r: &mut ChunkReader,
    header: &ChunkHeader,
    mesh: &Mesh,
) -> Result<VertexAnimationTrack> {
    let animation_type = r.cursor().read_u16()?;
    let target = r.cursor().read_u16()?;
    let vertex_count = target_vertex_count(mesh, target)?;

    let keyframes = match animation_type {
        1 => {
            let mut keyframes = Vec::new();
            r.read_child_chunks(header.end(), &[ANIMATION_MORPH_KEYFRAME], |r, keyframe| {
                let time = r.cursor().read_f32()?;
                let expected = vertex_count as usize * 12;
                if r.remaining_in(&keyframe) != expected {
                    return Err(Error::ConstraintViolation(format!(
                        "Morph keyframe at offset {} does not contain exactly {} positions.",
                        keyframe.offset, vertex_count
                    )));
                }
                let positions = r
                    .cursor()
                    .read_f32_array(vertex_count as usize * 3)?
                    .chunks_exact(3)
                    .map(Vec3::from_slice)
                    .collect();
                keyframes.push(MorphKeyFrame { time, positions });
                Ok(())
            })?;
            VertexKeyFrames::Morph(keyframes)
        }
        2 => {
            let mut keyframes = Vec::new();
            r.read_child_chunks(header.end(), &[ANIMATION_POSE_KEYFRAME], |r, keyframe| {
                let time = r.cursor().read_f32()?;
                let mut pose_refs = Vec::new();
                r.read_child_chunks(keyframe.end(), &[ANIMATION_POSE_REF], |r, _| {
                    let pose_index = r.cursor().read_u16()?;
                    let influence = r.cursor().read_f32()?;
                    if pose_index as usize >= mesh.poses.len() {
                        return Err(Error::ConstraintViolation(format!(
                            "Pose reference {} is out of range for {} poses.",
                            pose_index,
                            mesh.poses.len()
                        )));
                    }
                    pose_refs.push(PoseRef {
                        pose_index,
                        influence,
                    });
                    Ok(())
                })?;
                keyframes.push(PoseKeyFrame { time, pose_refs });
                Ok(())
            })?;
            VertexKeyFrames::Pose(keyframes)
        }
        _ => {
            return Err(Error::ConstraintViolation(format!(
                "Unrecognized vertex animation type {}.",
                animation_type
            )))
        }
    };

    Ok(VertexAnimationTrack { target, keyframes })
}

fn read_attachment_point(c: &mut Cursor) -> Result<AttachmentPoint> {
    let name = c.read_line()?;
    let parent_bone = c.read_line()?;
    Ok(AttachmentPoint {
        name,
        parent_bone: (!parent_bone.is_empty()).then(|| parent_bone),
        position: c.read_vec3()?,
        orientation: c.read_quat()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexlit::hex;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn read_logs(data: &[u8]) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || read_mesh(data).unwrap());

        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn read_mesh_logs_selected_grammar() {
        let logs = read_logs(&hex!(
            "0010 5B4D65736853657269616C697A65725F76312E33305D 0A
             0030 07000000 00"
        ));
        assert!(logs.contains(
            "Selected mesh grammar for [MeshSerializer_v1.30]: vertex declarations true, flipped texture v false"
        ));
    }

    #[test]
    fn read_legacy_mesh_logs_selected_grammar() {
        let logs = read_logs(&hex!(
            "0010 5B4D65736853657269616C697A65725F76312E31305D 0A
             0030 07000000 00"
        ));
        assert!(logs.contains("vertex declarations false, flipped texture v true"));
        assert!(logs.contains("Resave the mesh"));
    }

    #[test]
    fn read_dependency_info_absent() {
        // A mesh chunk directly after the header.
        let data = hex!(
            "0010 5B4D65736853657269616C697A65725F76312E33305D 0A
             0030 07000000 00"
        );
        assert_eq!(None, read_dependency_info(&data).unwrap());
    }

    #[test]
    fn read_dependency_info_lists() {
        let data = hex!(
            "0010 5B4D65736853657269616C697A65725F76312E33305D 0A
             00E1 1F000000
                01E1 0A000000 00000000
                02E1 0F000000 01000000 00000001 61"
        );
        assert_eq!(
            Some(DependencyInfo {
                meshes: Vec::new(),
                materials: Vec::new(),
                skeletons: vec!["a".into()],
            }),
            read_dependency_info(&data).unwrap()
        );
    }

    #[test]
    fn read_mesh_unsupported_version() {
        let data = hex!("0010 5B4D65736853657269616C697A65725F76312E34305D 0A");
        assert!(matches!(read_mesh(&data), Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn read_mesh_missing_mesh_chunk() {
        let data = hex!("0010 5B4D65736853657269616C697A65725F76312E33305D 0A");
        assert!(matches!(
            read_mesh(&data),
            Err(Error::UnexpectedChunk {
                expected: MESH,
                found: None,
                ..
            })
        ));
    }

    #[test]
    fn read_empty_mesh_skips_unknown_chunks() {
        let data = hex!(
            "0010 5B4D65736853657269616C697A65725F76312E33305D 0A
             0030 0D000000 01
                 0099 06000000
             0077 06000000"
        );
        assert_eq!(Mesh::default(), read_mesh(&data).unwrap());
    }

    #[test]
    fn read_sub_mesh_missing_geometry() {
        // A sub mesh with dedicated vertices but no geometry chunk.
        let data = hex!(
            "0010 5B4D65736853657269616C697A65725F76312E33305D 0A
             0030 15000000 00
                 0040 0E000000 6D 0A 00 00000000 00"
        );
        assert!(matches!(
            read_mesh(&data),
            Err(Error::UnexpectedChunk {
                expected: GEOMETRY,
                found: None,
                ..
            })
        ));
    }

    #[test]
    fn read_sub_mesh_shared_without_geometry() {
        let data = hex!(
            "0010 5B4D65736853657269616C697A65725F76312E33305D 0A
             0030 15000000 00
                 0040 0E000000 6D 0A 01 00000000 00"
        );
        assert!(matches!(
            read_mesh(&data),
            Err(Error::ConstraintViolation(_))
        ));
    }

    #[test]
    fn read_vertex_buffer_stride_mismatch() {
        // Declares a single float3 position but the buffer has a stride of 16 bytes.
        let data = hex!(
            "0010 5B4D65736853657269616C697A65725F76312E33305D 0A
             0030 47000000 00
                 0050 40000000 01000000
                     0051 16000000
                         1051 10000000 0000 0200 0100 0000 0000
                     0052 20000000 0000 1000
                         1052 16000000 00000000 00000000 00000000 00000000"
        );
        assert!(matches!(
            read_mesh(&data),
            Err(Error::ConstraintViolation(_))
        ));
    }
}
