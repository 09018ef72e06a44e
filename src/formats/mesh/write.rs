use std::io::{Seek, Write};

use super::chunk_ids::*;
use super::*;
use crate::chunk::write_file_header;
use crate::export::ChunkWriter;

pub(crate) fn write_mesh<W: Write + Seek>(
    mesh: &Mesh,
    writer: &mut W,
    options: &MeshWriteOptions,
) -> Result<()> {
    let mut w = ChunkWriter::new(writer);
    write_file_header(&mut w, options.version.as_str())?;

    // Dependency info must directly follow the header to be found without reading the mesh.
    if options.dependency_info {
        write_dependency_info(&mut w, &mesh.dependency_info())?;
    }

    w.chunk(MESH, |w| write_mesh_contents(w, mesh, options.version))?;
    Ok(())
}

fn write_dependency_info<W: Write + Seek>(
    w: &mut ChunkWriter<W>,
    info: &DependencyInfo,
) -> Result<()> {
    w.chunk(DEPENDENCY_INFO, |w| {
        write_packed_strings(w, DEPENDENCY_MESHES, &info.meshes)?;
        write_packed_strings(w, DEPENDENCY_MATERIALS, &info.materials)?;
        write_packed_strings(w, DEPENDENCY_SKELETONS, &info.skeletons)?;
        Ok(())
    })?;
    Ok(())
}

fn write_packed_strings<W: Write + Seek>(
    w: &mut ChunkWriter<W>,
    tag: u16,
    names: &[String],
) -> Result<()> {
    w.chunk(tag, |w| {
        w.write_u32(names.len() as u32)?;
        for name in names {
            w.write_packed_string(name)?;
        }
        Ok(())
    })?;
    Ok(())
}

fn write_mesh_contents<W: Write + Seek>(
    w: &mut ChunkWriter<W>,
    mesh: &Mesh,
    version: MeshVersion,
) -> Result<()> {
    w.write_bool(mesh.skeleton_name.is_some())?;

    if let Some(vertex_data) = &mesh.shared_vertex_data {
        write_geometry(w, vertex_data, version)?;
    }

    for sub_mesh in &mesh.sub_meshes {
        write_sub_mesh(w, mesh, sub_mesh, version)?;
    }

    if let Some(skeleton_name) = &mesh.skeleton_name {
        w.chunk(MESH_SKELETON_LINK, |w| w.write_line(skeleton_name))?;
    }

    write_bone_assignments(w, MESH_BONE_ASSIGNMENT, &mesh.bone_assignments)?;

    if !mesh.lod.usages.is_empty() {
        write_mesh_lod(w, mesh)?;
    }

    if let Some(bounds) = &mesh.bounds {
        w.chunk(MESH_BOUNDS, |w| {
            w.write_vec3(bounds.min)?;
            w.write_vec3(bounds.max)?;
            w.write_f32(bounds.radius)
        })?;
    }

    if mesh.sub_meshes.iter().any(|s| s.name.is_some()) {
        w.chunk(SUBMESH_NAME_TABLE, |w| {
            for (i, sub_mesh) in mesh.sub_meshes.iter().enumerate() {
                if let Some(name) = &sub_mesh.name {
                    w.chunk(SUBMESH_NAME_TABLE_ELEMENT, |w| {
                        w.write_u16(i as u16)?;
                        w.write_line(name)
                    })?;
                }
            }
            Ok(())
        })?;
    }

    if !mesh.edge_lists.is_empty() {
        write_edge_lists(w, mesh)?;
    }

    if !mesh.poses.is_empty() {
        w.chunk(POSES, |w| {
            for pose in &mesh.poses {
                write_pose(w, mesh, pose)?;
            }
            Ok(())
        })?;
    }

    if !mesh.animations.is_empty() {
        w.chunk(ANIMATIONS, |w| {
            for animation in &mesh.animations {
                write_animation(w, mesh, animation)?;
            }
            Ok(())
        })?;
    }

    for attachment_point in &mesh.attachment_points {
        w.chunk(ATTACHMENT_POINT, |w| {
            w.write_line(&attachment_point.name)?;
            w.write_line(attachment_point.parent_bone.as_deref().unwrap_or(""))?;
            w.write_vec3(attachment_point.position)?;
            w.write_quat(attachment_point.orientation)
        })?;
    }

    Ok(())
}

fn write_indices<W: Write + Seek>(w: &mut ChunkWriter<W>, indices: &Indices) -> Result<()> {
    w.write_u32(indices.len() as u32)?;
    w.write_bool(indices.is_32bit())?;
    match indices {
        Indices::U16(v) => w.write_u16_array(v),
        Indices::U32(v) => w.write_u32_array(v),
    }
}

/// The number of vertices in the data animated by `target`.
fn target_vertex_count(mesh: &Mesh, target: u16) -> Result<u32> {
    mesh.target_vertex_data(target)
        .map(|v| v.vertex_count)
        .ok_or_else(|| {
            Error::ConstraintViolation(format!("Target {} has no vertex data.", target))
        })
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

fn write_sub_mesh<W: Write + Seek>(
    w: &mut ChunkWriter<W>,
    mesh: &Mesh,
    sub_mesh: &SubMesh,
    version: MeshVersion,
) -> Result<()> {
    let vertices = sub_mesh.vertices(mesh).ok_or_else(|| {
        Error::ConstraintViolation(format!(
            "Sub mesh with material {:?} uses shared vertices, but the mesh has no shared vertices.",
            sub_mesh.material_name
        ))
    })?;
    validate_indices(&sub_mesh.indices, vertices.vertex_count)?;

    w.chunk(SUBMESH, |w| {
        w.write_line(&sub_mesh.material_name)?;
        w.write_bool(sub_mesh.uses_shared_vertices())?;
        write_indices(w, &sub_mesh.indices)?;

        if let Some(vertex_data) = &sub_mesh.vertex_data {
            write_geometry(w, vertex_data, version)?;
        }

        w.chunk(SUBMESH_OPERATION, |w| {
            w.write_u16(sub_mesh.operation_type as u16)
        })?;

        write_bone_assignments(w, SUBMESH_BONE_ASSIGNMENT, &sub_mesh.bone_assignments)?;

        for alias in &sub_mesh.texture_aliases {
            w.chunk(SUBMESH_TEXTURE_ALIAS, |w| {
                w.write_line(&alias.alias_name)?;
                w.write_line(&alias.texture_name)
            })?;
        }
        Ok(())
    })?;
    Ok(())
}

fn write_bone_assignments<W: Write + Seek>(
    w: &mut ChunkWriter<W>,
    tag: u16,
    assignments: &BoneAssignments,
) -> Result<()> {
    for (vertex_index, weights) in assignments {
        for weight in weights {
            w.chunk(tag, |w| {
                w.write_u32(*vertex_index)?;
                w.write_u16(weight.bone_index)?;
                w.write_f32(weight.weight)
            })?;
        }
    }
    Ok(())
}

fn write_geometry<W: Write + Seek>(
    w: &mut ChunkWriter<W>,
    vertex_data: &VertexData,
    version: MeshVersion,
) -> Result<()> {
    match version {
        MeshVersion::V1_30 => write_vertex_declaration_geometry(w, vertex_data),
        MeshVersion::V1_20 => write_legacy_geometry(w, vertex_data, version),
        MeshVersion::V1_10 => write_legacy_geometry(w, vertex_data, version),
    }
}

fn write_vertex_declaration_geometry<W: Write + Seek>(
    w: &mut ChunkWriter<W>,
    vertex_data: &VertexData,
) -> Result<()> {
    w.chunk(GEOMETRY, |w| {
        w.write_u32(vertex_data.vertex_count)?;

        w.chunk(GEOMETRY_VERTEX_DECLARATION, |w| {
            for element in &vertex_data.elements {
                w.chunk(GEOMETRY_VERTEX_ELEMENT, |w| {
                    w.write_u16(element.source)?;
                    w.write_u16(element.element_type as u16)?;
                    w.write_u16(element.semantic as u16)?;
                    w.write_u16(element.offset)?;
                    w.write_u16(element.index)
                })?;
            }
            Ok(())
        })?;

        for (bind_index, buffer) in &vertex_data.buffers {
            let declared_size = vertex_data.declared_vertex_size(*bind_index);
            if buffer.vertex_size as usize != declared_size {
                return Err(Error::ConstraintViolation(format!(
                    "Vertex buffer {} has a stride of {} bytes, but the declaration requires {} bytes.",
                    bind_index, buffer.vertex_size, declared_size
                )));
            }

            let expected_size = vertex_data.vertex_count as usize * buffer.vertex_size as usize;
            if buffer.data.len() != expected_size {
                return Err(Error::ConstraintViolation(format!(
                    "Vertex buffer {} has {} bytes, but {} vertices require {} bytes.",
                    bind_index,
                    buffer.data.len(),
                    vertex_data.vertex_count,
                    expected_size
                )));
            }

            w.chunk(GEOMETRY_VERTEX_BUFFER, |w| {
                w.write_u16(*bind_index)?;
                w.write_u16(buffer.vertex_size)?;
                w.chunk(GEOMETRY_VERTEX_BUFFER_DATA, |w| w.write_bytes(&buffer.data))?;
                Ok(())
            })?;
        }
        Ok(())
    })?;
    Ok(())
}

/// Writes the separate attribute streams used before vertex declarations.
/// Only float3 positions and normals, a diffuse colour, and float texture coordinates can be stored.
/// Colours are stored without their format and read back as [VertexElementType::Colour].
fn write_legacy_geometry<W: Write + Seek>(
    w: &mut ChunkWriter<W>,
    vertex_data: &VertexData,
    version: MeshVersion,
) -> Result<()> {
    let unsupported = |element: &VertexElement| {
        Error::ConstraintViolation(format!(
            "Vertex element {:?} {} of type {:?} cannot be stored in {}.",
            element.semantic, element.index, element.element_type, version
        ))
    };

    let mut positions = None;
    let mut normals = None;
    let mut colours = None;
    let mut texture_coordinates = Vec::new();
    for element in &vertex_data.elements {
        match (element.semantic, element.index) {
            (VertexElementSemantic::Position, 0)
                if element.element_type == VertexElementType::Float3 =>
            {
                positions = Some(element)
            }
            (VertexElementSemantic::Normal, 0)
                if element.element_type == VertexElementType::Float3 =>
            {
                normals = Some(element)
            }
            (VertexElementSemantic::Diffuse, 0) if element.element_type.is_colour() => {
                colours = Some(element)
            }
            (VertexElementSemantic::TextureCoordinates, _)
                if element.element_type.float_components().is_some() =>
            {
                texture_coordinates.push(element)
            }
            _ => return Err(unsupported(element)),
        }
    }
    texture_coordinates.sort_by_key(|e| e.index);

    let positions = positions.ok_or_else(|| {
        Error::ConstraintViolation(format!("Geometry written in {} requires positions.", version))
    })?;

    w.chunk(GEOMETRY, |w| {
        w.write_u32(vertex_data.vertex_count)?;
        w.write_bytes(&vertex_data.read_element_bytes(positions)?)?;

        if let Some(normals) = normals {
            let bytes = vertex_data.read_element_bytes(normals)?;
            w.chunk(GEOMETRY_NORMALS, |w| w.write_bytes(&bytes))?;
        }

        if let Some(colours) = colours {
            let bytes = vertex_data.read_element_bytes(colours)?;
            w.chunk(GEOMETRY_COLOURS, |w| w.write_bytes(&bytes))?;
        }

        for element in texture_coordinates {
            let dimensions = element.element_type.float_components().unwrap_or_default();
            let bytes = vertex_data.read_element_bytes(element)?;
            let mut values: Vec<f32> = bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            if version.flips_texture_v() && dimensions >= 2 {
                for uv in values.chunks_exact_mut(dimensions) {
                    uv[1] = 1.0 - uv[1];
                }
            }

            w.chunk(GEOMETRY_TEXCOORDS, |w| {
                w.write_u16(dimensions as u16)?;
                w.write_f32_array(&values)
            })?;
        }
        Ok(())
    })?;
    Ok(())
}

fn write_mesh_lod<W: Write + Seek>(w: &mut ChunkWriter<W>, mesh: &Mesh) -> Result<()> {
    if !mesh.lod.manual {
        for sub_mesh in &mesh.sub_meshes {
            if sub_mesh.lod_face_data.len() != mesh.lod.usages.len() {
                return Err(Error::ConstraintViolation(format!(
                    "Sub mesh with material {:?} has {} LOD index buffers, but the mesh has {} LOD usages.",
                    sub_mesh.material_name,
                    sub_mesh.lod_face_data.len(),
                    mesh.lod.usages.len()
                )));
            }
        }
    }

    for usage in &mesh.lod.usages {
        match (mesh.lod.manual, &usage.manual_mesh_name) {
            (true, None) => {
                return Err(Error::ConstraintViolation(format!(
                    "Manual LOD usage at depth {} has no mesh name.",
                    usage.from_depth_squared
                )))
            }
            (false, Some(name)) => {
                return Err(Error::ConstraintViolation(format!(
                    "Generated LOD usage at depth {} cannot reference mesh {:?}.",
                    usage.from_depth_squared, name
                )))
            }
            _ => (),
        }
    }

    w.chunk(MESH_LOD, |w| {
        w.write_u16(mesh.lod.level_count() as u16)?;
        w.write_bool(mesh.lod.manual)?;

        for (i, usage) in mesh.lod.usages.iter().enumerate() {
            w.chunk(MESH_LOD_USAGE, |w| {
                w.write_f32(usage.from_depth_squared)?;
                if mesh.lod.manual {
                    if let Some(name) = &usage.manual_mesh_name {
                        w.chunk(MESH_LOD_MANUAL, |w| w.write_line(name))?;
                    }
                } else {
                    for sub_mesh in &mesh.sub_meshes {
                        w.chunk(MESH_LOD_GENERATED, |w| {
                            write_indices(w, &sub_mesh.lod_face_data[i])
                        })?;
                    }
                }
                Ok(())
            })?;
        }
        Ok(())
    })?;
    Ok(())
}

fn write_edge_lists<W: Write + Seek>(w: &mut ChunkWriter<W>, mesh: &Mesh) -> Result<()> {
    // Only level 0 of a manual LOD chain stores edges.
    let writable_levels = if mesh.lod.manual {
        1
    } else {
        mesh.lod.level_count()
    };
    if let Some(level) = mesh
        .edge_lists
        .keys()
        .find(|level| **level as usize >= writable_levels)
    {
        return Err(Error::ConstraintViolation(format!(
            "Edge data for LOD level {} cannot be stored with {} {} LOD levels.",
            level,
            mesh.lod.level_count(),
            if mesh.lod.manual { "manual" } else { "generated" }
        )));
    }

    w.chunk(EDGE_LISTS, |w| {
        for level in 0..mesh.lod.level_count() as u16 {
            let manual = mesh.lod.manual && level > 0;
            let edge_data = mesh.edge_lists.get(&level);
            if !manual && edge_data.is_none() {
                continue;
            }

            w.chunk(EDGE_LIST_LOD, |w| {
                w.write_u16(level)?;
                w.write_bool(manual)?;
                if let (false, Some(edge_data)) = (manual, edge_data) {
                    write_edge_data(w, edge_data)?;
                }
                Ok(())
            })?;
        }
        Ok(())
    })?;
    Ok(())
}

fn write_edge_data<W: Write + Seek>(w: &mut ChunkWriter<W>, edge_data: &EdgeData) -> Result<()> {
    w.write_u32(edge_data.triangles.len() as u32)?;
    w.write_u32(edge_data.edge_groups.len() as u32)?;

    for triangle in &edge_data.triangles {
        w.write_u32(triangle.index_set)?;
        w.write_u32(triangle.vertex_set)?;
        w.write_u32_array(&triangle.vertex_indices)?;
        w.write_u32_array(&triangle.shared_vertex_indices)?;
        w.write_vec4(triangle.normal)?;
    }

    for group in &edge_data.edge_groups {
        w.chunk(EDGE_GROUP, |w| {
            w.write_u32(group.vertex_set)?;
            w.write_u32(group.edges.len() as u32)?;
            for edge in &group.edges {
                w.write_u32_array(&edge.triangle_indices)?;
                w.write_u32_array(&edge.vertex_indices)?;
                w.write_u32_array(&edge.shared_vertex_indices)?;
                w.write_bool(edge.degenerate)?;
            }
            Ok(())
        })?;
    }
    Ok(())
}

fn write_pose<W: Write + Seek>(w: &mut ChunkWriter<W>, mesh: &Mesh, pose: &Pose) -> Result<()> {
    let vertex_count = target_vertex_count(mesh, pose.target)?;
    if let Some(vertex_index) = pose.vertex_offsets.keys().find(|i| **i >= vertex_count) {
        return Err(Error::ConstraintViolation(format!(
            "Pose {:?} offsets vertex {}, but the target has {} vertices.",
            pose.name, vertex_index, vertex_count
        )));
    }

    w.chunk(POSE, |w| {
        w.write_line(&pose.name)?;
        w.write_u16(pose.target)?;
        for (vertex_index, offset) in &pose.vertex_offsets {
            w.chunk(POSE_VERTEX, |w| {
                w.write_u32(*vertex_index)?;
                w.write_vec3(*offset)
            })?;
        }
        Ok(())
    })?;
    Ok(())
}

fn write_animation<W: Write + Seek>(
    w: &mut ChunkWriter<W>,
    mesh: &Mesh,
    animation: &VertexAnimation,
) -> Result<()> {
    w.chunk(ANIMATION, |w| {
        w.write_line(&animation.name)?;
        w.write_f32(animation.length)?;

        for track in &animation.tracks {
            let vertex_count = target_vertex_count(mesh, track.target)? as usize;

            w.chunk(ANIMATION_TRACK, |w| {
                w.write_u16(track.keyframes.animation_type())?;
                w.write_u16(track.target)?;

                match &track.keyframes {
                    VertexKeyFrames::Morph(keyframes) => {
                        for keyframe in keyframes {
                            if keyframe.positions.len() != vertex_count {
                                return Err(Error::ConstraintViolation(format!(
                                    "Morph keyframe at time {} has {} positions, but the target has {} vertices.",
                                    keyframe.time,
                                    keyframe.positions.len(),
                                    vertex_count
                                )));
                            }
                            w.chunk(ANIMATION_MORPH_KEYFRAME, |w| {
                                w.write_f32(keyframe.time)?;
                                for position in &keyframe.positions {
                                    w.write_vec3(*position)?;
                                }
                                Ok(())
                            })?;
                        }
                    }
                    VertexKeyFrames::Pose(keyframes) => {
                        for keyframe in keyframes {
                            w.chunk(ANIMATION_POSE_KEYFRAME, |w| {
                                w.write_f32(keyframe.time)?;
                                for pose_ref in &keyframe.pose_refs {
                                    if pose_ref.pose_index as usize >= mesh.poses.len() {
                                        return Err(Error::ConstraintViolation(format!(
                                            "Pose reference {} is out of range for {} poses.",
                                            pose_ref.pose_index,
                                            mesh.poses.len()
                                        )));
                                    }
                                    w.chunk(ANIMATION_POSE_REF, |w| {
                                        w.write_u16(pose_ref.pose_index)?;
                                        w.write_f32(pose_ref.influence)
                                    })?;
                                }
                                Ok(())
                            })?;
                        }
                    }
                }
                Ok(())
            })?;
        }
        Ok(())
    })?;
    Ok(())
}
