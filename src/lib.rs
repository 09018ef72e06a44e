//! # ogre_lib
//!
//! ogre_lib is a library for reading and writing the chunked binary mesh and skeleton formats
//! used by the OGRE rendering engine.
//!
//! Files are a sequence of nested chunks. Each chunk starts with a `u16` tag and a `u32` length
//! including the 6 byte header. The reader treats lengths as authoritative and skips chunks it does not recognize,
//! so files containing newer optional chunks can still be read.
//!
//! Reading always converts the file to the same in memory representation regardless of the file version.
//! See [formats::mesh] and [formats::skeleton] for details.
//!
//! ## Examples
//! Read a mesh, print its dependencies, and save it using the current version.
/*!
```rust no_run
use ogre_lib::formats::mesh::Mesh;

let mesh = Mesh::from_file("ogrehead.mesh")?;
let info = mesh.dependency_info();
println!("{:?}", info.materials);

mesh.write_to_file("ogrehead_new.mesh")?;
# Ok::<(), Box<dyn std::error::Error>>(())
```
 */
//! Only the dependency info can be read without reading the rest of the file.
/*!
```rust no_run
let data = std::fs::read("ogrehead.mesh")?;
if let Some(info) = ogre_lib::get_dependency_info(&mut std::io::Cursor::new(data))? {
    println!("{:?}", info.skeletons);
}
# Ok::<(), Box<dyn std::error::Error>>(())
```
 */
pub mod chunk;
pub mod cursor;
mod error;
pub mod export;
pub mod formats;
pub mod strings;

use std::fs;
use std::io::{Read, Seek, Write};
use std::path::Path;

pub use error::{Error, Result};

use formats::mesh::{DependencyInfo, Mesh, MeshWriteOptions};
use formats::skeleton::Skeleton;

macro_rules! read_write_impl {
    ($ty:ident, $read:path, $write:path) => {
        impl $ty {
            /// Tries to read the type from `path`.
            /// The entire file is buffered for performance.
            pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
                let data = fs::read(path)?;
                $read(&data)
            }

            /// Tries to read the type from `reader`.
            /// The remaining data in `reader` is buffered before parsing.
            pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                $read(&data)
            }

            /// Tries to read the type from the bytes of an entire file.
            pub fn from_bytes(data: &[u8]) -> Result<Self> {
                $read(data)
            }

            /// Tries to write the type to `writer`.
            /// For best performance when writing to a file, use `write_to_file` instead.
            pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
                $write(self, writer)
            }

            /// Tries to write the type to `path`.
            /// The entire file is buffered for performance.
            pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
                export::write_to_file(path, |c| $write(self, c))
            }
        }
    };
}

fn write_mesh_default<W: Write + Seek>(mesh: &Mesh, writer: &mut W) -> Result<()> {
    formats::mesh::write_mesh(mesh, writer, &MeshWriteOptions::default())
}

read_write_impl!(Mesh, formats::mesh::read_mesh, write_mesh_default);
read_write_impl!(
    Skeleton,
    formats::skeleton::read_skeleton,
    formats::skeleton::write_skeleton
);

/// Reads a complete mesh from `reader`.
pub fn import_mesh<R: Read>(reader: &mut R) -> Result<Mesh> {
    Mesh::read(reader)
}

/// Writes `mesh` using the current version with a leading dependency info chunk.
pub fn export_mesh<W: Write + Seek>(mesh: &Mesh, writer: &mut W) -> Result<()> {
    mesh.write(writer)
}

/// Writes `mesh` using `options` to select the file version and optional chunks.
pub fn export_mesh_with_options<W: Write + Seek>(
    mesh: &Mesh,
    writer: &mut W,
    options: &MeshWriteOptions,
) -> Result<()> {
    mesh.write_with_options(writer, options)
}

/// Reads the dependency info at the start of a mesh file without reading the mesh itself.
/// Returns [None] if the chunk after the header is not a dependency info chunk.
pub fn get_dependency_info<R: Read>(reader: &mut R) -> Result<Option<DependencyInfo>> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Mesh::read_dependency_info(&data)
}

pub fn import_skeleton<R: Read>(reader: &mut R) -> Result<Skeleton> {
    Skeleton::read(reader)
}

pub fn export_skeleton<W: Write + Seek>(skeleton: &Skeleton, writer: &mut W) -> Result<()> {
    skeleton.write(writer)
}

#[cfg(test)]
pub(crate) fn group_hex(a: &str, words_per_line: usize) -> String {
    use itertools::Itertools;

    // ex: "FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF..."
    let words = a
        .chars()
        .collect::<Vec<char>>()
        .chunks(8)
        .map(|c| c.iter().collect::<String>())
        .collect::<Vec<String>>();

    words.chunks(words_per_line).map(|c| c.join(" ")).join("\n")
}

#[cfg(test)]
macro_rules! assert_hex_eq {
    ($a:expr, $b:expr) => {
        assert!(
            $a[..] == $b[..],
            "\n{} !=\n{}",
            crate::group_hex(&hex::encode($a), 8),
            crate::group_hex(&hex::encode($b), 8)
        )
    };
}

#[cfg(test)]
pub(crate) use assert_hex_eq;
