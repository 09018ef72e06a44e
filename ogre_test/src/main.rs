use clap::Parser;
use ogre_lib::formats::{mesh::Mesh, skeleton::Skeleton};
use rayon::prelude::*;
use std::{io::Cursor, path::Path};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Test read/write for all mesh and skeleton files recursively in a folder.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// The root folder containing .mesh and .skeleton files
    root_folder: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into()))
        .init();

    let cli = Cli::parse();

    let folder = Path::new(&cli.root_folder);
    let start = std::time::Instant::now();

    globwalk::GlobWalkerBuilder::from_patterns(folder, &["*.mesh"])
        .build()
        .unwrap()
        .filter_map(|p| p.ok())
        .par_bridge()
        .for_each(|path| {
            check_read_write_mesh(path.path());
        });

    globwalk::GlobWalkerBuilder::from_patterns(folder, &["*.skeleton"])
        .build()
        .unwrap()
        .filter_map(|p| p.ok())
        .par_bridge()
        .for_each(|path| {
            check_read_write_skeleton(path.path());
        });

    println!("Finished in {:?}", start.elapsed());
}

fn check_read_write_mesh(path: &Path) {
    let before = std::fs::read(path).unwrap();
    match Mesh::from_bytes(&before) {
        Ok(mesh) => {
            // Older versions are upgraded, so compare the data instead of the bytes.
            let mut writer = Cursor::new(Vec::new());
            mesh.write(&mut writer).unwrap();
            let after = writer.into_inner();

            match Mesh::from_bytes(&after) {
                Ok(new_mesh) if new_mesh == mesh => (),
                Ok(_) => println!("Read/write does not preserve data for {path:?}"),
                Err(e) => println!("Error reading written mesh for {path:?}: {e}"),
            }

            match Mesh::read_dependency_info(&after) {
                Ok(Some(info)) if info == mesh.dependency_info() => (),
                _ => println!("Dependency info not preserved for {path:?}"),
            }
        }
        Err(e) => {
            println!("Error reading {path:?}: {e}");
        }
    }
}

fn check_read_write_skeleton(path: &Path) {
    let before = std::fs::read(path).unwrap();
    match Skeleton::from_bytes(&before) {
        Ok(skeleton) => {
            let mut writer = Cursor::new(Vec::new());
            skeleton.write(&mut writer).unwrap();
            let after = writer.into_inner();
            if before != after {
                // Unit scales are optional, so the bytes may differ while the data matches.
                match Skeleton::from_bytes(&after) {
                    Ok(new_skeleton) if new_skeleton == skeleton => (),
                    _ => println!("Read/write not 1:1 for {path:?}"),
                }
            }
        }
        Err(e) => {
            println!("Error reading {path:?}: {e}");
        }
    }
}
