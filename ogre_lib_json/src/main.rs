use clap::{Parser, ValueEnum};
use ogre_lib::formats::mesh::{Mesh, MeshVersion, MeshWriteOptions};
use ogre_lib::formats::skeleton::Skeleton;
use serde::Serialize;
use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Convert .mesh and .skeleton files to JSON and JSON back to binary.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// The input .mesh, .skeleton, or .json file
    input: PathBuf,

    /// The output file. Defaults to the input path with a new extension.
    output: Option<PathBuf>,

    /// The serializer version used when writing meshes from JSON
    #[arg(long, value_enum, default_value_t = Version::V1_30)]
    mesh_version: Version,

    /// Don't write the dependency info chunk when writing meshes from JSON
    #[arg(long)]
    no_dependency_info: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Version {
    #[value(name = "1.30")]
    V1_30,
    #[value(name = "1.20")]
    V1_20,
    #[value(name = "1.10")]
    V1_10,
}

impl From<Version> for MeshVersion {
    fn from(value: Version) -> Self {
        match value {
            Version::V1_30 => MeshVersion::V1_30,
            Version::V1_20 => MeshVersion::V1_20,
            Version::V1_10 => MeshVersion::V1_10,
        }
    }
}

fn read_data_write_json<T: Serialize, F: Fn(&Path) -> ogre_lib::Result<T>>(
    input_path: &Path,
    output_path: Option<&PathBuf>,
    read_t: F,
) {
    // Modify the input if no output is specified to allow dragging a file onto the executable.
    let json_output_path = output_path
        .cloned()
        .unwrap_or_else(|| PathBuf::from(input_path.to_string_lossy().to_string() + ".json"));

    let parse_start_time = Instant::now();
    match read_t(input_path) {
        Ok(data) => {
            eprintln!("Parse: {:?}", parse_start_time.elapsed());
            write_json(json_output_path, data);
        }
        Err(error) => eprintln!("{}", error),
    };
}

fn write_json<T: Sized + Serialize, P: AsRef<Path>>(output_path: P, object: T) {
    let json = serde_json::to_string_pretty(&object).unwrap();

    let mut output_file = std::fs::File::create(output_path).expect("unable to create file");
    output_file
        .write_all(json.as_bytes())
        .expect("unable to write");
}

fn read_json_write_data(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let get_output_path = |ext| {
        cli.output.clone().unwrap_or_else(|| {
            // "model.mesh.json" becomes "model.mesh".
            let without_json = cli.input.with_extension("");
            if without_json.extension().is_some() {
                without_json
            } else {
                cli.input.with_extension(ext)
            }
        })
    };

    let json = std::fs::read_to_string(&cli.input)?;
    if let Ok(mesh) = serde_json::from_str::<Mesh>(&json) {
        let options = MeshWriteOptions {
            version: cli.mesh_version.into(),
            dependency_info: !cli.no_dependency_info,
        };
        write_data(&get_output_path("mesh"), |file| {
            mesh.write_with_options(file, &options)
        })
    } else {
        let skeleton = serde_json::from_str::<Skeleton>(&json)?;
        write_data(&get_output_path("skeleton"), |file| skeleton.write(file))
    }
}

fn write_data<F: FnOnce(&mut std::io::Cursor<Vec<u8>>) -> ogre_lib::Result<()>>(
    output_path: &Path,
    write_t: F,
) -> Result<(), Box<dyn Error>> {
    let export_time = Instant::now();
    let mut writer = std::io::Cursor::new(Vec::new());
    write_t(&mut writer)?;
    std::fs::write(output_path, writer.into_inner())?;
    eprintln!("Export: {:?}", export_time.elapsed());
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into()))
        .init();

    let cli = Cli::parse();

    match cli.input.extension().and_then(|e| e.to_str()) {
        Some("mesh") => read_data_write_json(&cli.input, cli.output.as_ref(), |p| {
            Mesh::from_file(p)
        }),
        Some("skeleton") => read_data_write_json(&cli.input, cli.output.as_ref(), |p| {
            Skeleton::from_file(p)
        }),
        Some("json") => {
            if let Err(error) = read_json_write_data(&cli) {
                eprintln!("{}", error);
            }
        }
        _ => eprintln!("Unsupported file extension for {:?}", cli.input),
    };
}
