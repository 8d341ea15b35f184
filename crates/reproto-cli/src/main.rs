//! reproto - Recover .proto sources from compiled protobuf descriptors
//!
//! Loads file descriptors from a serialized descriptor set or from compiled
//! binaries, then writes one `.proto` file per descriptor, imports first.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser};
use reproto_core::{
    DescriptorIndex, DescriptorSource, DirectoryEmitter, Emitter, IndexedFile, MemoryEmitter,
    RenderConfig, Scanner, Walker, DEFAULT_OUTPUT_ROOT,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Recover .proto schema sources from compiled protobuf descriptors
#[derive(Parser, Debug)]
#[command(name = "reproto")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Output root for generated .proto files
    #[arg(short, long, default_value = DEFAULT_OUTPUT_ROOT)]
    output: PathBuf,

    /// File to reconstruct, with its imports (repeatable; default: every file nothing imports)
    #[arg(long = "root", value_name = "NAME")]
    roots: Vec<String>,

    /// Import prefix assumed available to every compiler (repeatable; default: google/)
    #[arg(long = "well-known", value_name = "PREFIX")]
    well_known: Vec<String>,

    /// Render and print files instead of writing them
    #[arg(long)]
    dry_run: bool,

    /// Only list file names in emission order
    #[arg(long, conflicts_with = "dry_run")]
    list: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Serialized FileDescriptorSet (e.g. from `protoc --include_imports -o`)
    #[arg(long, value_name = "FILE")]
    descriptor_set: Option<PathBuf>,

    /// Compiled binary to scan for embedded descriptors
    #[arg(short, long, value_name = "FILE")]
    binary: Option<PathBuf>,

    /// Directory of compiled binaries to scan
    #[arg(short, long, value_name = "DIR")]
    directory: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    let index = load_index(&cli)?;
    info!("Indexed {} descriptor(s)", index.len());

    let roots = select_roots(&index, &cli.roots)?;
    let config = render_config(&cli);

    if cli.list {
        let walker = run(MemoryEmitter::new(), &roots, config)?;
        for name in walker.emitted() {
            println!("{}", name);
        }
    } else if cli.dry_run {
        let walker = run(MemoryEmitter::new(), &roots, config)?;
        for file in walker.emitter().files() {
            println!("// {}", cli.output.join(&file.name).display());
            print!("{}", file.text);
        }
    } else {
        let walker = run(DirectoryEmitter::new(&cli.output), &roots, config)?;
        for path in walker.emitter().written() {
            println!("Wrote {}", path.display());
        }
        info!("Wrote {} file(s) under {}", walker.emitted().len(), cli.output.display());
    }

    Ok(())
}

fn render_config(cli: &Cli) -> RenderConfig {
    let config = RenderConfig::new();
    if cli.well_known.is_empty() {
        config
    } else {
        config.well_known_prefixes(cli.well_known.iter().cloned())
    }
}

/// Walk every root into `emitter`, sharing one visited set
fn run<E: Emitter>(
    emitter: E,
    roots: &[IndexedFile<'_>],
    config: RenderConfig,
) -> Result<Walker<E>> {
    let mut walker = Walker::new(emitter).with_config(config);
    for root in roots {
        walker
            .walk(root)
            .with_context(|| format!("Failed to reconstruct {}", root.file_name()))?;
    }
    Ok(walker)
}

fn select_roots<'a>(
    index: &'a DescriptorIndex,
    requested: &[String],
) -> Result<Vec<IndexedFile<'a>>> {
    if requested.is_empty() {
        let roots = index.roots();
        if roots.is_empty() {
            bail!("No root descriptors: every indexed file is imported by another");
        }
        return Ok(roots);
    }

    requested
        .iter()
        .map(|name| index.root(name).map_err(Into::into))
        .collect()
}

/// Build the descriptor index from whichever input was given
fn load_index(cli: &Cli) -> Result<DescriptorIndex> {
    let mut index = if let Some(ref path) = cli.input.descriptor_set {
        let data = fs::read(path)
            .with_context(|| format!("Failed to read descriptor set: {}", path.display()))?;
        DescriptorIndex::from_descriptor_set(&data)
            .with_context(|| format!("Failed to parse descriptor set: {}", path.display()))?
    } else if let Some(ref path) = cli.input.binary {
        if !path.is_file() {
            bail!("Input path is not a file: {}", path.display());
        }
        let mut index = DescriptorIndex::new();
        scan_binary(path, &mut index)?;
        index
    } else if let Some(ref directory) = cli.input.directory {
        scan_directory(directory)?
    } else {
        bail!("One of --descriptor-set, --binary or --directory must be specified")
    };

    if !cli.well_known.is_empty() {
        index = index.with_well_known_prefixes(cli.well_known.iter().cloned());
    }

    if index.is_empty() {
        return Err(reproto_core::Error::NoDescriptorsFound.into());
    }
    Ok(index)
}

fn scan_binary(path: &Path, index: &mut DescriptorIndex) -> Result<usize> {
    trace!("Reading {}", path.display());
    let data = fs::read(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;

    let added = index
        .extend_from_binary(data, &Scanner::new())
        .with_context(|| format!("Failed to scan binary: {}", path.display()))?;
    debug!("Found {} new descriptor(s) in {}", added, path.display());
    Ok(added)
}

fn scan_directory(directory: &Path) -> Result<DescriptorIndex> {
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut index = DescriptorIndex::new();
    let mut binaries_scanned = 0;

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || is_hidden(path) || !is_likely_binary(path) {
            trace!("Skipping {}", path.display());
            continue;
        }

        if let Err(e) = scan_binary(path, &mut index) {
            // Keep going with the remaining binaries
            warn!("Error scanning {}: {:#}", path.display(), e);
        }
        binaries_scanned += 1;
    }

    info!("Scanned {} binaries", binaries_scanned);
    Ok(index)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Heuristic to determine if a file is likely a compiled binary
fn is_likely_binary(path: &Path) -> bool {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let library_extensions = ["so", "dylib", "dll", "exe", "a", "lib", "o", "pyd", "node"];
        if library_extensions.contains(&ext.to_lowercase().as_str()) {
            return true;
        }
        let text_extensions = [
            "txt", "md", "json", "yaml", "yml", "toml", "xml", "html", "proto", "rs", "py", "go",
            "c", "h", "cpp", "java", "sh", "log", "csv",
        ];
        if text_extensions.contains(&ext.to_lowercase().as_str()) {
            return false;
        }
    }

    let mut magic = [0u8; 4];
    let read = fs::File::open(path).and_then(|mut file| {
        use std::io::Read;
        file.read_exact(&mut magic)
    });
    if read.is_ok() {
        let mach_o = [
            [0xCF, 0xFA, 0xED, 0xFE],
            [0xCE, 0xFA, 0xED, 0xFE],
            [0xFE, 0xED, 0xFA, 0xCF],
            [0xFE, 0xED, 0xFA, 0xCE],
            [0xCA, 0xFE, 0xBA, 0xBE],
        ];
        if mach_o.contains(&magic) || magic == [0x7F, b'E', b'L', b'F'] || magic[..2] == *b"MZ" {
            return true;
        }
    }

    path.extension().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;
    use prost_types::{FileDescriptorProto, FileDescriptorSet};
    use tempfile::TempDir;

    fn file(name: &str, deps: &[&str]) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some(name.to_string()),
            package: Some("demo".to_string()),
            syntax: Some("proto3".to_string()),
            dependency: deps.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    fn write_set(dir: &Path) -> PathBuf {
        let set = FileDescriptorSet {
            file: vec![
                file("demo/common/types.proto", &[]),
                file("demo/api/service.proto", &["demo/common/types.proto"]),
            ],
        };
        let path = dir.join("set.pb");
        fs::write(&path, set.encode_to_vec()).unwrap();
        path
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_input_is_required() {
        assert!(Cli::try_parse_from(["reproto"]).is_err());
        assert!(Cli::try_parse_from(["reproto", "--binary", "a", "--directory", "b"]).is_err());
    }

    #[test]
    fn test_descriptor_set_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let set = write_set(temp_dir.path());
        let out = temp_dir.path().join("protobuf");

        let cli = Cli::try_parse_from([
            "reproto",
            "--descriptor-set",
            set.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
        ])
        .unwrap();

        let index = load_index(&cli).unwrap();
        let roots = select_roots(&index, &cli.roots).unwrap();
        let walker = run(DirectoryEmitter::new(&cli.output), &roots, render_config(&cli)).unwrap();

        assert_eq!(
            walker.emitted(),
            ["demo/common/types.proto", "demo/api/service.proto"]
        );
        let service = fs::read_to_string(out.join("demo/api/service.proto")).unwrap();
        assert_eq!(
            service,
            "syntax = \"proto3\";\npackage demo;\nimport \"../common/types.proto\";\n"
        );
    }

    #[test]
    fn test_explicit_root() {
        let temp_dir = TempDir::new().unwrap();
        let set = write_set(temp_dir.path());
        let index = DescriptorIndex::from_descriptor_set(&fs::read(set).unwrap()).unwrap();

        let roots = select_roots(&index, &["demo/common/types.proto".to_string()]).unwrap();
        let walker = run(MemoryEmitter::new(), &roots, RenderConfig::default()).unwrap();
        assert_eq!(walker.emitted(), ["demo/common/types.proto"]);

        assert!(select_roots(&index, &["missing.proto".to_string()]).is_err());
    }

    #[test]
    fn test_binary_input() {
        let temp_dir = TempDir::new().unwrap();
        let mut blob = vec![0x7F, b'E', b'L', b'F', 0x00];
        blob.extend_from_slice(&file("x.proto", &[]).encode_to_vec());
        blob.push(0);
        let path = temp_dir.path().join("libdemo.so");
        fs::write(&path, blob).unwrap();

        let cli = Cli::try_parse_from(["reproto", "--binary", path.to_str().unwrap()]).unwrap();
        let index = load_index(&cli).unwrap();
        assert_eq!(index.names().collect::<Vec<_>>(), ["x.proto"]);
    }

    #[test]
    fn test_is_likely_binary() {
        assert!(!is_likely_binary(Path::new("/tmp/test.txt")));
        assert!(!is_likely_binary(Path::new("/tmp/test.proto")));
        assert!(is_likely_binary(Path::new("/tmp/libfoo.so")));
        assert!(is_likely_binary(Path::new("/tmp/does-not-exist")));
    }
}
