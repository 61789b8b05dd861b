//! tmfgen - Generate manifest event classes from legacy TMF files
//!
//! This tool parses trace message format (TMF) descriptor files and writes
//! C# event classes usable by manifest-based trace decoders.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tmfgen_core::{
    CSharpIdentifiers, CSharpRenderer, NameAllocator, NamespaceRegistry, Schema, StatsWriter,
    TmfParser,
};
use tracing::{debug, error, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Generate manifest event classes from legacy TMF trace descriptors
#[derive(Parser, Debug)]
#[command(name = "tmfgen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Output directory for generated sources
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value = "csharp")]
    format: OutputFormat,

    /// Scope of namespace name uniqueness
    #[arg(long, value_enum, default_value = "shared")]
    namespace_scope: NamespaceScope,

    /// Dry run - don't write files, just show what would be generated
    #[arg(long)]
    dry_run: bool,

    /// Overwrite existing files without prompting
    #[arg(long)]
    force: bool,

    /// Only list parsed files without generating
    #[arg(long)]
    list_only: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single TMF file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory searched recursively for .tmf files
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Output format for parsed schemas
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// C# event classes
    Csharp,
    /// Per-file namespace, class and field counts
    Summary,
}

/// How far namespace names must be unique
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum NamespaceScope {
    /// Unique across every file of the run
    Shared,
    /// Unique within each file only
    PerFile,
}

/// Tracks written outputs for deduplication
#[derive(Default)]
struct OutputRegistry {
    /// Maps output filename -> content hashes already written under it
    seen: HashMap<String, Vec<String>>,
    /// Statistics
    stats: RegistryStats,
}

#[derive(Default)]
struct RegistryStats {
    total_parsed: usize,
    failed: usize,
    duplicates_skipped: usize,
    conflicts_renamed: usize,
    written: usize,
}

impl OutputRegistry {
    fn new() -> Self {
        Self::default()
    }

    /// Compute a short hash of the content (first 8 chars of blake3)
    fn content_hash(content: &str) -> String {
        let hash = blake3::hash(content.as_bytes());
        hash.to_hex()[..8].to_string()
    }

    /// Register generated source and return where to write it, or `None`
    /// if identical content was already produced under this name
    fn register(&mut self, filename: &str, content_hash: &str, output_dir: &Path) -> Option<PathBuf> {
        let variants = self.seen.entry(filename.to_string()).or_default();

        if variants.iter().any(|h| h == content_hash) {
            debug!("Skipping duplicate: {} (hash: {})", filename, content_hash);
            self.stats.duplicates_skipped += 1;
            return None;
        }

        let output_path = if variants.is_empty() {
            output_dir.join(filename)
        } else {
            let new_name = Self::add_suffix(filename, &format!("~{}", content_hash));
            info!("Conflict resolved: {} -> {} (content differs)", filename, new_name);
            self.stats.conflicts_renamed += 1;
            output_dir.join(new_name)
        };

        variants.push(content_hash.to_string());
        Some(output_path)
    }

    /// Add a suffix before the .cs extension
    fn add_suffix(filename: &str, suffix: &str) -> String {
        if let Some(stem) = filename.strip_suffix(".cs") {
            format!("{}{}.cs", stem, suffix)
        } else {
            format!("{}{}", filename, suffix)
        }
    }

    fn print_summary(&self) {
        info!(
            "Summary: {} parsed, {} failed, {} duplicates skipped, {} conflicts renamed, {} written",
            self.stats.total_parsed,
            self.stats.failed,
            self.stats.duplicates_skipped,
            self.stats.conflicts_renamed,
            self.stats.written
        );
    }
}

/// Per-run state shared by every processed file
struct Run<'a> {
    cli: &'a Cli,
    registry: Arc<NamespaceRegistry>,
    renderer: CSharpRenderer,
    outputs: OutputRegistry,
}

impl<'a> Run<'a> {
    fn new(cli: &'a Cli) -> Self {
        Self {
            cli,
            registry: NamespaceRegistry::shared(),
            renderer: CSharpRenderer::new(),
            outputs: OutputRegistry::new(),
        }
    }

    fn parser(&self) -> TmfParser {
        let names = NameAllocator::new().with_normalizer(Arc::new(CSharpIdentifiers));
        let names = match self.cli.namespace_scope {
            NamespaceScope::Shared => names.with_registry(self.registry.clone()),
            NamespaceScope::PerFile => names,
        };
        TmfParser::with_allocator(names)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
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

    let mut run = Run::new(&cli);

    // Dispatch based on input mode
    if let Some(ref file) = cli.input.file {
        process_single_file(&mut run, file)?;
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&mut run, directory)?;
    } else {
        bail!("Either --file or --directory must be specified")
    }

    if !cli.list_only && !cli.dry_run {
        run.outputs.print_summary();
    }

    Ok(())
}

/// Process a single TMF file
fn process_single_file(run: &mut Run<'_>, file: &Path) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    process_tmf(run, file)
}

/// Process every TMF file below a directory
fn process_directory(run: &mut Run<'_>, directory: &Path) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    // Shared namespace suffixes depend on visit order.
    let mut files_processed = 0;
    for entry in WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        if !is_tmf(path) {
            trace!("Skipping non-TMF file: {}", path.display());
            continue;
        }

        debug!("Processing TMF: {}", path.display());
        if let Err(e) = process_tmf(run, path) {
            // Log error but continue with other files
            warn!("Error processing {}: {:#}", path.display(), e);
        }
        files_processed += 1;
    }

    info!("Processed {} TMF files", files_processed);
    Ok(())
}

/// Returns true for files with a `.tmf` extension, in any case
fn is_tmf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("tmf"))
        .unwrap_or(false)
}

/// Parse one TMF file and emit its output
fn process_tmf(run: &mut Run<'_>, path: &Path) -> Result<()> {
    let schema = match run.parser().parse_file(path) {
        Ok(schema) => schema,
        Err(e) => {
            run.outputs.stats.failed += 1;
            if e.is_format_error() {
                return Err(e).with_context(|| format!("Malformed TMF file: {}", path.display()));
            }
            return Err(e).with_context(|| format!("Failed to read: {}", path.display()));
        }
    };
    run.outputs.stats.total_parsed += 1;

    if run.cli.list_only {
        println!("{}", path.display());
        return Ok(());
    }

    match run.cli.format {
        OutputFormat::Summary => print_stats(path, &schema),
        OutputFormat::Csharp => emit_source(run, path, &schema),
    }
}

fn print_stats(path: &Path, schema: &Schema) -> Result<()> {
    let mut stats = StatsWriter::default();
    schema
        .walk(&mut stats)
        .with_context(|| format!("Failed to walk schema of {}", path.display()))?;
    println!(
        "{}: {} namespaces, {} classes, {} fields ({} with fallback type)",
        path.display(),
        stats.namespace_count,
        stats.class_count,
        stats.field_count,
        stats.fallback_field_count
    );
    Ok(())
}

fn emit_source(run: &mut Run<'_>, path: &Path, schema: &Schema) -> Result<()> {
    if schema.is_empty() {
        debug!("No events in {}", path.display());
    }

    let content = run.renderer.render(schema);
    let content_hash = OutputRegistry::content_hash(&content);
    let filename = schema.output_filename();

    let Some(output_path) = run
        .outputs
        .register(&filename, &content_hash, &run.cli.output)
    else {
        return Ok(());
    };

    if run.cli.dry_run {
        println!("Would write: {}", output_path.display());
        if run.cli.verbose > 0 {
            println!("---");
            println!("{}", content);
            println!("---");
        }
        return Ok(());
    }

    match write_source_file(&output_path, &content, run.cli.force) {
        Ok(()) => {
            println!("Wrote {}", output_path.display());
            run.outputs.stats.written += 1;
        }
        Err(e) => {
            error!("Failed to write {}: {:#}", output_path.display(), e);
        }
    }
    Ok(())
}

/// Write a generated source file to disk
fn write_source_file(output_path: &Path, content: &str, force: bool) -> Result<()> {
    // Create parent directories
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    if output_path.exists() && !force {
        bail!(
            "File already exists: {} (use --force to overwrite)",
            output_path.display()
        );
    }

    let mut file = fs::File::create(output_path)
        .with_context(|| format!("Failed to create file: {}", output_path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write file: {}", output_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TMF: &str = "// PDB:  foo.pdb
// PDB:  Last Updated :2012-5-4:12:51:1:778 (UTC) [ManagedWPP]
0d7b2cbb-0000-4a3a-9e2e-6b3a1b1e0f00 FooLib // SRC=foo.cpp MJ= MN=
#typev foo_cpp10 11 \"%0Started\" // LEVEL=Info FUNC=Foo::Start
{
name, ItemString -- 10
}
";

    #[test]
    fn test_output_registry_deduplication() {
        let mut registry = OutputRegistry::new();
        let temp_dir = TempDir::new().unwrap();
        let hash = OutputRegistry::content_hash("class Line1 {}");

        let path1 = registry.register("Foo.foo_cpp.cs", &hash, temp_dir.path());
        assert!(path1.unwrap().ends_with("Foo.foo_cpp.cs"));

        let path2 = registry.register("Foo.foo_cpp.cs", &hash, temp_dir.path());
        assert!(path2.is_none());
        assert_eq!(registry.stats.duplicates_skipped, 1);
    }

    #[test]
    fn test_output_registry_conflict_hash_suffix() {
        let mut registry = OutputRegistry::new();
        let temp_dir = TempDir::new().unwrap();
        let hash1 = OutputRegistry::content_hash("class Line1 {}");
        let hash2 = OutputRegistry::content_hash("class Line2 {}");

        registry.register("Foo.foo_cpp.cs", &hash1, temp_dir.path());
        let path2 = registry
            .register("Foo.foo_cpp.cs", &hash2, temp_dir.path())
            .unwrap();
        let path2_str = path2.to_string_lossy().to_string();
        assert!(path2_str.contains("Foo.foo_cpp~"));
        assert!(path2_str.ends_with(".cs"));
        assert_eq!(registry.stats.conflicts_renamed, 1);
    }

    #[test]
    fn test_add_suffix() {
        assert_eq!(
            OutputRegistry::add_suffix("Comp.src_c.cs", "~abc123"),
            "Comp.src_c~abc123.cs"
        );
        assert_eq!(OutputRegistry::add_suffix("noext", "~abc"), "noext~abc");
    }

    #[test]
    fn test_content_hash() {
        let hash1 = OutputRegistry::content_hash("hello");
        let hash2 = OutputRegistry::content_hash("hello");
        let hash3 = OutputRegistry::content_hash("world");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 8);
    }

    #[test]
    fn test_is_tmf() {
        assert!(is_tmf(Path::new("/tmp/a.tmf")));
        assert!(is_tmf(Path::new("/tmp/A.TMF")));
        assert!(!is_tmf(Path::new("/tmp/a.txt")));
        assert!(!is_tmf(Path::new("/tmp/tmf")));
    }

    #[test]
    fn test_process_directory_writes_sources() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(input.path().join("foo.tmf"), TMF).unwrap();
        fs::write(input.path().join("broken.tmf"), "nope\n").unwrap();
        fs::write(input.path().join("notes.txt"), "ignored").unwrap();

        let cli = Cli::parse_from([
            "tmfgen",
            "--directory",
            input.path().to_str().unwrap(),
            "--output",
            output.path().to_str().unwrap(),
        ]);
        let mut run = Run::new(&cli);
        process_directory(&mut run, input.path()).unwrap();

        assert_eq!(run.outputs.stats.total_parsed, 1);
        assert_eq!(run.outputs.stats.failed, 1);
        assert_eq!(run.outputs.stats.written, 1);

        let generated = fs::read_to_string(output.path().join("FooLib.foo_cpp.cs")).unwrap();
        assert!(generated.contains("namespace FooStart"));
        assert!(generated.contains("class Line10"));
    }

    #[test]
    fn test_namespace_scope() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foo.tmf");
        fs::write(&path, TMF).unwrap();

        let cli = Cli::parse_from(["tmfgen", "--file", path.to_str().unwrap()]);
        let run = Run::new(&cli);
        run.parser().parse_file(&path).unwrap();
        let second = run.parser().parse_file(&path).unwrap();
        assert_eq!(second.namespaces[0].name, "FooStart_1");

        let cli = Cli::parse_from([
            "tmfgen",
            "--file",
            path.to_str().unwrap(),
            "--namespace-scope",
            "per-file",
        ]);
        let run = Run::new(&cli);
        run.parser().parse_file(&path).unwrap();
        let second = run.parser().parse_file(&path).unwrap();
        assert_eq!(second.namespaces[0].name, "FooStart");
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
