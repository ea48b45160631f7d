//! xdm - Structural XML Diff and Merge Tool CLI
//!
//! Computes the differences between two similar XML files as an ordered set
//! of path-keyed add/remove/change entries, and grafts them onto a third,
//! independently-evolved file.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use xml_xdm::{IdentifierSet, XmlDelta};

/// Structural XML Diff and Merge Tool
#[derive(Parser)]
#[command(name = "xdm")]
#[command(version)]
#[command(about = "Structural XML diff and merge tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Identifier attribute names, in priority order
    #[arg(
        long,
        global = true,
        value_delimiter = ',',
        default_values_t = ["name".to_string(), "id".to_string(), "key".to_string()]
    )]
    identifiers: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the differences between an original file and a modified one
    #[command(visible_alias = "d")]
    Diff {
        /// Original, unmodified XML file
        original: String,
        /// Modified XML file
        modified: String,
        /// Output file (default: stdout)
        output: Option<String>,

        /// Emit the compact single-line form instead of the readable one
        #[arg(short, long)]
        compact: bool,
    },

    /// Apply a stored diff to a target file, in place
    #[command(visible_alias = "a")]
    Apply {
        /// Diff file produced by the diff command
        difffile: String,
        /// Target XML file to patch in place
        target: String,
    },

    /// Diff two files and merge the result into a copy of a third
    ///
    /// Writes <target>.diff.xml with the differences and
    /// <target>.merged.<ext> with the merged result.
    #[command(visible_alias = "m")]
    Merge {
        /// Original, unmodified XML file
        original: String,
        /// Modified XML file
        modified: String,
        /// Target XML file to merge the differences into
        target: String,
    },
}

fn main() -> std::process::ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    let identifiers = IdentifierSet::new(cli.identifiers.clone());

    let result = match cli.command {
        Commands::Diff {
            original,
            modified,
            output,
            compact,
        } => run_diff(&original, &modified, output.as_deref(), compact, &identifiers),
        Commands::Apply { difffile, target } => run_apply(&difffile, &target),
        Commands::Merge {
            original,
            modified,
            target,
        } => run_merge(&original, &modified, &target, &identifiers),
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

/// Computes and writes a diff.
fn run_diff(
    original: &str,
    modified: &str,
    output: Option<&str>,
    compact: bool,
    identifiers: &IdentifierSet,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Comparing {} to {}", modified, original);
    let delta = XmlDelta::between_files_with(original, modified, identifiers, None)?;

    eprintln!(
        "{} adds, {} removes, {} changes",
        delta.adds.len(),
        delta.removes.len(),
        delta.changes.len()
    );

    let text = delta.serialize(compact)?;
    match output {
        Some(path) => fs::write(path, text)?,
        None => print!("{}", text),
    }

    Ok(())
}

/// Applies a stored diff to a target file.
fn run_apply(difffile: &str, target: &str) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Loading diff: {}", difffile);
    let delta = XmlDelta::deserialize(&fs::read_to_string(difffile)?)?;

    if !delta.is_different() {
        eprintln!("Diff is empty; nothing to do.");
        return Ok(());
    }

    eprintln!("Patching {}", target);
    delta.apply_to_file(target, None, None)?;
    eprintln!("Patch complete.");
    Ok(())
}

/// Diffs two files and merges the result into a copy of the target,
/// leaving the diff next to it for inspection.
fn run_merge(
    original: &str,
    modified: &str,
    target: &str,
    identifiers: &IdentifierSet,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Comparing {} to {}", modified, original);
    let delta = XmlDelta::between_files_with(original, modified, identifiers, None)?;

    let diff_file = sibling_with_suffix(target, "diff.xml");
    fs::write(&diff_file, delta.serialize(false)?)?;
    eprintln!("Differences written to {}", diff_file.display());

    if !delta.is_different() {
        eprintln!("Documents are structurally identical; nothing to merge.");
        return Ok(());
    }

    // Merge into a copy so the target itself stays untouched
    let merged_file = merged_name(target);
    fs::copy(target, &merged_file)?;
    delta.apply_to_file(&merged_file, None, None)?;
    eprintln!("Merged result written to {}", merged_file.display());

    Ok(())
}

/// `dir/name.ext` -> `dir/name.<suffix>`
fn sibling_with_suffix(path: &str, suffix: &str) -> PathBuf {
    let path = Path::new(path);
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    path.with_file_name(format!("{}.{}", stem, suffix))
}

/// `dir/name.ext` -> `dir/name.merged.ext`
fn merged_name(path: &str) -> PathBuf {
    let path = Path::new(path);
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    match path.extension() {
        Some(ext) => path.with_file_name(format!("{}.merged.{}", stem, ext.to_string_lossy())),
        None => path.with_file_name(format!("{}.merged", stem)),
    }
}
