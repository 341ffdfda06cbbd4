//! per-run workspace materialization and the generated parameter file
//!
//! Every operation takes an explicit target directory; nothing here relies on
//! or mutates the process working directory.

use crate::{config::ParamMap, meta::RunMeta};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("parameter mapping could not be encoded: {0}")]
    Params(#[from] serde_json::Error),
    #[error("no parameter block found in parameter file")]
    MissingBlock,
}

/// create the run directory with its `log` subdirectory and copy the static
/// simulation files into it
///
/// Directory creation is idempotent: an already existing directory is fine
/// (the array platform requests overlapping paths lazily), but a path that
/// exists and is not a directory fails. A missing static file is the
/// operator's concern and only logs a warning.
pub fn create_workspace(
    dir: &Path,
    source_dir: &Path,
    files: &[String],
) -> Result<(), WorkspaceError> {
    info!(dir = %dir.display(), "creating run directory");
    ensure_dir(&dir.join("log"))?;

    for file in files {
        let from = source_dir.join(file);
        let to = dir.join(file);
        match fs::copy(&from, &to) {
            Ok(_) => debug!(file = %file, "copied static file"),
            Err(error) => warn!(file = %file, %error, "failed to copy static file"),
        }
    }

    Ok(())
}

/// idempotent directory creation; an existing directory is fine, a path that
/// exists as something else is not
pub fn ensure_dir(path: &Path) -> Result<(), WorkspaceError> {
    fs::create_dir_all(path).map_err(|source| WorkspaceError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// write the run-specific parameter file
///
/// The file carries a header comment block (generating command line, run
/// identifier, platform, code revision, working-tree status), the parameter
/// mapping as sorted indented JSON rewritten into Python literals, and the
/// two trailing display/persistence flags. The downstream simulation program
/// executes it as configuration.
pub fn write_model_params(
    path: &Path,
    id_string: &str,
    platform: &str,
    params: &ParamMap,
    meta: &RunMeta,
    interactive: bool,
    store_gdf: bool,
) -> Result<(), WorkspaceError> {
    info!(path = %path.display(), "writing parameter file");

    let mut out = String::from("#!/apps/free/python/2.7.10/bin/python\n\n");
    out.push_str(&reproducibility_header(id_string, platform, meta));
    out.push_str("params =\\\n");
    out.push_str(&render_params(params)?);
    out.push_str(&format!("\n\ninteractive = {}\n", py_bool(interactive)));
    out.push_str(&format!("storeGDF = {}\n", py_bool(store_gdf)));

    fs::write(path, out).map_err(|source| WorkspaceError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// the reproducibility comment block stamped into every generated artifact:
/// generating command line, run identifier, platform, code revision and
/// working-tree status
pub fn reproducibility_header(id_string: &str, platform: &str, meta: &RunMeta) -> String {
    let mut header = String::new();
    header.push_str(
        "## This file was auto-generated by the dispatcher called with the following arguments:\n",
    );
    header.push_str(&format!("# {}\n\n", meta.command_line));
    header.push_str("## ID string of experiment:\n");
    header.push_str(&format!("# {id_string}\n\n"));
    header.push_str("## Reproducibility info:\n");
    header.push_str(&format!("#  platform = {platform}\n"));
    header.push_str(&format!("#  {}\n", meta.commit_line));
    header.push_str(&format!("#  {}\n\n", meta.status_line));
    header
}

/// recover the parameter mapping from a generated parameter file
/// the inverse of `write_model_params` for the mapping block
pub fn parse_model_params(contents: &str) -> Result<ParamMap, WorkspaceError> {
    let marker = "params =\\\n";
    let start = contents
        .find(marker)
        .ok_or(WorkspaceError::MissingBlock)?
        + marker.len();
    let block = &contents[start..];
    let end = block.find("\n\ninteractive").unwrap_or(block.len());

    let json = block[..end]
        .replace(": True", ": true")
        .replace(": False", ": false")
        .replace(": None", ": null");
    Ok(serde_json::from_str(&json)?)
}

/// the mapping block: sorted keys, 4-space indent, Python scalar literals
/// NOTE: the literal rewrite assumes no string value embeds `: true` etc.,
/// the same assumption the downstream tooling has always made
fn render_params(params: &ParamMap) -> Result<String, serde_json::Error> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    params.serialize(&mut serializer)?;

    let json = String::from_utf8_lossy(&buffer);
    Ok(json
        .replace(": true", ": True")
        .replace(": false", ": False")
        .replace(": null", ": None"))
}

fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}
