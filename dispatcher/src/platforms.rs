//! backend-specific submission behavior
//!
//! Each backend knows how to turn one resolved combination into its
//! submission artifact and when the submission command may actually be
//! issued. The variant is selected once per dispatch and fixed.

pub mod k;
pub mod local;
pub mod sango;
pub mod sango_array;

use crate::{
    config::{ConfigError, ParamMap},
    meta::RunMeta,
    workspace::WorkspaceError,
};
use std::{
    fs, io,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error("failed to write script {path}: {source}")]
    Script { path: PathBuf, source: io::Error },
}

/// platform selector as exposed on the command line
#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlatformKind {
    #[value(name = "Local")]
    Local,
    #[value(name = "Sango")]
    Sango,
    #[value(name = "SangoArray")]
    SangoArray,
    #[value(name = "K")]
    K,
}

/// a submission command ready to execute (or to print, in mock mode)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub command: String,
    /// directory the command must run in
    pub workdir: PathBuf,
}

/// everything a platform may consult while staging one combination
pub struct RunContext<'a> {
    pub id_string: &'a str,
    /// the run directory (flat platforms) or the shared master directory
    pub run_dir: &'a Path,
    /// the resolved combination for this run
    pub params: &'a ParamMap,
    /// the layered mapping with sweep lists intact
    pub full_params: &'a ParamMap,
    pub files_to_transfer: &'a [String],
    pub sim_counter: u64,
    pub last_sim: u64,
    pub meta: &'a RunMeta,
    pub interactive: bool,
    pub store_gdf: bool,
}

pub trait Platform {
    fn name(&self) -> &'static str;

    /// whether each run gets its own flat workspace with a parameter file
    /// (the array platform manages a shared master directory instead)
    fn flat_workspace(&self) -> bool {
        true
    }

    /// generate the submission artifacts for one combination and decide
    /// whether to submit now (`Some`) or defer (`None`)
    fn stage(&mut self, ctx: &RunContext<'_>) -> Result<Option<Submission>, PlatformError>;
}

/// all backend variants behind one enum
/// (this is deliberately not made with dynamic dispatch, the variant set is
/// small and fixed)
pub enum Platforms {
    Local(local::LocalPlatform),
    Sango(sango::SangoPlatform),
    SangoArray(sango_array::SangoArrayPlatform),
    K(k::KPlatform),
}

impl Platforms {
    pub fn load(kind: PlatformKind) -> Self {
        match kind {
            PlatformKind::Local => Self::Local(local::LocalPlatform),
            PlatformKind::Sango => Self::Sango(sango::SangoPlatform),
            PlatformKind::SangoArray => Self::SangoArray(sango_array::SangoArrayPlatform),
            PlatformKind::K => Self::K(k::KPlatform),
        }
    }
}

impl Platform for Platforms {
    fn name(&self) -> &'static str {
        match self {
            Self::Local(platform) => platform.name(),
            Self::Sango(platform) => platform.name(),
            Self::SangoArray(platform) => platform.name(),
            Self::K(platform) => platform.name(),
        }
    }

    fn flat_workspace(&self) -> bool {
        match self {
            Self::Local(platform) => platform.flat_workspace(),
            Self::Sango(platform) => platform.flat_workspace(),
            Self::SangoArray(platform) => platform.flat_workspace(),
            Self::K(platform) => platform.flat_workspace(),
        }
    }

    fn stage(&mut self, ctx: &RunContext<'_>) -> Result<Option<Submission>, PlatformError> {
        match self {
            Self::Local(platform) => platform.stage(ctx),
            Self::Sango(platform) => platform.stage(ctx),
            Self::SangoArray(platform) => platform.stage(ctx),
            Self::K(platform) => platform.stage(ctx),
        }
    }
}

pub(crate) fn write_file(path: &Path, contents: &str) -> Result<(), PlatformError> {
    fs::write(path, contents).map_err(|source| PlatformError::Script {
        path: path.to_path_buf(),
        source,
    })
}

/// write a script that other scripts invoke directly
pub(crate) fn write_executable(path: &Path, contents: &str) -> Result<(), PlatformError> {
    write_file(path, contents)?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|source| {
        PlatformError::Script {
            path: path.to_path_buf(),
            source,
        }
    })
}
