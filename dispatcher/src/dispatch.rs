//! the dispatch orchestrator: configuration layering, grid expansion and
//! per-combination launch

use crate::{
    config::{self, ConfigError, Overrides, ParamMap},
    explore,
    meta::RunMeta,
    platforms::{Platform, PlatformError, PlatformKind, Platforms, RunContext, Submission},
    workspace::{self, WorkspaceError},
};
use std::{path::PathBuf, process::Command};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// everything the command line decides about one dispatch
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub platform: PlatformKind,
    /// optional custom parameter file, layered over the built-in defaults
    pub custom: Option<PathBuf>,
    pub overrides: Overrides,
    pub interactive: bool,
    pub store_gdf: bool,
    /// generate everything but never execute the submission command
    pub mock: bool,
    /// directory run directories are created under
    pub root: PathBuf,
    /// directory the static simulation files are copied from
    pub source_dir: PathBuf,
}

/// owns the sweep counters and routes every resolved combination through
/// workspace materialization and the selected platform
pub struct JobDispatcher {
    platform: Platforms,
    request: DispatchRequest,
    meta: RunMeta,
    /// the layered parameter mapping, sweep lists intact
    params: ParamMap,
    files_to_transfer: Vec<String>,
    /// 0-based index of the combination currently being processed
    sim_counter: u64,
    /// index of the final combination, known before expansion starts
    last_sim: u64,
}

impl JobDispatcher {
    pub fn new(request: DispatchRequest, meta: RunMeta) -> Self {
        Self {
            platform: Platforms::load(request.platform),
            request,
            meta,
            params: ParamMap::new(),
            files_to_transfer: Vec::new(),
            sim_counter: 0,
            last_sim: 0,
        }
    }

    /// layer the configuration and launch one run per combination
    pub fn dispatch(&mut self) -> Result<(), DispatchError> {
        self.params = config::base_params();
        if let Some(path) = self.request.custom.clone() {
            let custom = config::load_custom(&path)?;
            self.params.extend(custom);
        }
        config::apply_overrides(&mut self.params, &self.request.overrides);
        config::expand_values(&mut self.params);

        self.files_to_transfer = transfer_list(&self.params)?;
        // the array platform needs the final index before the first
        // combination is processed
        self.last_sim = explore::combination_count(&self.params).saturating_sub(1);
        info!(
            runs = self.last_sim + 1,
            platform = self.platform.name(),
            "dispatching parameter grid"
        );

        let full = self.params.clone();
        explore::explore(&full, &mut |combination| self.launch_one(combination))
    }

    /// materialize the workspace for one resolved combination and issue (or
    /// defer) its submission
    fn launch_one(&mut self, combination: &ParamMap) -> Result<(), DispatchError> {
        let flat = self.platform.flat_workspace();
        let id_string = if flat {
            self.meta.run_id(self.sim_counter)
        } else {
            // the array platform shares one master directory across runs
            self.meta.array_id()
        };
        let run_dir = self.request.root.join(&id_string);

        if flat {
            workspace::create_workspace(
                &run_dir,
                &self.request.source_dir,
                &self.files_to_transfer,
            )?;
            workspace::write_model_params(
                &run_dir.join("modelParams.py"),
                &id_string,
                self.platform.name(),
                combination,
                &self.meta,
                self.request.interactive,
                self.request.store_gdf,
            )?;
        }

        let ctx = RunContext {
            id_string: &id_string,
            run_dir: &run_dir,
            params: combination,
            full_params: &self.params,
            files_to_transfer: &self.files_to_transfer,
            sim_counter: self.sim_counter,
            last_sim: self.last_sim,
            meta: &self.meta,
            interactive: self.request.interactive,
            store_gdf: self.request.store_gdf,
        };
        if let Some(submission) = self.platform.stage(&ctx)? {
            submit(&submission, self.request.mock);
        }

        self.sim_counter += 1;
        Ok(())
    }
}

/// execute a submission command, or only print it in mock mode
/// failures are the scheduler's concern and are logged, never retried
fn submit(submission: &Submission, mock: bool) {
    if mock {
        info!(command = %submission.command, "mock run, command not executed");
        return;
    }

    info!(command = %submission.command, "executing submission command");
    match Command::new("sh")
        .arg("-c")
        .arg(&submission.command)
        .current_dir(&submission.workdir)
        .status()
    {
        Ok(status) if status.success() => debug!("submission command finished"),
        Ok(status) => warn!(%status, "submission command failed, see the scheduler logs"),
        Err(error) => warn!(%error, "failed to spawn submission command"),
    }
}

/// the static files every run needs; depends on the selected test program,
/// so it is recomputed once after configuration layering
fn transfer_list(params: &ParamMap) -> Result<Vec<String>, ConfigError> {
    let which_test = config::text(params, "whichTest")?;
    Ok(vec![
        "LGneurons.py".to_owned(),
        "iniBG.py".to_owned(),
        format!("{which_test}.py"),
        "nstrand.py".to_owned(),
        "solutions_simple_unique.csv".to_owned(),
        "__init__.py".to_owned(),
    ])
}
