use super::{write_executable, write_file, Platform, PlatformError, RunContext, Submission};
use crate::{config, explore, workspace};
use itertools::Itertools;
use std::path::PathBuf;
use tracing::{debug, info};

/// how many runs each array task processes
pub const ARRAY_SIZE: u64 = 100;
/// scheduler-side cap on simultaneously running array tasks
pub const MAX_ACTIVE_TASKS: u64 = 200;

const LOG_DIR: &str = "array_log";

/// batches many runs under one scheduler array job
///
/// The target filesystem penalizes large numbers of small discrete
/// submissions, so per-run work is kept minimal: master artifacts are written
/// once on the first combination, every combination only creates its numbered
/// leaf directory, and the single `sbatch --array` submission happens on the
/// last combination. Run parameters are not stored per leaf; they are
/// recovered later from the leaf's numeric position and the manifest files.
pub struct SangoArrayPlatform;

/// numeric leaf path of one combination: nine digits split into three
/// segments, collision-free up to 10^9 combinations
pub fn leaf_path(counter: u64) -> PathBuf {
    let digits = format!("{counter:09}");
    [&digits[0..3], &digits[3..6], &digits[6..9]].iter().collect()
}

impl Platform for SangoArrayPlatform {
    fn name(&self) -> &'static str {
        "SangoArray"
    }

    fn flat_workspace(&self) -> bool {
        false
    }

    fn stage(&mut self, ctx: &RunContext<'_>) -> Result<Option<Submission>, PlatformError> {
        // master artifacts must exist before any leaf directory is created
        if ctx.sim_counter == 0 {
            init_master(ctx)?;
        }

        let leaf = ctx.run_dir.join(leaf_path(ctx.sim_counter));
        workspace::ensure_dir(&leaf)?;
        debug!(leaf = %leaf.display(), "created leaf directory");

        if ctx.sim_counter == ctx.last_sim {
            // task ids are inclusive and each covers ARRAY_SIZE indices, so
            // flooring the final index covers the last partial batch exactly
            let top_task = ctx.last_sim / ARRAY_SIZE;
            Ok(Some(Submission {
                command: format!(
                    "sbatch --array=0-{top_task}%{MAX_ACTIVE_TASKS} {}.slurm",
                    ctx.id_string
                ),
                workdir: ctx.run_dir.to_path_buf(),
            }))
        } else {
            Ok(None)
        }
    }
}

/// once-only setup of the shared master directory: log directory, one
/// manifest per swept parameter, the base parameter file, the bootstrap
/// script and the array submission script
fn init_master(ctx: &RunContext<'_>) -> Result<(), PlatformError> {
    let master = ctx.run_dir;
    info!(master = %master.display(), "initializing array master directory");

    workspace::ensure_dir(&master.join(LOG_DIR))?;

    for (param, values) in explore::varied(ctx.full_params) {
        let manifest = master.join(format!("{param}.txt"));
        write_file(&manifest, &format!("{}\n", values.iter().join("\n")))?;
    }

    workspace::write_model_params(
        &master.join("baseModelParams.py"),
        ctx.id_string,
        "SangoArray",
        ctx.full_params,
        ctx.meta,
        ctx.interactive,
        ctx.store_gdf,
    )?;

    write_executable(&master.join("firestarter.sh"), &firestarter(ctx)?)?;

    let script_path = master.join(format!("{}.slurm", ctx.id_string));
    info!(path = %script_path.display(), "writing slurm array script file");
    write_file(&script_path, &array_script(ctx)?)?;

    Ok(())
}

/// bootstrap run from inside each leaf directory by an array task: stages
/// the static files onto node-local scratch, runs the simulation program and
/// copies the score summary back into the leaf
fn firestarter(ctx: &RunContext<'_>) -> Result<String, PlatformError> {
    let which_test = config::text(ctx.params, "whichTest")?;

    let mut script = String::from("#!/bin/bash\n\n");
    script.push_str("dir=$(pwd)\n");
    script.push_str("xpbase=$(cd ../../.. && pwd)\n");
    script.push_str("workdir=/scratch/${SLURM_JOB_ID}_$(basename $dir)\n");
    script.push_str("mkdir -p $workdir\n");
    script.push_str("cd $workdir\n");
    for file in ctx.files_to_transfer {
        script.push_str(&format!("cp $xpbase/../{file} $(pwd)/\n"));
    }
    script.push_str(&format!("python {which_test}.py\n"));
    script.push_str("cp params_score.csv $dir/\n");
    script.push_str("rm -rf /scratch/$(basename $workdir)\n");

    Ok(script)
}

/// the array submission script: resource directives plus a loop that maps
/// each index of the task's window to its leaf path and fires the bootstrap
/// for every leaf that exists, in parallel
fn array_script(ctx: &RunContext<'_>) -> Result<String, PlatformError> {
    let duration_h = config::render(ctx.params, "durationH")?;
    let nbcpu = config::render(ctx.params, "nbcpu")?;
    let email = config::render(ctx.params, "email")?;
    let id = ctx.id_string;

    let mut script = String::from("#!/bin/bash\n\n");
    script.push_str(&format!("#SBATCH --time={duration_h}:00:00\n"));
    script.push_str("#SBATCH --partition=compute\n");
    script.push_str("#SBATCH --mem-per-cpu=1000M\n");
    script.push_str(&format!("#SBATCH --ntasks={ARRAY_SIZE}\n"));
    script.push_str(&format!("#SBATCH --cpus-per-task={nbcpu}\n"));
    script.push_str(&format!("#SBATCH --job-name=sBCBG_{id}\n"));
    script.push_str("#SBATCH --input=none\n");
    script.push_str(&format!("#SBATCH --output=\"{LOG_DIR}/{id}_%A.out\"\n"));
    script.push_str(&format!("#SBATCH --error=\"{LOG_DIR}/{id}_%A.err\"\n"));
    script.push_str(&format!("#SBATCH --mail-user={email}\n"));
    script.push_str("#SBATCH --mail-type=BEGIN,END,FAIL\n\n");
    script.push_str("module use /apps/unit/DoyaU/.modulefiles/\n");
    script.push_str("module load nest/2.10\n\n");
    script.push_str("SECONDS=0\n");
    script.push_str("PROCESS_STARTED=0\n");
    script.push_str(&format!(
        "for subtask in `seq $(($SLURM_ARRAY_TASK_ID*{ARRAY_SIZE})) $((($SLURM_ARRAY_TASK_ID+1)*{ARRAY_SIZE}-1))`\ndo\n"
    ));
    script.push_str("  XPNAME=$(printf \"%09d\" $subtask)\n");
    script.push_str("  XPDIR=\"${XPNAME: -9:3}/${XPNAME: -6:3}/${XPNAME: -3}\"\n");
    script.push_str("  if [ -d \"$XPDIR\" ]; then\n");
    script.push_str("    (>&2 echo \"STARTING SUBTASK: $subtask\")\n");
    script.push_str("    (>&2 echo \"XP NAME: $XPNAME\")\n");
    script.push_str("    (>&2 echo \"XP DIR: $XPDIR\")\n");
    script.push_str("    PROCESS_STARTED=$(($PROCESS_STARTED+1))\n");
    script.push_str(
        "    srun -c1 --mem-per-cpu=500M --exclusive --ntasks 1 --chdir $XPDIR ../../../firestarter.sh &\n",
    );
    script.push_str("  fi\n");
    script.push_str("done\n");
    script.push_str("wait\n");
    script.push_str(
        "(>&2 echo \"SUMMARY: ran n=$PROCESS_STARTED processes in t=$SECONDS seconds overall\")\n",
    );

    Ok(script)
}
