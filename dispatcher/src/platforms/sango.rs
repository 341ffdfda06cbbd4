use super::{write_file, Platform, PlatformError, RunContext, Submission};
use crate::config;
use tracing::info;

/// one scheduler job per run, submitted synchronously with `sbatch`
pub struct SangoPlatform;

impl Platform for SangoPlatform {
    fn name(&self) -> &'static str {
        "Sango"
    }

    fn stage(&mut self, ctx: &RunContext<'_>) -> Result<Option<Submission>, PlatformError> {
        let script_path = ctx.run_dir.join("go.slurm");
        info!(path = %script_path.display(), "writing slurm script file");
        write_file(&script_path, &slurm_script(ctx)?)?;

        Ok(Some(Submission {
            command: "sbatch go.slurm".to_owned(),
            workdir: ctx.run_dir.to_path_buf(),
        }))
    }
}

fn slurm_script(ctx: &RunContext<'_>) -> Result<String, PlatformError> {
    let duration_h = config::render(ctx.params, "durationH")?;
    let duration_min = config::render(ctx.params, "durationMin")?;
    let nbcpu = config::render(ctx.params, "nbcpu")?;
    let email = config::render(ctx.params, "email")?;
    let which_test = config::text(ctx.params, "whichTest")?;
    let id = ctx.id_string;

    let mut script = String::from("#!/bin/bash\n\n");
    script.push_str(&format!("#SBATCH --time={duration_h}:{duration_min}:00\n"));
    script.push_str("#SBATCH --partition=compute\n");
    script.push_str("#SBATCH --mem-per-cpu=500M\n");
    script.push_str("#SBATCH --ntasks=1\n");
    script.push_str(&format!("#SBATCH --cpus-per-task={nbcpu}\n"));
    script.push_str(&format!("#SBATCH --job-name=sBCBG_{id}\n"));
    script.push_str("#SBATCH --input=none\n");
    script.push_str(&format!("#SBATCH --output=\"{id}.out\"\n"));
    script.push_str(&format!("#SBATCH --error=\"{id}.err\"\n"));
    script.push_str(&format!("#SBATCH --mail-user={email}\n"));
    script.push_str("#SBATCH --mail-type=BEGIN,END,FAIL\n\n");
    script.push_str("module use /apps/unit/DoyaU/.modulefiles/\n");
    script.push_str("module load nest/2.10\n\n");
    script.push_str(&format!("time srun --mpi=pmi2 python {which_test}.py\n"));

    Ok(script)
}
