use super::{Platform, PlatformError, RunContext, Submission};
use crate::config;

/// runs the simulation program directly in the run directory
pub struct LocalPlatform;

impl Platform for LocalPlatform {
    fn name(&self) -> &'static str {
        "Local"
    }

    fn stage(&mut self, ctx: &RunContext<'_>) -> Result<Option<Submission>, PlatformError> {
        let which_test = config::text(ctx.params, "whichTest")?;

        Ok(Some(Submission {
            command: format!("python {which_test}.py"),
            workdir: ctx.run_dir.to_path_buf(),
        }))
    }
}
