use super::{write_file, Platform, PlatformError, RunContext, Submission};
use crate::{config, workspace};
use tracing::info;

/// remote supercomputer batch system (PJM)
///
/// Submission is a two-stage pair: `bg.sh` sets up the runtime environment on
/// the compute node and runs the simulation program, `my_job.sh` carries the
/// PJM resource request and the stage-in/stage-out transfer directives. The
/// directive syntax is fixed by the scheduler and must not be reformatted.
pub struct KPlatform;

impl Platform for KPlatform {
    fn name(&self) -> &'static str {
        "K"
    }

    fn stage(&mut self, ctx: &RunContext<'_>) -> Result<Option<Submission>, PlatformError> {
        let which_test = config::text(ctx.params, "whichTest")?;
        let nbnodes = config::render(ctx.params, "nbnodes")?;

        write_file(&ctx.run_dir.join("bg.sh"), &inner_script(which_test))?;

        let job_path = ctx.run_dir.join("my_job.sh");
        info!(path = %job_path.display(), "writing PJM script file");
        write_file(&job_path, &job_script(ctx, &nbnodes))?;

        Ok(Some(Submission {
            command: "pjsub ./my_job.sh".to_owned(),
            workdir: ctx.run_dir.to_path_buf(),
        }))
    }
}

fn inner_script(which_test: &str) -> String {
    let mut script = String::from("#!/bin/sh\n");
    script.push_str("export HOME=\".\"\n");
    script.push_str(
        "export PATH=\"/opt/klocal/Python-2.7/bin:../bin:../gsl-2.1.install/bin:${PATH}\"\n",
    );
    script.push_str(
        "export LD_LIBRARY_PATH=\"/opt/klocal/Python-2.7/lib:/opt/klocal/cblas/lib:/opt/local/Python-2.7.3/lib:../lib:../gsl-2.1.install/lib:${LD_LIBRARY_PATH}\"\n",
    );
    script.push_str("export NEST_DATA_DIR=\"../share/nest\"\n");
    script.push_str("export PYTHONPATH=\"../lib/python2.7/site-packages\"\n");
    script.push_str(". ../bin/nest_vars.sh\n");
    script.push_str("mkdir ./log\n");
    script.push_str(&format!("python {which_test}.py\n"));
    script
}

fn job_script(ctx: &RunContext<'_>, nbnodes: &str) -> String {
    let mut script = String::from("#!/bin/bash -x\n");
    // reproducibility trace, stamped before the scheduler directives
    script.push_str(&workspace::reproducibility_header(
        ctx.id_string,
        "K",
        ctx.meta,
    ));
    script.push_str("#PJM -m b\n");
    script.push_str("#PJM -m e\n");
    script.push_str("#PJM --rsc-list \"rscgrp=small\"\n");
    script.push_str(&format!("#PJM --rsc-list \"node={nbnodes}\"\n"));
    script.push_str("#PJM --rsc-list \"elapse=23:50:00\"\n");
    script.push_str(&format!("#PJM --mpi \"proc={nbnodes}\"\n"));
    script.push_str("#PJM -s\n");
    script.push_str("#PJM --stg-transfiles all\n");
    script.push_str("#PJM --mpi \"use-rankdir\"\n");
    script.push_str("#PJM --stgin \"rank=* ./*.py %r:./\"\n");
    script.push_str("#PJM --stgin \"rank=* ./bg.sh %r:./\"\n");
    script.push_str("#PJM --stgin \"rank=* ./*.csv %r:./\"\n");
    script.push_str(
        "#PJM --stgin-dir \"rank=0 ../../nest-2.12.0-install-gsl/bin 0:../bin recursive=7\"\n",
    );
    script.push_str(
        "#PJM --stgin-dir \"rank=0 ../../nest-2.12.0-install-gsl/lib 0:../lib recursive=7\"\n",
    );
    script.push_str(
        "#PJM --stgin-dir \"rank=0 ../../nest-2.12.0-install-gsl/share 0:../share recursive=7\"\n",
    );
    script.push_str("#PJM --stgin \"rank=0 ../../gsl.tgz 0:../\"\n");
    script.push_str("#PJM --stgout \"rank=* %r:./log/* ./log/ stgout=all\"\n\n");
    script.push_str(". /work/system/Env_base\n");
    script.push_str("export FLIB_FASTOMP=FALSE\n");
    script.push_str("tar -zxf ../gsl.tgz -C ../\n");
    script.push_str("rm -f ../gsl.tgz\n");
    script.push_str(&format!("mpirun -np {nbnodes} sh bg.sh\n"));
    script.push_str("echo \"finish\"\n");
    script
}
