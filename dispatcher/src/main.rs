mod config;
mod dispatch;
mod explore;
mod meta;
mod platforms;
mod workspace;

#[cfg(test)]
mod dispatch_test;
#[cfg(test)]
mod meta_test;
#[cfg(test)]
mod workspace_test;

use clap::Parser;
use config::Overrides;
use dispatch::{DispatchRequest, JobDispatcher};
use meta::RunMeta;
use platforms::PlatformKind;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Simulation dispatcher. Argument precedence: built-in default values <
/// custom initialization file values < commandline-supplied values.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// run the experiment on which platform?
    #[arg(long, value_enum)]
    platform: PlatformKind,

    /// YAML file with a `params` mapping of custom parameters
    #[arg(long)]
    custom: Option<PathBuf>,

    /// which LG14 parameterization to use?
    #[arg(long = "LG14modelID")]
    lg14_model_id: Option<i64>,

    /// which test to run?
    #[arg(
        long = "whichTest",
        value_parser = clap::builder::PossibleValuesParser::new([
            "testPlausibility",
            "testGPR01",
            "testChannel",
            "testChannelBG",
        ])
    )]
    which_test: Option<String>,

    /// number of CPU to use (-1 to guess)
    #[arg(long)]
    nbcpu: Option<i64>,

    /// number of basal ganglia channels to simulate
    #[arg(long = "nbCh")]
    nb_ch: Option<i64>,

    /// set to enable the display of debug plots
    #[arg(long)]
    interactive: bool,

    /// set to store spike rasters (gdf files) of the simulation
    #[arg(long)]
    gdf: bool,

    /// to receive emails when cluster simulations are done
    #[arg(long)]
    email: Option<String>,

    /// optional tag for this experiment, added to the directory name
    #[arg(long, default_value = "")]
    tag: String,

    /// NEST seed (affects the Poisson spike train generator)
    #[arg(long = "nestSeed")]
    nest_seed: Option<i64>,

    /// Python seed (affects the connection map)
    #[arg(long = "pythonSeed")]
    python_seed: Option<i64>,

    /// does not start the simulations, only writes experiment directories
    #[arg(long)]
    mock: bool,
}

impl Cli {
    fn into_request(self) -> (DispatchRequest, String) {
        let overrides = Overrides {
            lg14_model_id: self.lg14_model_id,
            which_test: self.which_test,
            nbcpu: self.nbcpu,
            nb_ch: self.nb_ch,
            email: self.email,
            nest_seed: self.nest_seed,
            python_seed: self.python_seed,
        };

        let request = DispatchRequest {
            platform: self.platform,
            custom: self.custom,
            overrides,
            interactive: self.interactive,
            store_gdf: self.gdf,
            mock: self.mock,
            root: PathBuf::from("."),
            source_dir: PathBuf::from("."),
        };

        (request, self.tag)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (request, tag) = Cli::parse().into_request();
    let meta = RunMeta::collect(tag);

    let mut dispatcher = JobDispatcher::new(request, meta);
    if let Err(error) = dispatcher.dispatch() {
        error!(%error, "dispatch aborted");
        std::process::exit(1);
    }
}
