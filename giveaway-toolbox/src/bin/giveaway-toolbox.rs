mod cli;

use color_eyre::Report;
use structopt::StructOpt;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<(), Report> {
    color_eyre::install()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    cli::Cli::from_args().exec()
}
