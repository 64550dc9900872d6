use crate::build_info;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "Survey sentiment batch worker",
    version = build_info::VERSION_WITH_COMMIT,
    long_version = build_info::VERSION_WITH_COMMIT
)]
pub struct Cli {
    #[clap(long)]
    /// Max messages requested per delivered batch
    pub max_batch_size: Option<usize>,

    #[clap(long)]
    /// Port for the health/metrics HTTP server
    pub metrics_port: Option<u16>,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
