use std::path::PathBuf;

use clap::Parser;

mod app;
mod config;
mod effects;
mod logging;
mod render;

/// Bulk image processor: compression, AI metadata, and renaming over a
/// local library or a remote worker endpoint, in adaptive batches.
#[derive(Debug, Parser)]
#[command(name = "mediabatch", version)]
pub(crate) struct Cli {
    /// Which images to process.
    #[arg(long, value_enum, default_value_t = CliCriterion::MissingAlt)]
    pub criterion: CliCriterion,

    /// Answer yes to every confirmation prompt.
    #[arg(long)]
    pub yes: bool,

    /// Path to the RON configuration file.
    #[arg(long, default_value = "mediabatch.ron")]
    pub config: PathBuf,

    /// Remote worker endpoint, overriding the configuration file.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Local image library directory, overriding the configuration file.
    #[arg(long)]
    pub library: Option<PathBuf>,

    /// File the activity log is exported to.
    #[arg(long)]
    pub export_log: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum CliCriterion {
    /// Only images with no alt text yet.
    MissingAlt,
    /// Every image in the library. Asks for confirmation.
    All,
}

impl From<CliCriterion> for batch_core::Criterion {
    fn from(criterion: CliCriterion) -> Self {
        match criterion {
            CliCriterion::MissingAlt => batch_core::Criterion::MissingAlt,
            CliCriterion::All => batch_core::Criterion::All,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(logging::LogDestination::Both);
    let config = config::load(&cli.config);
    app::run(cli, config)
}
