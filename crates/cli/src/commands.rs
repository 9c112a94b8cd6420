use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronize CVE and CPE catalogs into the local mirror
    Sync {
        #[arg(long, help = "Force a full sync from the epoch instead of resuming")]
        full: bool,

        #[arg(long, help = "Sync only one entity type: \"cve\" or \"cpe\"")]
        entity: Option<String>,

        #[arg(long, help = "Path to a .env file to load before reading configuration")]
        env_file: Option<String>,
    },
    /// Show record counts, modification times and checkpoints
    Inspect {
        #[arg(
            long,
            help = "If set, prints the inspection report as JSON instead of a table"
        )]
        json: bool,

        #[arg(long, help = "Path to a .env file to load before reading configuration")]
        env_file: Option<String>,
    },
    /// Delete archived API pages past the retention horizon
    Sweep {
        #[arg(long, help = "Path to a .env file to load before reading configuration")]
        env_file: Option<String>,
    },
    /// Test the database connection
    TestConn {
        #[arg(long, help = "Path to a .env file to load before reading configuration")]
        env_file: Option<String>,
    },
}
