use clap::Parser;
use tracing_subscriber::EnvFilter;

use obi_maint::config::{Cli, Job};
use obi_maint::{db, jobs};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "obi_maint=info".into()),
        )
        .with_target(false)
        .init();

    let args = match &cli.job {
        Job::RepairPartial(args) | Job::BackfillReports(args) => args,
    };
    args.validate()?;

    let mut conn = db::open_db(&args.db)?;

    // Per-record failures are logged and summarized; only a top-level
    // failure (bad config, unreachable database) exits non-zero.
    match &cli.job {
        Job::RepairPartial(_) => {
            let summary = jobs::repair::run(&mut conn, args.group)?;
            summary.log("repair-partial");
        }
        Job::BackfillReports(_) => {
            let summary = jobs::backfill::run(&mut conn, args.group)?;
            summary.log("backfill-reports");
        }
    }

    Ok(())
}
