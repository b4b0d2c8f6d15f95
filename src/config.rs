use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "obi-maint")]
#[command(about = "One-shot maintenance jobs for the OBI assessment store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub job: Job,
}

#[derive(Subcommand, Debug)]
pub enum Job {
    /// Recompute scores for stuck level-2 attempts and repair their reports
    RepairPartial(JobArgs),
    /// Insert missing report rows for completed sessions
    BackfillReports(JobArgs),
}

#[derive(Args, Debug)]
pub struct JobArgs {
    /// Path to the assessment SQLite database
    #[arg(long, env = "OBI_MAINT_DB")]
    pub db: PathBuf,

    /// Group to operate on
    #[arg(long, env = "OBI_MAINT_GROUP")]
    pub group: i64,
}

impl JobArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.group <= 0 {
            anyhow::bail!("group id must be positive, got {}", self.group);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repair_subcommand() {
        let cli = Cli::try_parse_from([
            "obi-maint",
            "repair-partial",
            "--db",
            "/tmp/assess.sqlite3",
            "--group",
            "29",
        ])
        .expect("parse args");
        match cli.job {
            Job::RepairPartial(args) => {
                assert_eq!(args.group, 29);
                assert!(args.validate().is_ok());
            }
            other => panic!("unexpected job: {:?}", other),
        }
    }

    #[test]
    fn rejects_non_positive_group() {
        let cli = Cli::try_parse_from([
            "obi-maint",
            "backfill-reports",
            "--db",
            "/tmp/assess.sqlite3",
            "--group",
            "0",
        ])
        .expect("parse args");
        match cli.job {
            Job::BackfillReports(args) => assert!(args.validate().is_err()),
            other => panic!("unexpected job: {:?}", other),
        }
    }
}
