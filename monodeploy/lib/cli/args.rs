use std::path::PathBuf;

use clap::Parser;

use super::styles;

//-------------------------------------------------------------------------------------------------
// Types
//-------------------------------------------------------------------------------------------------

/// `monodeploy` builds, verifies and publishes the backend services of a project
#[derive(Debug, Parser)]
#[command(name = "monodeploy", author, version, styles=styles::styles())]
pub struct MonodeployArgs {
    /// The subcommand to run
    #[command(subcommand)]
    pub subcommand: Option<MonodeploySubcommand>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Debug, Parser)]
pub enum MonodeploySubcommand {
    /// Show what a deployment would do
    #[command(name = "plan")]
    Plan {
        /// Project directory
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Project file name
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Build, verify and publish the project
    #[command(name = "deploy")]
    Deploy {
        /// Project directory
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Project file name
        #[arg(short, long)]
        config: Option<String>,

        /// Do not boot and health check images locally
        #[arg(long)]
        skip_verify: bool,

        /// Comment attached to the deployment
        #[arg(short = 'm', long)]
        comment: Option<String>,
    },

    /// Check the project declarations
    #[command(name = "validate")]
    Validate {
        /// Project directory
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Project file name
        #[arg(short, long)]
        config: Option<String>,
    },
}

//-------------------------------------------------------------------------------------------------
// Tests
//-------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_args_are_consistent() {
        MonodeployArgs::command().debug_assert();
    }

    #[test]
    fn test_parse_deploy() {
        let args = MonodeployArgs::parse_from([
            "monodeploy",
            "deploy",
            "--path",
            "/srv/project",
            "--skip-verify",
            "-m",
            "release 42",
        ]);

        match args.subcommand {
            Some(MonodeploySubcommand::Deploy {
                path,
                config,
                skip_verify,
                comment,
            }) => {
                assert_eq!(path, Some(PathBuf::from("/srv/project")));
                assert_eq!(config, None);
                assert!(skip_verify);
                assert_eq!(comment.as_deref(), Some("release 42"));
            }
            other => panic!("unexpected subcommand: {other:?}"),
        }
    }
}
