//! Command-line argument definitions using clap

use clap::Parser;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

/// Churnprep - Prepare customer churn data for model training
#[derive(Parser, Debug)]
#[command(name = "churnprep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Suppress the banner, step output and summary table
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        let cli = Cli::parse_from(["churnprep"]);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(!cli.quiet);
    }

    #[test]
    fn test_config_override() {
        let cli = Cli::parse_from(["churnprep", "-c", "other.yaml", "--quiet"]);
        assert_eq!(cli.config, PathBuf::from("other.yaml"));
        assert!(cli.quiet);
    }
}
