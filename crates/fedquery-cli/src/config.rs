//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use fedquery_core::config::{
    FederationConfig, DEFAULT_LIMIT, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_OFFSET,
};

/// Run one federated request against a JSON dataset.
#[derive(Parser, Debug)]
#[command(name = "fedquery")]
#[command(version, about = "Run federated queries over JSON datasets")]
pub struct Args {
    /// Dataset file holding the schema and every collection's rows.
    pub dataset: PathBuf,

    /// Request file. An empty request is used when omitted.
    #[arg(short, long)]
    pub request: Option<PathBuf>,

    /// Fetch a single root instead of a page.
    #[arg(long, conflicts_with = "explain")]
    pub one: bool,

    /// Print the execution plan without calling any provider.
    #[arg(long)]
    pub explain: bool,

    /// Relation-first discovery iterations allowed beyond the requested page.
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,

    /// Relation fetch offset at which discovery stops widening.
    #[arg(long, default_value_t = DEFAULT_MAX_OFFSET)]
    pub max_offset: u64,

    /// Page size used when the request carries no limit.
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    pub default_limit: u64,

    /// Fetch relations one after another instead of concurrently.
    #[arg(long)]
    pub sequential: bool,
}

/// What the binary should do with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Many,
    One,
    Explain,
}

impl Args {
    /// Selected mode.
    pub fn mode(&self) -> Mode {
        if self.explain {
            Mode::Explain
        } else if self.one {
            Mode::One
        } else {
            Mode::Many
        }
    }

    /// Convert command-line arguments to federation configuration.
    pub fn to_config(&self) -> FederationConfig {
        let config = FederationConfig::new()
            .with_max_iterations(self.max_iterations)
            .with_max_offset(self.max_offset)
            .with_default_limit(self.default_limit);

        if self.sequential {
            config.sequential()
        } else {
            config
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["fedquery", "data.json"]);
        assert_eq!(args.mode(), Mode::Many);
        assert_eq!(args.to_config(), FederationConfig::default());
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "fedquery",
            "data.json",
            "--request",
            "req.json",
            "--one",
            "--max-iterations",
            "3",
            "--default-limit",
            "25",
            "--sequential",
        ]);
        assert_eq!(args.mode(), Mode::One);
        assert_eq!(args.request.as_deref(), Some(std::path::Path::new("req.json")));

        let config = args.to_config();
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.default_limit, 25);
        assert!(!config.concurrent_fan_out);
    }

    #[test]
    fn test_one_conflicts_with_explain() {
        let result = Args::try_parse_from(["fedquery", "data.json", "--one", "--explain"]);
        assert!(result.is_err());
    }
}
