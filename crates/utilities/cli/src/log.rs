//! Logging arguments and the tracing subscriber.

use crate::CliResult;
use clap::{ArgAction, Args};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logging arguments.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct LogArgs {
    /// Verbosity level. Repeat to log more: `-v` debug, `-vv` trace.
    #[arg(short = 'v', long = "verbosity", action = ArgAction::Count, global = true)]
    pub verbosity: u8,
    /// Extra filter directives, e.g. `scanner=trace,head_feed=debug`.
    #[arg(long = "log.filter", env = "OPERA_LOG_FILTER", global = true)]
    pub filter: Option<String>,
}

impl LogArgs {
    /// Returns the default level for the verbosity.
    pub const fn level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// Builds the [`EnvFilter`]: the verbosity level, then `RUST_LOG`, then the extra
    /// directives.
    pub fn env_filter(&self) -> CliResult<EnvFilter> {
        let mut filter =
            EnvFilter::builder().with_default_directive(self.level().into()).from_env_lossy();
        if let Some(directives) = &self.filter {
            for directive in directives.split(',').filter(|d| !d.is_empty()) {
                filter = filter.add_directive(directive.parse()?);
            }
        }
        Ok(filter)
    }
}

/// Installs the global `fmt` subscriber.
pub fn init_tracing_subscriber(args: &LogArgs) -> CliResult<()> {
    tracing_subscriber::registry().with(fmt::layer()).with(args.env_filter()?).try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rstest::rstest;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        log: LogArgs,
    }

    #[rstest]
    #[case(&["test"], LevelFilter::INFO)]
    #[case(&["test", "-v"], LevelFilter::DEBUG)]
    #[case(&["test", "-vv"], LevelFilter::TRACE)]
    #[case(&["test", "-vvvv"], LevelFilter::TRACE)]
    fn test_verbosity(#[case] args: &[&str], #[case] level: LevelFilter) {
        let cli = TestCli::try_parse_from(args).unwrap();
        assert_eq!(cli.log.level(), level);
    }

    #[test]
    fn test_invalid_filter() {
        let args = LogArgs { filter: Some("scanner=loud".to_string()), ..Default::default() };
        assert!(args.env_filter().is_err());
    }
}
