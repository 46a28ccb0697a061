//! Command-line interface for Loopy.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::Config;

/// Loopy - find which local interfaces are wired to each other
#[derive(Parser, Debug)]
#[command(
    name = "loopy",
    author,
    version,
    about = "Link-layer connectivity verifier for multi-homed hosts",
    long_about = r#"
Loopy pings the IPv6 link-local address of every local interface from
every other local interface and prints the pairs that answer.

Use it to find interfaces that share a segment, verify cabling, or spot
a port accidentally looped back onto the same host.

QUICK START:
  loopy                       check all interfaces
  loopy -i eth0 -i eth1       check only eth0 and eth1
  loopy addresses             list link-local addresses only
"#
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(flatten)]
    pub check: CheckArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check connectivity between all interface pairs (default)
    Check,

    /// List link-local addresses without probing
    Addresses,

    /// Show example configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Discovery and probe overrides
#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Only use these interfaces (can be specified multiple times)
    #[arg(short, long, global = true)]
    pub interface: Vec<String>,

    /// Skip these interfaces (can be specified multiple times)
    #[arg(short = 'x', long, global = true)]
    pub exclude: Vec<String>,

    /// Reply timeout in milliseconds
    #[arg(short, long, global = true, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Number of interface pairs probed in parallel
    #[arg(short = 'j', long, global = true)]
    pub concurrency: Option<usize>,

    /// Accept any echo reply, even one whose sequence number does not match
    #[arg(long, global = true)]
    pub no_verify: bool,

    /// Pin probe sockets to their interface (needs CAP_NET_RAW)
    #[arg(long, global = true)]
    pub bind_device: bool,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref level) = self.log_level {
            config.logging.level = level.clone();
        }
        if self.no_color {
            config.logging.color = false;
        }

        let args = &self.check;
        if !args.interface.is_empty() {
            config.discovery.interfaces = args.interface.clone();
        }
        config.discovery.exclude.extend(args.exclude.iter().cloned());
        if let Some(ms) = args.timeout {
            config.probe.timeout = Duration::from_millis(ms);
        }
        if let Some(n) = args.concurrency {
            config.probe.concurrency = n;
        }
        if args.no_verify {
            config.probe.verify_sequence = false;
        }
        if args.bind_device {
            config.probe.bind_device = true;
        }
    }
}

/// Config command arguments
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Output path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Completions command arguments
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}

/// Shell for completions
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_to_check() {
        let cli = Cli::parse_from(["loopy"]);
        assert!(cli.command.is_none());
        assert!(cli.check.interface.is_empty());

        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.probe.timeout, crate::DEFAULT_PROBE_TIMEOUT);
        assert!(config.probe.verify_sequence);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "loopy", "-i", "eth0", "-i", "eth1", "-x", "eth2", "--timeout", "250", "-j", "8",
            "--no-verify", "--no-color", "-l", "debug",
        ]);

        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.discovery.interfaces, vec!["eth0", "eth1"]);
        assert_eq!(config.discovery.exclude, vec!["eth2"]);
        assert_eq!(config.probe.timeout, Duration::from_millis(250));
        assert_eq!(config.probe.concurrency, 8);
        assert!(!config.probe.verify_sequence);
        assert!(!config.logging.color);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_subcommands() {
        let cli = Cli::parse_from(["loopy", "addresses", "-i", "eth0"]);
        assert!(matches!(cli.command, Some(Commands::Addresses)));
        assert_eq!(cli.check.interface, vec!["eth0"]);

        let cli = Cli::parse_from(["loopy", "completions", "zsh"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Completions(CompletionsArgs { shell: Shell::Zsh }))
        ));
    }
}
