//! Loopy CLI - link-layer connectivity verifier.

use std::io;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tracing::{info, warn};

use loopy::check::{format_address_line, Aggregator, ConnectivityChecker, ReportWriter};
use loopy::cli::{Cli, Commands, CompletionsArgs, ConfigArgs, Shell};
use loopy::config::{init_logging, Config};
use loopy::error::Result;
use loopy::probe::IcmpProber;
use loopy::util::{self, discover_links, SysfsMetadata, SystemAddressProvider};
use loopy::Link;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config if specified
    let default_path = Config::default_path();
    let mut config = if let Some(ref path) = cli.config {
        Config::load(path).with_context(|| format!("loading {}", path.display()))?
    } else if default_path.exists() {
        Config::load(&default_path)
            .with_context(|| format!("loading {}", default_path.display()))?
    } else {
        Config::default()
    };
    cli.apply(&mut config);
    config.validate()?;

    if !config.logging.color {
        colored::control::set_override(false);
    }
    init_logging(&config.logging)?;

    // Dispatch command
    match cli.command {
        None | Some(Commands::Check) => run_check(&config).await,
        Some(Commands::Addresses) => run_addresses(&config),
        Some(Commands::Config(args)) => run_config(&args),
        Some(Commands::Completions(args)) => run_completions(&args),
    }
}

/// Discover links on this host.
fn discover(config: &Config) -> Result<Vec<Link>> {
    let links = discover_links(
        &SystemAddressProvider,
        &SysfsMetadata::new(),
        &config.discovery,
    )?;
    info!("found {} link-local addresses", links.len());
    Ok(links)
}

fn print_addresses(links: &[Link]) {
    println!();
    println!("{}", "Addresses:".bright_white().bold());
    for link in links {
        println!("{}", format_address_line(link));
    }
    println!();
}

/// List addresses only
fn run_addresses(config: &Config) -> Result<()> {
    let links = discover(config)?;
    print_addresses(&links);
    Ok(())
}

/// Check every pair of links
async fn run_check(config: &Config) -> Result<()> {
    let links = discover(config)?;
    print_addresses(&links);

    if links.len() < 2 {
        warn!("fewer than two link-local addresses, nothing to check");
    }

    println!("{}", "Connectivity:".bright_white().bold());

    let checker = ConnectivityChecker::new(IcmpProber::new(config.probe.clone()))
        .with_concurrency(config.probe.concurrency);
    let mut aggregator = Aggregator::new(ReportWriter::new(io::stdout()));

    match checker.run(&links, &mut aggregator).await {
        Ok(summary) => {
            println!();
            info!(
                "{} of {} ordered pairs probed, elapsed {}",
                summary.probes_sent,
                summary.pairs_total,
                util::format_duration(summary.elapsed)
            );
            Ok(())
        }
        Err(e) => {
            if e.is_permission_denied() {
                eprintln!();
                eprintln!("{} Could not open an ICMPv6 socket.", "✗".red());
                eprintln!("  Allow unprivileged ping sockets for your group, e.g.:");
                eprintln!("    sudo sysctl -w net.ipv4.ping_group_range=\"0 2147483647\"");
                if !util::is_root() {
                    eprintln!("  or run with {}.", "sudo".bright_white());
                }
            }
            Err(e)
        }
    }
}

/// Show example configuration
fn run_config(args: &ConfigArgs) -> Result<()> {
    let config = Config::example();

    if let Some(ref path) = args.output {
        config.save(path)?;
        println!(
            "{} Configuration written to {}",
            "✓".green(),
            path.display()
        );
    } else {
        let output = toml::to_string_pretty(&config)
            .map_err(|e| loopy::Error::Config(format!("Failed to serialize config: {e}")))?;
        println!("{output}");
    }

    Ok(())
}

/// Generate shell completions
fn run_completions(args: &CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::generate;

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => clap_complete::Shell::Bash,
        Shell::Zsh => clap_complete::Shell::Zsh,
        Shell::Fish => clap_complete::Shell::Fish,
        Shell::PowerShell => clap_complete::Shell::PowerShell,
    };

    generate(shell, &mut cmd, name, &mut io::stdout());

    Ok(())
}
