//! fastocloud-env - FastoCloud media server environment CLI
//!
//! Command-line interface for CDN config generation, provisioning and
//! plugin verification

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

use fastocloud_env::cdn::{CdnOptions, CdnSetup, ConfigWriter, DescriptorVariant, GroupPlan, NodeSource, Prompter};
use fastocloud_env::logging::{init_logging, LoggingConfig};
use fastocloud_env::plugins::{enforce, reports_json, PluginInspector, PluginSetReport};
use fastocloud_env::port::{probe_for, AllocationSession, PortAllocator};
use fastocloud_env::provision::{
    catalog, CommandRunner, DryRunRunner, ProvisionOptions, Provisioner, SystemRunner, DEFAULT_HOSTNAME,
};
use fastocloud_env::{EnvConfig, PackageSelection, PlatformId};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_ALIAS: &str = "localhost";
const DEFAULT_CONNECTIONS: usize = 100;

#[derive(Parser)]
#[command(name = "fastocloud-env")]
#[command(version)]
#[command(about = "FastoCloud media server environment tool", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    /// Warnings and errors only
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate listener ports and write nginx + service descriptor configs
    Cdn(CdnArgs),
    /// Install packages and build the media stack from source
    Provision(ProvisionArgs),
    /// Print the system package list for a platform
    Packages(PackagesArgs),
    /// Check that the streamer's GStreamer elements are loadable
    CheckPlugins {
        /// Install prefix holding lib/gstreamer-1.0
        #[arg(long)]
        prefix: Option<PathBuf>,
        /// Print reports as JSON
        #[arg(long)]
        json: bool,
        /// Exit non-zero if any element is missing
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Args)]
struct CdnArgs {
    /// Nodes hostname [default: 127.0.0.1]
    #[arg(long)]
    host: Option<String>,
    /// Nodes hostname alias [default: localhost]
    #[arg(long)]
    alias: Option<String>,
    /// Number of ports to open per group
    #[arg(long, default_value_t = DEFAULT_CONNECTIONS)]
    connections: usize,
    /// Write the ML service descriptor
    #[arg(long)]
    ml_version: bool,
    /// Ask for host, alias and per-group node counts
    #[arg(long)]
    interactive: bool,
    /// Enter node endpoints by hand instead of allocating ports
    #[arg(long, requires = "interactive")]
    manual_nodes: bool,
    /// Render and print without writing files
    #[arg(long)]
    dry_run: bool,
    #[arg(long)]
    available_dir: Option<PathBuf>,
    #[arg(long)]
    enabled_dir: Option<PathBuf>,
    #[arg(long)]
    descriptor_dir: Option<PathBuf>,
}

#[derive(Args)]
struct SelectionArgs {
    /// Include NVIDIA libraries
    #[arg(long)]
    with_nvidia: bool,
    /// Include WPE WebKit dependencies
    #[arg(long)]
    with_wpe: bool,
    /// Include MongoDB
    #[arg(long)]
    with_mongo: bool,
    /// Take GStreamer from the distribution; only the fastogt support
    /// libraries are built from source
    #[arg(long)]
    repo_build: bool,
}

impl SelectionArgs {
    fn selection(&self) -> PackageSelection {
        PackageSelection {
            with_nvidia: self.with_nvidia,
            with_wpe: self.with_wpe,
            with_mongo: self.with_mongo,
            with_gstreamer: true,
            repo_build: self.repo_build,
        }
    }
}

#[derive(Args)]
struct ProvisionArgs {
    /// Target platform [default: detected]
    #[arg(long)]
    platform: Option<PlatformId>,
    #[arg(long, default_value = DEFAULT_HOSTNAME)]
    hostname: String,
    #[arg(long)]
    prefix: Option<PathBuf>,
    #[arg(long)]
    build_dir: Option<PathBuf>,
    #[command(flatten)]
    selection: SelectionArgs,
    /// Regenerate the dbus machine id first (fresh containers)
    #[arg(long)]
    docker: bool,
    #[arg(long)]
    skip_system: bool,
    #[arg(long)]
    skip_tools: bool,
    #[arg(long)]
    skip_nginx: bool,
    /// Enable a component family (repeatable)
    #[arg(long = "with", value_name = "COMPONENT")]
    with: Vec<String>,
    /// Disable a component family (repeatable)
    #[arg(long = "without", value_name = "COMPONENT")]
    without: Vec<String>,
    /// Print commands instead of running them
    #[arg(long)]
    dry_run: bool,
    #[arg(long)]
    no_check_plugins: bool,
}

#[derive(Args)]
struct PackagesArgs {
    #[arg(long)]
    platform: Option<PlatformId>,
    #[command(flatten)]
    selection: SelectionArgs,
    /// Print as a JSON array
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(LoggingConfig::from_flags(cli.verbose, cli.quiet));

    let config = EnvConfig::load_or_default(cli.config.as_deref())
        .with_context(|| "Failed to load configuration")?;

    match cli.command {
        Commands::Cdn(args) => handle_cdn(&config, args),
        Commands::Provision(args) => handle_provision(&config, args),
        Commands::Packages(args) => handle_packages(args),
        Commands::CheckPlugins { prefix, json, strict } => {
            let prefix = prefix.unwrap_or_else(|| config.provision.prefix.clone());
            let sets = check_plugins(&config, SystemRunner, &prefix, json);
            enforce(&sets, strict)?;
            Ok(())
        }
    }
}

fn handle_cdn(config: &EnvConfig, args: CdnArgs) -> Result<()> {
    if !args.dry_run {
        warn_unless_root();
    }

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());

    let host = match (args.host, args.interactive) {
        (Some(host), _) => host,
        (None, true) => prompter.ask("Nodes hostname", Some(DEFAULT_HOST))?,
        (None, false) => DEFAULT_HOST.to_string(),
    };
    let alias = match (args.alias, args.interactive) {
        (Some(alias), _) => alias,
        (None, true) => prompter.ask("Nodes hostname alias", Some(DEFAULT_ALIAS))?,
        (None, false) => DEFAULT_ALIAS.to_string(),
    };

    let plans = if args.interactive {
        let mut plans = Vec::with_capacity(config.cdn.groups.len());
        for group in &config.cdn.groups {
            let count = prompter.node_count(&group.name, group.connection_count(args.connections))?;
            let source = if args.manual_nodes {
                let default_url = format!("http://{}", host);
                let nodes = (0..count)
                    .map(|i| prompter.manual_node(&group.name, i, &default_url))
                    .collect::<fastocloud_env::Result<Vec<_>>>()?;
                NodeSource::Manual(nodes)
            } else {
                NodeSource::Allocate(count)
            };
            plans.push(GroupPlan {
                group: group.clone(),
                source,
            });
        }
        plans
    } else {
        GroupPlan::allocate_all(&config.cdn.groups, args.connections)
    };

    let cdn = &config.cdn;
    let writer = ConfigWriter::new(
        args.available_dir.as_deref().unwrap_or(cdn.available_dir.as_path()),
        args.enabled_dir.as_deref().unwrap_or(cdn.enabled_dir.as_path()),
        args.descriptor_dir.as_deref().unwrap_or(cdn.descriptor_dir.as_path()),
        cdn.enable_mode,
    );
    let probe = probe_for(cdn.probe, cdn.probe_timeout_ms);
    let allocator = PortAllocator::new(host.as_str(), cdn.scan_range, probe);
    let setup = CdnSetup::new(allocator, writer);

    let options = CdnOptions {
        alias,
        variant: if args.ml_version {
            DescriptorVariant::Ml
        } else {
            DescriptorVariant::Pro
        },
        descriptor_template: cdn.descriptor_template.clone(),
        dry_run: args.dry_run,
    };

    let mut session = AllocationSession::new();
    let report = setup.run(&mut session, &plans, &options)?;

    for assignment in &report.assignments {
        let span = match (assignment.ports.first(), assignment.ports.last()) {
            (Some(first), Some(last)) => format!("{}..={}", first, last),
            _ => "none".to_string(),
        };
        println!("{} {}: {} port(s) [{}]", "✓".green(), assignment.group, assignment.len(), span);
    }

    if args.dry_run {
        for site in &report.sites {
            println!("\n{} {}", "#".dimmed(), site.filename.bold());
            print!("{}", site.contents);
        }
        println!("\n{} {}", "#".dimmed(), report.descriptor.filename.bold());
        print!("{}", report.descriptor.contents);
    } else {
        for path in &report.written {
            println!("  wrote {}", path.display());
        }
    }
    Ok(())
}

fn handle_provision(config: &EnvConfig, args: ProvisionArgs) -> Result<()> {
    let platform = match args.platform {
        Some(platform) => platform,
        None => PlatformId::detect()?,
    };
    if !args.dry_run {
        warn_unless_root();
    }

    let mut flags = config.provision.components.clone();
    if args.selection.repo_build {
        flags.restrict_to_repo_build();
    }
    flags.apply(&args.with, &args.without)?;
    if args.selection.with_wpe {
        flags.wpe = true;
    }
    let components = catalog(&flags, &config.provision.versions, &config.provision.patch_dir);

    let defaults = ProvisionOptions::default();
    let options = ProvisionOptions {
        prefix: args.prefix.unwrap_or_else(|| config.provision.prefix.clone()),
        build_dir: args.build_dir.unwrap_or_else(|| config.provision.build_dir.clone()),
        jobs: match config.provision.jobs {
            0 => defaults.jobs,
            jobs => jobs,
        },
        dry_run: args.dry_run,
        nginx_dir: config.provision.nginx_dir.clone(),
        sites_enabled: config.cdn.enabled_dir.clone(),
        ..defaults
    };
    let prefix = options.prefix.clone();
    println!("Provisioning {} into {}", platform.to_string().bold(), prefix.display());

    let runner: Box<dyn CommandRunner> = if args.dry_run {
        Box::new(DryRunRunner::new())
    } else {
        Box::new(SystemRunner)
    };
    let provisioner = Provisioner::new(platform, runner, options);

    if args.docker {
        provisioner.prepare_docker()?;
    }
    if !args.skip_system {
        provisioner.set_hostname(&args.hostname)?;
        provisioner.install_packages(&args.selection.selection())?;
        println!("{} system packages", "✓".green());
    }
    if !args.skip_tools {
        provisioner.install_tools(&config.provision.versions.meson)?;
        println!("{} tools", "✓".green());
    }
    if !args.skip_nginx {
        provisioner.install_nginx()?;
        println!("{} nginx", "✓".green());
    }

    let built = provisioner.build_all(&components)?;
    println!("{} {} component(s) built", "✓".green(), built);

    if !args.no_check_plugins && !args.dry_run {
        let sets = check_plugins(config, SystemRunner, &prefix, false);
        let failed: usize = sets.iter().map(PluginSetReport::missing).sum();
        if failed > 0 {
            warn!(failed, "some GStreamer plugins are missing");
        }
    }
    Ok(())
}

fn handle_packages(args: PackagesArgs) -> Result<()> {
    let platform = match args.platform {
        Some(platform) => platform,
        None => PlatformId::detect()?,
    };
    let packages = platform.packages().select(&args.selection.selection());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&packages)?);
    } else {
        for package in packages {
            println!("{}", package);
        }
    }
    Ok(())
}

/// Print one line per plugin of every list
fn check_plugins<R: CommandRunner>(
    config: &EnvConfig,
    runner: R,
    prefix: &Path,
    json: bool,
) -> Vec<PluginSetReport> {
    let inspector = PluginInspector::new(runner, prefix)
        .with_extra_paths(&config.plugins.plugin_path, &config.plugins.library_path);
    let sets = inspector.check_sets();

    if json {
        let all: Vec<_> = sets.iter().flat_map(|set| set.reports.iter().cloned()).collect();
        match reports_json(&all) {
            Ok(text) => println!("{}", text),
            Err(e) => warn!(error = %e, "failed to serialize plugin reports"),
        }
        return sets;
    }

    for set in &sets {
        println!("\nPlugins for {}:", set.title);
        for report in &set.reports {
            if report.is_ok() {
                println!("{}", format!("Check plugin {}, success return code: {}", report.name, report.code).green());
            } else {
                println!("{}", format!("Check plugin {}, failed return code: {}", report.name, report.code).red());
            }
        }
    }
    sets
}

#[cfg(unix)]
fn warn_unless_root() {
    if !nix::unistd::geteuid().is_root() {
        warn!("not running as root; writing system paths will likely fail");
    }
}

#[cfg(not(unix))]
fn warn_unless_root() {}
