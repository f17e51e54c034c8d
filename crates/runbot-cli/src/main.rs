mod serve;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use runbot_core::{Config, TestSuiteScanner};
use tracing_subscriber::EnvFilter;

use serve::FrontEnd;

#[derive(Parser)]
#[command(name = "runbot")]
#[command(about = "Run test suites from a chat and get the results back", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Serve {
        /// Config file (defaults to ./runbot.toml, then the user config)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Read commands from stdin and print replies instead of using Telegram
        #[arg(long, conflicts_with = "webhook")]
        console: bool,
        /// Receive updates on an HTTP webhook instead of long polling
        #[arg(long)]
        webhook: bool,
    },
    /// List the runnable units found in a framework checkout
    Scan {
        /// Framework root (defaults to runner.framework_path, then `.`)
        path: Option<PathBuf>,
        /// Group test classes by directory
        #[arg(long)]
        grouped: bool,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the default configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            console,
            webhook,
        } => {
            let config = Config::load_from(config.as_deref())
                .wrap_err("Failed to load configuration")?;
            init_tracing(&config.log.level);

            let front_end = if console {
                FrontEnd::Console
            } else if webhook {
                FrontEnd::Webhook
            } else {
                FrontEnd::Polling
            };
            serve::start(config, front_end).await?;
        }
        Commands::Scan {
            path,
            grouped,
            config,
        } => {
            let config = Config::load_from(config.as_deref())
                .wrap_err("Failed to load configuration")?;
            init_tracing(&config.log.level);

            let root = path
                .or_else(|| config.runner.framework_path.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            print_scan(&config, &root, grouped);
        }
        Commands::Config => {
            print!("{}", Config::default_config_string());
        }
    }

    Ok(())
}

/// Logs go to stderr so console replies on stdout stay readable.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_scan(config: &Config, root: &Path, grouped: bool) {
    let scanner = TestSuiteScanner::with_config(config.discovery.clone());

    if grouped {
        let groups = scanner.scan_grouped(root);
        if groups.is_empty() {
            println!("No test groups found under {}", root.display());
            return;
        }
        for (name, units) in groups {
            println!("/{} ({} tests)", name.to_lowercase(), units.len());
            for unit in units {
                println!(
                    "    {:<24} {}",
                    unit.command_name,
                    unit.test_class.unwrap_or_default()
                );
            }
        }
        return;
    }

    let units = scanner.scan(root);
    if units.is_empty() {
        println!("No runnable units found under {}", root.display());
        return;
    }
    for unit in units {
        let kind = if unit.is_profile() { "profile" } else { "class" };
        println!("/{:<24} {:<8} {}", unit.command_name, kind, unit.description);
    }
}
