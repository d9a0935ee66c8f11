#![forbid(unsafe_code)]

mod cmd;
mod linear;
mod output;

use std::env;

use clap::{CommandFactory, Parser, Subcommand};
use output::{OutputMode, resolve_output_mode};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "blockmap: Linear dependency flowcharts",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of diagram markup.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags and environment.
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "Render a project's blocking graph",
        long_about = "Fetch every issue in a Linear project, resolve its \"blocks\" relations and print a Mermaid flowchart split into actionable, priority, external-blocked-by and blocked sections.",
        after_help = "EXAMPLES:\n    # Print the flowchart for a project\n    blockmap graph 8a1f3c2e-project-id\n\n    # Include unblocked issues that block nothing\n    blockmap graph 8a1f3c2e-project-id --show-actionable\n\n    # Stable output for diffing\n    blockmap graph 8a1f3c2e-project-id --sorted > deps.mmd\n\n    # Emit machine-readable output\n    blockmap graph 8a1f3c2e-project-id --json"
    )]
    Graph(cmd::graph::GraphArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        long_about = "Generate shell completion scripts for blockmap.",
        after_help = "EXAMPLES:\n    # Bash\n    blockmap completions bash > ~/.local/share/bash-completion/completions/blockmap\n\n    # Zsh\n    blockmap completions zsh > ~/.zfunc/_blockmap"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("BLOCKMAP_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "blockmap=debug,info"
        } else {
            "blockmap=info,warn"
        })
    });

    let format = env::var("BLOCKMAP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();

    match cli.command {
        Commands::Graph(ref args) => cmd::graph::run_graph(args, output).await,
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}
