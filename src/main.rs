use clap::{Parser, Subcommand};

mod commands;

use commands::{context, run};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "conveyor")]
#[command(version = VERSION)]
#[command(about = "Pipeline-automation command toolkit for CI/CD jobs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a pipeline command against a backend
    Run(run::RunArgs),
    /// Manage execution context descriptors
    Context(context::ContextArgs),
}

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Run(args) => run::run(args),
        Commands::Context(args) => context::run(args),
    };

    std::process::ExitCode::from(exit_code_to_u8(code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
