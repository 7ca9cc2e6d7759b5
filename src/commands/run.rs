use std::path::PathBuf;

use clap::{Args, Subcommand};

use conveyor::clients::gitlab::GitlabConnector;
use conveyor::log_status;
use conveyor::{CommandRunner, ExecutionContext, RunPipelineCommand};

#[derive(Args)]
pub struct RunArgs {
    #[command(subcommand)]
    pub backend: RunBackend,
}

#[derive(Subcommand)]
pub enum RunBackend {
    /// Trigger or reuse a GitLab pipeline described by the context
    Gitlab {
        /// Path to the context descriptor file
        #[arg(long)]
        context: PathBuf,
    },
}

pub fn run(args: RunArgs) -> i32 {
    match args.backend {
        RunBackend::Gitlab { context } => {
            let context = match ExecutionContext::from_descriptor_file(&context) {
                Ok(context) => context,
                Err(e) => {
                    log_status!("run", "{}", e);
                    return 1;
                }
            };

            let command = RunPipelineCommand::new(context, Box::new(GitlabConnector::new()));
            CommandRunner::new(command).run()
        }
    }
}
