use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use serde_yml::Value;

use conveyor::log_status;
use conveyor::ContextFile;

#[derive(Args)]
pub struct ContextArgs {
    #[command(subcommand)]
    pub action: ContextAction,
}

#[derive(Subcommand)]
pub enum ContextAction {
    /// Write a context descriptor and empty parameter files into a folder
    Init {
        /// Folder to initialize
        #[arg(long)]
        folder: PathBuf,
    },
}

pub fn run(args: ContextArgs) -> i32 {
    match args.action {
        ContextAction::Init { folder } => match init(&folder) {
            Ok(descriptor) => {
                log_status!("context", "Wrote descriptor to {}", descriptor.display());
                0
            }
            Err(e) => {
                log_status!("context", "{}", e);
                1
            }
        },
    }
}

fn init(folder: &Path) -> conveyor::Result<PathBuf> {
    for sub in ["input", "input/files", "output", "output/files", "logs"] {
        std::fs::create_dir_all(folder.join(sub)).map_err(|e| {
            conveyor::Error::internal_io(e.to_string(), Some("initialize context folder".to_string()))
        })?;
    }

    ContextFile::params_insecure().save(&folder.join("input/params.yaml"))?;
    ContextFile::params_secure().save(&folder.join("input/params_secure.yaml"))?;

    let mut descriptor = ContextFile::context_descriptor();
    descriptor.set_multiple([
        ("paths.logs".to_string(), path_value(folder, "logs")),
        ("paths.input.params".to_string(), path_value(folder, "input/params.yaml")),
        (
            "paths.input.params_secure".to_string(),
            path_value(folder, "input/params_secure.yaml"),
        ),
        ("paths.input.files".to_string(), path_value(folder, "input/files")),
        ("paths.output.params".to_string(), path_value(folder, "output/params.yaml")),
        ("paths.output.files".to_string(), path_value(folder, "output/files")),
    ]);

    let descriptor_path = folder.join("context.yaml");
    descriptor.save(&descriptor_path)?;
    Ok(descriptor_path)
}

fn path_value(folder: &Path, sub: &str) -> Value {
    Value::from(folder.join(sub).to_string_lossy().to_string())
}
