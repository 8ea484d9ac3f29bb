//! pulpod entry point.
//!
//! Loads the service configuration, installs the tracing subscriber and runs
//! one container manager operation per invocation.
//!
//! ## Examples
//!
//! ```text
//! pulpod run
//! pulpod create quay.io/libpod/alpine sandbox-1 --start
//! pulpod --config ./pulpod.toml list
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use pulpod_core::{select, Config, ContainerManager, LoggingConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "pulpod", version, about = "Drive idle sandbox containers on a podman service")]
struct Cli {
    /// Extra configuration file, merged over /etc/pulpod/config.toml
    #[arg(long, short, env = "PULPOD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect, report the daemon version and the managed containers
    Run,
    /// List managed containers
    List,
    /// Pull an image into the daemon's store
    Pull { image: String },
    /// Create a managed idle container
    Create {
        image: String,
        name: String,
        /// Start the container once created
        #[arg(long)]
        start: bool,
    },
    /// Start a container
    Start { id: String },
    /// Stop a container
    Stop { id: String },
    /// Force-remove a container
    Rm { id: String },
    /// Show a container's state
    Inspect { id: String },
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let default_level = if logging.devmode { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("pulpod={default_level},pulpod_core={default_level}")))?;

    // Logs go to stderr so command output on stdout stays scriptable.
    let registry = tracing_subscriber::registry().with(filter);
    if logging.devmode {
        registry
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

async fn execute(manager: &dyn ContainerManager, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Run => {
            let version = manager.version().await?;
            let containers = manager.list().await?;
            tracing::info!(flavor = manager.flavor(), %version, managed = containers.len(), "Connected");
            println!("{} {version}", manager.flavor());
            for name in containers {
                println!("{name}");
            }
        }
        Command::List => {
            for name in manager.list().await? {
                println!("{name}");
            }
        }
        Command::Pull { image } => {
            manager.pull_image(&image).await?;
            println!("{image}");
        }
        Command::Create { image, name, start } => {
            let id = manager
                .create_container(&image, &name)
                .await
                .with_context(|| format!("failed to create container {name}"))?;
            if start {
                manager.start_container(id.as_str()).await?;
            }
            println!("{id}");
        }
        Command::Start { id } => manager.start_container(&id).await?,
        Command::Stop { id } => manager.stop_container(&id).await?,
        Command::Rm { id } => manager.remove_container(&id).await?,
        Command::Inspect { id } => {
            let info = manager.inspect_container(&id).await?;
            println!("id:      {}", info.id);
            println!("name:    {}", info.name);
            println!("image:   {}", info.image);
            println!("state:   {}", info.state);
            println!("owned:   {}", info.is_owned());
            if let Some(created) = info.created {
                println!("created: {}", created.to_rfc3339());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.logging)?;
    tracing::debug!(?config, "Configuration loaded");

    let manager = select(&config.containermanager)
        .await
        .context("failed to set up container manager")?;

    execute(manager.as_ref(), cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pulpod_core::{ContainerState, InMemoryManager};

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_create_with_start() {
        let cli = Cli::try_parse_from([
            "pulpod",
            "--config",
            "/tmp/pulpod.toml",
            "create",
            "quay.io/libpod/alpine",
            "c1",
            "--start",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/pulpod.toml")));
        match cli.command {
            Command::Create { image, name, start } => {
                assert_eq!(image, "quay.io/libpod/alpine");
                assert_eq!(name, "c1");
                assert!(start);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_requires_command() {
        assert!(Cli::try_parse_from(["pulpod"]).is_err());
    }

    #[tokio::test]
    async fn test_execute_create_and_start() {
        let manager = InMemoryManager::new().with_registry_image("alpine");
        execute(
            &manager,
            Command::Create {
                image: "alpine".to_string(),
                name: "c1".to_string(),
                start: true,
            },
        )
        .await
        .unwrap();

        let info = manager.inspect_container("c1").await.unwrap();
        assert_eq!(info.state, ContainerState::Running);

        execute(&manager, Command::Rm { id: "c1".to_string() })
            .await
            .unwrap();
        assert!(manager.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_execute_propagates_errors() {
        let manager = InMemoryManager::new();
        let err = execute(&manager, Command::Stop { id: "nope".to_string() })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
