use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use ember_ai::{LlamaCppLoader, ModelManager};
use ember_core::config::AppConfig;
use ember_core::lifecycle;
use ember_server::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    lifecycle::init_tracing();

    let cli = Cli::parse();
    let mut config = AppConfig::load_or_default(cli.config.as_deref());
    cli.apply(&mut config);

    let manager = Arc::new(ModelManager::new(
        config.model.clone(),
        config.generation.clone(),
        Arc::new(LlamaCppLoader),
    ));

    match cli.command {
        None | Some(Commands::Serve { .. }) => {
            lifecycle::log_startup();
            ember_server::start(manager, config.server).await?;
            lifecycle::log_shutdown();
        }
        Some(Commands::Generate {
            prompt,
            max_new_tokens,
        }) => {
            let max_new_tokens =
                max_new_tokens.unwrap_or(config.generation.default_max_new_tokens);
            manager.load().await?;
            let text = manager.generate(&prompt, max_new_tokens).await?;
            println!("{text}");
        }
    }

    Ok(())
}
