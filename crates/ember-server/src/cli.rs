use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ember_core::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "ember", about = "Ember: llama.cpp text generation over HTTP")]
pub struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// GGUF model file (overrides config)
    #[arg(long, global = true, env = "EMBER_MODEL_PATH")]
    pub model: Option<PathBuf>,

    /// Worker threads (default: all cores)
    #[arg(long, global = true, env = "EMBER_THREADS")]
    pub threads: Option<u32>,

    /// Prompt format: raw or chatml
    #[arg(long, global = true, env = "EMBER_PROMPT_FORMAT")]
    pub prompt_format: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Serve the HTTP API (default)
    Serve {
        #[arg(long, env = "EMBER_HOST")]
        host: Option<String>,
        #[arg(long, env = "EMBER_PORT")]
        port: Option<u16>,
    },

    /// Load the model and print one completion
    Generate {
        #[arg(long)]
        prompt: String,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1024))]
        max_new_tokens: Option<u32>,
    },
}

impl Cli {
    /// Fold command-line overrides into the loaded configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(model) = &self.model {
            config.model.path = model.clone();
        }
        if let Some(threads) = self.threads {
            config.model.n_threads = Some(threads);
        }
        if let Some(format) = &self.prompt_format {
            config.model.prompt_format = format.clone();
        }
        if let Some(Commands::Serve { host, port }) = &self.command {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve_with_config_values() {
        let cli = Cli::try_parse_from(["ember"]).unwrap();
        assert!(cli.command.is_none());

        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.server.addr(), "0.0.0.0:8000");
    }

    #[test]
    fn overrides_replace_config_values() {
        let cli = Cli::try_parse_from([
            "ember",
            "--model",
            "/srv/tiny.gguf",
            "--threads",
            "2",
            "serve",
            "--port",
            "9090",
        ])
        .unwrap();

        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.model.path, PathBuf::from("/srv/tiny.gguf"));
        assert_eq!(config.model.n_threads, Some(2));
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn generate_rejects_out_of_range_tokens() {
        for tokens in ["0", "1025"] {
            let args = ["ember", "generate", "--prompt", "hi", "--max-new-tokens", tokens];
            assert!(Cli::try_parse_from(args).is_err(), "accepted {tokens}");
        }

        let cli = Cli::try_parse_from(["ember", "generate", "--prompt", "hi"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Generate {
                prompt: "hi".into(),
                max_new_tokens: None
            })
        );
    }
}
