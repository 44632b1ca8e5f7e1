//! ReVal daemon: runs the Telegram join gate.

use anyhow::Context;
use clap::Parser;
use reval_gate::DeliveryMode;
use reval_node::{init_logging, GateConfig, GateNode, ProofVerification, Secret};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reval", about = "Telegram group-join gate backed by identity proofs")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "REVAL_CONFIG")]
    config: Option<PathBuf>,

    /// Public base URL of the gate, e.g. "https://gate.example.com".
    #[arg(long, env = "REVAL_BASE_URL")]
    base_url: Option<String>,

    /// Address for the HTTP server, e.g. "0.0.0.0:3000".
    #[arg(long, env = "REVAL_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// Directory for the LMDB record store.
    #[arg(long, env = "REVAL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Telegram bot token.
    #[arg(long, env = "REVAL_BOT_TOKEN", hide_env_values = true)]
    bot_token: Option<String>,

    /// Register `<base-url>/api/bot` as the bot's webhook on start.
    #[arg(long, env = "REVAL_REGISTER_WEBHOOK")]
    register_webhook: bool,

    /// Proof-protocol application id.
    #[arg(long, env = "REVAL_APP_ID")]
    app_id: Option<String>,

    /// Proof-protocol application secret.
    #[arg(long, env = "REVAL_APP_SECRET", hide_env_values = true)]
    app_secret: Option<String>,

    /// Proof provider members must satisfy.
    #[arg(long, env = "REVAL_PROVIDER_ID")]
    provider_id: Option<String>,

    /// Base URL of the proof service API.
    #[arg(long, env = "REVAL_PROOF_API_URL")]
    proof_api_url: Option<String>,

    /// How proof outcomes arrive: "poll" or "callback".
    #[arg(long, env = "REVAL_DELIVERY_MODE")]
    delivery_mode: Option<DeliveryMode>,

    /// Proof checking: "attestor" or "trust".
    #[arg(long, env = "REVAL_PROOF_VERIFICATION", value_parser = parse_verification)]
    proof_verification: Option<ProofVerification>,

    /// Trusted attestor public keys (hex, comma-separated).
    #[arg(long, env = "REVAL_ATTESTOR_KEYS", value_delimiter = ',')]
    attestor_keys: Vec<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "REVAL_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "REVAL_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the gate.
    Serve,
    /// Print the effective configuration as TOML with secrets redacted.
    Config,
}

fn parse_verification(s: &str) -> Result<ProofVerification, String> {
    match s.to_ascii_lowercase().as_str() {
        "trust" => Ok(ProofVerification::Trust),
        "attestor" => Ok(ProofVerification::Attestor),
        other => Err(format!("unknown proof verification mode: {other}")),
    }
}

impl Cli {
    /// Layer CLI flags and env vars over the file configuration.
    fn apply(self, mut config: GateConfig) -> (GateConfig, Command) {
        if let Some(v) = self.base_url {
            config.base_url = v;
        }
        if let Some(v) = self.listen_addr {
            config.listen_addr = v;
        }
        if let Some(v) = self.data_dir {
            config.data_dir = v;
        }
        if let Some(v) = self.bot_token {
            config.bot_token = Secret::new(v);
        }
        config.register_webhook |= self.register_webhook;
        if let Some(v) = self.app_id {
            config.proof.app_id = v;
        }
        if let Some(v) = self.app_secret {
            config.proof.app_secret = Secret::new(v);
        }
        if let Some(v) = self.provider_id {
            config.proof.provider_id = v;
        }
        if let Some(v) = self.proof_api_url {
            config.proof.api_base_url = v;
        }
        if let Some(v) = self.delivery_mode {
            config.proof.delivery_mode = v;
        }
        if let Some(v) = self.proof_verification {
            config.proof.proof_verification = v;
        }
        if !self.attestor_keys.is_empty() {
            config.proof.attestor_keys = self.attestor_keys;
        }
        if let Some(v) = self.log_format {
            config.log_format = v;
        }
        if let Some(v) = self.log_level {
            config.log_level = v;
        }
        (config, self.command)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => GateConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => GateConfig::default(),
    };
    let (config, command) = cli.apply(file_config);

    match command {
        Command::Config => {
            println!("{}", config.to_redacted_toml_string()?);
        }
        Command::Serve => {
            init_logging(config.log_format()?, &config.log_level);
            tracing::info!(
                base_url = %config.base_url,
                listen = %config.listen_addr,
                mode = %config.proof.delivery_mode,
                "starting ReVal gate"
            );

            let mut node = GateNode::new(config).await?;
            node.start().await?;

            tracing::info!("shutdown signal received, stopping gate");
            node.stop().await?;

            tracing::info!("ReVal daemon exited cleanly");
        }
    }

    Ok(())
}
