use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "invoice-component")]
#[command(about = "Generate invoice PDFs through the external invoice renderer")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "invoice-component.toml")]
    pub config: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Generate one invoice from a JSON payload
    Generate {
        /// Payload file, or '-' for stdin
        #[arg(short, long)]
        payload: String,

        /// Caller identity used for file naming and storage metadata
        #[arg(long, default_value = "local")]
        user_id: String,
    },
    /// Download the renderer binary if it is not installed
    Provision,
    /// Print the component descriptor as JSON
    Describe,
}
