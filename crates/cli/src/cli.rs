use clap::{Parser, Subcommand};

/// Send error alerts to a chat webhook.
///
/// Settings come from `ERROR_ALERTER_*` environment variables (and `.env`).
#[derive(Parser, Debug)]
#[command(name = "error-alerter", version, about = "Send error alerts to a chat webhook")]
pub struct CliArgs {
    /// Settings profile (looks up `{PROFILE}_ERROR_ALERTER_*` first)
    #[arg(long, env = "ERROR_ALERTER_PROFILE", default_value = "")]
    pub profile: String,

    /// Webhook URL override
    #[arg(long)]
    pub webhook_url: Option<String>,

    /// Redis URL for dedup (no dedup when unset)
    #[arg(long, env = "ERROR_ALERTER_REDIS_URL")]
    pub redis_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved settings with secrets redacted
    Config,

    /// Post a test alert (skips dedup)
    Test,

    /// Run an alert through the full pipeline
    Send {
        /// Error type name
        #[arg(long = "class")]
        error_class: String,

        /// Error message
        #[arg(long)]
        message: String,

        /// Coarse origin label
        #[arg(long, default_value = "Application")]
        source: String,

        /// Fine-grained origin, e.g. `Handler#action`
        #[arg(long)]
        detail: Option<String>,

        /// Job queue name
        #[arg(long)]
        queue: Option<String>,

        /// Stack frame; repeat for several, outermost first
        #[arg(long = "frame")]
        frames: Vec<String>,
    },
}
