use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "skein",
    about = "Minimal chat client over an OpenAI-compatible endpoint"
)]
pub struct Cli {
    /// Model label to chat with (see --list-models).
    #[arg(short, long)]
    pub model: Option<String>,

    /// List known model labels and exit.
    #[arg(long)]
    pub list_models: bool,

    /// List stored sessions and exit.
    #[arg(long)]
    pub sessions: bool,
}
