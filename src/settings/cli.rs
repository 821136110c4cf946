use super::Parser;

#[derive(Parser, Debug)]
#[command(about = "Authentication gateway for the notes API")]
pub struct Cli {
    /// Path to the settings file.
    #[arg(long)]
    pub settings: Option<String>,
}
