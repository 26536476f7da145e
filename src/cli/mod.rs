use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Refuse to read documents larger than this many bytes. Overrides FILESAVE_MAX_READ_BYTES.
    #[arg(long, global = true)]
    pub max_read_bytes: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Save a local file to a picked location.
    #[command(alias = "s")]
    Save {
        /// The local file whose bytes are sent across the bridge.
        #[arg(required = true)]
        input: PathBuf,

        /// Location the picker answers with: a `file://` handle or a path.
        #[arg(long)]
        to: String,

        /// Suggested file name shown in the picker. Defaults to FILESAVE_DEFAULT_NAME or project.sb3.
        #[arg(long)]
        name: Option<String>,

        /// MIME-type hint for the picker.
        #[arg(long)]
        mime: Option<String>,

        /// Make the picker report a cancel instead of a location.
        #[arg(long)]
        cancel: bool,
    },

    /// Open a picked document and print it as the bridge would return it.
    #[command(alias = "o")]
    Open {
        /// Location the picker answers with: a `file://` handle or a path.
        #[arg(required = true)]
        from: String,

        /// MIME-type filter for the picker.
        #[arg(long)]
        mime: Option<String>,

        /// Write the decoded bytes here instead of printing the reply.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Make the picker report a cancel instead of a location.
        #[arg(long)]
        cancel: bool,
    },
}

/// Parses command-line arguments using `clap`.
pub fn run() -> Result<Args, Box<dyn std::error::Error>> {
    Ok(Args::parse())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_save() {
        let args = Args::try_parse_from(["filesave", "save", "in.bin", "--to", "/tmp/x.sb3", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);
        match args.command {
            Commands::Save { input, to, cancel, .. } => {
                assert_eq!(input, PathBuf::from("in.bin"));
                assert_eq!(to, "/tmp/x.sb3");
                assert!(!cancel);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn save_requires_destination() {
        assert!(Args::try_parse_from(["filesave", "save", "in.bin"]).is_err());
    }
}
