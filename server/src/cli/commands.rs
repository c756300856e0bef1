// server/src/cli/commands.rs

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Precta healthcare marketplace backend
#[derive(Parser, Debug)]
#[command(name = "precta")]
#[command(version, about = "Precta healthcare marketplace backend")]
pub struct CliArgs {
    /// Configuration file; defaults to an optional precta.toml in the working directory
    #[arg(short = 'c', long = "config", global = true, env = "PRECTA_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<PrectaCommand>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum PrectaCommand {
    /// Serve the REST API (the default)
    Serve {
        #[arg(short = 'p', long = "port", value_name = "PORT")]
        port: Option<u16>,
        #[arg(long = "host", value_name = "HOST")]
        host: Option<String>,
    },
    /// Apply pending database migrations and exit
    Migrate,
    /// Print the effective configuration with secrets redacted
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_accepts_port_and_global_config() {
        let args = CliArgs::try_parse_from(["precta", "serve", "--port", "9000", "--config", "/etc/precta.toml"])
            .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/etc/precta.toml")));
        assert_eq!(args.command, Some(PrectaCommand::Serve { port: Some(9000), host: None }));
    }

    #[test]
    fn no_subcommand_is_allowed() {
        let args = CliArgs::try_parse_from(["precta"]).unwrap();
        assert_eq!(args.command, None);
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(CliArgs::try_parse_from(["precta", "shell"]).is_err());
    }
}
