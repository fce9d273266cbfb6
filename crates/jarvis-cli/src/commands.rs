//! Subcommand definitions.

use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the WebSocket server (the default)
    Serve {
        /// Address to bind, overrides HOST
        #[arg(long)]
        host: Option<String>,
        /// Port to bind, overrides PORT
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List Cloud Text-to-Speech voices
    Voices {
        /// Only voices for this language, e.g. fr-FR
        #[arg(short, long)]
        language: Option<String>,
    },
    /// List Gemini models visible to the API key
    Models {
        /// Only models that support live sessions
        #[arg(long)]
        live_only: bool,
    },
}

#[cfg(test)]
mod tests {
    use crate::Cli;
    use crate::commands::Commands;
    use clap::Parser;

    #[test]
    fn serve_overrides() {
        let cli = Cli::parse_from(["jarvis", "serve", "--host", "127.0.0.1", "-p", "9000"]);
        match cli.command {
            Some(Commands::Serve { host, port }) => {
                assert_eq!(host.as_deref(), Some("127.0.0.1"));
                assert_eq!(port, Some(9000));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn serve_without_overrides() {
        let cli = Cli::parse_from(["jarvis", "serve"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Serve {
                host: None,
                port: None
            })
        ));
    }

    #[test]
    fn voices_language_filter() {
        let cli = Cli::parse_from(["jarvis", "voices", "--language", "fr-FR"]);
        match cli.command {
            Some(Commands::Voices { language }) => assert_eq!(language.as_deref(), Some("fr-FR")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(Cli::try_parse_from(["jarvis", "serve", "--port", "99999"]).is_err());
    }
}
