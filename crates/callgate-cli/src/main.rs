//! callgate CLI — call registered services from the command line.
//!
//! Uses the same dispatch engine (callgate-core) a network transport would,
//! which makes it handy for poking at services during development.

use callgate_cli::commands;
use clap::{Parser, Subcommand};

/// callgate CLI — route a call to a registered service
#[derive(Parser)]
#[command(name = "callgate", version, about = "callgate CLI — route a call to a registered service")]
pub struct Cli {
    /// Path to a YAML config file selecting the built-in services
    #[arg(long, env = "CALLGATE_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch a call
    Call {
        /// Method path (e.g. "discovery.get_methods")
        method: String,
        /// Arguments as a JSON object (by name) or array (by position)
        #[arg(long, default_value = "{}")]
        args: String,
    },

    /// List registered services
    Services,

    /// List the public operations of a service
    Methods {
        /// Service name
        service: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "callgate_core=warn,callgate_cli=info".into()),
        )
        .init();

    let result = if let Some(command) = cli.command {
        match commands::init_context(cli.config.as_deref()) {
            Ok(context) => match command {
                Commands::Call { method, args } => commands::call::call(&context, &method, &args),
                Commands::Services => commands::discovery::services(&context),
                Commands::Methods { service } => commands::discovery::methods(&context, &service),
            },
            Err(e) => Err(e),
        }
    } else {
        // No subcommand — show help
        use clap::CommandFactory;
        Cli::command().print_help().ok();
        println!();
        Ok(())
    };

    if let Err(e) = result {
        tracing::debug!("Command failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
