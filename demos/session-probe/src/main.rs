use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use warden::prelude::*;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Inspect and drive a Warden session stored in a local file.
#[derive(Parser)]
#[command(name = "session-probe", version)]
struct Cli {
    /// Credential file.
    #[arg(long, default_value = "warden-credential.json", global = true)]
    store: PathBuf,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "warn", global = true)]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a token's claims.
    Decode { token: String },
    /// Check a token's structure and expiry.
    Validate { token: String },
    /// Store a credential, as a successful login would.
    Login {
        token: String,
        #[arg(long)]
        role: Option<String>,
    },
    /// Show the current session.
    Status,
    /// Ask the route guard for a decision.
    Authorize {
        #[arg(long)]
        role: Option<String>,
    },
    /// Clear the stored credential.
    Logout,
    /// Activate the session and wait until it ends (or Ctrl-C).
    Watch {
        /// Confirm the token against this identity server first.
        #[arg(long)]
        confirm_url: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// Prints directives instead of routing anywhere.
struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, directive: NavigationDirective) {
        let NavigationDirective::EntryPoint { path, cause } = directive;
        println!("{}", json!({ "navigate": path, "cause": cause.as_str() }));
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn builder(store: &Path) -> Result<SessionAuthorityBuilder, WardenError> {
    Ok(SessionAuthority::builder()
        .storage(FileStore::open(store)?)
        .navigator(Arc::new(PrintNavigator)))
}

fn print_validation(validation: &Validation) -> Result<(), serde_json::Error> {
    let report = match validation {
        Validation::Valid(claims) => json!({ "valid": true, "claims": claims }),
        Validation::Invalid(reason) => json!({ "valid": false, "reason": reason.as_str() }),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn watch<C: IdentityConfirmer>(
    authority: SessionAuthority<C>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Subscribe first so an expiry racing with activation is still seen.
    let mut transitions = authority.controller().transitions();
    let state = authority.activate().await;
    if !state.is_active() {
        println!("{}", serde_json::to_string(&state)?);
        return Ok(());
    }

    loop {
        tokio::select! {
            received = transitions.recv() => match received {
                Ok(state) => {
                    println!("{}", serde_json::to_string(&state)?);
                    if state == LifecycleState::Unauthenticated {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("missed {skipped} transitions");
                    if authority.state() == LifecycleState::Unauthenticated {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                authority.deactivate();
                eprintln!("stopped watching; credential left in place");
                break;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    warden::logging::init_tracing(&cli.log);

    match cli.command {
        Command::Decode { token } => {
            let claims = decode(&token)?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }
        Command::Validate { token } => {
            print_validation(&validate(Some(&token), UnixMillis::now()))?;
        }
        Command::Login { token, role } => {
            let authority = builder(&cli.store)?.build()?;
            authority.login(&LoginGrant {
                access_token: token,
                role,
            })?;
            println!("{}", serde_json::to_string_pretty(&authority.session())?);
        }
        Command::Status => {
            let authority = builder(&cli.store)?.build()?;
            println!("{}", serde_json::to_string_pretty(&authority.session())?);
        }
        Command::Authorize { role } => {
            let authority = builder(&cli.store)?.build()?;
            println!("{}", authority.authorize(role.as_deref()).as_str());
        }
        Command::Logout => {
            let authority = builder(&cli.store)?.build()?;
            authority.logout();
        }
        Command::Watch { confirm_url } => match confirm_url {
            Some(url) => {
                let confirmer = HttpConfirmer::new(&HttpConfirmerConfig::new(url))?;
                watch(builder(&cli.store)?.build_with(confirmer)?).await?;
            }
            None => watch(builder(&cli.store)?.build()?).await?,
        },
    }
    Ok(())
}
