use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use broker_gate::auth::AdmissionPolicy;
use broker_gate::config;

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Operator tools for broker-gate", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash a token or password with bcrypt for use in the config file
    Passwd {
        /// bcrypt cost factor (4-31)
        #[arg(short, long, default_value_t = 11)]
        cost: u32,

        /// Secret to hash; read from stdin when omitted
        #[arg(short, long)]
        secret: Option<String>,
    },
    /// Validate a config file and print the admission mode
    Check {
        path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Passwd { cost, secret } => {
            let secret = match secret {
                Some(secret) => secret,
                None => read_secret()?,
            };
            if secret.is_empty() {
                return Err("refusing to hash an empty secret".into());
            }
            let hashed = bcrypt::hash(secret, cost)?;
            println!("{hashed}");
        }
        Commands::Check { path } => {
            let config = config::load_config(&path)?;
            let policy = AdmissionPolicy::from_config(&config.auth)?;
            println!("config:        {}", path.display());
            println!("listen:        {}", config.listener.bind_address);
            println!("mode:          {}", policy.mode().as_str());
            println!("auth_required: {}", policy.auth_required());
            let hashed = match &policy {
                AdmissionPolicy::None => None,
                AdmissionPolicy::Token(secret) => Some(secret.is_hashed()),
                AdmissionPolicy::UserPass { password, .. } => Some(password.is_hashed()),
            };
            if let Some(hashed) = hashed {
                println!("bcrypt:        {hashed}");
            }
            println!("auth_timeout:  {}ms", config.timeouts.auth_ms);
        }
    }

    Ok(())
}

fn read_secret() -> io::Result<String> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
