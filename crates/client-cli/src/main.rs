use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use shared::RegisterRequest;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod config;

use api::ApiClient;

#[derive(Parser)]
#[command(name = "scholar")]
#[command(about = "Command-line client for the Scholar Hub tutoring service")]
#[command(version)]
struct Cli {
    /// Server URL (overrides config)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Auth token (overrides config)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a student or mentor account
    Register(RegisterArgs),
    /// Log in and remember the access token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Revoke the current access token
    Logout,
    /// Show the logged-in account
    Whoami,
    /// Ask the AI assistant a question
    Ask {
        /// The question; multiple words are joined with spaces
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// List students at your school (mentors only)
    Students,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct RegisterArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    /// student or mentor
    #[arg(long)]
    role: String,
    #[arg(long)]
    full_name: Option<String>,
    #[arg(long)]
    school: Option<String>,
    /// Student only
    #[arg(long)]
    grade: Option<String>,
    /// Student only
    #[arg(long)]
    class_name: Option<String>,
    /// Mentor only
    #[arg(long)]
    department: Option<String>,
    /// Mentor only, in years
    #[arg(long)]
    experience: Option<i64>,
}

impl From<RegisterArgs> for RegisterRequest {
    fn from(args: RegisterArgs) -> Self {
        RegisterRequest {
            email: args.email,
            password: args.password,
            role: args.role,
            full_name: args.full_name,
            grade: args.grade,
            class_name: args.class_name,
            school: args.school,
            department: args.department,
            experience: args.experience,
        }
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a configuration value
    Set {
        /// Configuration key (server, token)
        key: String,
        /// Configuration value
        value: String,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Show all configuration
    Show,
    /// Get the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scholar=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = config::Config::load().unwrap_or_default();
    let server = config.server(cli.server);
    let token = config.token(cli.token);
    tracing::debug!("Using server {}", server);

    match cli.command {
        Commands::Register(args) => auth::register(&server, args.into()).await?,
        Commands::Login { email, password } => {
            auth::login(&mut config, &server, email, password).await?
        }
        Commands::Logout => auth::logout(&mut config, &server, token).await?,
        Commands::Whoami => auth::whoami(&server, token).await?,
        Commands::Ask { question } => {
            let client = ApiClient::new(&server, token);
            let answer = client.ask(&question.join(" ")).await?;
            println!("{}", answer);
        }
        Commands::Students => {
            let client = ApiClient::new(&server, token);
            let students = client.students().await?;
            if students.is_empty() {
                println!("No students found at your school.");
            }
            for student in students {
                println!(
                    "\x1b[1m{}\x1b[0m  (student {}, grade {}, class {})",
                    student.full_name.as_deref().unwrap_or("Unknown"),
                    student.id,
                    student.grade.as_deref().unwrap_or("-"),
                    student.class_name.as_deref().unwrap_or("-"),
                );
                if let Some(summary) = student.progress_summary {
                    println!("  {}", summary);
                }
            }
        }
        Commands::Config { action } => handle_config_command(action)?,
    }

    Ok(())
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            let mut config = config::Config::load().unwrap_or_default();
            config.set(&key, value)?;
            config.save()?;
            println!("Configuration saved");
        }
        ConfigAction::Get { key } => {
            let config = config::Config::load()?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Show => {
            let config = config::Config::load()?;
            println!("server: {}", config.server(None));
            println!("token: {}", config.get("token")?);
        }
        ConfigAction::Path => {
            let path = config::Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_register_mentor() {
        let cli = Cli::parse_from([
            "scholar",
            "register",
            "--email",
            "sarah@test.io",
            "--password",
            "secret1",
            "--role",
            "mentor",
            "--department",
            "Math",
            "--experience",
            "6",
        ]);
        let Commands::Register(args) = cli.command else {
            panic!("Expected register");
        };
        let req = RegisterRequest::from(args);
        assert_eq!(req.role, "mentor");
        assert_eq!(req.experience, Some(6));
        assert!(req.grade.is_none());
    }

    #[test]
    fn test_parse_ask_with_global_server() {
        let cli = Cli::parse_from([
            "scholar",
            "ask",
            "What",
            "is",
            "a",
            "robot?",
            "--server",
            "http://hub",
        ]);
        assert_eq!(cli.server.as_deref(), Some("http://hub"));
        let Commands::Ask { question } = cli.command else {
            panic!("Expected ask");
        };
        assert_eq!(question.join(" "), "What is a robot?");
    }
}
