use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use curation::auth::{NewUser, issue_api_token, register_user};
use curation::config::ServerConfig;
use curation::server::{AppState, create_router};
use curation::store::{SqliteStore, Store};

const NOT_INITIALIZED: &str =
    "Server not initialized. Run 'curation admin init' first to create the database and admin user.";

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "curation")]
#[command(about = "A content channel curation server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// TOML config file; flags below override its values
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database, admin user and admin token)
    Init {
        #[command(flatten)]
        user: UserArgs,

        /// Skip interactive prompts; the admin signs in with the token only
        #[arg(long)]
        non_interactive: bool,
    },

    /// Create a user and print an API token for them
    CreateUser {
        #[command(flatten)]
        user: UserArgs,

        /// Grant admin rights
        #[arg(long)]
        admin: bool,

        /// Skip the password prompt
        #[arg(long)]
        non_interactive: bool,
    },
}

#[derive(Args)]
struct UserArgs {
    /// Data directory for the database
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Email address used to sign in
    #[arg(long, default_value = "admin@example.com")]
    email: String,

    #[arg(long, default_value = "")]
    first_name: String,

    #[arg(long, default_value = "")]
    last_name: String,
}

fn prompt_password(email: &str) -> anyhow::Result<String> {
    let password = inquire::Password::new(&format!("Password for {email}:"))
        .with_validator(|input: &str| {
            if input.chars().count() < 8 {
                Err("Password must be at least 8 characters".into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;
    Ok(password)
}

fn open_store(data_dir: &Path) -> anyhow::Result<SqliteStore> {
    fs::create_dir_all(data_dir)?;
    let config = ServerConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    Ok(store)
}

fn print_token(heading: &str, raw_token: &str) {
    println!();
    println!("========================================");
    println!("{heading}");
    println!();
    println!("  {raw_token}");
    println!();
    println!("========================================");
    println!();
}

fn run_init(args: UserArgs, non_interactive: bool) -> anyhow::Result<()> {
    let store = open_store(&args.data_dir)?;
    let token_file = ServerConfig {
        data_dir: args.data_dir.clone(),
        ..Default::default()
    }
    .admin_token_path();

    if store.has_admin_user()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let password = if non_interactive {
        None
    } else {
        Some(prompt_password(&args.email)?)
    };

    let admin = register_user(
        &store,
        NewUser {
            email: args.email,
            first_name: args.first_name,
            last_name: args.last_name,
            password,
            is_admin: true,
            policies_accepted: true,
        },
    )?;

    let raw_token = issue_api_token(&store, &admin.id)?;
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    print_token(
        "Admin token (save this, it won't be shown again):",
        &raw_token,
    );
    println!("Admin user: {}", admin.email);
    println!("Token also written to: {}", token_file.display());

    Ok(())
}

fn run_create_user(args: UserArgs, admin: bool, non_interactive: bool) -> anyhow::Result<()> {
    let store = open_store(&args.data_dir)?;
    if !store.has_admin_user()? {
        bail!(NOT_INITIALIZED);
    }

    let password = if non_interactive {
        None
    } else {
        Some(prompt_password(&args.email)?)
    };

    let user = register_user(
        &store,
        NewUser {
            email: args.email,
            first_name: args.first_name,
            last_name: args.last_name,
            password,
            is_admin: admin,
            policies_accepted: false,
        },
    )?;

    let raw_token = issue_api_token(&store, &user.id)?;
    print_token(&format!("Created user '{}' with token:", user.email), &raw_token);

    Ok(())
}

async fn run_serve(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = match config_path {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }

    let token_file = config.admin_token_path();
    if !token_file.exists() {
        bail!(NOT_INITIALIZED);
    }

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    if !store.has_admin_user()? {
        bail!(NOT_INITIALIZED);
    }

    info!("Admin token available at {}", token_file.display());

    let addr = config.socket_addr()?;
    let state = Arc::new(AppState::new(Arc::new(store), config));
    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("curation=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                user,
                non_interactive,
            } => run_init(user, non_interactive)?,
            AdminCommands::CreateUser {
                user,
                admin,
                non_interactive,
            } => run_create_user(user, admin, non_interactive)?,
        },
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
        } => run_serve(config, host, port, data_dir).await?,
    }

    Ok(())
}
