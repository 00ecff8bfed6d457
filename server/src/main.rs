use anyhow::Context;
use clap::{Parser, Subcommand};
use larder_server::config::Config;
use larder_server::telemetry::init_telemetry;
use larder_server::{api, app, db, users, AppState};

#[derive(Parser)]
#[command(name = "larder-server", about = "Recipe, tag and ingredient API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print the OpenAPI document and exit
    Openapi,
    /// Create an administrator account
    CreateSuperuser {
        #[arg(long)]
        email: String,
        #[arg(long, env = "LARDER_SUPERUSER_PASSWORD")]
        password: String,
        #[arg(long, default_value = "")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Openapi) = cli.command {
        println!("{}", api::openapi().to_pretty_json()?);
        return Ok(());
    }

    let _telemetry = init_telemetry()?;
    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url).context("Failed to set up database")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::CreateSuperuser {
            email,
            password,
            name,
        } => {
            let mut conn = pool.get()?;
            let user = users::create_superuser(&mut conn, &email, &password, &name)?;
            println!("Created superuser {} (id {})", user.email, user.id);
            Ok(())
        }
        Command::Serve | Command::Openapi => serve(pool, config).await,
    }
}

async fn serve(pool: db::DbPool, config: Config) -> anyhow::Result<()> {
    let state = AppState::new(pool, &config);
    std::fs::create_dir_all(state.media.root())
        .with_context(|| format!("Failed to create {}", state.media.root().display()))?;

    let app = app(state, &config);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec available at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
