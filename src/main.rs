// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use qmaster::config::Config;
use qmaster::db::{DynStore, MemoryStore, PgStore, Store};
use qmaster::models::user::{NewUser, Role};
use qmaster::routes;
use qmaster::services::{
    generator,
    mailer::{LogMailer, Mailer, SmtpMailer},
};
use qmaster::state::AppState;
use qmaster::utils::hash::hash_password;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load configuration from environment (.env included)
    let config = Config::from_env().unwrap_or_else(|e| panic!("Invalid configuration: {}", e));

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store: DynStore = match &config.database_url {
        Some(database_url) => {
            let pool = connect_with_retry(database_url).await;

            tracing::info!("Running migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Migrations applied successfully.");

            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store. Data is lost on restart.");
            Arc::new(MemoryStore::new())
        }
    };

    if let Err(e) = seed_teacher(store.as_ref(), &config).await {
        tracing::error!("Failed to seed teacher account: {:?}", e);
    }

    let generator = generator::from_config(&config).expect("Failed to build question generator");
    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => {
            let mailer = SmtpMailer::new(smtp, config.otp_ttl_secs / 60).expect("Invalid SMTP configuration");
            tracing::info!("Mailing OTPs through {}", smtp.host);
            Arc::new(mailer)
        }
        None => {
            tracing::warn!("EMAIL_USER/EMAIL_PASS not set; OTPs are logged instead of mailed.");
            Arc::new(LogMailer::new(config.log_otp))
        }
    };
    let state = AppState::new(store, config.clone(), generator, mailer);

    let app = routes::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("QMaster listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {}: {}", addr, e));

    axum::serve(listener, app).await.expect("Server error");
}

/// Connects to Postgres, retrying while the database container starts up.
async fn connect_with_retry(database_url: &str) -> PgPool {
    let mut retry_count = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => {
                tracing::info!("Database connected...");
                return pool;
            }
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

async fn seed_teacher(store: &dyn Store, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if let (Some(username), Some(password)) = (&config.seed_teacher_username, &config.seed_teacher_password) {
        if store.find_user_by_username(username).await?.is_none() {
            tracing::info!("Seeding teacher account: {}", username);
            store
                .create_user(NewUser {
                    username: username.clone(),
                    password_hash: hash_password(password)?,
                    role: Role::Teacher,
                    email: String::new(),
                })
                .await?;
            tracing::info!("Teacher account created successfully.");
        }
    }
    Ok(())
}
