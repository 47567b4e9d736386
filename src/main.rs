use std::process;
use std::sync::Arc;

use lanterna::{
    application::applications::ApplicationService,
    application::auth::{AuthService, hash_password},
    application::contacts::ContactService,
    application::error::AppError,
    application::events::EventService,
    application::journals::JournalService,
    application::repos::{
        ApplicationsRepo, ContactsRepo, EventsRepo, JournalsRepo, NewUser, TokensRepo, UsersRepo,
    },
    cache::{CacheConfig, ResponseCache},
    config,
    infra::{blob::BlobStorage, db::PgRepositories, error::InfraError, http, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::CreateAdmin(args) => run_create_admin(settings, args).await,
    }
}

async fn connect(settings: &config::Settings) -> Result<PgRepositories, AppError> {
    let url = settings.database.url.as_deref().ok_or_else(|| {
        AppError::from(InfraError::configuration(
            "database.url is required; set LANTERNA__DATABASE__URL or --database-url",
        ))
    })?;

    let pool = PgRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(PgRepositories::new(pool))
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let db = connect(&settings).await?;
    PgRepositories::run_migrations(db.pool())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    info!(target = "lanterna::migrate", "migrations applied");
    Ok(())
}

async fn run_create_admin(
    settings: config::Settings,
    args: config::CreateAdminArgs,
) -> Result<(), AppError> {
    let db = connect(&settings).await?;
    PgRepositories::run_migrations(db.pool())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    let password_hash = hash_password(&args.password)
        .map_err(|err| AppError::unexpected(format!("failed to hash password: {err}")))?;
    let user = db
        .create_user(NewUser {
            name: args.name,
            email: args.email,
            password_hash,
            is_admin: true,
        })
        .await?;

    info!(
        target = "lanterna::admin",
        user_id = user.id,
        email = %user.email,
        "administrator account created"
    );
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let db = Arc::new(connect(&settings).await?);
    PgRepositories::run_migrations(db.pool())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    let blobs = Arc::new(
        BlobStorage::new(settings.storage.directory.clone())
            .map_err(|err| AppError::from(InfraError::from(err)))?,
    );
    let cache = Arc::new(ResponseCache::new(CacheConfig::from(&settings.cache)));

    let events_repo: Arc<dyn EventsRepo> = db.clone();
    let journals_repo: Arc<dyn JournalsRepo> = db.clone();
    let applications_repo: Arc<dyn ApplicationsRepo> = db.clone();
    let contacts_repo: Arc<dyn ContactsRepo> = db.clone();
    let users_repo: Arc<dyn UsersRepo> = db.clone();
    let tokens_repo: Arc<dyn TokensRepo> = db.clone();

    let state = http::AppState {
        events: Arc::new(EventService::new(events_repo, blobs.clone(), cache.clone())),
        journals: Arc::new(JournalService::new(
            journals_repo,
            blobs.clone(),
            cache.clone(),
        )),
        applications: Arc::new(ApplicationService::new(applications_repo, blobs.clone())),
        contacts: Arc::new(ContactService::new(contacts_repo)),
        auth: Arc::new(AuthService::new(users_repo, tokens_repo)),
        cache,
        blobs,
        db: db.clone(),
        public_base_url: settings.storage.public_base_url.clone(),
    };

    let router = http::build_router(state, settings.storage.max_upload_bytes.get());

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "lanterna::serve",
        addr = %settings.server.addr,
        "listening"
    );

    let graceful_shutdown = settings.server.graceful_shutdown;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal(graceful_shutdown).await;
        })
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal(grace: std::time::Duration) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(target = "lanterna::serve", error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!(
        target = "lanterna::serve",
        grace_seconds = grace.as_secs(),
        "shutdown signal received, draining connections"
    );
    tokio::time::sleep(grace).await;
}
