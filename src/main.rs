use std::{process, sync::Arc};

use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use yatube::{
    application::{
        admin::{AdminService, CreateGroupCommand},
        error::AppError,
    },
    config::{self, Command, GroupsCommand, PostsCommand},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AppRepositories, HttpState},
        telemetry,
        uploads::UploadStorage,
    },
};

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
        .unwrap_or(Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        Command::Serve(_) => run_serve(settings).await,
        Command::Migrate(_) => run_migrate(settings).await,
        Command::Groups(GroupsCommand::Create(args)) => {
            let admin = admin_service(&settings).await?;
            let group = admin
                .create_group(CreateGroupCommand {
                    title: args.title,
                    slug: args.slug,
                    description: args.description,
                })
                .await?;
            println!("{}\t{}\t{}", group.id, group.slug, group.title);
            Ok(())
        }
        Command::Posts(PostsCommand::Delete(args)) => {
            let admin = admin_service(&settings).await?;
            admin.delete_post(args.id).await?;
            println!("deleted post {}", args.id);
            Ok(())
        }
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;

    let uploads = Arc::new(
        UploadStorage::new(settings.media.root.clone())
            .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );
    info!(
        media_root = %uploads.root().display(),
        "upload storage ready"
    );

    let state = HttpState::new(app_repositories(&repositories, uploads), &settings)?;
    serve_http(&settings, state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;
    info!("database migrations applied");
    Ok(())
}

async fn admin_service(settings: &config::Settings) -> Result<AdminService, AppError> {
    let repositories = init_repositories(settings).await?;
    Ok(AdminService::new(
        repositories.clone(),
        repositories.clone(),
        repositories,
    ))
}

async fn connect_pool(settings: &config::Settings) -> Result<sqlx::PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let pool = connect_pool(settings).await?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    let repositories = PostgresRepositories::new(pool);
    repositories
        .health_check()
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(repositories))
}

fn app_repositories(
    repositories: &Arc<PostgresRepositories>,
    uploads: Arc<UploadStorage>,
) -> AppRepositories {
    AppRepositories {
        users: repositories.clone(),
        groups: repositories.clone(),
        posts: repositories.clone(),
        posts_writer: repositories.clone(),
        comments: repositories.clone(),
        follows: repositories.clone(),
        images: uploads,
    }
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
