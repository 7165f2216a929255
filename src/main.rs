use std::{process, sync::Arc};

use tagfeed::{
    application::{
        error::AppError, posts_hook::HookOptions, repos::PostsRepo, sessions::SessionStore,
    },
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        memory::MemoryPostsRepo,
        telemetry,
    },
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
        config::Command::CheckContent(_) => run_check_content(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repo = Arc::new(MemoryPostsRepo::load(&settings.content.posts_file).await?);
    let posts_repo: Arc<dyn PostsRepo> = repo;

    let sessions = Arc::new(SessionStore::new(
        posts_repo,
        HookOptions::from(&settings.feed),
        settings.sessions.idle_ttl,
    ));
    let router = http::build_router(HttpState::new(sessions));

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "tagfeed::serve",
        addr = %settings.server.addr,
        page_size = settings.feed.page_size.get(),
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "tagfeed::serve", "server stopped");
    Ok(())
}

async fn run_check_content(settings: config::Settings) -> Result<(), AppError> {
    let path = settings.content.posts_file;
    if !tokio::fs::try_exists(&path)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?
    {
        return Err(AppError::validation(format!(
            "content file `{}` does not exist",
            path.display()
        )));
    }

    let repo = MemoryPostsRepo::load(&path).await?;
    let summary = repo
        .summary()
        .map_err(|err| AppError::unexpected(err.to_string()))?;

    info!(
        target = "tagfeed::check_content",
        path = %path.display(),
        posts = summary.posts,
        tags = summary.tags.len(),
        "content is valid"
    );
    println!(
        "{}: {} posts, {} tags ({})",
        path.display(),
        summary.posts,
        summary.tags.len(),
        summary.tags.join(", ")
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target = "tagfeed::serve", error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target = "tagfeed::serve", "shutdown signal received");
}
