use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use threadline_api::ExistsPolicy;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

mod db;
mod error;
mod extractors;
mod handlers;
mod service;

#[cfg(test)]
mod testdb;

pub use error::Error;
use extractors::{AppState, PgPool};
use service::ServiceConfig;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

#[derive(Debug, structopt::StructOpt)]
#[structopt(name = "threadline-server", about = "Threaded comments over HTTP")]
struct Opt {
    /// Postgres connection string
    #[structopt(long, env = "DATABASE_URL")]
    database_url: String,

    #[structopt(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    #[structopt(long, env = "DB_MAX_CONNECTIONS", default_value = "16")]
    max_connections: u32,

    /// Deadline for each database operation, in milliseconds
    #[structopt(long, env = "QUERY_TIMEOUT_MS", default_value = "5000")]
    query_timeout_ms: u64,

    /// Whether soft-deleted comments can still be replied to ("structural")
    /// or not ("visible")
    #[structopt(long, env = "EXISTS_POLICY", default_value = "structural")]
    exists_policy: ExistsPolicy,

    /// How long to wait for in-flight requests on shutdown
    #[structopt(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value = "3")]
    shutdown_timeout_secs: u64,
}

/// Opens the pool, with every statement bounded server-side by
/// `statement_timeout`
pub async fn create_sqlx_pool(
    db_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
    statement_timeout: Duration,
) -> anyhow::Result<sqlx::PgPool> {
    let options = db_url
        .parse::<sqlx::postgres::PgConnectOptions>()
        .with_context(|| format!("Error parsing database url {:?}", db_url))?
        .options([("statement_timeout", statement_timeout.as_millis())]);
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect_with(options)
        .await
        .with_context(|| format!("Error opening database {:?}", db_url))
}

pub fn app(db: PgPool, config: ServiceConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS]);
    Router::new()
        .route(
            "/api/comments",
            post(handlers::create_comment).get(handlers::list_comments),
        )
        .route(
            "/api/comments/:id",
            get(handlers::fetch_tree).delete(handlers::delete_comment),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { db, config })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(?err, "failed listening for ctrl-c");
            futures::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(?err, "failed listening for SIGTERM");
                futures::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = futures::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => (),
        () = terminate => (),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let query_timeout = Duration::from_millis(opt.query_timeout_ms);

    let pool = create_sqlx_pool(
        &opt.database_url,
        opt.max_connections,
        query_timeout,
        query_timeout,
    )
    .await?;
    MIGRATOR
        .run(&pool)
        .await
        .context("applying database migrations")?;
    let db = PgPool::new(pool);

    let app = app(
        db.clone(),
        ServiceConfig {
            query_timeout,
            exists_policy: opt.exists_policy,
        },
    );

    let (shutdown_send, shutdown_recv) = tokio::sync::oneshot::channel::<()>();
    tracing::info!("listening on {}", opt.listen);
    let server = axum::Server::try_bind(&opt.listen)
        .with_context(|| format!("binding to {}", opt.listen))?
        .serve(app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = shutdown_recv.await;
        });
    tokio::pin!(server);

    tokio::select! {
        res = &mut server => res.context("serving axum webserver")?,
        () = shutdown_signal() => {
            tracing::info!("shutdown requested, draining in-flight requests");
            let _ = shutdown_send.send(());
            let grace = Duration::from_secs(opt.shutdown_timeout_secs);
            match tokio::time::timeout(grace, &mut server).await {
                Ok(res) => res.context("shutting down axum webserver")?,
                Err(_) => tracing::warn!("in-flight requests still running after {grace:?}, dropping them"),
            }
        }
    }

    db.close().await;
    tracing::info!("database pool closed, bye");
    Ok(())
}
