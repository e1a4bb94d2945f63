use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue};
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use word_refresher::config::Config;
use word_refresher::logging::init_tracing;
use word_refresher::middleware::rate_limit::rate_limit_cleanup_loop;
use word_refresher::routes::build_router;
use word_refresher::services::mailer::mailer_from_config;
use word_refresher::state::{AppState, Repositories};
use word_refresher::store::seed::seed_starter_words;
use word_refresher::store::Store;
use word_refresher::workers::WorkerManager;

const CSP_HEADER: &str = "default-src 'self'; script-src 'self'; style-src 'self'; connect-src 'self'; img-src 'self' data:; frame-ancestors 'none'; base-uri 'self'; form-action 'self'";

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    let _log_guard = match init_tracing(&config.log_config()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialise logging: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting word-refresher");

    let store = match Store::open(&config.sled_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(error = %e, path = %config.sled_path, "Failed to open sled database");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = store.run_migrations() {
        tracing::error!(error = %e, "Failed to run migrations");
        return ExitCode::FAILURE;
    }

    let repos = Repositories::from_store(store.clone());

    if config.seed_words {
        match seed_starter_words(repos.words.as_ref()) {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "Seeded starter words"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to seed starter words");
                return ExitCode::FAILURE;
            }
        }
    }

    let cors_layer = match build_cors_layer(&config) {
        Ok(layer) => layer,
        Err(message) => {
            tracing::error!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let mailer = mailer_from_config(&config.mail);
    let state = AppState::new(repos.clone(), mailer, &config, shutdown_tx.clone());

    tokio::spawn(rate_limit_cleanup_loop(
        state.rate_limit().clone(),
        shutdown_tx.subscribe(),
    ));

    let worker_handle = if config.worker.is_leader {
        let worker_manager =
            WorkerManager::new(repos.clone(), shutdown_tx.subscribe(), &config.worker);
        Some(tokio::spawn(async move {
            if let Err(e) = worker_manager.start().await {
                tracing::error!(error = %e, "Worker manager failed");
            }
        }))
    } else {
        None
    };

    let app = build_router(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("content-security-policy"),
            HeaderValue::from_static(CSP_HEADER),
        ));

    let addr = SocketAddr::new(config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "Failed to bind TCP listener");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, "Listening");

    let server_future = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()));

    if let Some(handle) = worker_handle {
        tokio::spawn(async move {
            match handle.await {
                Err(e) => {
                    tracing::error!(error = %e, "Worker task panicked, HTTP server continues")
                }
                Ok(()) => tracing::info!("Worker manager exited normally"),
            }
        });
    }

    let mut exit = ExitCode::SUCCESS;
    if let Err(e) = server_future.await {
        tracing::error!(error = %e, "HTTP server crashed");
        exit = ExitCode::FAILURE;
    }

    tracing::info!("Flushing store before exit");
    if let Err(e) = store.flush() {
        tracing::error!(error = %e, "Failed to flush store before exit");
    }
    tracing::info!("Shutdown complete");
    exit
}

fn build_cors_layer(config: &Config) -> Result<CorsLayer, String> {
    if config.cors_origin.trim() == "*" {
        // Wildcard origins cannot carry credentials.
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_credentials(false)
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .allow_methods(Any));
    }

    config
        .cors_origin
        .parse::<HeaderValue>()
        .map(|origin| {
            CorsLayer::new()
                .allow_origin(origin)
                .allow_credentials(true)
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                ])
        })
        .map_err(|e| format!("Invalid CORS_ORIGIN '{}': {e}", config.cors_origin))
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl-C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
