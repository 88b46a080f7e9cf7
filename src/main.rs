use std::sync::Arc;

use dotenvy::dotenv;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use helpdesk::config::AppConfig;
use helpdesk::email::Mailer;
use helpdesk::nlp::{Classifier, HttpClassifier};
use helpdesk::shared::state::AppState;
use helpdesk::shared::utils::{create_conn, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();

    let pool = create_conn(&config.database.url)?;
    run_migrations(&pool).map_err(|e| anyhow::anyhow!("migrations failed: {e}"))?;

    let classifier: Arc<dyn Classifier> = Arc::new(HttpClassifier::new(
        config.nlp.base_url.clone(),
        config.nlp.timeout_secs,
    ));

    let mailer = Mailer::from_config(&config.smtp)?.map(Arc::new);
    if mailer.is_none() {
        info!("SMTP not configured, email delivery disabled");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState {
        conn: pool,
        config,
        classifier,
        mailer,
    });

    let app = axum::Router::new()
        .merge(helpdesk::tickets::configure_ticket_routes())
        .merge(helpdesk::mappings::configure_mapping_routes())
        .merge(helpdesk::notifications::configure_notification_routes())
        .merge(helpdesk::nlp::configure_nlp_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    info!("helpdesk listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
