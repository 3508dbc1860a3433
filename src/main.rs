use std::net::SocketAddr;
use std::sync::Arc;

use talenthub_backend::{
    config::Config,
    database::{
        memory::MemoryCandidateStore,
        pool::{create_pool, run_migrations},
        postgres::PgCandidateStore,
        CandidateStore,
    },
    routes, telemetry, AppState,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    telemetry::init_tracing(config.log_format);

    let store: Arc<dyn CandidateStore> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = create_pool(&config, url).await?;
            run_migrations(&pool).await?;
            info!("Connected to Postgres, migrations applied");
            Arc::new(PgCandidateStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL is not set; candidates are kept in memory and lost on restart");
            Arc::new(MemoryCandidateStore::new())
        }
    };

    let addr: SocketAddr = config.server_address.parse()?;
    let app = routes::router(AppState::new(config, store));

    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
