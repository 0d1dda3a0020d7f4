//! Backend entry-point: configuration, migrations, pool, HTTP server.

use actix_web::{web, HttpServer};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use backend::outbound::persistence::{self, DbPool, PoolConfig};
use backend::server::{self, config::AppConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %err, "tracing init failed");
    }

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;

    persistence::run_migrations(&config.database_url).map_err(std::io::Error::other)?;

    let pool = DbPool::new(PoolConfig::new(&config.database_url))
        .await
        .map_err(std::io::Error::other)?;
    let state = web::Data::new(server::build_state(&pool, &config)?);

    info!(addr = %config.bind_addr, "starting server");
    HttpServer::new(move || server::build_app(state.clone()))
        .bind(config.bind_addr)?
        .run()
        .await
}
