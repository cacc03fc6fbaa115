mod auth;
mod config;
mod database;
mod error;
mod handlers;
mod model;
mod session;
mod watchlist;

use actix_session::storage::CookieSessionStore;
use actix_session::SessionMiddleware;
use actix_web::cookie::Key;
use actix_web::{middleware::Logger, web, App, HttpServer};
use handlers::AppState;
use log::{error, info};
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(
        env_logger::Env::default().default_filter_or("filmlog=debug,actix_web=info"),
    );

    let config = config::Config::from_env()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;

    // Lazy pool: an unreachable database is logged here but requests still
    // get a chance to connect once it comes back.
    let pool = MySqlPoolOptions::new().connect_lazy_with(config.connect_options());
    match pool.acquire().await {
        Ok(_) => info!("Connected to MySQL"),
        Err(err) => error!("Could not reach MySQL at startup: {}", err),
    }

    let key = Key::derive_from(config.session_secret.as_bytes());
    let state = web::Data::new(AppState {
        db: Arc::new(database::MySqlStore::new(pool)),
    });

    HttpServer::new(move || {
        let tera = tera::Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*")).unwrap();
        App::new()
            .wrap(Logger::default())
            .wrap(SessionMiddleware::new(
                CookieSessionStore::default(),
                key.clone(),
            ))
            .app_data(web::Data::new(tera))
            .app_data(state.clone())
            .configure(handlers::routes)
    })
    .bind("127.0.0.1:4000")?
    .run()
    .await
}
