use actix_cors::Cors;
use actix_middleware::JwtAuthMiddleware;
use actix_web::{http::header, web, App, HttpServer};
use blog_service::config::Config;
use blog_service::services::{AuthService, EmailService};
use blog_service::state::AppState;
use crypto_core::jwt;
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,actix_web=info,sqlx=warn"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn startup_error(context: &str, e: impl std::fmt::Display) -> io::Error {
    tracing::error!("{}: {}", context, e);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    let production = std::env::var("APP_ENV")
        .map(|env| env.eq_ignore_ascii_case("production"))
        .unwrap_or(false);
    init_tracing(production);

    let config = Config::from_env().map_err(|e| startup_error("Configuration loading failed", e))?;

    tracing::info!("Starting blog-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    jwt::initialize_jwt_secret(&config.auth.jwt_secret)
        .map_err(|e| startup_error("JWT initialization failed", e))?;

    let store = blog_service::build_store(&config)
        .await
        .map_err(|e| startup_error("Storage initialization failed", e))?;

    match AuthService::new(store.clone())
        .seed_admin(&config.admin.email, &config.admin.password)
        .await
    {
        Ok(true) => tracing::info!(email = %config.admin.email, "Seeded admin account"),
        Ok(false) => tracing::debug!("Admin account already present"),
        Err(e) => return Err(startup_error("Admin seeding failed", e)),
    }

    let mailer = EmailService::new(&config.email)
        .map_err(|e| startup_error("Mailer initialization failed", e))?;
    if !mailer.is_enabled() {
        tracing::warn!("SMTP_HOST not set; password reset emails are only logged");
    }

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    let allowed_origins: Vec<String> = config
        .cors
        .allowed_origins
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect();

    let state = web::Data::new(AppState::new(store, mailer, config));

    tracing::info!("Starting HTTP server at {}", bind_address);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .supports_credentials()
            .max_age(3600);
        for origin in &allowed_origins {
            cors = if origin == "*" {
                cors.allow_any_origin()
            } else {
                cors.allowed_origin(origin)
            };
        }

        App::new()
            .app_data(state.clone())
            .wrap(JwtAuthMiddleware)
            .wrap(cors)
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(blog_service::configure_app)
    })
    .bind(&bind_address)?
    .run()
    .await
}
