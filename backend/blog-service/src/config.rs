/// Configuration management for Blog Service
///
/// All settings come from environment variables (optionally seeded from a
/// `.env` file by the binary). Development defaults let the service start
/// with no configuration at all; production refuses unsafe defaults.
use db_pool::DbConfig;
use std::fmt;

const DEV_JWT_SECRET: &str = "miniblog-development-secret-change-me";
const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Database pool configuration
    pub database: DbConfig,
    /// Session token settings
    pub auth: AuthConfig,
    /// Seeded administrator account
    pub admin: AdminConfig,
    /// Outgoing mail
    pub email: EmailSettings,
    /// Storage backend selection
    pub storage: StorageConfig,
}

/// Application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application environment (development, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
    /// Frontend origin used to build password reset links
    pub client_url: String,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of session tokens and the session cookie
    pub token_ttl_days: i64,
    /// Mark the session cookie `Secure`
    pub cookie_secure: bool,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl_days", &self.token_ttl_days)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

#[derive(Clone)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// SMTP settings; an empty host switches the mailer to log-only mode
#[derive(Clone)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub use_starttls: bool,
}

impl fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSettings")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "[REDACTED]"))
            .field("smtp_from", &self.smtp_from)
            .field("use_starttls", &self.use_starttls)
            .finish()
    }
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "MiniBlog <noreply@miniblog.local>".to_string(),
            use_starttls: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let client_url =
            std::env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let storage = StorageConfig {
            backend: match std::env::var("STORAGE_BACKEND")
                .unwrap_or_else(|_| "postgres".to_string())
                .to_ascii_lowercase()
                .as_str()
            {
                "postgres" | "postgresql" => StorageBackend::Postgres,
                "memory" => StorageBackend::Memory,
                other => return Err(format!("Unknown STORAGE_BACKEND '{}'", other)),
            },
        };

        let (database, url_was_set) = DbConfig::for_service("blog-service");
        if production && storage.backend == StorageBackend::Postgres && !url_was_set {
            return Err("DATABASE_URL must be set in production".to_string());
        }

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("BLOG_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("BLOG_SERVICE_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(5000),
                client_url: client_url.clone(),
            },
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if production && std::env::var("CLIENT_URL").is_err() => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => client_url,
                };

                if production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            database,
            auth: {
                let jwt_secret = match std::env::var("JWT_SECRET") {
                    Ok(secret) => secret,
                    Err(_) if production => {
                        return Err("JWT_SECRET must be set in production".to_string())
                    }
                    Err(_) => DEV_JWT_SECRET.to_string(),
                };

                if production && jwt_secret.len() < MIN_PRODUCTION_SECRET_LEN {
                    return Err(format!(
                        "JWT_SECRET must be at least {} bytes in production",
                        MIN_PRODUCTION_SECRET_LEN
                    ));
                }

                AuthConfig {
                    jwt_secret,
                    token_ttl_days: parse_env_or_default("JWT_EXPIRE_DAYS", 7)?,
                    cookie_secure: production,
                }
            },
            admin: AdminConfig {
                email: std::env::var("ADMIN_EMAIL")
                    .unwrap_or_else(|_| "admin@miniblog.local".to_string())
                    .to_lowercase(),
                password: std::env::var("ADMIN_PASSWORD")
                    .unwrap_or_else(|_| "ChangeMe123!".to_string()),
            },
            email: {
                let defaults = EmailSettings::default();
                EmailSettings {
                    smtp_host: std::env::var("SMTP_HOST").unwrap_or_default(),
                    smtp_port: parse_env_or_default("SMTP_PORT", defaults.smtp_port)?,
                    smtp_username: std::env::var("SMTP_USERNAME").ok().filter(|v| !v.is_empty()),
                    smtp_password: std::env::var("SMTP_PASSWORD").ok().filter(|v| !v.is_empty()),
                    smtp_from: std::env::var("SMTP_FROM").unwrap_or(defaults.smtp_from),
                    use_starttls: std::env::var("SMTP_STARTTLS")
                        .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "false" | "0" | "no"))
                        .unwrap_or(defaults.use_starttls),
                }
            },
            storage,
        })
    }

    /// Configuration for in-process use: in-memory storage, log-only mail
    pub fn in_memory() -> Self {
        Config {
            app: AppConfig {
                env: "test".to_string(),
                host: "127.0.0.1".to_string(),
                port: 0,
                client_url: "http://localhost:3000".to_string(),
            },
            cors: CorsConfig {
                allowed_origins: "http://localhost:3000".to_string(),
            },
            database: DbConfig::default(),
            auth: AuthConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                token_ttl_days: 7,
                cookie_secure: false,
            },
            admin: AdminConfig {
                email: "admin@miniblog.local".to_string(),
                password: "ChangeMe123!".to_string(),
            },
            email: EmailSettings::default(),
            storage: StorageConfig {
                backend: StorageBackend::Memory,
            },
        }
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "APP_ENV",
        "CLIENT_URL",
        "CORS_ALLOWED_ORIGINS",
        "DATABASE_URL",
        "JWT_SECRET",
        "JWT_EXPIRE_DAYS",
        "STORAGE_BACKEND",
        "BLOG_SERVICE_PORT",
        "SMTP_STARTTLS",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_development_defaults() {
        clear_env();

        let config = Config::from_env().expect("defaults should load");
        assert_eq!(config.app.port, 5000);
        assert_eq!(config.cors.allowed_origins, "http://localhost:3000");
        assert_eq!(config.auth.token_ttl_days, 7);
        assert!(!config.auth.cookie_secure);
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert!(config.email.use_starttls);
    }

    #[test]
    #[serial]
    fn test_cors_falls_back_to_client_url() {
        clear_env();
        std::env::set_var("CLIENT_URL", "https://blog.example.com");

        let config = Config::from_env().expect("config");
        assert_eq!(config.cors.allowed_origins, "https://blog.example.com");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_production_requires_secret() {
        clear_env();
        std::env::set_var("APP_ENV", "production");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://blog.example.com");
        std::env::set_var("DATABASE_URL", "postgres://db/blog");

        assert!(Config::from_env().is_err());

        std::env::set_var("JWT_SECRET", "too-short");
        assert!(Config::from_env().is_err());

        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        let config = Config::from_env().expect("production config");
        assert!(config.auth.cookie_secure);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_production_rejects_wildcard_cors() {
        clear_env();
        std::env::set_var("APP_ENV", "production");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "*");
        std::env::set_var("DATABASE_URL", "postgres://db/blog");
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");

        assert!(Config::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_unknown_storage_backend() {
        clear_env();
        std::env::set_var("STORAGE_BACKEND", "mongodb");

        assert!(Config::from_env().is_err());

        std::env::set_var("STORAGE_BACKEND", "memory");
        assert_eq!(
            Config::from_env().expect("memory").storage.backend,
            StorageBackend::Memory
        );

        clear_env();
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::in_memory();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains(DEV_JWT_SECRET));
        assert!(!rendered.contains("ChangeMe123!"));
    }
}
