use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use crate::logging::LogConfig;

#[derive(Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub jwt_secret: String,
    pub jwt_expires_in_hours: u64,
    pub cors_origin: String,
    pub trust_proxy: bool,
    /// Public origin used in emailed links. Falls back to the listen address when unset.
    pub app_base_url: Option<String>,
    pub static_dir: String,
    pub seed_words: bool,
    pub rate_limit: RateLimitConfig,
    pub worker: WorkerConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u64,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub is_leader: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailProvider {
    /// Writes outgoing mail to the log instead of delivering it.
    Log,
    None,
}

impl FromStr for MailProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "none" | "disabled" | "off" => Ok(Self::None),
            other => Err(format!("unknown mail provider: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub provider: MailProvider,
    pub from_name: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("enable_file_logs", &self.enable_file_logs)
            .field("log_dir", &self.log_dir)
            .field("sled_path", &self.sled_path)
            .field("jwt_secret", &"***REDACTED***")
            .field("jwt_expires_in_hours", &self.jwt_expires_in_hours)
            .field("cors_origin", &self.cors_origin)
            .field("trust_proxy", &self.trust_proxy)
            .field("app_base_url", &self.app_base_url)
            .field("static_dir", &self.static_dir)
            .field("seed_words", &self.seed_words)
            .field("rate_limit", &self.rate_limit)
            .field("worker", &self.worker)
            .field("mail", &self.mail)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        let app_base_url = env_or("APP_BASE_URL", "");
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 8000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/word-refresher.sled"),
            jwt_secret: env_or(
                "JWT_SECRET",
                "change_me_to_random_64_chars_change_me_to_random_64_chars",
            ),
            jwt_expires_in_hours: env_or_parse("JWT_EXPIRES_IN_HOURS", 168_u64),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:8000"),
            trust_proxy: env_or_bool("TRUST_PROXY", false),
            app_base_url: (!app_base_url.trim().is_empty())
                .then(|| app_base_url.trim().trim_end_matches('/').to_string()),
            static_dir: env_or("STATIC_DIR", "./public"),
            seed_words: env_or_bool("SEED_WORDS", true),
            rate_limit: RateLimitConfig {
                window_secs: env_or_parse("RATE_LIMIT_WINDOW_SECS", 900_u64),
                max_requests: env_or_parse("RATE_LIMIT_MAX", 100_u64),
            },
            worker: WorkerConfig {
                is_leader: env_or_bool("WORKER_LEADER", true),
            },
            mail: MailConfig {
                provider: env_or_parse("MAIL_PROVIDER", MailProvider::Log),
                from_name: env_or("MAIL_FROM_NAME", "Word Refresher"),
            },
        }
    }

    /// Origin for links sent by email. Never taken from request headers, so a
    /// caller cannot redirect verification tokens to another host.
    pub fn public_base_url(&self) -> String {
        match self.app_base_url.as_deref() {
            Some(base) => base.to_string(),
            None => format!("http://{}", SocketAddr::new(self.host, self.port)),
        }
    }

    /// Session cookie lifetime, matching the session token expiry.
    pub fn session_max_age_secs(&self) -> u64 {
        self.jwt_expires_in_hours.saturating_mul(60 * 60)
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            log_level: self.log_level.clone(),
            enable_file_logs: self.enable_file_logs,
            log_dir: self.log_dir.clone(),
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                tracing::warn!(key, value = %raw, "Unrecognized boolean env var, using default");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn managed_keys() -> &'static [&'static str] {
        &[
            "HOST",
            "PORT",
            "RUST_LOG",
            "JWT_EXPIRES_IN_HOURS",
            "RATE_LIMIT_MAX",
            "APP_BASE_URL",
            "SEED_WORDS",
            "MAIL_PROVIDER",
        ]
    }

    fn clear_keys(keys: &[&str]) {
        for key in keys {
            env::remove_var(key);
        }
    }

    #[test]
    fn loads_defaults_when_missing() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.jwt_expires_in_hours, 168);
        assert_eq!(cfg.rate_limit.max_requests, 100);
        assert!(cfg.app_base_url.is_none());
        assert!(cfg.seed_words);
        assert_eq!(cfg.mail.provider, MailProvider::Log);
    }

    #[test]
    fn parses_values() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "4000");
        env::set_var("RATE_LIMIT_MAX", "7");
        env::set_var("APP_BASE_URL", "https://words.example.com/");
        env::set_var("SEED_WORDS", "off");
        env::set_var("MAIL_PROVIDER", "none");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.rate_limit.max_requests, 7);
        assert_eq!(cfg.app_base_url.as_deref(), Some("https://words.example.com"));
        assert!(!cfg.seed_words);
        assert_eq!(cfg.mail.provider, MailProvider::None);
        clear_keys(managed_keys());
    }

    #[test]
    fn invalid_values_fall_back() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "bad");
        env::set_var("MAIL_PROVIDER", "carrier-pigeon");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.mail.provider, MailProvider::Log);
        clear_keys(managed_keys());
    }

    #[test]
    fn link_origin_and_cookie_age_follow_config() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "4100");
        env::set_var("JWT_EXPIRES_IN_HOURS", "2");
        let cfg = Config::from_env();
        assert_eq!(cfg.public_base_url(), "http://127.0.0.1:4100");
        assert_eq!(cfg.session_max_age_secs(), 7200);

        env::set_var("APP_BASE_URL", "https://words.example.com");
        assert_eq!(Config::from_env().public_base_url(), "https://words.example.com");
        clear_keys(managed_keys());
    }

    #[test]
    fn debug_redacts_secret() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        let cfg = Config::from_env();
        let rendered = format!("{cfg:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains(&cfg.jwt_secret));
    }
}
