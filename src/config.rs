use serde::Deserialize;

/// Which parts of the service this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// HTTP surface only
    Api,
    /// Worker pool only
    Worker,
    /// HTTP surface and worker pool in one process
    All,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "api" => Some(Self::Api),
            "worker" => Some(Self::Worker),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub fn runs_api(&self) -> bool {
        matches!(self, Self::Api | Self::All)
    }

    pub fn runs_workers(&self) -> bool {
        matches!(self, Self::Worker | Self::All)
    }
}

/// Job store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Redis,
    Memory,
}

impl StoreKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "redis" => Some(Self::Redis),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // HTTP settings
    pub listen_addr: String,
    pub public_url: Option<String>,
    pub role: Role,
    pub debug: bool,

    // Job store settings
    pub store: StoreKind,
    pub redis_url: String,
    pub queue: String,

    // Worker settings
    pub worker_concurrency: usize,
    pub worker_poll_ms: u64,
    pub shutdown_grace_secs: u64,

    // Provider settings
    pub nominatim_url: String,
    pub provider_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".to_string(),
            public_url: None,
            role: Role::All,
            debug: false,
            store: StoreKind::Redis,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            queue: "default".to_string(),
            worker_concurrency: 2,
            worker_poll_ms: 250,
            shutdown_grace_secs: 30,
            nominatim_url: "https://nominatim.openstreetmap.org".to_string(),
            provider_timeout_secs: 10,
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Reject combinations that cannot work.
    ///
    /// An in-memory queue is private to its process, so it needs the API
    /// and the workers side by side.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.store == StoreKind::Memory && self.role != Role::All {
            anyhow::bail!(
                "GEOREST_STORE=memory requires GEOREST_ROLE=all (got {:?})",
                self.role
            );
        }
        if self.queue.trim().is_empty() {
            anyhow::bail!("GEOREST_QUEUE must not be empty");
        }
        Ok(())
    }
}

fn default_user_agent() -> String {
    concat!("geo-rest/", env!("CARGO_PKG_VERSION")).to_string()
}

pub fn load_config() -> anyhow::Result<Config> {
    let listen_addr = std::env::var("GEOREST_LISTEN_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:5000".to_string());

    let public_url = std::env::var("GEOREST_PUBLIC_URL")
        .ok()
        .filter(|v| !v.trim().is_empty());

    let role = match std::env::var("GEOREST_ROLE") {
        Ok(v) => Role::parse(&v).ok_or_else(|| {
            anyhow::anyhow!("invalid GEOREST_ROLE '{}': expected api, worker or all", v)
        })?,
        Err(_) => Role::All,
    };

    let debug = std::env::var("DEBUG").is_ok();

    // Job store settings
    let store = match std::env::var("GEOREST_STORE") {
        Ok(v) => StoreKind::parse(&v).ok_or_else(|| {
            anyhow::anyhow!("invalid GEOREST_STORE '{}': expected redis or memory", v)
        })?,
        Err(_) => StoreKind::Redis,
    };

    let redis_url = std::env::var("GEOREST_REDIS_URL")
        .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

    let queue = std::env::var("GEOREST_QUEUE")
        .unwrap_or_else(|_| "default".to_string());

    // Worker settings
    let worker_concurrency = std::env::var("GEOREST_WORKER_CONCURRENCY")
        .unwrap_or_else(|_| "2".to_string())
        .parse()
        .unwrap_or(2);

    let worker_poll_ms = std::env::var("GEOREST_WORKER_POLL_MS")
        .unwrap_or_else(|_| "250".to_string())
        .parse()
        .unwrap_or(250);

    let shutdown_grace_secs = std::env::var("GEOREST_SHUTDOWN_GRACE_SECS")
        .unwrap_or_else(|_| "30".to_string())
        .parse()
        .unwrap_or(30);

    // Provider settings
    let nominatim_url = std::env::var("GEOREST_NOMINATIM_URL")
        .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string());

    let provider_timeout_secs = std::env::var("GEOREST_PROVIDER_TIMEOUT_SECS")
        .unwrap_or_else(|_| "10".to_string())
        .parse()
        .unwrap_or(10);

    let user_agent = std::env::var("GEOREST_USER_AGENT")
        .unwrap_or_else(|_| default_user_agent());

    let config = Config {
        listen_addr,
        public_url,
        role,
        debug,
        store,
        redis_url,
        queue,
        worker_concurrency,
        worker_poll_ms,
        shutdown_grace_secs,
        nominatim_url,
        provider_timeout_secs,
        user_agent,
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.listen_addr, "0.0.0.0:5000");
        assert_eq!(cfg.role, Role::All);
        assert_eq!(cfg.store, StoreKind::Redis);
        assert_eq!(cfg.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(cfg.queue, "default");
        assert_eq!(cfg.worker_concurrency, 2);
        assert_eq!(cfg.worker_poll_ms, 250);
        assert_eq!(cfg.shutdown_grace_secs, 30);
        assert_eq!(cfg.provider_timeout_secs, 10);
        assert!(cfg.public_url.is_none());
        assert!(cfg.user_agent.starts_with("geo-rest/"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_config_debug() {
        let cfg = Config::default();
        let debug_str = format!("{:?}", cfg);
        assert!(debug_str.contains("listen_addr"));
        assert!(debug_str.contains("0.0.0.0:5000"));
    }

    // ===== Role / StoreKind Tests =====

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("api"), Some(Role::Api));
        assert_eq!(Role::parse("Worker"), Some(Role::Worker));
        assert_eq!(Role::parse(" ALL "), Some(Role::All));
        assert_eq!(Role::parse("scheduler"), None);
    }

    #[test]
    fn test_role_components() {
        assert!(Role::Api.runs_api());
        assert!(!Role::Api.runs_workers());
        assert!(!Role::Worker.runs_api());
        assert!(Role::Worker.runs_workers());
        assert!(Role::All.runs_api() && Role::All.runs_workers());
    }

    #[test]
    fn test_store_kind_parse() {
        assert_eq!(StoreKind::parse("redis"), Some(StoreKind::Redis));
        assert_eq!(StoreKind::parse("MEMORY"), Some(StoreKind::Memory));
        assert_eq!(StoreKind::parse("sqlite"), None);
    }

    // ===== Validation Tests =====

    #[test]
    fn test_memory_store_requires_all_role() {
        let mut cfg = Config {
            store: StoreKind::Memory,
            ..Config::default()
        };
        assert!(cfg.validate().is_ok());

        cfg.role = Role::Api;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("GEOREST_STORE=memory"));

        cfg.role = Role::Worker;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_empty_queue_rejected() {
        let cfg = Config {
            queue: "  ".to_string(),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    // ===== Environment Tests =====

    #[test]
    fn test_load_config_with_custom_listen_addr() {
        std::env::set_var("GEOREST_LISTEN_ADDR", "127.0.0.1:9000");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.listen_addr, "127.0.0.1:9000");
        std::env::remove_var("GEOREST_LISTEN_ADDR");
    }

    #[test]
    fn test_load_config_with_redis_settings() {
        std::env::set_var("GEOREST_REDIS_URL", "redis://cache:6380/2");
        std::env::set_var("GEOREST_QUEUE", "geocoding");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.redis_url, "redis://cache:6380/2");
        assert_eq!(cfg.queue, "geocoding");
        std::env::remove_var("GEOREST_REDIS_URL");
        std::env::remove_var("GEOREST_QUEUE");
    }

    #[test]
    fn test_load_config_with_worker_settings() {
        std::env::set_var("GEOREST_WORKER_CONCURRENCY", "8");
        std::env::set_var("GEOREST_WORKER_POLL_MS", "50");
        std::env::set_var("GEOREST_SHUTDOWN_GRACE_SECS", "5");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.worker_concurrency, 8);
        assert_eq!(cfg.worker_poll_ms, 50);
        assert_eq!(cfg.shutdown_grace_secs, 5);
        std::env::remove_var("GEOREST_WORKER_CONCURRENCY");
        std::env::remove_var("GEOREST_WORKER_POLL_MS");
        std::env::remove_var("GEOREST_SHUTDOWN_GRACE_SECS");
    }

    #[test]
    fn test_load_config_with_provider_settings() {
        std::env::set_var("GEOREST_NOMINATIM_URL", "http://nominatim.local:8080");
        std::env::set_var("GEOREST_USER_AGENT", "acme-geo/1.0");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.nominatim_url, "http://nominatim.local:8080");
        assert_eq!(cfg.user_agent, "acme-geo/1.0");
        std::env::remove_var("GEOREST_NOMINATIM_URL");
        std::env::remove_var("GEOREST_USER_AGENT");
    }

    #[test]
    fn test_load_config_with_public_url() {
        std::env::set_var("GEOREST_PUBLIC_URL", "https://geo.example.com");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.public_url, Some("https://geo.example.com".to_string()));
        std::env::remove_var("GEOREST_PUBLIC_URL");
    }

    #[test]
    fn test_load_config_parse_error_uses_default() {
        std::env::set_var("GEOREST_PROVIDER_TIMEOUT_SECS", "soon");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.provider_timeout_secs, 10);
        std::env::remove_var("GEOREST_PROVIDER_TIMEOUT_SECS");
    }

    #[test]
    fn test_load_config_with_debug() {
        std::env::set_var("DEBUG", "1");
        let cfg = load_config().unwrap();
        assert!(cfg.debug);
        std::env::remove_var("DEBUG");
    }
}
