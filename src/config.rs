use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Config {
    /// Loads configuration, in precedence order: the YAML file named by
    /// `LITTLEWEB_CONFIG`, the `LISTEN` env var, built-in defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("LITTLEWEB_CONFIG") {
            match std::fs::read_to_string(&path) {
                Ok(text) => match serde_yaml::from_str(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => tracing::warn!("invalid config file {path}: {e}"),
                },
                Err(e) => tracing::warn!("cannot read config file {path}: {e}"),
            }
        }

        let listen_addr =
            std::env::var("LISTEN").unwrap_or_else(|_| default_listen_addr());
        Self { listen_addr }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}
