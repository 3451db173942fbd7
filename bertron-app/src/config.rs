/// Application settings, resolved from process environment variables with
/// `.env` fallback (loaded in main before this runs) and defaults last.
#[derive(Debug, Clone)]
pub struct Settings {
    pub mongo_host: String,
    pub mongo_port: u16,
    pub mongo_username: Option<String>,
    pub mongo_password: Option<String>,
    pub mongo_database: String,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            mongo_host: var_or("MONGO_HOST", "localhost"),
            mongo_port: parsed_var_or("MONGO_PORT", 27017),
            mongo_username: std::env::var("MONGO_USERNAME").ok(),
            mongo_password: std::env::var("MONGO_PASSWORD").ok(),
            mongo_database: var_or("MONGO_DATABASE", "bertron"),
            port: parsed_var_or("BERTRON_PORT", 8000),
        }
    }

    pub fn mongo_uri(&self) -> String {
        match (&self.mongo_username, &self.mongo_password) {
            (Some(username), Some(password)) => format!(
                "mongodb://{username}:{password}@{}:{}/?authSource=admin",
                self.mongo_host, self.mongo_port
            ),
            _ => format!("mongodb://{}:{}/", self.mongo_host, self.mongo_port),
        }
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_var_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
