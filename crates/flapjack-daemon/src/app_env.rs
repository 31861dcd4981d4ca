#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
    Test,
}

impl AppEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnv::Development => "development",
            AppEnv::Production => "production",
            AppEnv::Test => "test",
        }
    }

    /// Reads `APP_ENV`, defaulting to `development` when unset. Read once,
    /// in `main`, and threaded from there — not cached behind a static.
    pub fn from_environment() -> anyhow::Result<AppEnv> {
        std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".into())
            .parse()
    }
}

impl std::str::FromStr for AppEnv {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(AppEnv::Development),
            "production" => Ok(AppEnv::Production),
            "test" => Ok(AppEnv::Test),
            other => anyhow::bail!("{other} is not a known APP_ENV"),
        }
    }
}
