use std::env;

pub struct Config {
    /// Postgres connection string for the durable result store. required.
    pub db_url: String,
    /// Base URL of the external sentiment classification service. required.
    pub sentiment_api_url: String,
    /// Language code sent with every classification request.
    pub language_code: String,
}

impl Config {
    /// Reads configuration once at startup; values are immutable for the
    /// process lifetime.
    pub fn from_env() -> Result<Self, env::VarError> {
        let db_url = env::var("DATABASE_URL")?;
        let sentiment_api_url = env::var("SENTIMENT_API_URL")?;
        let language_code = env::var("LANGUAGE_CODE").unwrap_or_else(|_| "en".to_string());
        Ok(Self {
            db_url,
            sentiment_api_url,
            language_code,
        })
    }
}
