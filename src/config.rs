// Service configuration, layered: defaults -> config.toml -> APP_* env vars

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server_address: String,
    // PostgREST / Supabase base URL, e.g. https://xyz.supabase.co
    pub store_url: Option<String>,
    pub store_api_key: Option<String>,
    pub store_table: String,
    // How many chat matches are shown before "show all"
    pub chat_preview_limit: usize,
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let builder = Config::builder()
            .set_default("server_address", "127.0.0.1:3000")?
            .set_default("store_table", "listings")?
            .set_default("chat_preview_limit", 5)?
            .add_source(File::with_name("config").required(false))
            // e.g. APP_STORE_URL, APP_STORE_API_KEY
            .add_source(Environment::with_prefix("APP").try_parsing(true));

        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
impl Settings {
    pub fn for_tests() -> Self {
        Settings {
            server_address: "127.0.0.1:0".to_string(),
            store_url: None,
            store_api_key: None,
            store_table: "listings".to_string(),
            chat_preview_limit: 5,
        }
    }
}
