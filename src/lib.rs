pub mod api;
pub mod config;
pub mod db;
pub mod gemini;
pub mod portal;

pub use db::DbPool;

use config::Config;
use gemini::GeminiClient;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub gemini: GeminiClient,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let gemini = GeminiClient::from_config(&config.gemini);
        Self { config, db, gemini }
    }
}
