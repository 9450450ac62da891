use std::{net::SocketAddr, str::FromStr};

use anyhow::{Context, bail};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SearchBackend {
    Elasticsearch,
    Memory,
}

impl FromStr for SearchBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elasticsearch" | "elastic" => Ok(SearchBackend::Elasticsearch),
            "memory" => Ok(SearchBackend::Memory),
            other => bail!("unknown SEARCH_BACKEND {other:?}, expected elasticsearch or memory"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub search_backend: SearchBackend,
    pub elasticsearch_url: String,
    pub elasticsearch_index: String,
    pub search_timeout_secs: u64,
    pub search_max_results: usize,
    pub reindex_on_startup: bool,
    pub reindex_concurrency: usize,
    pub reindex_rps: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://filmoteka.db?mode=rwc".to_string());

        let search_backend = match std::env::var("SEARCH_BACKEND") {
            Ok(s) => s.parse().context("SEARCH_BACKEND")?,
            Err(_) => SearchBackend::Elasticsearch,
        };

        let elasticsearch_url = std::env::var("ELASTICSEARCH_URL")
            .unwrap_or_else(|_| "http://localhost:9200".to_string());
        let elasticsearch_index =
            std::env::var("ELASTICSEARCH_INDEX").unwrap_or_else(|_| "films".to_string());

        let search_timeout_secs: u64 =
            std::env::var("SEARCH_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(10);

        let search_max_results: usize =
            std::env::var("SEARCH_MAX_RESULTS").ok().and_then(|s| s.parse().ok()).unwrap_or(100);

        let reindex_on_startup = std::env::var("REINDEX_ON_STARTUP")
            .map(|s| matches!(s.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let reindex_concurrency: usize =
            std::env::var("REINDEX_CONCURRENCY").ok().and_then(|s| s.parse().ok()).unwrap_or(8);

        let reindex_rps: u32 =
            std::env::var("REINDEX_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(50);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            search_backend,
            elasticsearch_url,
            elasticsearch_index,
            search_timeout_secs,
            search_max_results,
            reindex_on_startup,
            reindex_concurrency,
            reindex_rps,
        })
    }
}
