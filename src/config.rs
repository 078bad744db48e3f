use std::{env, net::SocketAddr, time::Duration};

use anyhow::Result;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub retention: Duration,
    pub cleanup_interval: Duration,
    pub tracker: TrackerConfig,
}

/// Knobs for the job tracker and its progress routines.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub step_interval: Duration,
    pub step_count: u32,
    /// Zero disables the cap.
    pub max_active_jobs: usize,
    pub fail_keyword: Option<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            step_interval: Duration::from_millis(500),
            step_count: 10,
            max_active_jobs: 256,
            fail_keyword: None,
        }
    }
}

impl TrackerConfig {
    pub fn progress_increment(&self) -> u8 {
        (100 / self.step_count.clamp(1, 100)) as u8
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bind_raw =
            env::var("REPORT_JOBS_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_addr = parse_bind_addr(&bind_raw);

        let defaults = TrackerConfig::default();

        let step_interval = env_parse::<u64>("REPORT_JOBS_STEP_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.step_interval);

        let step_count = env_parse::<u32>("REPORT_JOBS_STEP_COUNT")
            .unwrap_or(defaults.step_count)
            .clamp(1, 100);

        let max_active_jobs =
            env_parse::<usize>("REPORT_JOBS_MAX_ACTIVE").unwrap_or(defaults.max_active_jobs);

        let retention = Duration::from_secs(
            env_parse::<u64>("REPORT_JOBS_RETENTION_SECONDS").unwrap_or(60 * 60),
        );

        let cleanup_interval = Duration::from_secs(
            env_parse::<u64>("REPORT_JOBS_CLEANUP_INTERVAL_SECONDS")
                .unwrap_or(60)
                .max(1),
        );

        let fail_keyword = env::var("REPORT_JOBS_FAIL_KEYWORD")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(Self {
            bind_addr,
            retention,
            cleanup_interval,
            tracker: TrackerConfig {
                step_interval,
                step_count,
                max_active_jobs,
                fail_keyword,
            },
        })
    }
}

fn parse_bind_addr(raw: &str) -> SocketAddr {
    raw.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .parse::<SocketAddr>()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8080)))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}
