use crate::{jobs::JobGuard, metrics::Metrics, prelude::*, sv};

/// Batch-job configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
  pub etl_interval: Duration,
  pub heatmap_interval: Duration,
  pub levels: Vec<String>,
  pub grid_size: usize,
  pub etl_window: u64,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      etl_interval: Duration::from_secs(15 * 60),
      heatmap_interval: Duration::from_secs(30 * 60),
      levels: vec![String::from("1")],
      grid_size: 50,
      etl_window: 100,
    }
  }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
  std::env::var(key).ok().and_then(|v| v.parse().ok())
}

impl Config {
  pub fn from_env() -> Self {
    let mut config = Self::default();

    if let Some(minutes) = env_parse::<u64>("ETL_INTERVAL_MINUTES") {
      config.etl_interval = Duration::from_secs(minutes * 60);
    }
    if let Some(minutes) = env_parse::<u64>("HEATMAP_INTERVAL_MINUTES") {
      config.heatmap_interval = Duration::from_secs(minutes * 60);
    }
    if let Ok(levels) = std::env::var("HEATMAP_LEVELS") {
      let levels: Vec<_> = levels
        .split(',')
        .map(str::trim)
        .filter(|lvl| !lvl.is_empty())
        .map(String::from)
        .collect();
      if !levels.is_empty() {
        config.levels = levels;
      }
    }
    if let Some(grid_size) = env_parse::<usize>("HEATMAP_GRID_SIZE") {
      config.grid_size = grid_size.max(1);
    }
    if let Some(window) = env_parse::<u64>("ETL_WINDOW") {
      config.etl_window = window;
    }

    config
  }
}

/// One guard per job type; a held guard means a run is in flight.
#[derive(Debug, Default)]
pub struct JobGuards {
  pub etl: JobGuard,
  pub heatmap: JobGuard,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
  pub metrics: Metrics,
  pub jobs: JobGuards,
}

impl AppState {
  pub async fn new(db_url: &str) -> Self {
    Self::with_config(db_url, Config::from_env()).await
  }

  pub async fn with_config(db_url: &str, config: Config) -> Self {
    info!("Connecting to database...");
    let db =
      Database::connect(db_url).await.expect("Failed to connect to database");

    info!("Running migrations...");
    Migrator::up(&db, None).await.expect("Failed to run migrations");

    Self {
      db,
      config,
      metrics: Metrics::default(),
      jobs: JobGuards::default(),
    }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      user: sv::User::new(&self.db),
      leaderboard: sv::Leaderboard::new(&self.db),
      heatmap: sv::Heatmap::new(&self.db),
      etl: sv::Etl::new(&self.db),
    }
  }
}

pub struct Services<'a> {
  pub user: sv::User<'a>,
  pub leaderboard: sv::Leaderboard<'a>,
  pub heatmap: sv::Heatmap<'a>,
  pub etl: sv::Etl<'a>,
}
