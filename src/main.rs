use std::env::args;
use std::str::FromStr;

use strum::IntoEnumIterator;
use tracing_subscriber::EnvFilter;
use yield_lock::scenarios::{Scenario, ScenarioError};

const DEFAULT_WORKERS: usize = 4;

fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_thread_ids(true)
        .init();

    let mut args = args().skip(1);
    let scenario = args
        .next()
        .ok_or(format!(
            "no scenario supplied, use one of {}",
            Scenario::iter()
                .map(|s| s.to_string())
                .collect::<Vec<String>>()
                .join(",")
        ))
        .and_then(|selector| Scenario::from_str(&selector).map_err(|e| e.to_string()))?;
    let workers = match args.next() {
        Some(n) => n
            .parse::<usize>()
            .map_err(|e| format!("bad worker count {n:?}: {e}"))?,
        None => DEFAULT_WORKERS,
    };

    let lock = yield_lock::init_lock();
    scenario
        .run(lock, workers)
        .map_err(|e| match e {
            ScenarioError::Lock(e) => format!("{scenario} failed: {e} (errno {})", e.errno()),
            e => format!("{scenario} failed: {e}"),
        })
}
