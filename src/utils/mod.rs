pub mod mapping;

use chrono::Local;
use std::env;

/// Current local date in `YYYY-MM-DD`, as the catalog expects for lifecycle phases.
pub fn current_date() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Current local timestamp in `YYYY-MM-DD HH:MM:SS` for report entries.
pub fn current_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Name of the user running the job, recorded next to every pruned relation.
pub fn current_user() -> String {
    ["USER", "USERNAME"]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .map(|user| user.trim().to_string())
        .find(|user| !user.is_empty())
        .unwrap_or_else(|| "system".to_string())
}
