use std::path::Path;

use super::types::TasksConfig;

/// Load configuration from `./config.toml` when present, falling back to
/// defaults, then apply environment overrides.
pub fn load_default() -> anyhow::Result<TasksConfig> {
    let local_config = Path::new("config.toml");

    let cfg = if local_config.exists() {
        let s = std::fs::read_to_string(local_config)?;
        toml::from_str::<TasksConfig>(&s)?
    } else {
        TasksConfig::default()
    };

    Ok(apply_env_overrides(cfg))
}

/// Load configuration from an explicit path, then apply environment
/// overrides.
pub fn load_from_path(path: &Path) -> anyhow::Result<TasksConfig> {
    let s = std::fs::read_to_string(path)?;
    let cfg = toml::from_str::<TasksConfig>(&s)?;
    Ok(apply_env_overrides(cfg))
}

// Environment variable overrides (highest priority).
fn apply_env_overrides(mut cfg: TasksConfig) -> TasksConfig {
    if let Ok(v) = std::env::var("TASKWIRE_PROJECT_ID") {
        if !v.trim().is_empty() {
            cfg.project_id = v;
        }
    }
    if let Ok(v) = std::env::var("TASKWIRE_TASK_HANDLER_ROOT_URL") {
        if !v.trim().is_empty() {
            cfg.task_handler_root_url = v;
        }
    }
    if let Ok(v) = std::env::var("TASKWIRE_HANDLER_SECRET") {
        if !v.trim().is_empty() {
            cfg.handler_secret = v;
        }
    }
    if let Ok(v) = std::env::var("TASKWIRE_EXECUTE_LOCALLY") {
        cfg.execute_locally = v.eq_ignore_ascii_case("true") || v == "1";
    }
    if let Ok(v) = std::env::var("TASKWIRE_BLOCK_REMOTE_TASKS") {
        cfg.block_remote_tasks = v.eq_ignore_ascii_case("true") || v == "1";
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_from_path_reads_toml() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            "project_id = \"acme\"\ntask_handler_root_url = \"https://worker/tasks\""
        )
        .unwrap();
        let cfg = load_from_path(f.path()).unwrap();
        assert_eq!(cfg.project_id, "acme");
        assert_eq!(cfg.task_handler_root_url, "https://worker/tasks");
        // Untouched fields keep their serde defaults.
        assert_eq!(cfg.location, "us-central1");
    }

    #[test]
    fn load_from_path_rejects_bad_toml() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "project_id = [not toml").unwrap();
        assert!(load_from_path(f.path()).is_err());
    }
}
