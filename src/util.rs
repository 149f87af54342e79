const CONFIG_PATH: &str = "ARCHIVER_STATUS_CONFIG";

/// Configuration file path from the environment, if any
pub fn get_config_path() -> Option<String> {
    std::env::var(CONFIG_PATH)
        .ok()
        .filter(|path| !path.trim().is_empty())
}
