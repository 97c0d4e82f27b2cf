use dirs::home_dir;
use std::{env, path::PathBuf};

const DEFAULT_DIR_NAME: &str = ".beanbot_core";
const CONFIG_FILE: &str = "config.json";
const LEDGER_FILE: &str = "ledger.bean";

/// Returns the application-specific data directory, defaulting to
/// `~/.beanbot_core`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os("BEANBOT_CORE_HOME") {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

/// Default location of the template configuration document.
pub fn default_config_file() -> PathBuf {
    app_data_dir().join(CONFIG_FILE)
}

/// Default ledger file location. The path may carry `{year}`, `{month}`,
/// and `{date}` placeholders.
pub fn default_ledger_file() -> PathBuf {
    app_data_dir().join(LEDGER_FILE)
}
