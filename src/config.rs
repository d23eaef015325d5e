use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Aayu";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset
pub fn default_log_filter() -> String {
    format!("info,{}=debug", env!("CARGO_PKG_NAME"))
}

/// Environment variable holding the reasoner API key
pub const API_KEY_ENV: &str = "AAYU_API_KEY";

/// Base URL of the hosted reasoner service
pub const REASONER_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model for intake analysis and outcome structuring (strict JSON output)
pub const REASONER_MODEL: &str = "gemini-3-pro-preview";

/// Model for the grounded reasoning stage (search and maps tools)
pub const GROUNDED_MODEL: &str = "gemini-2.5-flash";

/// Model for live voice sessions (native audio in and out)
pub const VOICE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";

/// Get the application data directory
/// ~/Aayu/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Aayu")
}

/// Get the triage history file path
pub fn history_path() -> PathBuf {
    app_data_dir().join("triage_history.json")
}
