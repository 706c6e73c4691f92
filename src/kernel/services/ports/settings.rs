use serde::{Deserialize, Serialize};

pub const DEFAULT_RELOAD_COALESCE_MS: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub show_hidden: bool,
    #[serde(default = "default_executable_extensions")]
    pub executable_extensions: Vec<String>,
    #[serde(default = "default_reload_coalesce_ms")]
    pub reload_coalesce_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_hidden: false,
            executable_extensions: default_executable_extensions(),
            reload_coalesce_ms: default_reload_coalesce_ms(),
        }
    }
}

impl Settings {
    pub fn is_executable(&self, path: &std::path::Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        self.executable_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}

fn default_executable_extensions() -> Vec<String> {
    vec!["exe".to_string()]
}

fn default_reload_coalesce_ms() -> u64 {
    DEFAULT_RELOAD_COALESCE_MS
}
