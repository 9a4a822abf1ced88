use crate::model::DEFAULT_PER_PAGE;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GhtConfig {
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub scorer: ScorerConfig,
}

/// [defaults] section: initial values for the filter form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

/// [scorer] section: the external relevance-scoring command. `{query}` and
/// `{dir}` placeholders are substituted at invocation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerConfig {
    #[serde(default = "default_scorer_cmd")]
    pub command: String,
    #[serde(default = "default_scorer_args")]
    pub args: Vec<String>,
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

fn default_scorer_cmd() -> String {
    "ck".into()
}

fn default_scorer_args() -> Vec<String> {
    vec![
        "--sem".into(),
        "--json".into(),
        "{query}".into(),
        "{dir}".into(),
    ]
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
        }
    }
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            command: default_scorer_cmd(),
            args: default_scorer_args(),
        }
    }
}

/// Load config by merging global defaults with a working-directory override.
/// Priority: `./.ght.toml` > global `~/.config/ght/config.toml` > built-in
/// defaults. Merging is deep: fields within sections override independently.
pub fn load_config() -> GhtConfig {
    let local_table = read_table(".ght.toml");
    let global_table = dirs::config_dir()
        .map(|d| d.join("ght/config.toml"))
        .and_then(|p| read_table(p.to_string_lossy().as_ref()));

    let merged = match (global_table, local_table) {
        (Some(mut global), Some(local)) => {
            deep_merge(&mut global, local);
            toml::Value::Table(global)
        }
        (Some(global), None) => toml::Value::Table(global),
        (None, Some(local)) => toml::Value::Table(local),
        (None, None) => return GhtConfig::default(),
    };

    merged.try_into().unwrap_or_default()
}

fn read_table(path: &str) -> Option<toml::map::Map<String, toml::Value>> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|c| c.parse::<toml::Value>().ok())
        .and_then(|v| match v {
            toml::Value::Table(t) => Some(t),
            _ => None,
        })
}

/// Recursively merge `overlay` into `base`. Overlay values win; nested tables
/// are merged recursively.
fn deep_merge(
    base: &mut toml::map::Map<String, toml::Value>,
    overlay: toml::map::Map<String, toml::Value>,
) {
    for (key, value) in overlay {
        match (base.get_mut(&key), &value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table.clone());
            }
            _ => {
                base.insert(key, value);
            }
        }
    }
}
