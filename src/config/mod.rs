use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::PathBuf,
    time::Duration,
};

use directories::BaseDirs;

use crate::execution::history::DEFAULT_CAPACITY;
use crate::process::python::PythonOptions;

const ENV_PREFIX: &str = "CODEBOX_";

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
    /// Whether lookups consult the environment before the map.
    use_env: bool,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(default_config_path())
    }

    pub fn load_from(config_path: PathBuf) -> Self {
        let mut map = default_map();

        // Read .codeboxrc if exists
        if let Ok(file) = fs::File::open(&config_path) {
            parse_rc(BufReader::new(file), &mut map);
        }

        Self { inner: map, config_path, use_env: true }
    }

    /// Config with defaults only, ignoring the rc file and environment.
    pub fn defaults() -> Self {
        Self { inner: default_map(), config_path: default_config_path(), use_env: false }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.inner.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        // ENV first; the prefixed spelling beats the bare one
        if self.use_env {
            if let Some(v) = env_value(key) {
                return Some(v);
            }
        }
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).filter(|v| !v.is_empty()).map(PathBuf::from)
    }

    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn parse_rc(reader: impl BufRead, map: &mut HashMap<String, String>) {
    for line in reader.lines().map_while(Result::ok) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            if let Some(key) = config_key(k.trim()) {
                map.insert(key.to_string(), v.trim().to_string());
            }
        }
    }
}

const KEYS: &[&str] = &[
    "PYTHON_BIN",
    "PRELOAD_MODULES",
    "SETUP_TIMEOUT",
    "EXECUTION_TIMEOUT",
    "HISTORY_CAPACITY",
    "CAPTURE_PLOTS",
    "ARTIFACT_DIR",
];

/// Canonical key for `k`, accepting the `CODEBOX_` prefixed spelling too.
fn config_key(k: &str) -> Option<&str> {
    let bare = k.strip_prefix(ENV_PREFIX).unwrap_or(k);
    KEYS.iter().copied().find(|key| *key == bare)
}

fn env_value(key: &str) -> Option<String> {
    env::var(format!("{}{}", ENV_PREFIX, key)).or_else(|_| env::var(key)).ok()
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("codebox").join(".codeboxrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("PYTHON_BIN".into(), "python3".into());
    m.insert("PRELOAD_MODULES".into(), String::new());

    // Numbers
    m.insert("SETUP_TIMEOUT".into(), "60".into());
    m.insert("EXECUTION_TIMEOUT".into(), "30".into());
    m.insert("HISTORY_CAPACITY".into(), DEFAULT_CAPACITY.to_string());

    // Bools as strings
    m.insert("CAPTURE_PLOTS".into(), "true".into());

    m
}

/// Typed view of the sandbox-related configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxSettings {
    pub python: PythonOptions,
    pub setup_timeout: Option<Duration>,
    pub execution_timeout: Option<Duration>,
    pub history_capacity: usize,
    pub artifact_dir: Option<PathBuf>,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self::from_config(&Config::defaults())
    }
}

impl SandboxSettings {
    pub fn from_config(cfg: &Config) -> Self {
        let secs = |key: &str, default: u64| match cfg.get_u64(key).unwrap_or(default) {
            0 => None,
            n => Some(Duration::from_secs(n)),
        };
        Self {
            python: PythonOptions {
                program: cfg.get("PYTHON_BIN").filter(|p| !p.is_empty()).unwrap_or_else(|| "python3".into()),
                preload: cfg.get_list("PRELOAD_MODULES"),
                capture_plots: cfg.get_bool("CAPTURE_PLOTS"),
            },
            setup_timeout: secs("SETUP_TIMEOUT", 60),
            execution_timeout: secs("EXECUTION_TIMEOUT", 30),
            history_capacity: cfg.get_usize("HISTORY_CAPACITY").unwrap_or(DEFAULT_CAPACITY).max(1),
            artifact_dir: cfg.get_path("ARTIFACT_DIR"),
        }
    }
}
