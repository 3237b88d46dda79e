//! # HikSADP Configuration Module
//!
//! Ce module gère la configuration de HikSADP :
//! - configuration YAML par défaut intégrée au binaire
//! - fusion avec un fichier `config.yaml` optionnel
//! - surcharges par variables d'environnement (structurées et historiques)
//! - accesseurs typés avec valeurs par défaut
//!
//! ## Usage
//!
//! ```no_run
//! use hikconfig::get_config;
//!
//! let config = get_config();
//! let timeout = config.sadp_timeout();
//! let workers = config.discovery_workers();
//! println!("SADP timeout: {:?}, workers: {}", timeout, workers);
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use lazy_static::lazy_static;
use parking_lot::RwLock;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{info, warn};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("hiksadp.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> = Arc::new(Config::load_config("").unwrap_or_else(|err| {
        warn!(error = %err, "Failed to load configuration, using embedded defaults");
        Config::embedded()
    }));
}

const ENV_CONFIG_DIR: &str = "HIKSADP_CONFIG";
const ENV_PREFIX: &str = "HIKSADP_CONFIG__";
const CONFIG_DIR_NAME: &str = ".hiksadp";

/// Variables d'environnement historiques et leur chemin dans l'arbre de configuration
const LEGACY_ENV_VARS: &[(&str, &[&str])] = &[
    ("HTTP_TIMEOUT", &["http", "timeout"]),
    ("USER_AGENT", &["http", "user_agent"]),
    ("DISCOVERY_WORKERS", &["discovery", "workers"]),
    ("DISCOVERY_TIMEOUT", &["discovery", "timeout"]),
    ("SADP_TIMEOUT", &["sadp", "timeout"]),
    ("DEBUG", &["debug"]),
];

// Default values for configuration
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const DEFAULT_DISCOVERY_WORKERS: usize = 100;
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_SADP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_DEBUG: bool = false;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

/// Macro to generate getter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> usize {
            match self.get_value($path) {
                Ok(Value::Number(n)) => match n.as_u64() {
                    Some(v) => v as usize,
                    None => {
                        warn!(path = %$path.join("."), value = %n, "Invalid number, using default");
                        $default
                    }
                },
                Ok(Value::String(s)) => s.trim().parse().unwrap_or_else(|_| {
                    warn!(path = %$path.join("."), value = %s, "Invalid number, using default");
                    $default
                }),
                _ => $default,
            }
        }
    };
}

/// Macro to generate getter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> bool {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => b,
                Ok(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => true,
                    "0" | "false" | "no" | "off" => false,
                    _ => {
                        warn!(path = %$path.join("."), value = %s, "Invalid boolean, using default");
                        $default
                    }
                },
                _ => $default,
            }
        }
    };
}

/// Macro to generate getter for duration values with default
macro_rules! impl_duration_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Duration {
            match self.get_value($path) {
                Ok(Value::String(s)) => parse_duration(&s).unwrap_or_else(|err| {
                    warn!(path = %$path.join("."), value = %s, error = %err, "Invalid duration, using default");
                    $default
                }),
                Ok(Value::Number(n)) => match n.as_f64().and_then(secs_to_duration) {
                    Some(d) => d,
                    None => {
                        warn!(path = %$path.join("."), value = %n, "Invalid duration, using default");
                        $default
                    }
                },
                _ => $default,
            }
        }
    };
}

/// Configuration manager for HikSADP
///
/// Les valeurs sont conservées en mémoire sous forme d'arbre YAML dont
/// toutes les clés sont en minuscules. Aucune écriture sur disque n'est faite.
#[derive(Debug)]
pub struct Config {
    config_dir: PathBuf,
    data: RwLock<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            config_dir: self.config_dir.clone(),
            data: RwLock::new(self.data.read().clone()),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> PathBuf {
        // 1. Try provided directory
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return PathBuf::from(env_path);
        }

        // 3. Try current directory
        if Path::new(CONFIG_DIR_NAME).exists() {
            return PathBuf::from(CONFIG_DIR_NAME);
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config;
            }
        }

        PathBuf::from(CONFIG_DIR_NAME)
    }

    /// Configuration construite uniquement à partir des valeurs intégrées
    pub fn embedded() -> Self {
        let data = serde_yaml::from_str::<Value>(DEFAULT_CONFIG)
            .map(Self::lower_keys_value)
            .unwrap_or_else(|_| Value::Mapping(Mapping::new()));
        Self {
            config_dir: PathBuf::from(CONFIG_DIR_NAME),
            data: RwLock::new(data),
        }
    }

    /// Loads the configuration for the process
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `HIKSADP_CONFIG` environment variable
    /// 3. `.hiksadp` in the current directory
    /// 4. `.hiksadp` in the user's home directory
    ///
    /// Environment overrides are read from the process environment.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        Self::load_from(&config_dir, env::vars())
    }

    /// Charge la configuration depuis `config_dir` avec un jeu explicite de variables d'environnement
    ///
    /// Le répertoire et le fichier `config.yaml` sont optionnels. Les variables
    /// historiques (`SADP_TIMEOUT`, `DEBUG`...) sont appliquées avant les
    /// variables préfixées `HIKSADP_CONFIG__`, qui ont donc le dernier mot.
    pub fn load_from<I>(config_dir: &Path, env_vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        info!(config_dir = %config_dir.display(), "Using config directory");

        let mut config_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        let config_file_path = config_dir.join("config.yaml");
        match fs::read(&config_file_path) {
            Ok(data) => {
                info!(config_file = %config_file_path.display(), "Loaded config file");
                let external_value: Value = serde_yaml::from_slice(&data)
                    .map_err(|e| anyhow!("Invalid {}: {}", config_file_path.display(), e))?;
                merge_yaml(&mut config_value, &Self::lower_keys_value(external_value));
            }
            Err(_) => {
                info!(config_file = %config_file_path.display(), "Config file not found, using default embedded config");
            }
        }

        let mut config_value = Self::lower_keys_value(config_value);
        Self::apply_env_overrides(&mut config_value, env_vars);

        Ok(Config {
            config_dir: config_dir.to_path_buf(),
            data: RwLock::new(config_value),
        })
    }

    /// Répertoire de configuration retenu au chargement
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Sets a configuration value at the specified path (in memory only)
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        let mut data = self.data.write();
        Self::set_value_internal(&mut data, path, value)
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.read();
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                match map.get(Value::String(key.to_lowercase())) {
                    Some(next) => current = next,
                    None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides<I>(config: &mut Value, env_vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut prefixed = Vec::new();

        for (key, value) in env_vars {
            if let Some(rest) = key.strip_prefix(ENV_PREFIX) {
                prefixed.push((rest.to_string(), value));
            } else if let Some((_, path)) = LEGACY_ENV_VARS.iter().find(|(name, _)| *name == key) {
                let _ = Self::set_value_internal(config, path, Self::convert_env_value(&value));
            }
        }

        for (key, value) in prefixed {
            let key_path = key.split("__").collect::<Vec<_>>();
            let _ = Self::set_value_internal(config, &key_path, Self::convert_env_value(&value));
        }
    }

    fn convert_env_value(value: &str) -> Value {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
            return parsed;
        }
        Value::String(value.to_string())
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    let new_key = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    new_map.insert(new_key, Self::lower_keys_value(v));
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    impl_duration_config!(
        http_timeout,
        &["http", "timeout"],
        DEFAULT_HTTP_TIMEOUT
    );

    /// User-Agent envoyé par le client HTTP
    pub fn user_agent(&self) -> String {
        match self.get_value(&["http", "user_agent"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => DEFAULT_USER_AGENT.to_string(),
        }
    }

    impl_usize_config!(
        discovery_workers,
        &["discovery", "workers"],
        DEFAULT_DISCOVERY_WORKERS
    );

    impl_duration_config!(
        discovery_timeout,
        &["discovery", "timeout"],
        DEFAULT_DISCOVERY_TIMEOUT
    );

    impl_duration_config!(
        sadp_timeout,
        &["sadp", "timeout"],
        DEFAULT_SADP_TIMEOUT
    );

    impl_bool_config!(debug, &["debug"], DEFAULT_DEBUG);

    impl_bool_config!(
        log_enable_console,
        &["logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    /// Récupère le niveau de log minimum depuis la configuration
    pub fn log_min_level(&self) -> String {
        match self.get_value(&["logger", "min_level"]) {
            Ok(Value::String(s)) => s,
            _ => DEFAULT_LOG_MIN_LEVEL.to_string(),
        }
    }
}

/// Returns the global configuration instance
///
/// Chargée paresseusement au premier accès.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Convertit une durée textuelle en [`Duration`].
///
/// Formats acceptés : `250ms`, `5s`, `2m`, ou un nombre de secondes sans unité
/// (`1.5`). Les valeurs négatives sont refusées.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    let (number, unit) = if let Some(n) = s.strip_suffix("ms") {
        (n, "ms")
    } else if let Some(n) = s.strip_suffix('s') {
        (n, "s")
    } else if let Some(n) = s.strip_suffix('m') {
        (n, "m")
    } else {
        (s, "s")
    };

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid duration: '{}'", input))?;

    let secs = match unit {
        "ms" => value / 1000.0,
        "m" => value * 60.0,
        _ => value,
    };
    secs_to_duration(secs).ok_or_else(|| anyhow!("invalid duration: '{}'", input))
}

/// Secondes positives représentables par [`Duration`], sinon `None`
fn secs_to_duration(secs: f64) -> Option<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

/// Merges external YAML configuration into default configuration
///
/// Mappings are merged key by key; scalars and sequences are replaced.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn load(dir: &TempDir, pairs: &[(&str, &str)]) -> Config {
        Config::load_from(dir.path(), vars(pairs)).unwrap()
    }

    #[test]
    fn test_defaults_without_config_file() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir, &[]);

        assert_eq!(config.http_timeout(), Duration::from_secs(10));
        assert_eq!(config.discovery_workers(), 100);
        assert_eq!(config.discovery_timeout(), Duration::from_secs(1));
        assert_eq!(config.sadp_timeout(), Duration::from_secs(5));
        assert!(!config.debug());
        assert_eq!(config.log_min_level(), "INFO");
        assert!(config.log_enable_console());
        assert!(config.user_agent().starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_missing_directory_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let config = Config::load_from(&missing, Vec::new()).unwrap();
        assert_eq!(config.sadp_timeout(), Duration::from_secs(5));
        assert!(!missing.exists());
    }

    #[test]
    fn test_config_file_is_merged_over_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "SADP:\n  Timeout: 2s\ndiscovery:\n  workers: 8\n",
        )
        .unwrap();

        let config = load(&dir, &[]);
        assert_eq!(config.sadp_timeout(), Duration::from_secs(2));
        assert_eq!(config.discovery_workers(), 8);
        // untouched keys keep their defaults
        assert_eq!(config.discovery_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_config_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.yaml"), "sadp: [unclosed").unwrap();
        assert!(Config::load_from(dir.path(), Vec::new()).is_err());
    }

    #[test]
    fn test_legacy_env_vars() {
        let dir = TempDir::new().unwrap();
        let config = load(
            &dir,
            &[
                ("SADP_TIMEOUT", "750ms"),
                ("DISCOVERY_WORKERS", "12"),
                ("DEBUG", "true"),
                ("USER_AGENT", "probe/1.0"),
                ("UNRELATED", "x"),
            ],
        );

        assert_eq!(config.sadp_timeout(), Duration::from_millis(750));
        assert_eq!(config.discovery_workers(), 12);
        assert!(config.debug());
        assert_eq!(config.user_agent(), "probe/1.0");
    }

    #[test]
    fn test_prefixed_env_vars_win_over_legacy() {
        let dir = TempDir::new().unwrap();
        let config = load(
            &dir,
            &[
                ("HIKSADP_CONFIG__SADP__TIMEOUT", "3s"),
                ("SADP_TIMEOUT", "9s"),
                ("HIKSADP_CONFIG__LOGGER__MIN_LEVEL", "DEBUG"),
            ],
        );

        assert_eq!(config.sadp_timeout(), Duration::from_secs(3));
        assert_eq!(config.log_min_level(), "DEBUG");
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load(
            &dir,
            &[("HTTP_TIMEOUT", "soon"), ("DISCOVERY_WORKERS", "-3")],
        );
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
        assert_eq!(config.discovery_workers(), 100);
    }

    #[test]
    fn test_set_value_is_in_memory() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir, &[]);
        config
            .set_value(&["sadp", "timeout"], Value::String("1500ms".into()))
            .unwrap();
        config.set_value(&["debug"], Value::Bool(true)).unwrap();

        assert_eq!(config.sadp_timeout(), Duration::from_millis(1500));
        assert!(config.debug());
        assert!(!dir.path().join("config.yaml").exists());
    }

    #[test]
    fn test_overflowing_durations_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load(
            &dir,
            &[
                ("SADP_TIMEOUT", "1e30"),
                ("HIKSADP_CONFIG__DISCOVERY__TIMEOUT", "1e30"),
                ("HTTP_TIMEOUT", "1e300s"),
            ],
        );
        assert_eq!(config.sadp_timeout(), Duration::from_secs(5));
        assert_eq!(config.discovery_timeout(), Duration::from_secs(1));
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_get_value_reports_missing_path() {
        let config = Config::embedded();
        let err = config.get_value(&["sadp", "missing"]).unwrap_err();
        assert!(err.to_string().contains("sadp.missing"));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration(" 3 ").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("1.5").unwrap(), Duration::from_millis(1500));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("1e300s").is_err());
        assert!(parse_duration("1e30m").is_err());
        assert!(parse_duration("inf").is_err());
    }
}
