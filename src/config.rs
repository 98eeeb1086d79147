use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "zotserver")]
#[command(about = "Serves the reference library over a local HTTP interface", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".zotserver")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_uploads_dir")]
    uploads_dir: PathBuf,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    #[serde(default)]
    pub library: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    23119
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_upload_bytes() -> u64 {
    50 * 1024 * 1024
}

impl Default for App {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            uploads_dir: default_uploads_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            library: None,
        }
    }
}

impl App {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    /// Uploads directory, resolved against `base` when relative.
    pub fn get_uploads_dir(&self, base: &Path) -> PathBuf {
        resolve(base, &self.uploads_dir)
    }

    pub fn get_library(&self, base: &Path) -> Option<PathBuf> {
        self.library.as_ref().map(|p| resolve(base, p))
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: App,
}

impl Config {
    /// Missing config files fall back to defaults.
    pub fn new(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Config::default());
        }
        Config::load_config(&path.to_string_lossy())
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Config> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            let Some(end) = result[actual_start..].find('}') else {
                break;
            };
            let var_name = &result[actual_start + 2..actual_start + end];

            // ${VAR:-default}
            let env_value = match var_name.split_once(":-") {
                Some((actual_var, default_val)) => {
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                }
                None => env::var(var_name).unwrap_or_else(|_| {
                    tracing::warn!(variable = var_name, "environment variable not found");
                    String::new()
                }),
            };

            result.replace_range(actual_start..actual_start + end + 1, &env_value);
            offset = actual_start + env_value.len();
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_app() {
        let cfg = Config::from_yaml("app: {}\n").unwrap();
        assert_eq!(cfg.app.get_address(), "127.0.0.1:23119");
        assert_eq!(cfg.app.max_upload_bytes, 50 * 1024 * 1024);
        assert!(cfg.app.library.is_none());
    }

    #[test]
    fn default_values_in_placeholders() {
        let yaml = "app:\n  port: ${ZOTSERVER_TEST_UNSET_PORT:-8080}\n  uploads_dir: /srv/uploads\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.app.get_port(), 8080);
        assert_eq!(
            cfg.app.get_uploads_dir(Path::new("/etc/zotserver")),
            PathBuf::from("/srv/uploads")
        );
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let cfg = Config::from_yaml("app:\n  library: library.json\n").unwrap();
        assert_eq!(
            cfg.app.get_library(Path::new("/home/u/.zotserver")),
            Some(PathBuf::from("/home/u/.zotserver/library.json"))
        );
        assert_eq!(
            cfg.app.get_uploads_dir(Path::new("/home/u/.zotserver")),
            PathBuf::from("/home/u/.zotserver/uploads")
        );
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::new(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(cfg.app.get_port(), 23119);
    }
}
