use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File as ConfigFile, FileFormat};
use eyre::{eyre, Context, Result};
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::PathBuf;

const EXAMPLE_CONFIG: &str = include_str!("../config.toml");

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct Settings {
    pub db_path: String,
    pub key_path: String,
    pub session_path: String,
    pub auth_cache_path: String,
    pub server_address: String,
}

impl Settings {
    /// Bearer token of the current session, if a device session exists.
    /// Only the token is persisted here; the verified identity itself is
    /// never written in full.
    pub fn session(&self) -> Option<String> {
        let path = PathBuf::from(&self.session_path);

        if !path.exists() {
            return None;
        }

        let value = fs_err::read_to_string(path);
        value.ok().map(|x| x.trim_end().to_string())
    }

    pub fn save_session(&self, token: &str) -> Result<()> {
        fs_err::write(&self.session_path, token.as_bytes())
            .wrap_err("Failed to create a session file")?;
        Ok(())
    }

    pub fn clear_session(&self) -> Result<()> {
        let path = PathBuf::from(&self.session_path);
        if path.exists() {
            fs_err::remove_file(path)?;
        }
        Ok(())
    }

    pub fn builder() -> Result<ConfigBuilder<DefaultState>> {
        let data_dir = memry_common::utils::data_dir();
        let db_path = data_dir.join("lectures.db");
        let key_path = data_dir.join("key");
        let session_path = data_dir.join("session");
        let auth_cache_path = data_dir.join("auth_cache");

        Ok(Config::builder()
            .set_default("db_path", db_path.to_str())?
            .set_default("key_path", key_path.to_str())?
            .set_default("session_path", session_path.to_str())?
            .set_default("auth_cache_path", auth_cache_path.to_str())?
            .set_default("server_address", "http://127.0.0.1:8090")?
            .add_source(
                Environment::with_prefix("memry")
                    .prefix_separator("_")
                    .separator("__"),
            ))
    }

    pub fn new() -> Result<Self> {
        let config_dir = memry_common::utils::config_dir();
        let data_dir = memry_common::utils::data_dir();

        create_dir_all(&config_dir)
            .wrap_err_with(|| format!("Failed to create dir {config_dir:?}"))?;
        create_dir_all(&data_dir).wrap_err_with(|| format!("Failed to create dir {data_dir:?}"))?;

        let mut config_file = if let Ok(p) = std::env::var("MEMRY_CONFIG_DIR") {
            PathBuf::from(p)
        } else {
            let mut config_file = PathBuf::new();
            config_file.push(config_dir);
            config_file
        };

        config_file.push("config.toml");

        let mut config_builder = Self::builder()?;
        config_builder = if config_file.exists() {
            config_builder.add_source(ConfigFile::new(
                config_file.to_str().unwrap(),
                FileFormat::Toml,
            ))
        } else {
            let mut file = File::create(config_file).wrap_err("Failed to create config file")?;
            file.write_all(EXAMPLE_CONFIG.as_bytes())
                .wrap_err("Failed to write default config file")?;
            config_builder
        };

        let mut settings: Settings = config_builder
            .build()?
            .try_deserialize()
            .map_err(|e| eyre!("Failed to deserialize {}", e))?;

        settings.db_path = expand_shell(&settings.db_path)?;
        settings.key_path = expand_shell(&settings.key_path)?;
        settings.session_path = expand_shell(&settings.session_path)?;
        settings.auth_cache_path = expand_shell(&settings.auth_cache_path)?;

        Ok(settings)
    }
}

fn expand_shell(value: &str) -> Result<String> {
    Ok(shellexpand::full(value)?.to_string())
}
