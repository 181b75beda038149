use std::{env, path::PathBuf};

use directories::{ProjectDirs, UserDirs};
use serde::Deserialize;
use tracing::warn;

const DEFAULT_CONFIG: &str = include_str!("../../.config/config.json5");

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tick_rate: f64,
    #[serde(default)]
    pub frame_rate: f64,
    /// Where downloaded files are saved. Defaults to the platform download
    /// directory, then to the data directory.
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Result<Self, config::ConfigError> {
        let defaults: Config =
            json5::from_str(DEFAULT_CONFIG).expect("embedded default config must parse");
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("tick_rate", defaults.tick_rate)?
            .set_default("frame_rate", defaults.frame_rate)?;

        let config_files = [
            ("config.json5", config::FileFormat::Json5),
            ("config.json", config::FileFormat::Json),
            ("config.yaml", config::FileFormat::Yaml),
            ("config.toml", config::FileFormat::Toml),
            ("config.ini", config::FileFormat::Ini),
        ];
        let mut found_config = false;
        for (file, format) in &config_files {
            let source = config::File::from(config_dir.join(file))
                .format(*format)
                .required(false);
            builder = builder.add_source(source);
            if config_dir.join(file).exists() {
                found_config = true
            }
        }
        if !found_config {
            warn!("no configuration file found, using built-in defaults");
        }

        builder.build()?.try_deserialize()
    }

    pub fn download_dir(&self) -> PathBuf {
        if let Some(dir) = &self.download_dir {
            return dir.clone();
        }
        if let Some(user_dirs) = UserDirs::new()
            && let Some(downloads) = user_dirs.download_dir()
        {
            return downloads.to_path_buf();
        }
        get_data_dir()
    }
}

pub fn get_data_dir() -> PathBuf {
    let data_folder = env::var("DAVTUI_DATA").ok().map(PathBuf::from);

    if let Some(data_folder) = data_folder {
        data_folder
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn get_config_dir() -> PathBuf {
    let config_folder = env::var("DAVTUI_CONFIG").ok().map(PathBuf::from);

    if let Some(config_folder) = config_folder {
        config_folder
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", env!("CARGO_PKG_NAME"))
}
