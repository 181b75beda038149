use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version = version(), about)]
pub struct Cli {
    /// Tick rate, i.e. number of ticks per second
    #[arg(short, long, value_name = "FLOAT")]
    pub tick_rate: Option<f64>,

    /// Frame rate, i.e. number of frames per second
    #[arg(short, long, value_name = "FLOAT")]
    pub frame_rate: Option<f64>,

    /// Path to start browsing at
    #[arg(short, long, value_name = "PATH", default_value = "/")]
    pub path: String,

    /// Server URL, overriding the saved settings for this run
    #[arg(short, long, value_name = "URL")]
    pub url: Option<String>,

    /// Username, overriding the saved settings for this run
    #[arg(long, value_name = "NAME")]
    pub username: Option<String>,

    /// Password, overriding the saved settings for this run
    #[arg(long, value_name = "PASSWORD")]
    pub password: Option<String>,
}

const VERSION_MESSAGE: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> String {
    let author = clap::crate_authors!();

    let config_dir_path = crate::config::get_config_dir().display().to_string();
    let data_dir_path = crate::config::get_data_dir().display().to_string();

    format!(
        "\
{VERSION_MESSAGE}

Authors: {author}

Config directory: {config_dir_path}
Data directory: {data_dir_path}"
    )
}
