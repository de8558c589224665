use config::{Environment, File};
use ripple_rpc::codec::{CodecRegistry, CodecType};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:9999";

/// Searched for in the working directory when no `--config` is given.
const DEFAULT_FILE: &str = "ripple";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: String,
    /// Codec tags the server accepts in the handshake.
    pub codecs: Vec<CodecType>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            codecs: vec![CodecType::GOB, CodecType::JSON],
        }
    }
}

impl Config {
    pub fn registry(&self) -> ripple_rpc::Result<CodecRegistry> {
        CodecRegistry::from_types(&self.codecs)
    }
}

/// Layers `RIPPLE_*` environment variables over an optional config file.
///
/// An explicit `path` must exist; the default `ripple.*` file may be absent.
pub fn init_config(path: Option<&str>) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(File::with_name(path.unwrap_or(DEFAULT_FILE)).required(path.is_some()))
        .add_source(
            Environment::with_prefix("RIPPLE")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("codecs"),
        )
        .build()?;

    let config: Config = config.try_deserialize()?;
    debug!(?config, "config loaded");
    Ok(config)
}
