use serde::{Deserialize, Serialize};
use std::time::Duration;
use trackswitch_av::ToolsConfig;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub remux: RemuxConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RemuxConfig {
    /// Kill ffmpeg after this many seconds. Unset means no limit.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl RemuxConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
