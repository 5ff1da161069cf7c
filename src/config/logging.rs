use {crate::Result, serde::Deserialize};

///
/// Configuration for logging and tracing.
///
/// The filter itself comes from `RUST_LOG`; gate decisions are emitted at
/// `debug` under the `edge_gate` target, so `RUST_LOG=edge_gate=debug`
/// shows every classification and pipeline choice.
///
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Format for log output.
    /// The default format is `default`, which is "full" human-readable format.
    /// Other options are `json`, `compact`, and `pretty`.
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Default,
    Compact,
    Pretty,
}
