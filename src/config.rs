use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::Path};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub serial: SerialConfig,
    pub cassandra: CassandraConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// How long to wait for a line before logging a stall warning.
    /// Absent means wait forever.
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
}

fn default_port() -> String {
    "/dev/ttyUSB0".into()
}

fn default_baud_rate() -> u32 {
    9600
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CassandraConfig {
    /// Contact points as "host:port"
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,
    #[serde(default = "default_keyspace")]
    pub keyspace: String,
    #[serde(default = "default_table")]
    pub table: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

fn default_nodes() -> Vec<String> {
    vec!["192.168.1.3:9042".into()]
}

fn default_keyspace() -> String {
    "home".into()
}

fn default_table() -> String {
    "greenhouse".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Only readings whose `source` starts with this prefix are stored
    #[serde(default = "default_source_prefix")]
    pub source_prefix: String,
}

fn default_source_prefix() -> String {
    "G".into()
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_prefix: default_source_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Outside temperature at or below which a night counts as cold
    #[serde(default = "default_cold_threshold")]
    pub cold_threshold: f64,
}

fn default_cold_threshold() -> f64 {
    2.0
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            cold_threshold: default_cold_threshold(),
        }
    }
}

impl Config {
    /// Load YAML from disk, substitute $(VAR)/${VAR} with env vars, then parse.
    /// Afterwards, SERIAL_PORT overrides `serial.port` and CASSANDRA_NODES
    /// (comma-separated) overrides `cassandra.nodes`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let raw = fs::read_to_string(path)?;
        let mut cfg = Self::from_yaml(&raw)?;

        if let Ok(port) = std::env::var("SERIAL_PORT") {
            cfg.serial.port = port;
        }

        if let Ok(nodes) = std::env::var("CASSANDRA_NODES") {
            cfg.cassandra.nodes = nodes
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from)
                .collect();
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a YAML document after placeholder expansion. No env overrides, no validation.
    pub fn from_yaml(raw: &str) -> Result<Self, anyhow::Error> {
        let expanded = expand_env_placeholders(raw)?;
        Ok(serde_yaml::from_str(&expanded)?)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        anyhow::ensure!(!self.serial.port.is_empty(), "serial.port must not be empty");
        anyhow::ensure!(self.serial.baud_rate > 0, "serial.baud_rate must be positive");
        anyhow::ensure!(
            self.serial.read_timeout_secs != Some(0),
            "serial.read_timeout_secs must be positive when set"
        );
        anyhow::ensure!(
            !self.cassandra.nodes.is_empty(),
            "cassandra.nodes must include at least one contact point"
        );
        anyhow::ensure!(
            is_identifier(&self.cassandra.keyspace),
            "cassandra.keyspace '{}' is not a valid identifier",
            self.cassandra.keyspace
        );
        anyhow::ensure!(
            is_identifier(&self.cassandra.table),
            "cassandra.table '{}' is not a valid identifier",
            self.cassandra.table
        );
        anyhow::ensure!(
            !self.ingest.source_prefix.is_empty(),
            "ingest.source_prefix must not be empty"
        );
        Ok(())
    }
}

/// Plain CQL identifier: `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Expand $(VAR) and ${VAR} placeholders using environment variables.
/// "$$" becomes a literal "$".
fn expand_env_placeholders(input: &str) -> Result<String, anyhow::Error> {
    use anyhow::Context;

    let mut out = String::with_capacity(input.len());
    let mut it = input.chars().peekable();

    while let Some(c) = it.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let close = match it.peek().copied() {
            Some('$') => {
                it.next();
                out.push('$');
                continue;
            }
            Some('(') => ')',
            Some('{') => '}',
            _ => {
                out.push('$');
                continue;
            }
        };
        it.next();
        let var = read_until(&mut it, close)
            .with_context(|| format!("unterminated env placeholder: missing '{}'", close))?;
        let val = std::env::var(&var)
            .with_context(|| format!("missing environment variable: {}", var))?;
        out.push_str(&val);
    }

    Ok(out)
}

/// Read characters until we hit `end`, returning the collected string.
/// Consumes the closing delimiter.
fn read_until<I>(it: &mut std::iter::Peekable<I>, end: char) -> Option<String>
where
    I: Iterator<Item = char>,
{
    let mut buf = String::new();
    for ch in it.by_ref() {
        if ch == end {
            return Some(buf);
        }
        buf.push(ch);
    }
    None
}
