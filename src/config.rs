use lazy_static::lazy_static;
use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::RwLock;

lazy_static! {
    static ref CONFIG: RwLock<Config> = RwLock::new(Config::new());
}

/// Pacing and buffer tunables, read from the environment (and a best-effort
/// config file scan) once per `reload()`.
///
/// Mirrors the defaults called out in the design: 20ms pacing advance, a
/// 2-deep per-kind look-ahead, a 200KiB unbounded-video cap, and a 1GiB
/// preload ceiling.
#[derive(Debug, Clone)]
pub struct Config {
    /// Milliseconds the scheduler releases an access unit ahead of its DTS.
    pub pacing_advance_ms: u64,
    /// Per-stream-kind look-ahead depth the reassembler buffers before pacing.
    pub lookahead_depth: usize,
    /// Maximum PES payload size accepted for a single access unit.
    pub max_pes_payload: usize,
    /// Maximum total bytes read from an input before demuxing aborts.
    pub max_input_bytes: u64,
}

impl Config {
    fn new() -> Self {
        let mut config = Config {
            pacing_advance_ms: 20,
            lookahead_depth: 2,
            max_pes_payload: 200 * 1024,
            max_input_bytes: 1024 * 1024 * 1024,
        };

        if let Ok(v) = env::var("VDKIO_PACING_ADVANCE_MS") {
            if let Ok(parsed) = v.parse() {
                config.pacing_advance_ms = parsed;
            }
        }
        if let Ok(v) = env::var("VDKIO_LOOKAHEAD_DEPTH") {
            if let Ok(parsed) = v.parse() {
                config.lookahead_depth = parsed;
            }
        }
        if let Ok(v) = env::var("VDKIO_MAX_PES_PAYLOAD") {
            if let Ok(parsed) = v.parse() {
                config.max_pes_payload = parsed;
            }
        }
        if let Ok(v) = env::var("VDKIO_MAX_INPUT_BYTES") {
            if let Ok(parsed) = v.parse() {
                config.max_input_bytes = parsed;
            }
        }

        let config_paths = ["./config.toml", "./vdkio_config.toml"];
        for path in &config_paths {
            if let Ok(mut file) = File::open(path) {
                let mut content = String::new();
                if file.read_to_string(&mut content).is_ok() {
                    Self::apply_file_line(&mut config, &content, "pacing_advance_ms", |c, v| {
                        c.pacing_advance_ms = v
                    });
                    Self::apply_file_line(&mut config, &content, "lookahead_depth", |c, v| {
                        c.lookahead_depth = v as usize
                    });
                    Self::apply_file_line(&mut config, &content, "max_pes_payload", |c, v| {
                        c.max_pes_payload = v as usize
                    });
                    Self::apply_file_line(&mut config, &content, "max_input_bytes", |c, v| {
                        c.max_input_bytes = v
                    });
                }
            }
        }

        config
    }

    fn apply_file_line(config: &mut Config, content: &str, key: &str, set: impl Fn(&mut Config, u64)) {
        if let Some(line) = content.lines().find(|line| line.trim_start().starts_with(key)) {
            if let Some(value) = line.split('=').nth(1) {
                let value = value.trim().trim_matches('"').trim_matches('\'');
                if let Ok(parsed) = value.parse::<u64>() {
                    set(config, parsed);
                }
            }
        }
    }

    /// Re-reads environment and config file overrides. Called once at
    /// `Demuxer::start_streaming` time.
    pub fn reload() {
        let new_config = Config::new();
        if let Ok(mut config) = CONFIG.write() {
            *config = new_config;
        }
    }
}

/// Returns a snapshot of the current pacing/buffer configuration.
pub fn current() -> Config {
    CONFIG.read().unwrap().clone()
}

/// Creates a default config template file if it doesn't exist.
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        let template = r#"# VDKIO Configuration
# This is a template. Replace the values with your actual configuration.

pacing_advance_ms = 20
lookahead_depth = 2
max_pes_payload = 204800
max_input_bytes = 1073741824
"#;
        std::fs::write(path, template)?;
    }
    Ok(())
}
