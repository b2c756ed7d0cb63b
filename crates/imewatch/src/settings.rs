//! Engine configuration from file and flags.

use std::{fs, path::Path};

use ime_engine::EngineConfig;

use crate::{
    cli::Cli,
    error::{Error, Result},
};

/// Parse a RON engine configuration; absent fields keep their defaults.
pub fn parse(path: &Path, text: &str) -> Result<EngineConfig> {
    ron::from_str(text).map_err(|e| Error::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load the configuration named by `cli` and apply flag overrides.
pub fn resolve(cli: &Cli) -> Result<EngineConfig> {
    let mut cfg = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|e| Error::Config {
                path: path.clone(),
                message: e.to_string(),
            })?;
            parse(path, &text)?
        }
        None => EngineConfig::default(),
    };
    if let Some(ms) = cli.poll_ms {
        cfg.polling_interval_ms = ms.max(1);
    }
    if let Some(ms) = cli.pixel_ms {
        cfg.pixel_verification_interval_ms = ms;
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = parse(
            Path::new("x.ron"),
            "(polling_interval_ms: 50, terminal_processes: [\"nu\"])",
        )
        .expect("parse");
        assert_eq!(cfg.polling_interval_ms, 50);
        assert!(cfg.is_terminal("NU"));
        assert_eq!(cfg.pixel_verification_interval_ms, 5000);
    }

    #[test]
    fn bad_file_names_the_path() {
        let err = parse(Path::new("bad.ron"), "(polling_interval_ms: \"x\")").unwrap_err();
        assert!(err.to_string().contains("bad.ron"));
    }

    #[test]
    fn flags_override_file() {
        let mut f = tempfile::NamedTempFile::new().expect("tmp");
        write!(f, "(polling_interval_ms: 50, pixel_verification_interval_ms: 100)").expect("write");
        let path = f.path().to_string_lossy().to_string();
        let cli = Cli::parse_from(["imewatch", "--config", &path, "--poll-ms", "0", "--pixel-ms", "0"]);
        let cfg = resolve(&cli).expect("resolve");
        assert_eq!(cfg.polling_interval_ms, 1);
        assert_eq!(cfg.pixel_verification_interval_ms, 0);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let cli = Cli::parse_from(["imewatch", "--config", "/nonexistent/imewatch.ron"]);
        assert!(matches!(resolve(&cli), Err(Error::Config { .. })));
    }
}
