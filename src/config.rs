// Runtime configuration, read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use crate::generation::{DEFAULT_API_BASE, DEFAULT_MODEL};

const DEFAULT_PLAYER: &str = "ffplay -nodisp -loglevel quiet -loop 0";
const DEFAULT_LOG_FILTER: &str = "info";
const MISSING_KEY: &str =
    "Gemini API key not found. Please create a .env file with GEMINI_API_KEY='YOUR_API_KEY'.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout: Option<Duration>,
    pub sounds_dir: PathBuf,
    /// Program and leading arguments; the track path is appended.
    pub player: Vec<String>,
    pub export_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_filter: String,
}

fn get_data_dir() -> Result<PathBuf> {
    if let Some(data_home) = dirs::data_dir() {
        Ok(data_home.join("globalwell"))
    } else {
        Err(anyhow!("Could not determine data directory"))
    }
}

fn load_dotenv() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err).context("could not read .env"),
    }
}

impl Config {
    /// Reads `.env` from the working directory first, if there is one.
    /// Variables already set in the process win over the file.
    pub fn from_env() -> Result<Self> {
        load_dotenv()?;
        let data_dir = get_data_dir()?;
        let export_default = dirs::document_dir().unwrap_or_else(|| data_dir.clone());
        Self::from_lookup(|key| std::env::var(key).ok(), data_dir, export_default)
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        data_dir: PathBuf,
        export_default: PathBuf,
    ) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("GEMINI_API_KEY").ok_or_else(|| {
            anyhow!(MISSING_KEY)
        })?;

        let timeout = match get("GLOBALWELL_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .with_context(|| format!("GLOBALWELL_TIMEOUT_SECS must be whole seconds, got {raw:?}"))?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let player: Vec<String> = get("GLOBALWELL_PLAYER")
            .unwrap_or_else(|| DEFAULT_PLAYER.to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Ok(Self {
            api_key,
            model: get("GLOBALWELL_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base: get("GLOBALWELL_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            timeout,
            sounds_dir: get("GLOBALWELL_SOUNDS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("sounds")),
            player,
            export_dir: get("GLOBALWELL_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(export_default),
            log_dir: data_dir.join("logs"),
            log_filter: get("GLOBALWELL_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(
            |key| map.get(key).cloned(),
            PathBuf::from("/data/globalwell"),
            PathBuf::from("/home/me/Documents"),
        )
    }

    #[test]
    fn api_key_is_required() {
        let err = load(&[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Gemini API key not found. Please create a .env file with GEMINI_API_KEY='YOUR_API_KEY'."
        );
        assert!(load(&[("GEMINI_API_KEY", "   ")]).is_err());
    }

    #[test]
    fn defaults_fill_everything_else() {
        let cfg = load(&[("GEMINI_API_KEY", "abc")]).unwrap();
        assert_eq!(cfg.model, "gemini-1.5-flash");
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.timeout, None);
        assert_eq!(cfg.sounds_dir, PathBuf::from("/data/globalwell/sounds"));
        assert_eq!(cfg.export_dir, PathBuf::from("/home/me/Documents"));
        assert_eq!(cfg.log_dir, PathBuf::from("/data/globalwell/logs"));
        assert_eq!(cfg.player[0], "ffplay");
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn overrides_are_honoured() {
        let cfg = load(&[
            ("GEMINI_API_KEY", "abc"),
            ("GLOBALWELL_MODEL", "gemini-2.5-flash"),
            ("GLOBALWELL_TIMEOUT_SECS", "45"),
            ("GLOBALWELL_PLAYER", "mpv --no-video --loop"),
            ("GLOBALWELL_EXPORT_DIR", "/tmp/out"),
        ])
        .unwrap();
        assert_eq!(cfg.model, "gemini-2.5-flash");
        assert_eq!(cfg.timeout, Some(Duration::from_secs(45)));
        assert_eq!(cfg.player, vec!["mpv", "--no-video", "--loop"]);
        assert_eq!(cfg.export_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn bad_timeout_is_reported() {
        let err = load(&[("GEMINI_API_KEY", "abc"), ("GLOBALWELL_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("GLOBALWELL_TIMEOUT_SECS"));
    }

    #[test]
    fn dotenv_file_supplies_the_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "GEMINI_API_KEY='from-file'\nGLOBALWELL_MODEL=gemini-pro\n").unwrap();

        let vars: HashMap<String, String> = dotenvy::from_path_iter(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let cfg = Config::from_lookup(
            |key| vars.get(key).cloned(),
            PathBuf::from("/data/globalwell"),
            PathBuf::from("/home/me/Documents"),
        )
        .unwrap();
        assert_eq!(cfg.api_key, "from-file");
        assert_eq!(cfg.model, "gemini-pro");
    }
}
