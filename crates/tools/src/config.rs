//! 探索設定の読み込み（TOML ファイル + `--set name=value` 上書き）

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use rgo_core::SearchConfig;

/// TOML ファイル（省略時は既定値）を読み、上書きを順に適用する
pub fn load_config(path: Option<&Path>, overrides: &[String]) -> Result<SearchConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => SearchConfig::default(),
    };
    apply_overrides(&mut config, overrides)?;
    Ok(config)
}

/// `name=value` 形式の上書きを適用する
pub fn apply_overrides(config: &mut SearchConfig, overrides: &[String]) -> Result<()> {
    for entry in overrides {
        let (name, value) = parse_override(entry)?;
        config.set_property(name, value).with_context(|| format!("--set {entry}"))?;
    }
    Ok(())
}

/// `name=value` を分解する（前後の空白は無視）
pub fn parse_override(entry: &str) -> Result<(&str, &str)> {
    let (name, value) = entry
        .split_once('=')
        .ok_or_else(|| anyhow!("expected name=value, got '{entry}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("missing property name in '{entry}'"));
    }
    Ok((name, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgo_core::search::TimeManagement;

    #[test]
    fn test_parse_override() {
        assert_eq!(parse_override("threads=4").unwrap(), ("threads", "4"));
        assert_eq!(parse_override(" msec = 250 ").unwrap(), ("msec", "250"));
        assert!(parse_override("threads").is_err());
        assert!(parse_override("=4").is_err());
    }

    #[test]
    fn test_overrides_go_through_set_property() {
        let mut config = SearchConfig::default();
        apply_overrides(
            &mut config,
            &["threads=3".to_string(), "time-management=fixed".to_string()],
        )
        .unwrap();
        assert_eq!(config.threads, 3);
        assert_eq!(config.time_management, TimeManagement::Fixed);

        let err = apply_overrides(&mut config, &["no-such=1".to_string()]).unwrap_err();
        assert!(format!("{err:#}").contains("no-such"));
    }

    #[test]
    fn test_default_without_file() {
        let config = load_config(None, &[]).unwrap();
        assert_eq!(config, SearchConfig::default());
    }
}
