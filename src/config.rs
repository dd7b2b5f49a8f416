use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginMode {
    None,
    Narrow,
    Normal,
    Wide,
}

impl MarginMode {
    pub const fn to_page_margin(self) -> crate::store::PageMargin {
        match self {
            Self::None => crate::store::PageMargin::None,
            Self::Narrow => crate::store::PageMargin::Narrow,
            Self::Normal => crate::store::PageMargin::Normal,
            Self::Wide => crate::store::PageMargin::Wide,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub landscape: bool,
    pub margin: Option<MarginMode>,
    pub store: Option<PathBuf>,
    pub save_delay_ms: Option<u64>,
}

impl ConfigFlags {
    pub fn union(&self, other: &Self) -> Self {
        Self {
            landscape: self.landscape || other.landscape,
            margin: other.margin.or(self.margin),
            store: other.store.clone().or_else(|| self.store.clone()),
            save_delay_ms: other.save_delay_ms.or(self.save_delay_ms),
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("quill").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("quill")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("quill").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config").join("quill").join("config");
        }
    }

    PathBuf::from(".quillrc")
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".quillrc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = Vec::new();
    lines.push("# quill defaults (saved with --save)".to_string());
    if flags.landscape {
        lines.push("--landscape".to_string());
    }
    if let Some(margin) = flags.margin {
        let margin_str = match margin {
            MarginMode::None => "none",
            MarginMode::Narrow => "narrow",
            MarginMode::Normal => "normal",
            MarginMode::Wide => "wide",
        };
        lines.push(format!("--margin {}", margin_str));
    }
    if let Some(store) = &flags.store {
        lines.push(format!("--store {}", store.display()));
    }
    if let Some(delay) = flags.save_delay_ms {
        lines.push(format!("--save-delay-ms {}", delay));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if token == "--landscape" {
            flags.landscape = true;
        } else if token == "--margin" {
            if let Some(next) = tokens.get(i + 1) {
                flags.margin = parse_margin(next);
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--margin=") {
            flags.margin = parse_margin(value);
        } else if token == "--store" {
            if let Some(next) = tokens.get(i + 1) {
                flags.store = Some(PathBuf::from(next));
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--store=") {
            flags.store = Some(PathBuf::from(value));
        } else if token == "--save-delay-ms" {
            if let Some(next) = tokens.get(i + 1) {
                flags.save_delay_ms = next.parse().ok();
                i += 1;
            }
        } else if let Some(value) = token.strip_prefix("--save-delay-ms=") {
            flags.save_delay_ms = value.parse().ok();
        }
        i += 1;
    }
    flags
}

fn parse_margin(s: &str) -> Option<MarginMode> {
    match s {
        "none" => Some(MarginMode::None),
        "narrow" => Some(MarginMode::Narrow),
        "normal" => Some(MarginMode::Normal),
        "wide" => Some(MarginMode::Wide),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let args = vec![
            "quill".to_string(),
            "--landscape".to_string(),
            "--margin".to_string(),
            "wide".to_string(),
            "--store=notes.json".to_string(),
            "--save-delay-ms".to_string(),
            "500".to_string(),
        ];
        let flags = parse_flag_tokens(&args);
        assert!(flags.landscape);
        assert_eq!(flags.margin, Some(MarginMode::Wide));
        assert_eq!(flags.store, Some(PathBuf::from("notes.json")));
        assert_eq!(flags.save_delay_ms, Some(500));
    }

    #[test]
    fn test_config_union_merges_cli_over_file_for_options() {
        let file = ConfigFlags {
            landscape: true,
            margin: Some(MarginMode::Narrow),
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            margin: Some(MarginMode::Wide),
            save_delay_ms: Some(2_000),
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert!(merged.landscape);
        assert_eq!(merged.margin, Some(MarginMode::Wide));
        assert_eq!(merged.save_delay_ms, Some(2_000));
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".quillrc");
        let flags = ConfigFlags {
            landscape: true,
            margin: Some(MarginMode::None),
            store: Some(PathBuf::from("notes.json")),
            save_delay_ms: Some(250),
        };

        save_config_flags(&path, &flags).unwrap();
        let loaded = load_config_flags(&path).unwrap();
        assert_eq!(loaded, flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
    }
}
