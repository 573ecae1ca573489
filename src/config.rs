//! Optional config file loading. Search order: ./katanascrape.toml, then
//! $XDG_CONFIG_HOME/katanascrape/config.toml (or ~/.config/katanascrape/config.toml).

use serde::Deserialize;

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Site root, e.g. a mirror of mangakatana.com.
    pub base_url: Option<String>,
    /// HTTP and browser User-Agent.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Pause between search result pages, in milliseconds.
    pub page_delay_ms: Option<u64>,
    /// Run Chrome headless (default: true).
    pub headless: Option<bool>,
    /// Page-load and image-wait ceiling for the rendered fetch, in seconds.
    pub render_timeout_secs: Option<u64>,
}

/// Search order: (1) ./katanascrape.toml, (2) $XDG_CONFIG_HOME/katanascrape/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("katanascrape.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("katanascrape").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&s)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
            log::debug!("loaded config from {}", path.display());
            return Ok(Some(config));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let c: Config = toml::from_str("").unwrap();
        assert!(c.base_url.is_none());
        assert!(c.user_agent.is_none());
        assert!(c.timeout_secs.is_none());
        assert!(c.page_delay_ms.is_none());
        assert!(c.headless.is_none());
        assert!(c.render_timeout_secs.is_none());
    }

    #[test]
    fn parse_full_config() {
        let s = r#"
            base_url = "https://mangakatana.example"
            user_agent = "Custom/1.0"
            timeout_secs = 20
            page_delay_ms = 4000
            headless = false
            render_timeout_secs = 15
        "#;
        let c: Config = toml::from_str(s).unwrap();
        assert_eq!(c.base_url.as_deref(), Some("https://mangakatana.example"));
        assert_eq!(c.user_agent.as_deref(), Some("Custom/1.0"));
        assert_eq!(c.timeout_secs, Some(20));
        assert_eq!(c.page_delay_ms, Some(4000));
        assert_eq!(c.headless, Some(false));
        assert_eq!(c.render_timeout_secs, Some(15));
    }

    #[test]
    fn parse_partial_config() {
        let c: Config = toml::from_str("page_delay_ms = 0").unwrap();
        assert_eq!(c.page_delay_ms, Some(0));
        assert!(c.base_url.is_none());
        assert!(c.headless.is_none());
    }

    #[test]
    fn invalid_toml_errors() {
        assert!(toml::from_str::<Config>("base_url = [").is_err());
        assert!(toml::from_str::<Config>("timeout_secs = \"ten\"").is_err());
    }
}
