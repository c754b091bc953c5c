use std::fs;
use std::path::Path;

/// Loads `KEY=VALUE` lines from a local `.env`-style file into the process
/// environment before `engine_config::EngineEnv::from_env` reads it, so a
/// developer running the engine standalone doesn't have to export every
/// variable by hand (§10.3).
pub fn load_dotenv(path: impl AsRef<Path>) -> std::io::Result<()> {
    let content = fs::read_to_string(path)?;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = unquote(value.trim());
            if !key.is_empty() && std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
    Ok(())
}

fn unquote(value: &str) -> String {
    let stripped = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')));
    stripped.unwrap_or(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquote_strips_matching_quotes() {
        assert_eq!(unquote("\"value with spaces\""), "value with spaces");
        assert_eq!(unquote("'single'"), "single");
        assert_eq!(unquote("plain"), "plain");
    }
}
