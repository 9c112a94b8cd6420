use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Environment variable manager that loads from system and .env files
#[derive(Debug, Clone)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

impl EnvManager {
    pub fn new() -> Self {
        let mut vars = HashMap::new();

        // Load all system environment variables
        for (key, value) in std::env::vars() {
            vars.insert(key, value);
        }

        Self { vars }
    }

    /// An empty manager, for building configurations in tests.
    pub fn from_vars(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    /// Load variables from a .env file; file values override system ones.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::Config(format!("Failed to read env file {}: {}", path.display(), e))
        })?;

        self.parse_env_content(&content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), ConfigError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Parse KEY=VALUE format
            if let Some(eq_pos) = line.find('=') {
                let key = line[..eq_pos].trim();
                let value = line[eq_pos + 1..].trim();

                if key.is_empty() {
                    return Err(ConfigError::Config(format!(
                        "Invalid env file: empty key at line {}",
                        line_num + 1
                    )));
                }

                // Remove quotes from value if present
                let value = Self::unquote_value(value);

                self.vars.insert(key.to_string(), value);
            } else {
                return Err(ConfigError::Config(format!(
                    "Invalid env file: malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                )));
            }
        }

        Ok(())
    }

    fn unquote_value(value: &str) -> String {
        let value = value.trim();

        // Handle double quotes
        if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
            return value[1..value.len() - 1].to_string();
        }

        // Handle single quotes
        if value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2 {
            return value[1..value.len() - 1].to_string();
        }

        value.to_string()
    }
}

impl Default for EnvManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_and_skips_comments() {
        let mut env = EnvManager::from_vars(HashMap::new());
        let content = r#"
# Comment
KEY1=value1
KEY2=value2
        "#;

        env.parse_env_content(content).unwrap();
        assert_eq!(env.get("KEY1").unwrap(), "value1");
        assert_eq!(env.get("KEY2").unwrap(), "value2");
    }

    #[test]
    fn quoted_values_are_unwrapped() {
        let mut env = EnvManager::from_vars(HashMap::new());
        let content = r#"
QUOTED="value with spaces"
SINGLE='single quoted'
UNQUOTED=no_spaces
        "#;

        env.parse_env_content(content).unwrap();
        assert_eq!(env.get("QUOTED").unwrap(), "value with spaces");
        assert_eq!(env.get("SINGLE").unwrap(), "single quoted");
        assert_eq!(env.get("UNQUOTED").unwrap(), "no_spaces");
    }

    #[test]
    fn malformed_lines_are_rejected() {
        let mut env = EnvManager::from_vars(HashMap::new());
        assert!(env.parse_env_content("NOT A PAIR").is_err());
        assert!(env.parse_env_content("=value").is_err());
    }

    #[test]
    fn file_values_override_system_env() {
        let mut vars = HashMap::new();
        vars.insert("DB_HOST".to_string(), "system-host".to_string());
        let mut env = EnvManager::from_vars(vars);

        env.parse_env_content("DB_HOST=file-host").unwrap();
        assert_eq!(env.get("DB_HOST").unwrap(), "file-host");
    }
}
