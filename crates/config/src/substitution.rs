use anyhow::Result;
use regex::Regex;
use std::env;
use tracing::{debug, warn};

const ENV_VAR_PATTERN: &str = r"\$\{(\w+)(?::-([^}]*))?\}";

/// Substitute environment variables written as `${VAR_NAME}` or
/// `${VAR_NAME:-default}`
///
/// Unset variables fall back to their default. Without one they keep their
/// placeholder, which then fails YAML typing or validation with a message
/// naming the field.
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(ENV_VAR_PATTERN)?;
    let mut result = content.to_string();
    let mut missing_vars = Vec::new();

    for caps in re.captures_iter(content) {
        let (Some(placeholder), Some(var_name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        match (env::var(var_name.as_str()), caps.get(2)) {
            (Ok(value), _) => {
                debug!("Substituting environment variable: {}", var_name.as_str());
                result = result.replace(placeholder.as_str(), &value);
            }
            (Err(_), Some(default)) => {
                debug!("Using default for environment variable: {}", var_name.as_str());
                result = result.replace(placeholder.as_str(), default.as_str());
            }
            (Err(_), None) => {
                warn!("Environment variable '{}' not set", var_name.as_str());
                missing_vars.push(var_name.as_str().to_string());
            }
        }
    }

    if !missing_vars.is_empty() {
        debug!("Environment variables not set: {:?}", missing_vars);
    }

    Ok(result)
}

/// Check if a string contains unresolved environment variable placeholders
pub fn has_unresolved_env_vars(content: &str) -> bool {
    Regex::new(ENV_VAR_PATTERN)
        .map(|re| re.is_match(content))
        .unwrap_or(false)
}
