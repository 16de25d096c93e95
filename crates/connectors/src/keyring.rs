//! `keyring://<alias>` secret resolution against the OS-level credential
//! store (spec §6 "Secrets"). Resolved eagerly, before any connection
//! attempt — a missing or unreadable alias is always fatal, never retried.

use keyring::Entry;

use crate::error::{ConnectorError, Result};

const SERVICE_NAME: &str = "dtpipe";

/// Resolves `keyring://<alias>` to its stored secret. Any other string is
/// returned unchanged — most connection strings carry credentials inline
/// and never touch this path.
pub fn resolve(raw: &str) -> Result<String> {
    match raw.strip_prefix("keyring://") {
        Some(alias) => {
            let entry = Entry::new(SERVICE_NAME, alias).map_err(|e| ConnectorError::KeyringResolution(alias.to_string(), e.to_string()))?;
            entry
                .get_password()
                .map_err(|e| ConnectorError::KeyringResolution(alias.to_string(), e.to_string()))
        }
        None => Ok(raw.to_string()),
    }
}

/// Resolves every `keyring://` substring embedded in a larger connection
/// string (e.g. `postgres://user:keyring://db-pass@host/db`), so aliases
/// can stand in for just the password segment rather than the whole value.
pub fn resolve_embedded(raw: &str) -> Result<String> {
    const PREFIX: &str = "keyring://";
    let Some(start) = raw.find(PREFIX) else {
        return Ok(raw.to_string());
    };
    let alias_start = start + PREFIX.len();
    let alias_end = raw[alias_start..]
        .find(|c: char| c == '@' || c == '/' || c == '&' || c == ';')
        .map(|rel| alias_start + rel)
        .unwrap_or(raw.len());
    let alias = &raw[alias_start..alias_end];
    let secret = resolve(&format!("{PREFIX}{alias}"))?;
    Ok(format!("{}{}{}", &raw[..start], secret, &raw[alias_end..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_keyring_strings_pass_through() {
        assert_eq!(resolve("postgres://localhost/db").unwrap(), "postgres://localhost/db");
    }

    #[test]
    fn embedded_passthrough_when_no_alias_present() {
        assert_eq!(resolve_embedded("postgres://user:pw@host/db").unwrap(), "postgres://user:pw@host/db");
    }
}
