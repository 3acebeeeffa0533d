use anyhow::{anyhow, Result};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const USER_ID_LEN: usize = 28;

/// The local user's identity file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
}

pub fn create_identity(path: &Path) -> Result<Identity> {
    let user_id: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(USER_ID_LEN)
        .map(char::from)
        .collect();
    let identity = Identity { user_id };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| anyhow!("Failed to create {}: {}", parent.display(), e))?;
    }
    let json = serde_json::to_string_pretty(&identity)
        .map_err(|e| anyhow!("Failed to serialize identity to JSON: {}", e))?;
    fs::write(path, json)
        .map_err(|e| anyhow!("Failed to write identity file {}: {}", path.display(), e))?;
    Ok(identity)
}

pub fn load_identity(path: &Path) -> Result<Identity> {
    let data = fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read identity file {}: {}", path.display(), e))?;
    let identity: Identity = serde_json::from_str(&data)
        .map_err(|e| anyhow!("Failed to parse identity JSON: {}", e))?;
    if identity.user_id.is_empty() {
        return Err(anyhow!("Identity file {} has an empty user id", path.display()));
    }
    Ok(identity)
}

/// The identity path given on the command line or `~/.config/farmzone/id.json`.
pub fn get_identity_path(identity_path: Option<PathBuf>) -> Result<PathBuf> {
    match identity_path {
        Some(path) => Ok(path),
        None => dirs::home_dir()
            .map(|home| home.join(".config/farmzone/id.json"))
            .ok_or_else(|| anyhow!("Could not find home directory")),
    }
}

/// Load the identity, creating one only when no file exists. A file that
/// is unreadable or malformed is left in place and reported.
pub fn get_or_create_identity(path: &Path) -> Result<(Identity, bool)> {
    if !path.exists() {
        return Ok((create_identity(path)?, true));
    }
    Ok((load_identity(path)?, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_identity_is_created_once() -> Result<()> {
        let dir = TempDir::new("identity_test")?;
        let path = dir.path().join("nested/id.json");

        let (first, created) = get_or_create_identity(&path)?;
        assert!(created);
        assert_eq!(first.user_id.len(), USER_ID_LEN);

        let (second, created) = get_or_create_identity(&path)?;
        assert!(!created);
        assert_eq!(second.user_id, first.user_id);
        Ok(())
    }

    #[test]
    fn test_rejects_empty_user_id() -> Result<()> {
        let dir = TempDir::new("identity_test")?;
        let path = dir.path().join("id.json");
        fs::write(&path, r#"{"userId":""}"#)?;
        assert!(load_identity(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_malformed_identity_is_kept() -> Result<()> {
        let dir = TempDir::new("identity_test")?;
        let path = dir.path().join("id.json");

        for contents in [r#"{"userId":""}"#, "not json"] {
            fs::write(&path, contents)?;
            assert!(get_or_create_identity(&path).is_err());
            assert_eq!(fs::read_to_string(&path)?, contents);
        }
        Ok(())
    }
}
