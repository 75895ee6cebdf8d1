//! Object-store parameters taken from the process environment.

use std::path::PathBuf;

use super::ConfigError;

/// Switches the object store to a local directory (development mode).
pub const STORE_ROOT_VAR: &str = "GPS_STORE_ROOT";

const REQUIRED: [&str; 6] = ["S3_ID", "S3_KEY", "S3_BUCKET", "S3_INPUT", "S3_OUTPUT", "S3_SYNC"];

/// Bucket, credentials and the three working prefixes.
#[derive(Debug, Clone)]
pub struct StoreEnvironment {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    /// Prefix holding dataset definitions.
    pub input_prefix: String,
    /// Prefix receiving processed outputs; also the completeness index.
    pub output_prefix: String,
    /// Prefix mirroring origin artifacts, one sub-prefix per snapshot.
    pub sync_prefix: String,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub local_root: Option<PathBuf>,
}

impl StoreEnvironment {
    /// Read from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let local_root = get(STORE_ROOT_VAR).map(PathBuf::from);

        // Credentials are only needed for a remote bucket.
        let missing: Vec<String> = REQUIRED
            .iter()
            .filter(|name| {
                let credential = matches!(**name, "S3_ID" | "S3_KEY" | "S3_BUCKET");
                !(credential && local_root.is_some()) && get(**name).is_none()
            })
            .map(|name| name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(ConfigError::MissingEnvironment(missing));
        }

        Ok(Self {
            access_key_id: get("S3_ID").unwrap_or_default(),
            secret_access_key: get("S3_KEY").unwrap_or_default(),
            bucket: get("S3_BUCKET").unwrap_or_default(),
            input_prefix: get("S3_INPUT").unwrap_or_default(),
            output_prefix: get("S3_OUTPUT").unwrap_or_default(),
            sync_prefix: get("S3_SYNC").unwrap_or_default(),
            endpoint: get("S3_ENDPOINT"),
            region: get("S3_REGION"),
            local_root,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_complete_environment() {
        let env = StoreEnvironment::from_lookup(lookup(&[
            ("S3_ID", "id"),
            ("S3_KEY", "key"),
            ("S3_BUCKET", "bucket"),
            ("S3_INPUT", "input"),
            ("S3_OUTPUT", "output"),
            ("S3_SYNC", "sync"),
        ]))
        .unwrap();
        assert_eq!(env.bucket, "bucket");
        assert_eq!(env.sync_prefix, "sync");
        assert!(env.local_root.is_none());
    }

    #[test]
    fn test_missing_variables_are_named() {
        let err = StoreEnvironment::from_lookup(lookup(&[("S3_ID", "id"), ("S3_INPUT", "")]))
            .unwrap_err();
        match &err {
            ConfigError::MissingEnvironment(missing) => {
                assert!(missing.contains(&"S3_KEY".to_string()));
                assert!(missing.contains(&"S3_INPUT".to_string()));
                assert!(!missing.contains(&"S3_ID".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("must be set"));
    }

    #[test]
    fn test_local_root_waives_credentials() {
        let env = StoreEnvironment::from_lookup(lookup(&[
            (STORE_ROOT_VAR, "/tmp/store"),
            ("S3_INPUT", "input"),
            ("S3_OUTPUT", "output"),
            ("S3_SYNC", "sync"),
        ]))
        .unwrap();
        assert_eq!(env.local_root, Some(PathBuf::from("/tmp/store")));
        assert!(env.bucket.is_empty());
    }

    #[test]
    fn test_local_root_still_requires_prefixes() {
        let err = StoreEnvironment::from_lookup(lookup(&[(STORE_ROOT_VAR, "/tmp/store")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvironment(ref m) if m.len() == 3));
    }
}
