use config::{Config, ConfigError, Environment, File};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides, e.g. `APP_BACKEND__BASE_URL`.
pub const ENV_PREFIX: &str = "APP";

/// Locate the `config` directory of a workspace member.
///
/// Works both when the binary is started from the workspace root and from the
/// member's own directory.
pub fn configuration_directory(base_path: &Path, member: &str) -> PathBuf {
    if base_path.ends_with(member) {
        base_path.join("config")
    } else {
        base_path.join(member).join("config")
    }
}

/// Load `config/base.yaml` of `member`, overlaid with `APP_`-prefixed
/// environment variables (`__` separates nested keys).
pub fn load_settings<T: DeserializeOwned>(member: &str) -> Result<T, ConfigError> {
    dotenvy::dotenv().ok();

    let base_path = std::env::current_dir().map_err(|e| {
        ConfigError::Message(format!("Failed to determine the current directory: {}", e))
    })?;
    let directory = configuration_directory(&base_path, member);

    let settings = Config::builder()
        .add_source(File::from(directory.join("base.yaml")).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_directory_from_workspace_root() {
        let dir = configuration_directory(Path::new("/srv/portal"), "host-portal");
        assert_eq!(dir, PathBuf::from("/srv/portal/host-portal/config"));
    }

    #[test]
    fn resolves_directory_from_member_root() {
        let dir = configuration_directory(Path::new("/srv/portal/host-portal"), "host-portal");
        assert_eq!(dir, PathBuf::from("/srv/portal/host-portal/config"));
    }
}
