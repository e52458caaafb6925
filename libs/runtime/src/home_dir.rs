use std::{env, fs, path::PathBuf};

/// Errors for resolving the home directory
#[derive(Debug, thiserror::Error)]
pub enum HomeDirError {
    #[error("HOME environment variable is not set")]
    HomeMissing,
    #[error("APPDATA environment variable is not set")]
    AppDataMissing,
    #[error("home_dir must be an absolute path (after ~ expansion): {0}")]
    AbsoluteRequired(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn user_home() -> Result<PathBuf, HomeDirError> {
    #[cfg(target_os = "windows")]
    let home = env::var("USERPROFILE").or_else(|_| env::var("HOME"));
    #[cfg(not(target_os = "windows"))]
    let home = env::var("HOME");
    home.map(PathBuf::from).map_err(|_| HomeDirError::HomeMissing)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(raw: &str) -> Result<PathBuf, HomeDirError> {
    if raw == "~" {
        return user_home();
    }
    match raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        Some(rest) => Ok(user_home()?.join(rest)),
        None => Ok(PathBuf::from(raw)),
    }
}

fn platform_default(default_subdir: &str) -> Result<PathBuf, HomeDirError> {
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA").map_err(|_| HomeDirError::AppDataMissing)?;
        Ok(PathBuf::from(appdata).join(default_subdir))
    }
    #[cfg(not(target_os = "windows"))]
    {
        Ok(user_home()?.join(default_subdir))
    }
}

/// Resolve the application home directory.
///
/// A configured value may use `~` but must be absolute after expansion.
/// Without one, `$HOME/<default_subdir>` (`%APPDATA%` on Windows) is used.
/// With `create`, the directory is created if missing.
pub fn resolve_home_dir(
    config_home: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let path = match config_home {
        Some(raw) => {
            let expanded = expand_tilde(&raw)?;
            if !expanded.is_absolute() {
                return Err(HomeDirError::AbsoluteRequired(
                    expanded.to_string_lossy().into(),
                ));
            }
            expanded
        }
        None => platform_default(default_subdir)?,
    };

    if create {
        fs::create_dir_all(&path)?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn absolute_path_is_kept_and_created() {
        let tmp = tempdir().unwrap();
        let abs = tmp.path().join("custom_dir");

        let result =
            resolve_home_dir(Some(abs.to_string_lossy().to_string()), ".leases", true).unwrap();

        assert_eq!(result, abs);
        assert!(result.exists());
    }

    #[test]
    #[cfg(not(target_os = "windows"))]
    fn relative_path_is_rejected() {
        let err = resolve_home_dir(Some("relative/path".into()), ".leases", false).unwrap_err();
        assert!(matches!(err, HomeDirError::AbsoluteRequired(_)));
    }

    #[test]
    fn path_without_tilde_is_unchanged() {
        assert_eq!(
            expand_tilde("/usr/share/leases").unwrap(),
            PathBuf::from("/usr/share/leases")
        );
    }
}
