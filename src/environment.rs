// src/environment.rs
// =============================================================================
// Environment activation.
//
// An "environment" is a directory holding a KEY=VALUE file (by default
// `.env`). Activating it loads those variables into this process before any
// request is made, e.g. HTTPS_PROXY for a corporate tunnel. Variables that
// are already set are left alone.
// =============================================================================

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::SetupError;

/// Resolves `env_dir` against `cwd` when relative and joins the file name.
pub fn activation_file(cwd: &Path, env_dir: &Path, packages: &Path) -> PathBuf {
    let env_path = if env_dir.is_absolute() {
        env_dir.to_path_buf()
    } else {
        cwd.join(env_dir)
    };
    env_path.join(packages)
}

/// Loads the activation file into the process environment.
pub fn activate(env_dir: &Path, packages: &Path) -> Result<PathBuf, SetupError> {
    let cwd = std::env::current_dir().map_err(|e| SetupError::Environment {
        path: env_dir.to_path_buf(),
        source: dotenvy::Error::Io(e),
    })?;
    let file = activation_file(&cwd, env_dir, packages);

    dotenvy::from_path(&file).map_err(|source| SetupError::Environment {
        path: file.clone(),
        source,
    })?;

    info!("activated environment from {}", file.display());
    Ok(file)
}
