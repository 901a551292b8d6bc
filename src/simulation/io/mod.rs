use std::fs;
use std::path::{Path, PathBuf};

use crate::simulation::error::Result;

pub mod network;
pub mod schedule;
pub mod streetlights;
pub mod trips;

pub fn resolve_path(config_path: &Option<PathBuf>, file_path: &PathBuf) -> PathBuf {
    // explicit relative paths are kept as they are, tests rely on that
    if file_path.is_absolute() || file_path.starts_with("./") {
        return file_path.clone();
    }

    if let Some(path) = config_path.as_ref().and_then(|c| c.parent()) {
        path.join(file_path)
    } else {
        file_path.clone()
    }
}

/// Creates all parent directories of `file_path`.
pub(crate) fn create_parent_dirs(file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::resolve_path;

    #[test]
    fn resolve_relative_to_config() {
        let config = Some(PathBuf::from("/scenarios/small/config.yml"));
        let resolved = resolve_path(&config, &PathBuf::from("city_grid.json"));
        assert_eq!(PathBuf::from("/scenarios/small/city_grid.json"), resolved);
    }

    #[test]
    fn keep_explicit_paths() {
        let config = Some(PathBuf::from("/scenarios/small/config.yml"));
        assert_eq!(
            PathBuf::from("./city_grid.json"),
            resolve_path(&config, &PathBuf::from("./city_grid.json"))
        );
        assert_eq!(
            PathBuf::from("/data/city_grid.json"),
            resolve_path(&config, &PathBuf::from("/data/city_grid.json"))
        );
    }

    #[test]
    fn no_config_context() {
        assert_eq!(
            PathBuf::from("city_grid.json"),
            resolve_path(&None, &PathBuf::from("city_grid.json"))
        );
    }
}
