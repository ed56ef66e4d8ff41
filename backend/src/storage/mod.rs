pub mod uploads;
pub mod zip_utils;

use std::path::{Component, Path, PathBuf};

/// Joins `relative` onto the static root, refusing anything that could escape it.
pub fn static_path(static_dir: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let mut has_normal = false;
    for component in relative.components() {
        match component {
            Component::Normal(_) => has_normal = true,
            Component::CurDir => {}
            _ => return None,
        }
    }
    has_normal.then(|| static_dir.join(relative))
}
