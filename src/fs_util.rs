use std::fs;

use camino::Utf8Path;

use crate::error::ConvertError;

/// Removes whatever sits at `path`, file or directory tree.
pub fn remove_existing(path: &Utf8Path) -> Result<(), ConvertError> {
    let std_path = path.as_std_path();
    let result = if std_path.is_dir() {
        fs::remove_dir_all(std_path)
    } else if std_path.exists() {
        fs::remove_file(std_path)
    } else {
        return Ok(());
    };
    result.map_err(|err| ConvertError::StoreUnwritable {
        path: path.to_string(),
        message: err.to_string(),
    })
}
