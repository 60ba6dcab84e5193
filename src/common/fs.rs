//! File system helpers

use std::fs;
use std::path::Path;

use super::error::{ResponderError, Result};

/// Check that a path exists and is a regular file
pub fn check_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(ResponderError::Other(format!(
            "File not found: {}",
            path.display()
        )));
    }

    if !path.is_file() {
        return Err(ResponderError::Other(format!(
            "Path is not a file: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Read a whole file after checking it exists
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    check_file_exists(path)?;

    fs::read(path).map_err(ResponderError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_check_file_exists() {
        let path = PathBuf::from("Cargo.toml");
        assert!(check_file_exists(&path).is_ok());

        let path = PathBuf::from("non_existent_file.txt");
        assert!(check_file_exists(&path).is_err());

        let path = PathBuf::from("src");
        let err = check_file_exists(&path).unwrap_err();
        assert!(err.to_string().contains("not a file"));
    }

    #[test]
    fn test_read_file() {
        let path = PathBuf::from("Cargo.toml");
        let content = read_file(&path).unwrap();
        assert!(!content.is_empty());

        let path = PathBuf::from("non_existent_file.txt");
        assert!(read_file(&path).is_err());
    }
}
