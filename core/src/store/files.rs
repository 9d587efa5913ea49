use crate::prelude::{CoreError, CoreResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Files directly in `directory` whose extension is `ext` (without the dot),
/// sorted by name. A missing directory yields an empty list.
pub fn find_files_by_extension(directory: &Path, ext: &str) -> CoreResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(CoreError::io(directory, err)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| CoreError::io(directory, err))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|found| found == ext) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// First file with the given extension in `directory`, if any.
pub fn find_first(directory: &Path, ext: &str) -> CoreResult<Option<PathBuf>> {
    Ok(find_files_by_extension(directory, ext)?.into_iter().next())
}

/// Removes every file with extension `ext` from `directory`. Returns the
/// number of files removed; a missing directory removes nothing.
pub fn remove_matching_files(directory: &Path, ext: &str) -> CoreResult<usize> {
    let files = find_files_by_extension(directory, ext)?;
    for file in &files {
        fs::remove_file(file).map_err(|err| CoreError::io(file, err))?;
    }
    Ok(files.len())
}

/// Removes a file, treating an already missing file as success.
pub fn remove_if_exists(path: &Path) -> CoreResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(CoreError::io(path, err)),
    }
}

/// Renames `old_path` to `new_name` in the same directory, refusing to
/// overwrite an existing file.
pub fn rename_file(old_path: &Path, new_name: &str) -> CoreResult<PathBuf> {
    let parent = old_path.parent().unwrap_or_else(|| Path::new(""));
    let new_path = parent.join(new_name);
    if new_path.exists() {
        return Err(CoreError::Io {
            path: new_path.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", new_path.display()),
            ),
        });
    }
    fs::rename(old_path, &new_path).map_err(|err| CoreError::io(old_path, err))?;
    Ok(new_path)
}

/// Writes `contents` to a sibling temporary file and moves it over `path`,
/// so readers never observe a partially written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> CoreResult<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{}.tmp", file_name));
    fs::write(&temp, contents).map_err(|err| CoreError::io(&temp, err))?;
    fs::rename(&temp, path).map_err(|err| CoreError::io(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn removes_only_matching_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.cut"), "x").unwrap();
        fs::write(dir.path().join("b.cut"), "x").unwrap();
        fs::write(dir.path().join("keep.txt"), "x").unwrap();
        assert_eq!(remove_matching_files(dir.path(), "cut").unwrap(), 2);
        assert!(dir.path().join("keep.txt").exists());
        assert_eq!(remove_matching_files(&dir.path().join("missing"), "cut").unwrap(), 0);
    }

    #[test]
    fn rename_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.cut");
        fs::write(&a, "a").unwrap();
        fs::write(dir.path().join("b.cut"), "b").unwrap();
        assert!(rename_file(&a, "b.cut").is_err());
        let moved = rename_file(&a, "c.cut").unwrap();
        assert_eq!(fs::read_to_string(moved).unwrap(), "a");
    }

    #[test]
    fn atomic_write_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.txt");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
