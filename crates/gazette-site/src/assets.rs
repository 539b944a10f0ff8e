//! Output directory management.
//!
//! The output directory is rebuilt from scratch on every run: it is removed,
//! re-seeded with a verbatim copy of the static assets directory, and then
//! filled with rendered pages.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::SiteError;

/// Remove `output_dir` and recreate it as a copy of `static_dir`.
///
/// Returns the number of files copied.
pub fn purge_and_recreate(output_dir: &Path, static_dir: &Path) -> Result<usize, SiteError> {
    if !static_dir.is_dir() {
        return Err(SiteError::io(
            static_dir,
            io::Error::new(io::ErrorKind::NotFound, "static directory not found"),
        ));
    }

    if output_dir.exists() {
        fs::remove_dir_all(output_dir).map_err(|e| SiteError::io(output_dir, e))?;
    }

    copy_dir(static_dir, output_dir)
}

fn copy_dir(from: &Path, to: &Path) -> Result<usize, SiteError> {
    fs::create_dir_all(to).map_err(|e| SiteError::io(to, e))?;

    let mut copied = 0;

    for entry in WalkDir::new(from).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            SiteError::io(path, e.into())
        })?;

        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| SiteError::io(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| SiteError::io(entry.path(), e))?;
            copied += 1;
        }
    }

    tracing::debug!("Copied {} static files from {}", copied, from.display());

    Ok(copied)
}

/// Write `contents` to `path`, creating parent directories as needed.
///
/// The data goes to a temporary file next to `path` which is then renamed
/// over it, so a failed write never leaves a truncated file behind.
pub fn write_file(path: &Path, contents: &[u8]) -> Result<(), SiteError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    fs::create_dir_all(parent).map_err(|e| SiteError::io(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| SiteError::io(parent, e))?;
    tmp.write_all(contents).map_err(|e| SiteError::io(path, e))?;

    // Temporary files are created owner-only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(|e| SiteError::io(path, e))?;
    }

    tmp.persist(path).map_err(|e| SiteError::io(path, e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_file_creating_parents() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("a/b/c/index.html");

        write_file(&path, "<p>héllo</p>".as_bytes()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "<p>héllo</p>");
    }

    #[test]
    fn overwrites_existing_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("index.html");
        fs::write(&path, "old content that is longer").unwrap();

        write_file(&path, b"new").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn leaves_no_temporary_files() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("out/index.html");

        write_file(&path, b"x").unwrap();

        let entries: Vec<_> = fs::read_dir(temp.path().join("out"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("index.html")]);
    }

    #[test]
    fn purge_replaces_output_with_static_copy() {
        let temp = tempdir().unwrap();
        let static_dir = temp.path().join("static");
        let output_dir = temp.path().join("html");

        fs::create_dir_all(static_dir.join("css")).unwrap();
        fs::write(static_dir.join("css/site.css"), "body {}").unwrap();
        fs::write(static_dir.join("robots.txt"), "User-agent: *").unwrap();

        fs::create_dir_all(output_dir.join("stale")).unwrap();
        fs::write(output_dir.join("stale/index.html"), "old").unwrap();

        let copied = purge_and_recreate(&output_dir, &static_dir).unwrap();

        assert_eq!(copied, 2);
        assert!(!output_dir.join("stale").exists());
        assert_eq!(
            fs::read_to_string(output_dir.join("css/site.css")).unwrap(),
            "body {}"
        );
        assert!(output_dir.join("robots.txt").exists());
    }

    #[test]
    fn missing_static_dir_is_an_error() {
        let temp = tempdir().unwrap();
        let output_dir = temp.path().join("html");
        fs::create_dir_all(&output_dir).unwrap();

        let result = purge_and_recreate(&output_dir, &temp.path().join("nope"));

        assert!(matches!(result, Err(SiteError::Io { path, .. }) if path.ends_with("nope")));
        assert!(output_dir.exists());
    }
}
