//! Resolution of the three input selectors into an ordered list of files.

use std::path::{Path, PathBuf};

use crate::{
    foundation::error::{StackError, StackResult},
    source,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputSelector {
    /// Every supported image directly inside a directory.
    Dir(PathBuf),
    /// Explicit `;`-separated list.
    List(String),
    /// `<dir>\<pattern>` or `<dir>/<pattern>` with `*` and `?` wildcards.
    Pattern(String),
}

impl InputSelector {
    pub fn resolve(&self) -> StackResult<Vec<PathBuf>> {
        match self {
            Self::Dir(dir) => from_dir(dir),
            Self::List(list) => Ok(from_list(list)),
            Self::Pattern(spec) => from_pattern(spec),
        }
    }
}

fn read_dir_files(dir: &Path) -> StackResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(StackError::argument(format!(
            "input directory '{}' does not exist",
            dir.display()
        )));
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| StackError::io(dir, e))? {
        let entry = entry.map_err(|e| StackError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub fn from_dir(dir: &Path) -> StackResult<Vec<PathBuf>> {
    let files: Vec<PathBuf> = read_dir_files(dir)?
        .into_iter()
        .filter(|p| source::is_supported(p))
        .collect();
    tracing::debug!(dir = %dir.display(), count = files.len(), "listed directory");
    Ok(files)
}

pub fn from_list(list: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for raw in list.split(';') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let path = PathBuf::from(raw);
        if path.is_file() {
            files.push(path);
        } else {
            tracing::warn!(path = %path.display(), "skipping missing input");
        }
    }
    files
}

/// Split `<dir><sep><pattern>` at the last `\` or `/`.
pub fn split_pattern(spec: &str) -> (PathBuf, &str) {
    match spec.rfind(['\\', '/']) {
        Some(0) => (PathBuf::from(&spec[..1]), &spec[1..]),
        Some(i) => (PathBuf::from(&spec[..i]), &spec[i + 1..]),
        None => (PathBuf::from("."), spec),
    }
}

pub fn from_pattern(spec: &str) -> StackResult<Vec<PathBuf>> {
    let (dir, pattern) = split_pattern(spec);
    if pattern.is_empty() {
        return Err(StackError::argument(format!(
            "search pattern '{spec}' has no file name part"
        )));
    }
    let mut files = Vec::new();
    for path in read_dir_files(&dir)? {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !wildcard_match(pattern, name) {
            continue;
        }
        if source::is_supported(&path) {
            files.push(path);
        } else {
            tracing::warn!(path = %path.display(), "skipping unsupported input");
        }
    }
    Ok(files)
}

/// Case-insensitive match supporting `*` (any run) and `?` (one char).
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().flat_map(char::to_lowercase).collect();
    let n: Vec<char> = name.chars().flat_map(char::to_lowercase).collect();

    let (mut pi, mut ni) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;
    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ni));
            pi += 1;
        } else if let Some((sp, sn)) = star {
            pi = sp + 1;
            ni = sn + 1;
            star = Some((sp, sn + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, b"x").unwrap();
        p
    }

    #[test]
    fn wildcard_cases() {
        assert!(wildcard_match("*.jpg", "a.JPG"));
        assert!(wildcard_match("img_??.png", "img_01.png"));
        assert!(!wildcard_match("img_??.png", "img_1.png"));
        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("a*b*c", "aXXbYYc"));
        assert!(!wildcard_match("a*b*c", "aXXbYY"));
        assert!(wildcard_match("**.png", "x.png"));
        assert!(!wildcard_match("*.png", "x.png.bak"));
    }

    #[test]
    fn split_pattern_accepts_both_separators() {
        assert_eq!(
            split_pattern(r".\source\*.jpg"),
            (PathBuf::from(r".\source"), "*.jpg")
        );
        assert_eq!(
            split_pattern("./source/*.jpg"),
            (PathBuf::from("./source"), "*.jpg")
        );
        assert_eq!(split_pattern("*.png"), (PathBuf::from("."), "*.png"));
        assert_eq!(split_pattern("/x.png"), (PathBuf::from("/"), "x.png"));
    }

    #[test]
    fn dir_lists_supported_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.PNG");
        touch(dir.path(), "a.jpg");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "c.webp");
        std::fs::create_dir(dir.path().join("sub.png")).unwrap();

        let files = InputSelector::Dir(dir.path().to_path_buf())
            .resolve()
            .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "c.webp"]);
    }

    #[test]
    fn missing_dir_is_argument_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = from_dir(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, StackError::Argument(_)));
    }

    #[test]
    fn list_keeps_order_and_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let b = touch(dir.path(), "b.png");
        let a = touch(dir.path(), "a.png");
        let missing = dir.path().join("gone.png");
        let list = format!(
            "{};{}; ;{}",
            b.display(),
            missing.display(),
            a.display()
        );
        assert_eq!(from_list(&list), vec![b, a]);
    }

    #[test]
    fn pattern_matches_within_directory() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "p2.jpg");
        touch(dir.path(), "p1.jpg");
        touch(dir.path(), "p1.png");
        let spec = format!("{}/p*.jpg", dir.path().display());
        let files = InputSelector::Pattern(spec).resolve().unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("p1.jpg"), dir.path().join("p2.jpg")]
        );
    }
}
