use chrono::{DateTime, Utc};

/// One file or directory record returned by a listing. Produced fresh on
/// every refresh and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DirEntry {
    /// Full path from the share root, e.g. `/docs/report.pdf`.
    pub filename: String,
    /// Display name, the last path segment.
    pub basename: String,
    pub kind: EntryKind,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Strips the trailing segment of a path, treating `\` like `/`.
///
/// An empty result collapses to the root `"/"`. A string without any
/// separator is returned unchanged. Any input is accepted.
pub fn dirname(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let stripped = match normalized.rfind('/') {
        Some(idx) => &normalized[..idx],
        None => normalized.as_str(),
    };
    if stripped.is_empty() {
        return "/".to_string();
    }
    stripped.to_string()
}

/// Directories first, then files, each group alphabetical by basename.
pub fn sort_entries(entries: &mut [DirEntry]) {
    entries.sort_by(|a, b| {
        b.is_dir()
            .cmp(&a.is_dir())
            .then_with(|| a.basename.cmp(&b.basename))
    });
}

const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

pub fn format_size(size: u64) -> String {
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{size} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub fn format_modified(modified: Option<DateTime<Utc>>) -> String {
    match modified {
        Some(ts) => ts.format("%Y-%m-%d %H:%M").to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn entry(name: &str, kind: EntryKind) -> DirEntry {
        DirEntry {
            filename: format!("/{name}"),
            basename: name.to_string(),
            kind,
            size: 0,
            modified: None,
        }
    }

    #[test]
    fn dirname_strips_last_segment() {
        assert_eq!(dirname("/a/b/c"), "/a/b");
        assert_eq!(dirname("/a/b"), "/a");
    }

    #[test]
    fn dirname_collapses_to_root() {
        assert_eq!(dirname("/a"), "/");
        assert_eq!(dirname("/"), "/");
        assert_eq!(dirname(""), "/");
    }

    #[test]
    fn dirname_treats_backslashes_like_slashes() {
        assert_eq!(dirname("\\a\\b\\c"), "/a/b");
        assert_eq!(dirname("/a\\b"), "/a");
    }

    #[test]
    fn dirname_without_separator_is_unchanged() {
        assert_eq!(dirname("abc"), "abc");
    }

    #[test]
    fn directories_sort_before_files() {
        let mut entries = vec![
            entry("zz.txt", EntryKind::File),
            entry("aa.txt", EntryKind::File),
            entry("music", EntryKind::Directory),
            entry("docs", EntryKind::Directory),
        ];
        sort_entries(&mut entries);
        let names: Vec<&str> = entries.iter().map(|e| e.basename.as_str()).collect();
        assert_eq!(names, vec!["docs", "music", "aa.txt", "zz.txt"]);
    }

    #[test]
    fn sizes_format_with_binary_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }
}
