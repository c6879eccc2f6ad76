pub mod catalog;
pub mod scanner;

pub use catalog::Catalog;
pub use scanner::{ScannedFile, Scanner};

use std::path::Path;

/// Project-relative path with `/` separators, or `None` for paths outside the
/// root or with non-UTF-8 components.
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        parts.push(component.as_os_str().to_str()?);
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Normalizes a caller-supplied path (diff output, CLI argument) to the
/// catalog's key form.
pub fn normalize_rel_path(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let trimmed = unified.trim_start_matches("./");
    trimmed
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_slash_path() {
        let root = Path::new("/work/proj");
        assert_eq!(
            relative_slash_path(root, Path::new("/work/proj/src/models.py")).as_deref(),
            Some("src/models.py")
        );
        assert_eq!(relative_slash_path(root, Path::new("/elsewhere/x.py")), None);
        assert_eq!(relative_slash_path(root, root), None);
    }

    #[test]
    fn test_normalize_rel_path() {
        assert_eq!(normalize_rel_path("./src/models.py"), "src/models.py");
        assert_eq!(normalize_rel_path("src\\pkg\\mod.py"), "src/pkg/mod.py");
        assert_eq!(normalize_rel_path("src//./x.py"), "src/x.py");
    }
}
