//! Naming helpers for derived files, remote paths and URLs.
//!
//! Derived pictures follow `{basename}-{suffix}{ext}` naming both on disk and
//! in the artifact store, so these helpers are shared by the worker and the
//! storage crate.

use url::Url;

/// Maximum length of a single path component.
const MAX_COMPONENT_LEN: usize = 255;

/// Check that `name` is usable as a single file or directory name.
///
/// Rejects empty names, `.`/`..`, path separators and NUL bytes so that a
/// job id or picture name can never escape its parent directory.
pub fn is_safe_component(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_COMPONENT_LEN
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Split a file name into stem and extension (extension keeps its dot).
///
/// Leading dots do not start an extension: `.profile` has none.
pub fn split_extension(name: &str) -> (&str, &str) {
    let leading_dots = name.len() - name.trim_start_matches('.').len();
    match name[leading_dots..].rfind('.') {
        Some(idx) => name.split_at(leading_dots + idx),
        None => (name, ""),
    }
}

/// Insert `-{suffix}` before the extension of `name`.
pub fn derived_file_name(name: &str, suffix: &str) -> String {
    let (stem, ext) = split_extension(name);
    format!("{}-{}{}", stem, suffix, ext)
}

/// Insert `-{suffix}` before the extension of the last path segment of `url`.
///
/// Query and fragment are preserved.
pub fn derive_sibling_url(url: &str, suffix: &str) -> Result<String, url::ParseError> {
    let mut parsed = Url::parse(url)?;
    let path = parsed.path().to_string();
    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", path.as_str()),
    };
    let new_path = format!("{}/{}", dir, derived_file_name(file, suffix));
    parsed.set_path(&new_path);
    Ok(parsed.to_string())
}

/// Everything before the last `/` of a remote path, or `""` for a bare name.
pub fn parent_directory(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Join a remote directory prefix and a name with exactly one `/`.
pub fn join_remote(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("photo.jpg"), ("photo", ".jpg"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(".profile"), (".profile", ""));
        assert_eq!(split_extension("..x.png"), ("..x", ".png"));
    }

    #[test]
    fn test_derived_file_name() {
        assert_eq!(derived_file_name("photo.jpg", "thumb"), "photo-thumb.jpg");
        assert_eq!(derived_file_name("photo", "main"), "photo-main");
    }

    #[test]
    fn test_derive_sibling_url() {
        let url = derive_sibling_url("https://cdn.example.com/u/p/photo.png", "explore").unwrap();
        assert_eq!(url, "https://cdn.example.com/u/p/photo-explore.png");

        let url = derive_sibling_url("https://cdn.example.com/photo.png?v=2", "thumb").unwrap();
        assert_eq!(url, "https://cdn.example.com/photo-thumb.png?v=2");

        assert!(derive_sibling_url("not a url", "thumb").is_err());
    }

    #[test]
    fn test_parent_directory() {
        assert_eq!(parent_directory("u/p/photo.png"), "u/p");
        assert_eq!(parent_directory("photo.png"), "");
    }

    #[test]
    fn test_join_remote() {
        assert_eq!(join_remote("u/p/", "/a.png"), "u/p/a.png");
        assert_eq!(join_remote("", "a.png"), "a.png");
    }

    #[test]
    fn test_is_safe_component() {
        assert!(is_safe_component("job-1"));
        assert!(is_safe_component("photo.jpg"));
        assert!(!is_safe_component(""));
        assert!(!is_safe_component(".."));
        assert!(!is_safe_component("a/b"));
        assert!(!is_safe_component("a\\b"));
    }
}
