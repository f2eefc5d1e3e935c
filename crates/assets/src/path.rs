use std::path::Path;

/// Canonical registry key for `name` under the `root` prefix.
///
/// Separators are normalized to `/`, empty and `.` segments dropped, and the
/// root prefix is prepended unless `name` already starts with it. Callers may
/// therefore pass either `"ui/button.png"` or `"assets/ui/button.png"`.
pub fn canonicalize(root: &str, name: &str) -> String {
    let root = normalize(root);
    let name = normalize(name);
    if root.is_empty() {
        return name;
    }
    if name == root || name.starts_with(&format!("{root}/")) {
        name
    } else if name.is_empty() {
        root
    } else {
        format!("{root}/{name}")
    }
}

/// Lower-cased extension of a canonical path, if any.
pub fn extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn normalize(raw: &str) -> String {
    raw.replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}
