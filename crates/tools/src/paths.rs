//! Path resolution shared by the file tools.

use std::path::{Component, Path, PathBuf};
use toolclaw_core::error::ToolError;

/// Resolve `raw` against `cwd` and reject anything under `forbidden`.
///
/// `.` and `..` components are folded lexically so that the forbidden check
/// sees the real target even when the file does not exist yet.
pub fn resolve(
    tool_name: &str,
    cwd: &Path,
    raw: &str,
    forbidden: &[PathBuf],
) -> Result<PathBuf, ToolError> {
    let joined = if Path::new(raw).is_absolute() {
        PathBuf::from(raw)
    } else {
        cwd.join(raw)
    };
    let resolved = normalize(&joined);

    if let Some(blocked) = forbidden.iter().find(|f| resolved.starts_with(normalize(f))) {
        return Err(ToolError::PermissionDenied {
            tool_name: tool_name.into(),
            reason: format!("'{}' is under forbidden path '{}'", raw, blocked.display()),
        });
    }

    Ok(resolved)
}

/// Display `path` relative to `cwd` when possible.
pub fn display_relative(path: &Path, cwd: &Path) -> String {
    path.strip_prefix(cwd)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_cwd() {
        let p = resolve("read_file", Path::new("/work"), "src/lib.rs", &[]).unwrap();
        assert_eq!(p, PathBuf::from("/work/src/lib.rs"));
    }

    #[test]
    fn dot_segments_are_folded() {
        let p = resolve("read_file", Path::new("/work/sub"), "../a/./b.txt", &[]).unwrap();
        assert_eq!(p, PathBuf::from("/work/a/b.txt"));
    }

    #[test]
    fn forbidden_prefix_is_denied() {
        let forbidden = vec![PathBuf::from("/etc")];
        let err = resolve("read_file", Path::new("/work"), "../etc/shadow", &forbidden).unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied { .. }));
    }

    #[test]
    fn display_strips_cwd() {
        assert_eq!(
            display_relative(Path::new("/work/src/main.rs"), Path::new("/work")),
            "src/main.rs"
        );
        assert_eq!(display_relative(Path::new("/other"), Path::new("/work")), "/other");
    }
}
