use super::Provider;
use crate::model::Resource;
use crate::report::Event;
use std::fs;
use std::path::Path;

/// Manages files and directories: `ensure`, `content`, `mode`, `path`, `force`.
pub struct FileProvider;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ensure {
    Present,
    File,
    Directory,
    Absent,
}

impl Ensure {
    fn parse(v: &str) -> Option<Self> {
        match v {
            "present" => Some(Ensure::Present),
            "file" => Some(Ensure::File),
            "directory" => Some(Ensure::Directory),
            "absent" => Some(Ensure::Absent),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Ensure::Present => "present",
            Ensure::File => "file",
            Ensure::Directory => "directory",
            Ensure::Absent => "absent",
        }
    }
}

impl Provider for FileProvider {
    fn enforce(&self, resource: &Resource) -> Vec<Event> {
        let params = &resource.parameters;
        let path_str = params.get_str("path").unwrap_or(resource.title());
        let path = Path::new(path_str);
        if !path.is_absolute() {
            return vec![Event::failure(
                "path",
                format!("File paths must be fully qualified, not '{path_str}'"),
            )];
        }

        let ensure = match params.get_str("ensure") {
            Some(v) => match Ensure::parse(v) {
                Some(e) => e,
                None => {
                    return vec![Event::failure(
                        "ensure",
                        format!("Invalid value '{v}' for ensure"),
                    )];
                }
            },
            None => Ensure::Present,
        };

        let mut events = Vec::new();
        match ensure_state(path, ensure, params.get("force").and_then(|v| v.as_bool())) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(message) => {
                events.push(Event::failure(
                    "ensure",
                    format!("Could not set '{}' on ensure: {message}", ensure.as_str()),
                ));
                return events;
            }
        }

        if ensure == Ensure::Absent || ensure == Ensure::Directory {
            return events;
        }

        if let Some(content) = params.get_str("content") {
            match sync_content(path, content) {
                Ok(true) => events.push(Event::success("content", "content changed")),
                Ok(false) => {}
                Err(err) => {
                    events.push(Event::failure(
                        "content",
                        format!("Could not write content to {path_str}: {err}"),
                    ));
                    return events;
                }
            }
        }

        if let Some(mode) = params.get_str("mode") {
            match sync_mode(path, mode) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(message) => events.push(Event::failure("mode", message)),
            }
        }

        events
    }
}

fn ensure_state(path: &Path, ensure: Ensure, force: Option<bool>) -> Result<Option<Event>, String> {
    let existing = fs::symlink_metadata(path).ok();
    match (ensure, existing) {
        (Ensure::Absent, None) => Ok(None),
        (Ensure::Absent, Some(meta)) => {
            if meta.is_dir() {
                if force != Some(true) {
                    return Err("Cannot remove directory without force => true".to_string());
                }
                fs::remove_dir_all(path).map_err(|e| e.to_string())?;
            } else {
                fs::remove_file(path).map_err(|e| e.to_string())?;
            }
            Ok(Some(Event::success("ensure", "removed")))
        }
        (Ensure::Directory, None) => {
            fs::create_dir(path).map_err(|e| e.to_string())?;
            Ok(Some(Event::success("ensure", "created")))
        }
        (Ensure::Directory, Some(meta)) if meta.is_dir() => Ok(None),
        (Ensure::Directory, Some(_)) => Err("path exists and is not a directory".to_string()),
        (Ensure::File, Some(meta)) if meta.is_dir() => {
            Err("path exists and is a directory".to_string())
        }
        (Ensure::Present | Ensure::File, Some(_)) => Ok(None),
        (Ensure::Present | Ensure::File, None) => {
            fs::write(path, b"").map_err(|e| e.to_string())?;
            Ok(Some(Event::success(
                "ensure",
                "ensure changed 'absent' to 'file'",
            )))
        }
    }
}

fn sync_content(path: &Path, content: &str) -> std::io::Result<bool> {
    if path.is_dir() {
        return Ok(false);
    }
    let current = fs::read(path).unwrap_or_default();
    if current == content.as_bytes() {
        return Ok(false);
    }
    fs::write(path, content)?;
    Ok(true)
}

#[cfg(unix)]
fn sync_mode(path: &Path, mode: &str) -> Result<Option<Event>, String> {
    use std::os::unix::fs::PermissionsExt;

    let desired = u32::from_str_radix(mode, 8)
        .ok()
        .filter(|m| *m <= 0o7777)
        .ok_or_else(|| format!("Invalid mode '{mode}': expected an octal string like '0644'"))?;
    let meta = fs::metadata(path).map_err(|e| format!("Could not read mode of {}: {e}", path.display()))?;
    let current = meta.permissions().mode() & 0o7777;
    if current == desired {
        return Ok(None);
    }
    fs::set_permissions(path, fs::Permissions::from_mode(desired))
        .map_err(|e| format!("Could not set mode on {}: {e}", path.display()))?;
    Ok(Some(Event::success(
        "mode",
        format!("mode changed '{current:04o}' to '{desired:04o}'"),
    )))
}

#[cfg(not(unix))]
fn sync_mode(_path: &Path, mode: &str) -> Result<Option<Event>, String> {
    tracing::warn!(mode, "file modes are not supported on this platform; ignoring");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::EventStatus;
    use enact_types::{ParameterSet, ResourceRef};
    use serde_json::json;

    fn file(path: &Path, params: &[(&str, serde_json::Value)]) -> Resource {
        let params: ParameterSet = params.iter().cloned().collect();
        Resource::new(
            ResourceRef::new("file", path.to_string_lossy().to_string()),
            params,
        )
    }

    #[test]
    fn creates_file_with_content_then_is_idempotent() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let path = tmp.path().join("a.txt");
        let r = file(&path, &[("ensure", json!("file")), ("content", json!("hello"))]);

        let events = FileProvider.enforce(&r);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.status == EventStatus::Success));
        assert_eq!(fs::read_to_string(&path).expect("read"), "hello");

        assert!(FileProvider.enforce(&r).is_empty());
    }

    #[test]
    fn absent_removes_file() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let path = tmp.path().join("gone");
        fs::write(&path, "x").expect("write");

        let events = FileProvider.enforce(&file(&path, &[("ensure", json!("absent"))]));
        assert_eq!(events, vec![Event::success("ensure", "removed")]);
        assert!(!path.exists());
    }

    #[test]
    fn absent_directory_requires_force() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let dir = tmp.path().join("d");
        fs::create_dir(&dir).expect("mkdir");

        let events = FileProvider.enforce(&file(&dir, &[("ensure", json!("absent"))]));
        assert!(events[0].is_failure());
        assert!(dir.exists());

        let events = FileProvider.enforce(&file(
            &dir,
            &[("ensure", json!("absent")), ("force", json!(true))],
        ));
        assert!(!events[0].is_failure());
        assert!(!dir.exists());
    }

    #[test]
    fn directory_is_created() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let dir = tmp.path().join("sub");
        let events = FileProvider.enforce(&file(&dir, &[("ensure", json!("directory"))]));
        assert_eq!(events, vec![Event::success("ensure", "created")]);
        assert!(dir.is_dir());
    }

    #[test]
    fn missing_parent_is_a_failure_event() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let path = tmp.path().join("no").join("such").join("file");
        let events = FileProvider.enforce(&file(&path, &[("ensure", json!("file"))]));
        assert_eq!(events.len(), 1);
        assert!(events[0].is_failure());
        assert!(
            events[0]
                .message
                .starts_with("Could not set 'file' on ensure:")
        );
    }

    #[test]
    fn relative_paths_are_rejected() {
        let r = Resource::new(ResourceRef::new("file", "relative/x"), ParameterSet::new());
        let events = FileProvider.enforce(&r);
        assert_eq!(
            events,
            vec![Event::failure(
                "path",
                "File paths must be fully qualified, not 'relative/x'"
            )]
        );
    }

    #[test]
    fn invalid_ensure_is_rejected() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let events = FileProvider.enforce(&file(
            &tmp.path().join("x"),
            &[("ensure", json!("sideways"))],
        ));
        assert_eq!(events[0].message, "Invalid value 'sideways' for ensure");
    }

    #[cfg(unix)]
    #[test]
    fn mode_is_synchronized() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().expect("create temp dir");
        let path = tmp.path().join("m");
        fs::write(&path, "").expect("write");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).expect("chmod");

        let events = FileProvider.enforce(&file(&path, &[("mode", json!("0644"))]));
        assert_eq!(
            events,
            vec![Event::success("mode", "mode changed '0600' to '0644'")]
        );
        let mode = fs::metadata(&path).expect("stat").permissions().mode() & 0o7777;
        assert_eq!(mode, 0o644);
    }
}
