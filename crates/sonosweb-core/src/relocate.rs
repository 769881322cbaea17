use crate::CoreError;
use sonosweb_store::InstallLayout;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Turn a built source tree into the runtime layout.
///
/// 1. `client/dist` moves to `server/dist`.
/// 2. `server/.env.example` becomes `server/.env`.
/// 3. `.gitignore` and the whole `client/` tree (front-end manifests, sources,
///    node_modules) are deleted.
/// 4. Every entry of `server/` moves up to the root, replacing anything with the
///    same name, and the empty `server/` is removed.
///
/// Every sub-step is fatal: a half-flattened tree cannot be started.
pub fn relocate_build_output(layout: &InstallLayout, log: Option<&Path>) -> Result<(), CoreError> {
    let root = layout.root();
    let server = layout.server_dir();

    let dist_target = server.join("dist");
    remove_any(&dist_target)?;
    rename(&layout.client_dist_dir(), &dist_target, log)?;

    rename(&server.join(".env.example"), &server.join(".env"), log)?;

    remove_any(&root.join(".gitignore"))?;
    remove_any(&layout.client_dir())?;
    note(log, "removed .gitignore and client/");

    let entries = fs::read_dir(&server).map_err(|source| CoreError::Relocate {
        action: format!("reading {}", server.display()),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| CoreError::Relocate {
            action: format!("reading {}", server.display()),
            source,
        })?;
        let target = root.join(entry.file_name());
        remove_any(&target)?;
        rename(&entry.path(), &target, log)?;
    }

    fs::remove_dir(&server).map_err(|source| CoreError::Relocate {
        action: format!("removing {}", server.display()),
        source,
    })?;
    note(log, "removed server/");
    Ok(())
}

fn rename(from: &Path, to: &Path, log: Option<&Path>) -> Result<(), CoreError> {
    debug!("moving {} -> {}", from.display(), to.display());
    fs::rename(from, to).map_err(|source| CoreError::Relocate {
        action: format!("moving {} to {}", from.display(), to.display()),
        source,
    })?;
    note(log, &format!("moved {} -> {}", from.display(), to.display()));
    Ok(())
}

/// Remove a file or directory tree; an absent path is not an error.
fn remove_any(path: &Path) -> Result<(), CoreError> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => Err(e),
    };
    result.map_err(|source| CoreError::Relocate {
        action: format!("removing {}", path.display()),
        source,
    })
}

fn note(log: Option<&Path>, line: &str) {
    if let Some(log) = log {
        if let Err(e) = sonosweb_runtime::append_log(log, &format!("relocate: {line}\n")) {
            warn!("could not write {}: {e}", log.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn built_tree() -> (tempfile::TempDir, InstallLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path());
        let root = layout.root();
        fs::create_dir_all(layout.client_dist_dir()).unwrap();
        fs::create_dir_all(layout.client_dir().join("src")).unwrap();
        fs::create_dir_all(layout.server_dir().join("node_modules")).unwrap();
        fs::write(root.join(".gitignore"), "node_modules\n").unwrap();
        fs::write(root.join("package.json"), "root").unwrap();
        fs::write(layout.client_dist_dir().join("index.html"), "<html>").unwrap();
        fs::write(layout.client_dir().join("package.json"), "client").unwrap();
        fs::write(layout.server_dir().join("server.js"), "// entry").unwrap();
        fs::write(layout.server_dir().join("package.json"), "server").unwrap();
        fs::write(layout.server_dir().join(".env.example"), "PORT=5050\n").unwrap();
        (dir, layout)
    }

    #[test]
    fn produces_runtime_layout() {
        let (_dir, layout) = built_tree();
        relocate_build_output(&layout, None).unwrap();
        let root = layout.root();

        assert!(layout.server_entry().is_file());
        assert!(root.join("dist/index.html").is_file());
        assert!(root.join("node_modules").is_dir());
        assert_eq!(
            fs::read_to_string(layout.env_file()).unwrap(),
            "PORT=5050\n"
        );
        assert!(!root.join(".env.example").exists());
        assert!(!root.join(".gitignore").exists());
        assert!(!layout.client_dir().exists());
        assert!(!layout.server_dir().exists());
    }

    #[test]
    fn server_files_replace_root_collisions() {
        let (_dir, layout) = built_tree();
        relocate_build_output(&layout, None).unwrap();
        assert_eq!(
            fs::read_to_string(layout.root().join("package.json")).unwrap(),
            "server"
        );
    }

    #[test]
    fn missing_build_output_is_fatal() {
        let (_dir, layout) = built_tree();
        fs::remove_dir_all(layout.client_dist_dir()).unwrap();
        let err = relocate_build_output(&layout, None).unwrap_err();
        assert!(matches!(err, CoreError::Relocate { .. }));
        assert!(layout.server_dir().exists());
    }

    #[test]
    fn missing_env_template_is_fatal() {
        let (_dir, layout) = built_tree();
        fs::remove_file(layout.server_dir().join(".env.example")).unwrap();
        assert!(matches!(
            relocate_build_output(&layout, None),
            Err(CoreError::Relocate { .. })
        ));
    }

    #[test]
    fn moves_are_noted_in_log() {
        let (dir, layout) = built_tree();
        let log = dir.path().join("install.log");
        relocate_build_output(&layout, Some(&log)).unwrap();
        let content = fs::read_to_string(&log).unwrap();
        assert!(content.contains("relocate: moved"));
        assert!(content.contains("relocate: removed server/"));
    }
}
