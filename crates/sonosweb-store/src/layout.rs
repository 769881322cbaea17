use std::path::{Path, PathBuf};

const SERVER_ENTRY: &str = "server.js";
const ENV_FILE: &str = ".env";
const INSTALL_LOG: &str = "install.log";
const SUPERVISOR_LOG: &str = "forever.log";
const APP_LOG: &str = "sonos-web.log";
const PID_FILE: &str = "sonos-web.pid";

const SETTINGS_FILE: &str = "config.toml";
const RECORD_FILE: &str = "install.json";
const LOCK_FILE: &str = "lifecycle.lock";
const INSTALL_LOCK_SUFFIX: &str = ".lock";

/// Paths inside a sonos-web installation directory.
///
/// Before the relocate step the fetched tree still has `client/` and `server/`
/// subdirectories; after it, the server files sit directly under the root and
/// `server.js` doubles as the "installed" marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    /// A relative `root` is anchored at the current directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: anchor(root.into()),
        }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn server_entry(&self) -> PathBuf {
        self.root.join(SERVER_ENTRY)
    }

    #[inline]
    pub fn env_file(&self) -> PathBuf {
        self.root.join(ENV_FILE)
    }

    #[inline]
    pub fn install_log(&self) -> PathBuf {
        self.root.join(INSTALL_LOG)
    }

    #[inline]
    pub fn supervisor_log(&self) -> PathBuf {
        self.root.join(SUPERVISOR_LOG)
    }

    #[inline]
    pub fn app_log(&self) -> PathBuf {
        self.root.join(APP_LOG)
    }

    /// Written and removed by the process supervisor, never by us.
    #[inline]
    pub fn pid_file(&self) -> PathBuf {
        self.root.join(PID_FILE)
    }

    #[inline]
    pub fn client_dir(&self) -> PathBuf {
        self.root.join("client")
    }

    #[inline]
    pub fn client_dist_dir(&self) -> PathBuf {
        self.client_dir().join("dist")
    }

    #[inline]
    pub fn server_dir(&self) -> PathBuf {
        self.root.join("server")
    }

    /// Sibling of the root (`<root>.lock`), so it outlives `uninstall`.
    pub fn lock_file(&self) -> PathBuf {
        match self.root.file_name() {
            Some(name) => {
                let mut lock = name.to_os_string();
                lock.push(INSTALL_LOCK_SUFFIX);
                self.root.with_file_name(lock)
            }
            None => self.root.join(format!("sonos-web{INSTALL_LOCK_SUFFIX}")),
        }
    }
}

/// Paths inside the installer's own configuration directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayout {
    dir: PathBuf,
}

impl ConfigLayout {
    /// A relative `dir` is anchored at the current directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: anchor(dir.into()),
        }
    }

    /// `$HOME/.config/sonos-web`, or a relative fallback when `HOME` is unset.
    pub fn default_dir() -> PathBuf {
        expand_tilde("~/.config/sonos-web")
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[inline]
    pub fn settings_file(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    #[inline]
    pub fn record_file(&self) -> PathBuf {
        self.dir.join(RECORD_FILE)
    }

    #[inline]
    pub fn lock_file(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }
}

pub fn default_install_dir() -> PathBuf {
    expand_tilde("~/.local/share/sonos-web")
}

/// Make `path` absolute against the current directory. The path is kept as given
/// only when that directory cannot be determined.
pub fn anchor(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    std::path::absolute(&path).unwrap_or(path)
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_layout_paths_are_correct() {
        let layout = InstallLayout::new("/opt/sonos-web");
        assert_eq!(
            layout.server_entry(),
            PathBuf::from("/opt/sonos-web/server.js")
        );
        assert_eq!(layout.env_file(), PathBuf::from("/opt/sonos-web/.env"));
        assert_eq!(
            layout.install_log(),
            PathBuf::from("/opt/sonos-web/install.log")
        );
        assert_eq!(
            layout.supervisor_log(),
            PathBuf::from("/opt/sonos-web/forever.log")
        );
        assert_eq!(
            layout.app_log(),
            PathBuf::from("/opt/sonos-web/sonos-web.log")
        );
        assert_eq!(
            layout.pid_file(),
            PathBuf::from("/opt/sonos-web/sonos-web.pid")
        );
        assert_eq!(
            layout.client_dist_dir(),
            PathBuf::from("/opt/sonos-web/client/dist")
        );
        assert_eq!(layout.server_dir(), PathBuf::from("/opt/sonos-web/server"));
    }

    #[test]
    fn config_layout_paths_are_correct() {
        let layout = ConfigLayout::new("/home/u/.config/sonos-web");
        assert_eq!(
            layout.settings_file(),
            PathBuf::from("/home/u/.config/sonos-web/config.toml")
        );
        assert_eq!(
            layout.record_file(),
            PathBuf::from("/home/u/.config/sonos-web/install.json")
        );
        assert_eq!(
            layout.lock_file(),
            PathBuf::from("/home/u/.config/sonos-web/lifecycle.lock")
        );
    }

    #[test]
    fn relative_roots_are_anchored_at_current_dir() {
        let cwd = std::env::current_dir().unwrap();
        let layout = InstallLayout::new("sw");
        assert!(layout.root().is_absolute());
        assert_eq!(layout.root(), cwd.join("sw"));
        assert_eq!(layout.server_entry(), cwd.join("sw/server.js"));
        assert_eq!(ConfigLayout::new("cfg").dir(), cwd.join("cfg"));
    }

    #[test]
    fn install_lock_sits_next_to_root() {
        let layout = InstallLayout::new("/opt/sonos-web");
        assert_eq!(layout.lock_file(), PathBuf::from("/opt/sonos-web.lock"));
    }

    #[test]
    fn expand_tilde_leaves_absolute_paths_alone() {
        assert_eq!(expand_tilde("/srv/app"), PathBuf::from("/srv/app"));
    }

    #[test]
    fn expand_tilde_uses_home() {
        if let Ok(home) = std::env::var("HOME") {
            assert_eq!(expand_tilde("~/x"), PathBuf::from(home).join("x"));
        }
    }

    #[test]
    fn default_install_dir_is_deterministic() {
        assert_eq!(default_install_dir(), default_install_dir());
        assert!(default_install_dir().ends_with("sonos-web"));
    }
}
