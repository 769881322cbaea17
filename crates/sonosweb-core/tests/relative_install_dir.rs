//! Relative installation directories.
//!
//! Changes the process working directory, so it lives in its own test binary.

use sonosweb_core::{Manager, NoProgress, Settings, UninstallOutcome};
use sonosweb_runtime::mock::MockToolchain;
use sonosweb_store::{ConfigLayout, InstallRecord, InstallState};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn manager(config_dir: &Path, install_dir_override: Option<PathBuf>) -> Manager {
    Manager::with_toolchain(
        ConfigLayout::new(config_dir),
        Settings::default(),
        install_dir_override,
        Box::new(MockToolchain::new()),
    )
}

#[test]
fn relative_install_dir_resolves_the_same_from_any_cwd() {
    let dir = tempfile::tempdir().unwrap();
    let first_cwd = dir.path().join("a");
    let second_cwd = dir.path().join("b");
    fs::create_dir_all(&first_cwd).unwrap();
    fs::create_dir_all(&second_cwd).unwrap();
    let config_dir = dir.path().join("config");

    env::set_current_dir(&first_cwd).unwrap();
    let expected = env::current_dir().unwrap().join("sw");
    let report = manager(&config_dir, Some(PathBuf::from("sw")))
        .install(&mut NoProgress)
        .unwrap();
    assert_eq!(report.install_dir, expected);

    let record = InstallRecord::load(&config_dir.join("install.json")).unwrap();
    assert!(record.install_dir.is_absolute());
    assert_eq!(record.install_dir, expected);

    env::set_current_dir(&second_cwd).unwrap();
    let m = manager(&config_dir, None);
    let status = m.status();
    assert_eq!(status.state, InstallState::Running);
    assert_eq!(status.install_dir, expected);

    let outcome = m.uninstall().unwrap();
    assert!(matches!(
        outcome,
        UninstallOutcome::Removed { install_dir, .. } if install_dir == expected
    ));
    assert!(!expected.exists());
    assert!(!second_cwd.join("sw").exists());

    env::set_current_dir(env::temp_dir()).unwrap();
}
