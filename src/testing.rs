//! A stand-in for the admix binary, shared by the unit tests and the CLI tests.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use tempfile::TempDir;

const FAKE_ADMIX: &str = include_str!("../tests/data/fake_admix.sh");
const DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data");

static FAKE: OnceLock<(TempDir, PathBuf)> = OnceLock::new();

/// Installs the script at `dir/admix`. The installed file is only ever opened for
/// writing by `cp`, which has exited by the time this returns, so no child forked by
/// another test thread can still hold a writable descriptor to it when it is executed.
fn install(dir: &Path) -> PathBuf {
    let staging = dir.join("admix.sh");
    std::fs::write(&staging, FAKE_ADMIX.replace("@DATA_DIR@", DATA_DIR)).unwrap();

    let path = dir.join("admix");
    let status = Command::new("cp").arg(&staging).arg(&path).status().unwrap();
    assert!(status.success(), "could not install the fake admix");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Path to the fake admix script, installed once per test binary.
pub fn fake_admix() -> PathBuf {
    FAKE.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        let path = install(dir.path());
        (dir, path)
    })
    .1
    .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installed_script_runs_right_away() {
        // spawn from several threads while the script is being installed
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let status = Command::new(fake_admix()).status().unwrap();
                    assert_eq!(status.code(), Some(2));
                });
                scope.spawn(|| Command::new("true").status().unwrap());
            }
        });
    }
}
