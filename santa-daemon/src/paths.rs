use std::path::{Path, PathBuf};

use santa_core::store;

pub const DAEMON_SOCKET: &str = "santa.sock";
pub const TEMPLATES_DIR: &str = "templates";

pub fn santa_root(home: &Path) -> PathBuf {
    store::santa_root_at(home)
}

pub fn socket_path(home: &Path) -> PathBuf {
    santa_root(home).join(DAEMON_SOCKET)
}

/// User reply overrides; `.tera` files here replace the embedded templates.
pub fn templates_dir(home: &Path) -> PathBuf {
    santa_root(home).join(TEMPLATES_DIR)
}

pub fn snapshot_path(home: &Path) -> PathBuf {
    store::snapshot_path_at(home)
}

pub fn seed_path(home: &Path) -> PathBuf {
    store::seed_path_at(home)
}
