use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(super) struct FromEnv {
    pub(super) address_file: Option<PathBuf>,
    pub(super) connect_timeout_ms: Option<u64>,
    pub(super) tcp_nodelay: Option<bool>,
}
