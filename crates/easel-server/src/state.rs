//! Shared server state and environment configuration.

use dashmap::DashMap;
use easel_core::design::{DesignRecord, TemplateRecord};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DEFAULT_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 3030);
const DEFAULT_UPLOAD_DIR: &str = "./uploads";

/// Settings read from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub upload_dir: PathBuf,
    /// Optional JSON file holding an array of templates to serve.
    pub templates_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(DEFAULT_ADDR),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            templates_file: None,
        }
    }
}

impl ServerConfig {
    /// `EASEL_ADDR`, `EASEL_UPLOAD_DIR` and `EASEL_TEMPLATES`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("EASEL_ADDR") {
            match addr.parse() {
                Ok(parsed) => config.addr = parsed,
                Err(e) => warn!("Ignoring EASEL_ADDR {addr:?}: {e}"),
            }
        }
        if let Ok(dir) = std::env::var("EASEL_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        config.templates_file = std::env::var_os("EASEL_TEMPLATES").map(PathBuf::from);
        config
    }
}

/// Shared application state
pub struct AppState {
    /// Designs by id
    pub designs: DashMap<String, DesignRecord>,
    /// Templates by id
    pub templates: DashMap<String, TemplateRecord>,
    /// Root folder for uploaded files, served under `/uploads`
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            designs: DashMap::new(),
            templates: DashMap::new(),
            upload_dir: upload_dir.into(),
        }
    }

    pub fn with_templates(self, templates: impl IntoIterator<Item = TemplateRecord>) -> Self {
        for template in templates {
            self.templates.insert(template.id.clone(), template);
        }
        self
    }

    /// A design owned by `owner`. Other owners' designs read as missing.
    pub fn owned_design(&self, id: &str, owner: &str) -> Option<DesignRecord> {
        self.designs
            .get(id)
            .filter(|design| design.owner_id == owner)
            .map(|design| design.clone())
    }
}

/// Read a template seed file. Problems are logged and yield no templates.
pub fn load_templates(path: &Path) -> Vec<TemplateRecord> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("Could not read templates from {}: {e}", path.display());
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<TemplateRecord>>(&text) {
        Ok(templates) => {
            info!("Loaded {} templates from {}", templates.len(), path.display());
            templates
        }
        Err(e) => {
            warn!("Invalid templates file {}: {e}", path.display());
            Vec::new()
        }
    }
}
