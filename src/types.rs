use crate::{config::Config, staging::ScriptStager};

#[derive(Debug, Clone)]
pub struct AppState {
    pub version: String,
    pub stager: ScriptStager,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        AppState {
            version: config.version.clone(),
            stager: ScriptStager::new(config.staging_path.clone(), config.package_dir.clone()),
        }
    }
}
