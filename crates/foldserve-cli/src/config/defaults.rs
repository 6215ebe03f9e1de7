use super::models::BackendKind;

pub struct DefaultsConfig {
    pub data_dir: String,
    pub listen: String,
    pub model_name: String,
    pub device: String,
    pub backend: BackendKind,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub synthetic_recycles: usize,
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            listen: "127.0.0.1:8000".to_string(),
            model_name: "facebook/esmfold_v1".to_string(),
            device: "cuda".to_string(),
            backend: BackendKind::Remote,
            endpoint: "http://127.0.0.1:8500".to_string(),
            timeout_secs: 600,
            synthetic_recycles: 8,
            min_length: 10,
            max_length: 600,
        }
    }
}
