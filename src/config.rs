use std::fs;
use std::path::Path;
use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_REST_URL: &str = "https://bchn.fullstack.cash/v5/";

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    #[serde(default = "default_network")]
    pub network: String, // "bitcoin", "testnet", "regtest"
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub fee: FeePolicy,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FeePolicy {
    pub satoshis_per_byte: f64,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub overhead_bytes: u64,
}

impl Default for FeePolicy {
    fn default() -> Self {
        FeePolicy {
            satoshis_per_byte: 1.2,
            input_bytes: 148,
            output_bytes: 34,
            overhead_bytes: 10,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            network: default_network(),
            rest_url: default_rest_url(),
            api_token: None,
            fee: FeePolicy::default(),
        }
    }
}

fn default_network() -> String {
    "bitcoin".to_string()
}

fn default_rest_url() -> String {
    DEFAULT_REST_URL.to_string()
}

impl ServiceConfig {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).map_err(|e| {
            log::error!("設定ファイルの読み込みに失敗しました: {:?}", path);
            AppError::Io(e)
        })?;
        let config: ServiceConfig = serde_json::from_str(&content).map_err(|e| {
            log::error!("設定ファイルのパースに失敗しました。");
            AppError::JsonParse {
                file_path: path.to_path_buf(),
                source: e,
            }
        })?;
        log::debug!("設定ファイルのパース成功: {:?}", config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: ServiceConfig = serde_json::from_str(
            r#"{ "network": "testnet", "fee": { "satoshisPerByte": 2.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.network, "testnet");
        assert_eq!(config.rest_url, DEFAULT_REST_URL);
        assert!(config.api_token.is_none());
        assert_eq!(config.fee.satoshis_per_byte, 2.0);
        assert_eq!(config.fee.input_bytes, 148);
        assert_eq!(config.fee.output_bytes, 34);
        assert_eq!(config.fee.overhead_bytes, 10);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ServiceConfig::load(Path::new("/nonexistent/sender-config.json")).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn invalid_json_reports_file_path() {
        let path = std::env::temp_dir().join(format!("bch-sender-config-{}.json", std::process::id()));
        fs::write(&path, "{ not json").unwrap();
        let err = ServiceConfig::load(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        match err {
            AppError::JsonParse { file_path, .. } => assert_eq!(file_path, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
