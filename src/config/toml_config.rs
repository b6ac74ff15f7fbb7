use crate::core::range::DEFAULT_COURSE_NAME_TEMPLATE;
use crate::core::ConfigProvider;
use crate::utils::error::{ProvisionError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
const MAX_TIMEOUT_SECONDS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub course_name_template: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// "compact" (預設) 或 "json"
    pub format: Option<String>,
}

impl ProvisionConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ProvisionError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ProvisionError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SCHOOL_API_TOKEN})，找不到的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ProvisionError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.api.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }

    /// 未設定或環境變數沒有解析成功時視為沒有 token
    pub fn bearer_token(&self) -> Option<&str> {
        self.api
            .auth_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && !(t.starts_with("${") && t.ends_with('}')))
    }

    pub fn template(&self) -> &str {
        self.catalog
            .course_name_template
            .as_deref()
            .unwrap_or(DEFAULT_COURSE_NAME_TEMPLATE)
    }

    /// 未設定或無法辨識時使用精簡格式；`validate` 會回報無法辨識的值
    pub fn log_format(&self) -> LogFormat {
        self.logging
            .format
            .as_deref()
            .and_then(LogFormat::parse)
            .unwrap_or_default()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("api.base_url", &self.api.base_url)?;

        if let Some(timeout) = self.api.timeout_seconds {
            validation::validate_range("api.timeout_seconds", timeout, 1, MAX_TIMEOUT_SECONDS)?;
        }

        if let Some(template) = &self.catalog.course_name_template {
            validation::validate_non_empty_string("catalog.course_name_template", template)?;
        }

        if let Some(format) = &self.logging.format {
            if LogFormat::parse(format).is_none() {
                return Err(ProvisionError::InvalidConfigValueError {
                    field: "logging.format".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        LogFormat::NAMES.join(", ")
                    ),
                });
            }
        }

        Ok(())
    }
}

impl ConfigProvider for ProvisionConfig {
    fn api_base_url(&self) -> &str {
        &self.api.base_url
    }

    fn request_timeout_seconds(&self) -> u64 {
        self.timeout_seconds()
    }

    fn auth_token(&self) -> Option<&str> {
        self.bearer_token()
    }

    fn course_name_template(&self) -> &str {
        self.template()
    }
}

impl Validate for ProvisionConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_minimal_config() {
        let config = ProvisionConfig::from_toml_str(
            r#"
[api]
base_url = "https://school.example.com/api"
"#,
        )
        .unwrap();

        assert_eq!(config.api_base_url(), "https://school.example.com/api");
        assert_eq!(config.request_timeout_seconds(), 10);
        assert_eq!(config.auth_token(), None);
        assert_eq!(config.course_name_template(), "Grade {grade} {section}");
        assert_eq!(config.log_format(), LogFormat::Compact);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PROVISION_TEST_TOKEN", "abc123");

        let config = ProvisionConfig::from_toml_str(
            r#"
[api]
base_url = "https://school.example.com/api"
auth_token = "${PROVISION_TEST_TOKEN}"
"#,
        )
        .unwrap();
        assert_eq!(config.auth_token(), Some("abc123"));

        std::env::remove_var("PROVISION_TEST_TOKEN");
    }

    #[test]
    fn test_unresolved_token_is_ignored() {
        let config = ProvisionConfig::from_toml_str(
            r#"
[api]
base_url = "https://school.example.com/api"
auth_token = "${PROVISION_TEST_SURELY_UNSET}"
"#,
        )
        .unwrap();
        assert_eq!(config.auth_token(), None);
    }

    #[test]
    fn test_config_validation() {
        let config = ProvisionConfig::from_toml_str(
            r#"
[api]
base_url = "ftp://school.example.com"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = ProvisionConfig::from_toml_str(
            r#"
[api]
base_url = "https://school.example.com"
timeout_seconds = 0
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = ProvisionConfig::from_toml_str(
            r#"
[api]
base_url = "https://school.example.com"
timeout_seconds = 3600
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = ProvisionConfig::from_toml_str(
            r#"
[api]
base_url = "https://school.example.com"

[logging]
format = "xml"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ProvisionError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_missing_api_section_fails_to_parse() {
        let err = ProvisionConfig::from_toml_str("[catalog]\n").unwrap_err();
        assert!(matches!(err, ProvisionError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(
                br#"
[api]
base_url = "http://localhost:8080/api"
timeout_seconds = 3

[catalog]
course_name_template = "{grade}-{section}"

[logging]
format = "json"
"#,
            )
            .unwrap();

        let config = ProvisionConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.request_timeout_seconds(), 3);
        assert_eq!(config.course_name_template(), "{grade}-{section}");
        assert_eq!(config.log_format(), LogFormat::Json);
    }
}
