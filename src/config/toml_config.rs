use crate::adapters::provisioning;
use crate::utils::error::{InvoiceError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_RELEASE_VERSION: &str = "0.1.0";
pub const DEFAULT_URL_TEMPLATE: &str = "https://github.com/maaslalani/invoice/releases/download/v{version}/invoice_{version}_{platform}_{arch}.tar.gz";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const MAX_TIMEOUT_SECONDS: u64 = 3600;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentConfig {
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    pub install_dir: Option<String>,
    pub binary_name: Option<String>,
    pub work_dir: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_url_template")]
    pub url_template: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub root: Option<String>,
    pub public_base_url: Option<String>,
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_true() -> bool {
    true
}

fn default_version() -> String {
    DEFAULT_RELEASE_VERSION.to_string()
}

fn default_url_template() -> String {
    DEFAULT_URL_TEMPLATE.to_string()
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            install_dir: None,
            binary_name: None,
            work_dir: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            version: default_version(),
            url_template: default_url_template(),
        }
    }
}

impl ComponentConfig {
    /// 只指定安裝目錄，其餘使用預設值
    pub fn with_install_dir(install_dir: impl AsRef<Path>) -> Self {
        let mut config = Self::default();
        config.renderer.install_dir = Some(install_dir.as_ref().to_string_lossy().into_owned());
        config
    }

    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(InvoiceError::Io)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| InvoiceError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${INVOICE_HOME})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern");

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        let install_dir = crate::utils::validation::validate_required_field(
            "renderer.install_dir",
            &self.renderer.install_dir,
        )?;
        crate::utils::validation::validate_path("renderer.install_dir", install_dir)?;

        if let Some(work_dir) = &self.renderer.work_dir {
            crate::utils::validation::validate_path("renderer.work_dir", work_dir)?;
        }
        if let Some(binary_name) = &self.renderer.binary_name {
            crate::utils::validation::validate_non_empty_string("renderer.binary_name", binary_name)?;
            if binary_name.contains(['/', '\\']) {
                return Err(InvoiceError::InvalidConfigValue {
                    field: "renderer.binary_name".to_string(),
                    value: binary_name.clone(),
                    reason: "Binary name must not contain path separators".to_string(),
                });
            }
        }

        crate::utils::validation::validate_range(
            "renderer.timeout_seconds",
            self.renderer.timeout_seconds,
            1,
            MAX_TIMEOUT_SECONDS,
        )?;

        if self.provisioning.enabled {
            crate::utils::validation::validate_non_empty_string(
                "provisioning.version",
                &self.provisioning.version,
            )?;
            // 以範例平台展開模板後再檢查 URL
            let sample = self
                .provisioning
                .url_template
                .replace("{version}", &self.provisioning.version)
                .replace("{platform}", "linux")
                .replace("{arch}", "amd64");
            crate::utils::validation::validate_url("provisioning.url_template", &sample)?;
        }

        if let Some(root) = &self.storage.root {
            crate::utils::validation::validate_path("storage.root", root)?;
        }
        if let Some(base_url) = &self.storage.public_base_url {
            crate::utils::validation::validate_url("storage.public_base_url", base_url)?;
        }

        Ok(())
    }

    pub fn install_dir(&self) -> Result<PathBuf> {
        crate::utils::validation::validate_required_field(
            "renderer.install_dir",
            &self.renderer.install_dir,
        )
        .map(PathBuf::from)
    }

    pub fn binary_file_name(&self) -> &str {
        self.renderer
            .binary_name
            .as_deref()
            .unwrap_or(provisioning::binary_name())
    }

    pub fn binary_path(&self) -> Result<PathBuf> {
        Ok(self.install_dir()?.join(self.binary_file_name()))
    }

    /// 產生的 PDF 暫存目錄，預設與安裝目錄相同
    pub fn work_dir(&self) -> Result<PathBuf> {
        match &self.renderer.work_dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => self.install_dir(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.renderer.timeout_seconds)
    }

    pub fn storage_root(&self) -> PathBuf {
        self.storage
            .root
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./invoice-storage"))
    }
}

impl Validate for ComponentConfig {
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
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[renderer]
install_dir = "./bin"
work_dir = "./work"
timeout_seconds = 10

[provisioning]
enabled = false
version = "0.2.0"

[storage]
root = "./store"
public_base_url = "https://cdn.example.com"
"#;

        let config = ComponentConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.install_dir().unwrap(), PathBuf::from("./bin"));
        assert_eq!(config.work_dir().unwrap(), PathBuf::from("./work"));
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(!config.provisioning.enabled);
        assert_eq!(config.provisioning.url_template, DEFAULT_URL_TEMPLATE);
        assert_eq!(config.storage_root(), PathBuf::from("./store"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = ComponentConfig::from_toml_str("[renderer]\ninstall_dir = \"/opt/invoice\"\n").unwrap();

        assert_eq!(config.renderer.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
        assert!(config.provisioning.enabled);
        assert_eq!(config.provisioning.version, DEFAULT_RELEASE_VERSION);
        assert_eq!(config.work_dir().unwrap(), PathBuf::from("/opt/invoice"));
        assert_eq!(
            config.binary_path().unwrap(),
            PathBuf::from("/opt/invoice").join(provisioning::binary_name())
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("INVOICE_TEST_INSTALL_DIR", "/srv/invoice");

        let toml_content = r#"
[renderer]
install_dir = "${INVOICE_TEST_INSTALL_DIR}"
work_dir = "${INVOICE_TEST_UNSET_DIR}"
"#;

        let config = ComponentConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.renderer.install_dir.as_deref(), Some("/srv/invoice"));
        assert_eq!(
            config.renderer.work_dir.as_deref(),
            Some("${INVOICE_TEST_UNSET_DIR}")
        );

        std::env::remove_var("INVOICE_TEST_INSTALL_DIR");
    }

    #[test]
    fn test_config_validation() {
        let missing_dir = ComponentConfig::from_toml_str("").unwrap();
        assert!(matches!(
            missing_dir.validate(),
            Err(InvoiceError::MissingConfig { .. })
        ));

        let zero_timeout = ComponentConfig::from_toml_str(
            "[renderer]\ninstall_dir = \"./bin\"\ntimeout_seconds = 0\n",
        )
        .unwrap();
        let err = zero_timeout.validate().unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidConfigValue { .. }));
        assert!(err.to_string().contains("renderer.timeout_seconds"));

        let huge_timeout = ComponentConfig::from_toml_str(
            "[renderer]\ninstall_dir = \"./bin\"\ntimeout_seconds = 86400\n",
        )
        .unwrap();
        assert!(huge_timeout.validate().is_err());

        let bad_url = ComponentConfig::from_toml_str(
            "[renderer]\ninstall_dir = \"./bin\"\n[provisioning]\nurl_template = \"ftp://x/{version}.tar.gz\"\n",
        )
        .unwrap();
        assert!(bad_url.validate().is_err());

        let bad_binary = ComponentConfig::from_toml_str(
            "[renderer]\ninstall_dir = \"./bin\"\nbinary_name = \"../invoice\"\n",
        )
        .unwrap();
        assert!(bad_binary.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let err = ComponentConfig::from_toml_str("[renderer\n").unwrap_err();
        assert!(matches!(err, InvoiceError::Config { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[renderer]\ninstall_dir = \"./from-file\"\n")
            .unwrap();

        let config = ComponentConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.install_dir().unwrap(), PathBuf::from("./from-file"));
    }
}
