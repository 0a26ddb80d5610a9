//! Application configuration for the CRM report generator.
//!
//! User config lives at `~/.crmreport/crmreport.toml`.
//! Environment variables override config file values, which override defaults.
//! CLI flags are applied last by the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "crmreport.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".crmreport";

// ---------------------------------------------------------------------------
// Config structs (matching crmreport.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Salesforce connection settings.
    #[serde(default)]
    pub salesforce: SalesforceConfig,

    /// Claude API settings.
    #[serde(default)]
    pub claude: ClaudeConfig,

    /// Where the PDF is written.
    #[serde(default)]
    pub output: OutputConfig,

    /// Static report labels.
    #[serde(default)]
    pub report: ReportLabels,
}

/// `[salesforce]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesforceConfig {
    /// Login host prefix: "login" for production, "test" for sandboxes.
    #[serde(default = "default_domain")]
    pub domain: String,

    /// REST/SOAP API version, without the leading `v`.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Borrow the session of an `sf` CLI login instead of using credentials.
    #[serde(default)]
    pub use_cli_session: bool,

    /// Org alias passed to `sf org display --target-org`.
    #[serde(default = "default_cli_target_org")]
    pub cli_target_org: String,

    /// Name of the env var holding the username (never store the value itself).
    #[serde(default = "default_username_env")]
    pub username_env: String,

    /// Name of the env var holding the password.
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// Name of the env var holding the security token.
    #[serde(default = "default_security_token_env")]
    pub security_token_env: String,
}

impl Default for SalesforceConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            api_version: default_api_version(),
            use_cli_session: false,
            cli_target_org: default_cli_target_org(),
            username_env: default_username_env(),
            password_env: default_password_env(),
            security_token_env: default_security_token_env(),
        }
    }
}

fn default_domain() -> String {
    "login".into()
}
fn default_api_version() -> String {
    "59.0".into()
}
fn default_cli_target_org() -> String {
    "FMCDev".into()
}
fn default_username_env() -> String {
    "SF_USERNAME".into()
}
fn default_password_env() -> String {
    "SF_PASSWORD".into()
}
fn default_security_token_env() -> String {
    "SF_SECURITY_TOKEN".into()
}

/// `[claude]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for every narrative section.
    #[serde(default = "default_model")]
    pub model: String,

    /// Completion token limit per section.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// API root, overridable for proxies and tests.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            base_url: default_base_url(),
        }
    }
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_base_url() -> String {
    "https://api.anthropic.com".into()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default = "default_report_filename")]
    pub report_filename: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            report_filename: default_report_filename(),
        }
    }
}

impl OutputConfig {
    /// Full path to the output report.
    pub fn report_path(&self) -> PathBuf {
        Path::new(&self.output_dir).join(&self.report_filename)
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_report_filename() -> String {
    "crm_summary_report.pdf".into()
}

/// `[report]` section: fixed labels printed on the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportLabels {
    /// Cover page title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Cover page subtitle.
    #[serde(default = "default_subtitle")]
    pub subtitle: String,

    /// Attribution label at the bottom of the cover page.
    #[serde(default = "default_attribution")]
    pub attribution: String,

    /// Text before the page number in every footer.
    #[serde(default = "default_footer_label")]
    pub footer_label: String,
}

impl Default for ReportLabels {
    fn default() -> Self {
        Self {
            title: default_title(),
            subtitle: default_subtitle(),
            attribution: default_attribution(),
            footer_label: default_footer_label(),
        }
    }
}

fn default_title() -> String {
    "Force Multiply".into()
}
fn default_subtitle() -> String {
    "CRM Intelligence Report".into()
}
fn default_attribution() -> String {
    "AI-Powered Analysis by Claude".into()
}
fn default_footer_label() -> String {
    "Force Multiply CRM Report".into()
}

// ---------------------------------------------------------------------------
// Environment overrides
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        if let Some(domain) = lookup("SF_DOMAIN") {
            self.salesforce.domain = domain;
        }
        if let Some(flag) = lookup("SF_USE_CLI_SESSION") {
            self.salesforce.use_cli_session = flag.eq_ignore_ascii_case("true");
        }
        if let Some(org) = lookup("SF_CLI_TARGET_ORG") {
            self.salesforce.cli_target_org = org;
        }
        if let Some(model) = lookup("CLAUDE_MODEL") {
            self.claude.model = model;
        }
        if let Some(raw) = lookup("CLAUDE_MAX_TOKENS") {
            self.claude.max_tokens = raw.trim().parse().map_err(|_| {
                ReportError::config(format!("CLAUDE_MAX_TOKENS must be a positive integer, got '{raw}'"))
            })?;
        }
        if let Some(dir) = lookup("OUTPUT_DIR") {
            self.output.output_dir = dir;
        }
        if let Some(file) = lookup("REPORT_FILENAME") {
            self.output.report_filename = file;
        }
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Resolved secrets
// ---------------------------------------------------------------------------

/// Claude settings with the API key read from the environment.
#[derive(Clone)]
pub struct ClaudeSettings {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub base_url: String,
}

impl std::fmt::Debug for ClaudeSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Read the Claude API key named by the config. Fails if unset or empty.
pub fn resolve_claude(config: &AppConfig) -> Result<ClaudeSettings> {
    resolve_claude_from(config, |name| std::env::var(name).ok())
}

/// [`resolve_claude`] with an injectable variable lookup.
pub fn resolve_claude_from(
    config: &AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ClaudeSettings> {
    let var_name = &config.claude.api_key_env;
    match lookup(var_name) {
        Some(key) if !key.trim().is_empty() => Ok(ClaudeSettings {
            api_key: key,
            model: config.claude.model.clone(),
            max_tokens: config.claude.max_tokens,
            base_url: config.claude.base_url.clone(),
        }),
        _ => Err(ReportError::config(format!(
            "{var_name} environment variable is required"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.crmreport/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ReportError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.crmreport/crmreport.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ReportError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ReportError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| ReportError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ReportError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
