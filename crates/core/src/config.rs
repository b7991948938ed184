use serde::Deserialize;

use crate::error::MailportResult;

/// Shortest invitation token the issuer will hand out.
pub const MIN_TOKEN_LENGTH: usize = 40;

/// Root application configuration. Loaded from environment variables
/// with the prefix `MAILPORT__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub invitations: InvitationConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_from_email")]
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Base URL used to build invitation links.
    #[serde(default = "default_app_url")]
    pub app_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvitationConfig {
    #[serde(default = "default_token_length")]
    pub token_length: usize,
    #[serde(default = "default_role")]
    pub default_role: String,
    /// Delete the invitation again when the invitation email cannot be sent.
    #[serde(default = "default_rollback_on_mail_failure")]
    pub rollback_on_mail_failure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_workspace_name")]
    pub workspace_name: String,
    #[serde(default = "default_owner_email")]
    pub owner_email: String,
    #[serde(default = "default_owner_name")]
    pub owner_name: String,
    #[serde(default)]
    pub api_token: Option<String>,
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_from_email() -> String {
    "no-reply@mailport.local".to_string()
}
fn default_from_name() -> String {
    "Mailport".to_string()
}
fn default_app_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_token_length() -> usize {
    MIN_TOKEN_LENGTH
}
fn default_role() -> String {
    "member".to_string()
}
fn default_rollback_on_mail_failure() -> bool {
    true
}
fn default_workspace_name() -> String {
    "Default Workspace".to_string()
}
fn default_owner_email() -> String {
    "owner@mailport.local".to_string()
}
fn default_owner_name() -> String {
    "Workspace Owner".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_email: default_from_email(),
            from_name: default_from_name(),
            app_url: default_app_url(),
        }
    }
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            token_length: default_token_length(),
            default_role: default_role(),
            rollback_on_mail_failure: default_rollback_on_mail_failure(),
        }
    }
}

impl InvitationConfig {
    /// Configured length, never below [`MIN_TOKEN_LENGTH`].
    pub fn effective_token_length(&self) -> usize {
        self.token_length.max(MIN_TOKEN_LENGTH)
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            workspace_name: default_workspace_name(),
            owner_email: default_owner_email(),
            owner_name: default_owner_name(),
            api_token: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            mail: MailConfig::default(),
            invitations: InvitationConfig::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> MailportResult<Self> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("MAILPORT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api.http_port, 8080);
        assert_eq!(config.metrics.port, 9091);
        assert_eq!(config.invitations.default_role, "member");
        assert!(config.invitations.rollback_on_mail_failure);
        assert!(config.bootstrap.api_token.is_none());
    }

    #[test]
    fn test_token_length_has_floor() {
        let config = InvitationConfig {
            token_length: 12,
            ..InvitationConfig::default()
        };
        assert_eq!(config.effective_token_length(), MIN_TOKEN_LENGTH);

        let config = InvitationConfig {
            token_length: 64,
            ..InvitationConfig::default()
        };
        assert_eq!(config.effective_token_length(), 64);
    }

    #[test]
    fn test_deserialize_partial_sections() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "api": { "http_port": 3000 },
            "invitations": { "rollback_on_mail_failure": false }
        }))
        .unwrap();
        assert_eq!(config.api.http_port, 3000);
        assert_eq!(config.api.host, "0.0.0.0");
        assert!(!config.invitations.rollback_on_mail_failure);
        assert_eq!(config.invitations.token_length, 40);
    }
}
