//! First-run seeding: one workspace, its owner and an API token.

use chrono::Utc;
use mailport_core::config::BootstrapConfig;
use mailport_core::token::random_token;
use mailport_core::MailportResult;
use tracing::info;
use uuid::Uuid;

use crate::models::{ApiToken, User, Workspace};
use crate::store::AudienceRepository;

const API_TOKEN_LENGTH: usize = 60;

pub struct Bootstrap {
    pub workspace: Workspace,
    pub owner: User,
    pub api_token: String,
}

pub fn bootstrap_workspace(
    repo: &dyn AudienceRepository,
    config: &BootstrapConfig,
) -> MailportResult<Bootstrap> {
    let now = Utc::now();
    let owner = match repo.find_user_by_email(&config.owner_email)? {
        Some(user) => user,
        None => repo.insert_user(User {
            id: Uuid::new_v4(),
            name: config.owner_name.clone(),
            email: config.owner_email.clone(),
            created_at: now,
        })?,
    };
    let workspace = repo.insert_workspace(Workspace {
        id: Uuid::new_v4(),
        name: config.workspace_name.clone(),
        owner_id: owner.id,
        created_at: now,
        updated_at: now,
    })?;

    let api_token = config
        .api_token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| random_token(API_TOKEN_LENGTH));
    repo.insert_api_token(ApiToken {
        token: api_token.clone(),
        workspace_id: workspace.id,
        user_id: owner.id,
        created_at: now,
    })?;

    info!(
        workspace_id = %workspace.id,
        workspace = %workspace.name,
        owner = %owner.email,
        "Workspace bootstrapped"
    );
    Ok(Bootstrap {
        workspace,
        owner,
        api_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ManagementStore;

    #[test]
    fn test_bootstrap_registers_token() {
        let store = ManagementStore::new();
        let boot = bootstrap_workspace(&store, &BootstrapConfig::default()).unwrap();

        let token = store.find_api_token(&boot.api_token).unwrap().unwrap();
        assert_eq!(token.workspace_id, boot.workspace.id);
        assert_eq!(token.user_id, boot.owner.id);
        assert_eq!(boot.api_token.len(), API_TOKEN_LENGTH);
        assert!(store.get_workspace(boot.workspace.id).unwrap().is_some());
    }

    #[test]
    fn test_configured_token_is_used() {
        let store = ManagementStore::new();
        let config = BootstrapConfig {
            api_token: Some("dev-token".into()),
            ..BootstrapConfig::default()
        };
        let boot = bootstrap_workspace(&store, &config).unwrap();
        assert_eq!(boot.api_token, "dev-token");
        assert!(store.find_api_token("dev-token").unwrap().is_some());
    }
}
