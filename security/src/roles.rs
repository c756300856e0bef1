// security/src/roles.rs
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use anyhow::{Context, Result};
use tracing::info;

use models::UserRole;

const SUPERUSER: &str = "superuser";
const BUNDLED_ROLES: &str = include_str!("../roles_permissions.yaml");

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RoleConfig {
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RolesConfig {
    pub roles: HashMap<String, RoleConfig>,
}

impl RolesConfig {
    /// The table shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_yaml_str(BUNDLED_ROLES).context("bundled roles_permissions.yaml is invalid")
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: RolesConfig = serde_yaml::from_str(content)?;
        for role in config.roles.keys() {
            role.parse::<UserRole>()
                .with_context(|| format!("unknown role '{}' in permission table", role))?;
        }
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&content)
    }

    /// Uses `path` when given, otherwise the bundled table.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                info!("Loading role permissions from {}", path.display());
                Self::from_yaml_file(path)
            }
            None => Self::bundled(),
        }
    }

    pub fn get_role_config(&self, role: UserRole) -> Option<&RoleConfig> {
        self.roles.get(role.as_str())
    }

    pub fn has_permission(&self, role: UserRole, permission_name: &str) -> bool {
        self.get_role_config(role).map_or(false, |role_cfg| {
            role_cfg
                .permissions
                .iter()
                .any(|p| p == permission_name || p == SUPERUSER)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_table_grants_by_role() {
        let roles = RolesConfig::bundled().unwrap();
        assert!(roles.has_permission(UserRole::Patient, "appointments:book"));
        assert!(!roles.has_permission(UserRole::Patient, "prescriptions:issue"));
        assert!(roles.has_permission(UserRole::Doctor, "prescriptions:issue"));
        assert!(!roles.has_permission(UserRole::Doctor, "analytics:read"));
    }

    #[test]
    fn superuser_grants_everything() {
        let roles = RolesConfig::bundled().unwrap();
        assert!(roles.has_permission(UserRole::Admin, "analytics:read"));
        assert!(roles.has_permission(UserRole::Admin, "anything:at_all"));
    }

    #[test]
    fn missing_role_has_no_permissions() {
        let roles = RolesConfig::from_yaml_str("roles:\n  admin:\n    permissions: [superuser]\n").unwrap();
        assert!(!roles.has_permission(UserRole::Patient, "appointments:book"));
    }

    #[test]
    fn unknown_role_names_are_rejected() {
        let err = RolesConfig::from_yaml_str("roles:\n  pharmacist:\n    permissions: []\n").unwrap_err();
        assert!(err.to_string().contains("pharmacist"));
    }
}
