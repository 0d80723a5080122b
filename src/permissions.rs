// Role-based access to back-office sections

use crate::models::{keys, AccessRole, Section};
use crate::sync::SyncSession;
use std::collections::HashMap;
use std::sync::Arc;

pub type RoleAccess = HashMap<AccessRole, Vec<Section>>;

fn default_sections(role: AccessRole) -> Vec<Section> {
    match role {
        AccessRole::Admin => Section::all().to_vec(),
        AccessRole::Employee => vec![Section::Dashboard, Section::Payroll],
    }
}

/// Which sections each role may open. Overrides are persisted under the
/// `role_access` slice; roles without an override use the defaults.
pub struct AccessPolicy {
    session: Arc<SyncSession>,
}

impl AccessPolicy {
    pub fn new(session: Arc<SyncSession>) -> Self {
        Self { session }
    }

    /// Effective role/section table with defaults filled in
    pub async fn table(&self) -> RoleAccess {
        let stored: RoleAccess = self.session.load(keys::ROLE_ACCESS, HashMap::new()).await;
        let mut table = RoleAccess::new();
        for role in [AccessRole::Admin, AccessRole::Employee] {
            let sections = stored
                .get(&role)
                .cloned()
                .unwrap_or_else(|| default_sections(role));
            table.insert(role, sections);
        }
        table
    }

    pub async fn sections_for(&self, role: AccessRole) -> Vec<Section> {
        let stored: RoleAccess = self.session.load(keys::ROLE_ACCESS, HashMap::new()).await;
        stored
            .get(&role)
            .cloned()
            .unwrap_or_else(|| default_sections(role))
    }

    pub async fn allows(&self, role: AccessRole, section: Section) -> bool {
        self.sections_for(role).await.contains(&section)
    }

    pub async fn grant(&self, role: AccessRole, section: Section) {
        let mut sections = self.sections_for(role).await;
        if !sections.contains(&section) {
            sections.push(section);
        }
        self.store_override(role, sections).await;
        tracing::info!("{} role granted access to {}", role.as_str(), section.as_str());
    }

    pub async fn revoke(&self, role: AccessRole, section: Section) {
        let mut sections = self.sections_for(role).await;
        sections.retain(|s| *s != section);
        self.store_override(role, sections).await;
        tracing::info!("{} role access to {} revoked", role.as_str(), section.as_str());
    }

    async fn store_override(&self, role: AccessRole, sections: Vec<Section>) {
        let mut stored: RoleAccess = self.session.load(keys::ROLE_ACCESS, HashMap::new()).await;
        stored.insert(role, sections);
        self.session.save(keys::ROLE_ACCESS, &stored);
    }
}
