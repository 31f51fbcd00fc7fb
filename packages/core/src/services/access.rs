//! Workspace access checks
//!
//! The graph engine does not authenticate anyone. Callers pass the acting
//! user through `GraphService::with_actor` and the service asks an
//! [`AccessPolicy`] whether that user may read or change a workspace.

use crate::models::Workspace;

pub trait AccessPolicy: Send + Sync {
    fn can_view(&self, actor: &str, workspace: &Workspace) -> bool;

    fn can_edit(&self, actor: &str, workspace: &Workspace) -> bool;
}

/// The owner and listed editors may read and write; nobody else may do either
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerOrEditor;

impl AccessPolicy for OwnerOrEditor {
    fn can_view(&self, actor: &str, workspace: &Workspace) -> bool {
        self.can_edit(actor, workspace)
    }

    fn can_edit(&self, actor: &str, workspace: &Workspace) -> bool {
        workspace.owner_id == actor || workspace.editors.iter().any(|e| e == actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_and_editors_have_access() {
        let mut ws = Workspace::new("alice".to_string(), "Canvas".to_string());
        ws.editors.push("bob".to_string());

        let policy = OwnerOrEditor;
        assert!(policy.can_edit("alice", &ws));
        assert!(policy.can_edit("bob", &ws));
        assert!(policy.can_view("bob", &ws));
        assert!(!policy.can_view("mallory", &ws));
    }
}
