//! Selection derivation.
//!
//! The currently displayed client/project/requester are never stored as
//! references - only their ids are kept, and the entities are re-derived
//! from the authoritative client list on every access. When the underlying
//! entity is deleted the derived value becomes `None` on the next lookup.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Client, Project, Requester};

/// Ids of the currently displayed client and project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl Selection {
    /// Selects a client, dropping any project selection
    pub fn select_client(&mut self, client_id: Uuid) {
        self.client_id = Some(client_id);
        self.project_id = None;
    }

    /// Selects a project under the currently selected client
    pub fn select_project(&mut self, project_id: String) {
        self.project_id = Some(project_id);
    }

    /// Clears both selections
    pub fn clear(&mut self) {
        self.client_id = None;
        self.project_id = None;
    }
}

/// The client the selection points at, or `None` if it no longer exists
pub fn selected_client<'a>(clients: &'a [Client], selection: &Selection) -> Option<&'a Client> {
    let id = selection.client_id?;
    clients.iter().find(|c| c.id == id)
}

/// The project the selection points at, searched under the selected
/// client's requesters; `None` if either id dangles
pub fn selected_project<'a>(clients: &'a [Client], selection: &Selection) -> Option<&'a Project> {
    let client = selected_client(clients, selection)?;
    let project_id = selection.project_id.as_deref()?;
    client
        .requesters
        .iter()
        .flat_map(|r| r.projects.iter())
        .find(|p| p.id == project_id)
}

/// The requester under the selected client whose projects contain the
/// selected project
pub fn selected_requester<'a>(
    clients: &'a [Client],
    selection: &Selection,
) -> Option<&'a Requester> {
    let client = selected_client(clients, selection)?;
    let project_id = selection.project_id.as_deref()?;
    client
        .requesters
        .iter()
        .find(|r| r.projects.iter().any(|p| p.id == project_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutate::{delete_client, delete_project};

    fn seed() -> (Vec<Client>, Selection) {
        let mut client = Client::new("Acme".into());
        let mut requester = Requester::new("Jane".into());
        requester.projects.push(Project::new("Q-1".into(), "Assay A".into()));
        client.requesters.push(requester);

        let mut selection = Selection::default();
        selection.select_client(client.id);
        selection.select_project("Q-1".into());

        (vec![client], selection)
    }

    #[test]
    fn test_selection_resolves_all_three() {
        let (clients, selection) = seed();

        assert_eq!(selected_client(&clients, &selection).map(|c| c.name.as_str()), Some("Acme"));
        assert_eq!(
            selected_project(&clients, &selection).map(|p| p.id.as_str()),
            Some("Q-1")
        );
        assert_eq!(
            selected_requester(&clients, &selection).map(|r| r.name.as_str()),
            Some("Jane")
        );
    }

    #[test]
    fn test_selection_self_heals_after_project_delete() {
        let (clients, selection) = seed();
        let client_id = clients[0].id;

        let clients = delete_project(&clients, client_id, "Q-1").unwrap();

        assert!(selected_project(&clients, &selection).is_none());
        assert!(selected_requester(&clients, &selection).is_none());
        // The client itself is still there
        assert!(selected_client(&clients, &selection).is_some());
    }

    #[test]
    fn test_selection_self_heals_after_client_delete() {
        let (clients, selection) = seed();

        let clients = delete_client(&clients, clients[0].id);

        assert!(selected_client(&clients, &selection).is_none());
        assert!(selected_project(&clients, &selection).is_none());
        assert!(selected_requester(&clients, &selection).is_none());
    }

    #[test]
    fn test_select_client_drops_project_selection() {
        let (_, mut selection) = seed();

        selection.select_client(Uuid::new_v4());

        assert!(selection.project_id.is_none());
    }

    #[test]
    fn test_empty_selection_resolves_to_none() {
        let (clients, _) = seed();
        let selection = Selection::default();

        assert!(selected_client(&clients, &selection).is_none());
        assert!(selected_project(&clients, &selection).is_none());
    }
}
