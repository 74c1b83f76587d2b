//! Pure mutation functions over the client list.
//!
//! Every operation takes the full list of clients and returns a fresh list
//! with exactly one targeted change applied; the input is never mutated in
//! place, so a reader holding the old list always sees a consistent value
//! and replacement stays atomic at the assignment level.
//!
//! Lookup misses are reported through `MutateError` instead of silently
//! returning the input, so callers decide whether to surface them or treat
//! them as a no-op.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    stages_from_template, Client, ContactMethod, FollowUpRecord, FollowUpResult, LabTest, Project,
    Requester, StageStatus,
};

/// Error type for mutation operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MutateError {
    #[error("Client not found: {0}")]
    ClientNotFound(Uuid),

    #[error("Requester not found: {0}")]
    RequesterNotFound(Uuid),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Stage not found: {0}")]
    StageNotFound(Uuid),

    #[error("Test not found: {0}")]
    TestNotFound(Uuid),

    #[error("Follow-up record not found: {0}")]
    FollowUpNotFound(Uuid),

    #[error("Client has no requesters - add a requester first")]
    NoRequesters,

    #[error("A project with quote number '{0}' already exists")]
    DuplicateProjectId(String),
}

/// Editable fields of a client
#[derive(Debug, Clone)]
pub struct ClientEdit {
    pub name: String,
    pub business_no: Option<String>,
    pub industry: Option<String>,
    pub address: Option<String>,
    pub memo: Option<String>,
}

/// Editable fields of a requester
#[derive(Debug, Clone)]
pub struct RequesterEdit {
    pub name: String,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Fields supplied when creating a project
#[derive(Debug, Clone)]
pub struct NewProject {
    /// User-supplied quote number
    pub id: String,
    pub project_no: Option<String>,
    pub test_item: String,
    pub quote_date: Option<NaiveDate>,
    pub quoted_amount: i64,
    pub contracted_amount: i64,
    pub status_text: String,
}

impl NewProject {
    pub(crate) fn into_project(self) -> Project {
        Project {
            id: self.id,
            project_no: self.project_no,
            test_item: self.test_item,
            quote_date: self.quote_date,
            quoted_amount: self.quoted_amount,
            contracted_amount: self.contracted_amount,
            status_text: self.status_text,
            stages: stages_from_template(),
            tests: Vec::new(),
            follow_ups: Vec::new(),
        }
    }
}

/// Editable fields of a project; stages, tests and follow-ups are untouched
pub type ProjectEdit = NewProject;

/// Editable fields of a stage; the name and position never change
#[derive(Debug, Clone)]
pub struct StageEdit {
    pub status: StageStatus,
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Editable fields of a lab test
#[derive(Debug, Clone)]
pub struct TestEdit {
    pub test_no: String,
    pub name: String,
    pub manager: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Editable fields of a follow-up record
#[derive(Debug, Clone)]
pub struct FollowUpEdit {
    pub date: NaiveDate,
    pub method: ContactMethod,
    pub person: String,
    pub content: String,
    pub result: FollowUpResult,
    pub next_action: Option<String>,
    pub next_action_date: Option<NaiveDate>,
}

/// Finds a project anywhere in the list by quote number
pub fn find_project<'a>(clients: &'a [Client], project_id: &str) -> Option<&'a Project> {
    clients
        .iter()
        .flat_map(|c| c.requesters.iter())
        .flat_map(|r| r.projects.iter())
        .find(|p| p.id == project_id)
}

/// Finds the requester that owns the given project, anywhere in the list
pub fn owning_requester_id(clients: &[Client], project_id: &str) -> Option<Uuid> {
    clients
        .iter()
        .flat_map(|c| c.requesters.iter())
        .find(|r| r.projects.iter().any(|p| p.id == project_id))
        .map(|r| r.id)
}

fn project_id_taken(clients: &[Client], project_id: &str) -> bool {
    find_project(clients, project_id).is_some()
}

/// Appends a new client to the list
pub fn add_client(clients: &[Client], client: Client) -> Vec<Client> {
    let mut updated: Vec<Client> = clients.to_vec();
    updated.push(client);
    updated
}

/// Replaces the editable fields of a client, leaving its requesters unchanged
pub fn edit_client(
    clients: &[Client],
    client_id: Uuid,
    edit: ClientEdit,
) -> Result<Vec<Client>, MutateError> {
    if !clients.iter().any(|c| c.id == client_id) {
        return Err(MutateError::ClientNotFound(client_id));
    }

    Ok(clients
        .iter()
        .map(|c| {
            if c.id == client_id {
                Client {
                    id: c.id,
                    name: edit.name.clone(),
                    business_no: edit.business_no.clone(),
                    industry: edit.industry.clone(),
                    address: edit.address.clone(),
                    memo: edit.memo.clone(),
                    requesters: c.requesters.clone(),
                }
            } else {
                c.clone()
            }
        })
        .collect())
}

/// Removes a client and everything under it.
///
/// Deleting an id that does not exist returns a list structurally equal to
/// the input - delete is idempotent at the top level.
pub fn delete_client(clients: &[Client], client_id: Uuid) -> Vec<Client> {
    clients.iter().filter(|c| c.id != client_id).cloned().collect()
}

/// Appends a requester under the given client
pub fn add_requester(
    clients: &[Client],
    client_id: Uuid,
    requester: Requester,
) -> Result<Vec<Client>, MutateError> {
    if !clients.iter().any(|c| c.id == client_id) {
        return Err(MutateError::ClientNotFound(client_id));
    }

    Ok(clients
        .iter()
        .map(|c| {
            if c.id == client_id {
                let mut updated = c.clone();
                updated.requesters.push(requester.clone());
                updated
            } else {
                c.clone()
            }
        })
        .collect())
}

/// Replaces the editable fields of a requester, leaving its projects unchanged
pub fn edit_requester(
    clients: &[Client],
    client_id: Uuid,
    requester_id: Uuid,
    edit: RequesterEdit,
) -> Result<Vec<Client>, MutateError> {
    let client = clients
        .iter()
        .find(|c| c.id == client_id)
        .ok_or(MutateError::ClientNotFound(client_id))?;
    if !client.requesters.iter().any(|r| r.id == requester_id) {
        return Err(MutateError::RequesterNotFound(requester_id));
    }

    Ok(clients
        .iter()
        .map(|c| {
            if c.id != client_id {
                return c.clone();
            }
            let mut updated = c.clone();
            for r in &mut updated.requesters {
                if r.id == requester_id {
                    r.name = edit.name.clone();
                    r.department = edit.department.clone();
                    r.phone = edit.phone.clone();
                    r.email = edit.email.clone();
                }
            }
            updated
        })
        .collect())
}

/// Removes a requester and all of its projects from the client
pub fn delete_requester(
    clients: &[Client],
    client_id: Uuid,
    requester_id: Uuid,
) -> Result<Vec<Client>, MutateError> {
    let client = clients
        .iter()
        .find(|c| c.id == client_id)
        .ok_or(MutateError::ClientNotFound(client_id))?;
    if !client.requesters.iter().any(|r| r.id == requester_id) {
        return Err(MutateError::RequesterNotFound(requester_id));
    }

    Ok(clients
        .iter()
        .map(|c| {
            if c.id != client_id {
                return c.clone();
            }
            let mut updated = c.clone();
            updated.requesters.retain(|r| r.id != requester_id);
            updated
        })
        .collect())
}

/// Creates a project under the given requester, instantiating the fixed
/// stage template with fresh stage ids.
///
/// The target client must already have at least one requester, and the
/// quote number must be unused anywhere in the book.
pub fn add_project(
    clients: &[Client],
    client_id: Uuid,
    requester_id: Uuid,
    data: NewProject,
) -> Result<Vec<Client>, MutateError> {
    let client = clients
        .iter()
        .find(|c| c.id == client_id)
        .ok_or(MutateError::ClientNotFound(client_id))?;
    if client.requesters.is_empty() {
        return Err(MutateError::NoRequesters);
    }
    if !client.requesters.iter().any(|r| r.id == requester_id) {
        return Err(MutateError::RequesterNotFound(requester_id));
    }
    if project_id_taken(clients, &data.id) {
        return Err(MutateError::DuplicateProjectId(data.id));
    }

    let project = data.into_project();
    Ok(clients
        .iter()
        .map(|c| {
            if c.id != client_id {
                return c.clone();
            }
            let mut updated = c.clone();
            for r in &mut updated.requesters {
                if r.id == requester_id {
                    r.projects.push(project.clone());
                }
            }
            updated
        })
        .collect())
}

/// Replaces only the editable fields of a project, preserving its stages,
/// tests and follow-ups.
///
/// Changing the quote number is allowed but the new number must be unused.
pub fn edit_project(
    clients: &[Client],
    project_id: &str,
    edit: ProjectEdit,
) -> Result<Vec<Client>, MutateError> {
    if find_project(clients, project_id).is_none() {
        return Err(MutateError::ProjectNotFound(project_id.to_string()));
    }
    if edit.id != project_id && project_id_taken(clients, &edit.id) {
        return Err(MutateError::DuplicateProjectId(edit.id));
    }

    Ok(clients
        .iter()
        .map(|c| {
            let mut updated = c.clone();
            for r in &mut updated.requesters {
                for p in &mut r.projects {
                    if p.id == project_id {
                        p.id = edit.id.clone();
                        p.project_no = edit.project_no.clone();
                        p.test_item = edit.test_item.clone();
                        p.quote_date = edit.quote_date;
                        p.quoted_amount = edit.quoted_amount;
                        p.contracted_amount = edit.contracted_amount;
                        p.status_text = edit.status_text.clone();
                    }
                }
            }
            updated
        })
        .collect())
}

/// Wholesale replace of a project under a specific requester.
///
/// Every stage/test/follow-up sub-mutation funnels through here after the
/// caller derives the owning requester and computes the new project value.
pub fn update_project(
    clients: &[Client],
    requester_id: Uuid,
    updated_project: Project,
) -> Result<Vec<Client>, MutateError> {
    let requester = clients
        .iter()
        .flat_map(|c| c.requesters.iter())
        .find(|r| r.id == requester_id)
        .ok_or(MutateError::RequesterNotFound(requester_id))?;
    if !requester.projects.iter().any(|p| p.id == updated_project.id) {
        return Err(MutateError::ProjectNotFound(updated_project.id));
    }

    Ok(clients
        .iter()
        .map(|c| {
            let mut updated = c.clone();
            for r in &mut updated.requesters {
                if r.id == requester_id {
                    for p in &mut r.projects {
                        if p.id == updated_project.id {
                            *p = updated_project.clone();
                        }
                    }
                }
            }
            updated
        })
        .collect())
}

/// Removes a project from every requester under the client.
///
/// Filtering all requesters rather than only the expected owner keeps the
/// delete correct even if the project sits under an unexpected requester.
pub fn delete_project(
    clients: &[Client],
    client_id: Uuid,
    project_id: &str,
) -> Result<Vec<Client>, MutateError> {
    let client = clients
        .iter()
        .find(|c| c.id == client_id)
        .ok_or(MutateError::ClientNotFound(client_id))?;
    let present = client
        .requesters
        .iter()
        .any(|r| r.projects.iter().any(|p| p.id == project_id));
    if !present {
        return Err(MutateError::ProjectNotFound(project_id.to_string()));
    }

    Ok(clients
        .iter()
        .map(|c| {
            if c.id != client_id {
                return c.clone();
            }
            let mut updated = c.clone();
            for r in &mut updated.requesters {
                r.projects.retain(|p| p.id != project_id);
            }
            updated
        })
        .collect())
}

/// Derives the owning requester and a working copy of a project, for the
/// stage/test/follow-up sub-mutations.
fn derive_project(clients: &[Client], project_id: &str) -> Result<(Uuid, Project), MutateError> {
    let requester_id = owning_requester_id(clients, project_id)
        .ok_or_else(|| MutateError::ProjectNotFound(project_id.to_string()))?;
    let project = find_project(clients, project_id)
        .cloned()
        .ok_or_else(|| MutateError::ProjectNotFound(project_id.to_string()))?;
    Ok((requester_id, project))
}

/// Advances a stage one step along the Pending -> In Progress -> Completed
/// cycle; never produces On Hold.
pub fn advance_stage(
    clients: &[Client],
    project_id: &str,
    stage_id: Uuid,
) -> Result<Vec<Client>, MutateError> {
    let (requester_id, mut project) = derive_project(clients, project_id)?;
    let stage = project
        .stages
        .iter_mut()
        .find(|s| s.id == stage_id)
        .ok_or(MutateError::StageNotFound(stage_id))?;
    stage.status = stage.status.advanced();
    update_project(clients, requester_id, project)
}

/// Replaces the mutable fields of a stage (status, date, notes).
///
/// This is the only path that can set On Hold. The stage name and the
/// stage list itself never change after project creation.
pub fn edit_stage(
    clients: &[Client],
    project_id: &str,
    stage_id: Uuid,
    edit: StageEdit,
) -> Result<Vec<Client>, MutateError> {
    let (requester_id, mut project) = derive_project(clients, project_id)?;
    let stage = project
        .stages
        .iter_mut()
        .find(|s| s.id == stage_id)
        .ok_or(MutateError::StageNotFound(stage_id))?;
    stage.status = edit.status;
    stage.date = edit.date;
    stage.notes = edit.notes;
    update_project(clients, requester_id, project)
}

/// Appends a lab test to the project
pub fn add_test(
    clients: &[Client],
    project_id: &str,
    test: LabTest,
) -> Result<Vec<Client>, MutateError> {
    let (requester_id, mut project) = derive_project(clients, project_id)?;
    project.tests.push(test);
    update_project(clients, requester_id, project)
}

/// Replaces the editable fields of a lab test
pub fn edit_test(
    clients: &[Client],
    project_id: &str,
    test_id: Uuid,
    edit: TestEdit,
) -> Result<Vec<Client>, MutateError> {
    let (requester_id, mut project) = derive_project(clients, project_id)?;
    let test = project
        .tests
        .iter_mut()
        .find(|t| t.id == test_id)
        .ok_or(MutateError::TestNotFound(test_id))?;
    test.test_no = edit.test_no;
    test.name = edit.name;
    test.manager = edit.manager;
    test.start_date = edit.start_date;
    test.end_date = edit.end_date;
    update_project(clients, requester_id, project)
}

/// Removes a lab test from the project
pub fn delete_test(
    clients: &[Client],
    project_id: &str,
    test_id: Uuid,
) -> Result<Vec<Client>, MutateError> {
    let (requester_id, mut project) = derive_project(clients, project_id)?;
    let before = project.tests.len();
    project.tests.retain(|t| t.id != test_id);
    if project.tests.len() == before {
        return Err(MutateError::TestNotFound(test_id));
    }
    update_project(clients, requester_id, project)
}

/// Appends a follow-up record to the project
pub fn add_follow_up(
    clients: &[Client],
    project_id: &str,
    record: FollowUpRecord,
) -> Result<Vec<Client>, MutateError> {
    let (requester_id, mut project) = derive_project(clients, project_id)?;
    project.follow_ups.push(record);
    update_project(clients, requester_id, project)
}

/// Replaces the editable fields of a follow-up record
pub fn edit_follow_up(
    clients: &[Client],
    project_id: &str,
    record_id: Uuid,
    edit: FollowUpEdit,
) -> Result<Vec<Client>, MutateError> {
    let (requester_id, mut project) = derive_project(clients, project_id)?;
    let record = project
        .follow_ups
        .iter_mut()
        .find(|r| r.id == record_id)
        .ok_or(MutateError::FollowUpNotFound(record_id))?;
    record.date = edit.date;
    record.method = edit.method;
    record.person = edit.person;
    record.content = edit.content;
    record.result = edit.result;
    record.next_action = edit.next_action;
    record.next_action_date = edit.next_action_date;
    update_project(clients, requester_id, project)
}

/// Removes a follow-up record from the project
pub fn delete_follow_up(
    clients: &[Client],
    project_id: &str,
    record_id: Uuid,
) -> Result<Vec<Client>, MutateError> {
    let (requester_id, mut project) = derive_project(clients, project_id)?;
    let before = project.follow_ups.len();
    project.follow_ups.retain(|r| r.id != record_id);
    if project.follow_ups.len() == before {
        return Err(MutateError::FollowUpNotFound(record_id));
    }
    update_project(clients, requester_id, project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::STAGE_TEMPLATE;

    fn new_project_data(id: &str, item: &str) -> NewProject {
        NewProject {
            id: id.to_string(),
            project_no: None,
            test_item: item.to_string(),
            quote_date: None,
            quoted_amount: 0,
            contracted_amount: 0,
            status_text: String::new(),
        }
    }

    /// Builds a book with one client ("Acme"), one requester ("Jane") and
    /// one project ("Q-1"), returning (clients, client_id, requester_id).
    fn seed() -> (Vec<Client>, Uuid, Uuid) {
        let client = Client::new("Acme".into());
        let client_id = client.id;
        let clients = add_client(&[], client);

        let requester = Requester::new("Jane".into());
        let requester_id = requester.id;
        let clients = add_requester(&clients, client_id, requester).unwrap();

        let clients =
            add_project(&clients, client_id, requester_id, new_project_data("Q-1", "Assay A"))
                .unwrap();
        (clients, client_id, requester_id)
    }

    #[test]
    fn test_add_then_edit_scenario() {
        let client = Client::new("Acme".into());
        let client_id = client.id;
        let clients = add_client(&[], client);

        let mut requester = Requester::new("Jane".into());
        requester.email = Some("j@acme.com".into());
        let requester_id = requester.id;
        let clients = add_requester(&clients, client_id, requester).unwrap();

        let clients = add_project(
            &clients,
            client_id,
            requester_id,
            NewProject {
                id: "Q-1".into(),
                project_no: None,
                test_item: "Assay A".into(),
                quote_date: NaiveDate::from_ymd_opt(2024, 1, 1),
                quoted_amount: 1000,
                contracted_amount: 0,
                status_text: "new".into(),
            },
        )
        .unwrap();

        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].requesters.len(), 1);
        let project = &clients[0].requesters[0].projects[0];
        assert_eq!(project.id, "Q-1");
        assert_eq!(project.stages.len(), 7);
        assert!(project.stages.iter().all(|s| s.status == StageStatus::Pending));
        assert!(project.tests.is_empty());
        assert!(project.follow_ups.is_empty());
    }

    #[test]
    fn test_mutations_leave_input_untouched() {
        let (clients, client_id, _) = seed();
        let snapshot = clients.clone();

        let _ = delete_project(&clients, client_id, "Q-1").unwrap();
        let _ = advance_stage(&clients, "Q-1", clients[0].requesters[0].projects[0].stages[0].id)
            .unwrap();
        let _ = delete_client(&clients, client_id);

        assert_eq!(clients, snapshot);
    }

    #[test]
    fn test_delete_client_is_idempotent() {
        let (clients, _, _) = seed();

        let updated = delete_client(&clients, Uuid::new_v4());

        assert_eq!(updated, clients);
    }

    #[test]
    fn test_delete_client_cascades() {
        let (clients, client_id, _) = seed();

        let mut other = Client::new("Globex".into());
        let mut other_requester = Requester::new("Bob".into());
        other_requester.projects.push(Project::new("Q-2".into(), "Assay B".into()));
        other.requesters.push(other_requester);
        let clients = add_client(&clients, other);

        let updated = delete_client(&clients, client_id);

        assert_eq!(updated.len(), 1);
        assert!(find_project(&updated, "Q-1").is_none());
        // The other client's project is unaffected
        assert!(find_project(&updated, "Q-2").is_some());
    }

    #[test]
    fn test_delete_requester_cascades() {
        let (clients, client_id, requester_id) = seed();

        let updated = delete_requester(&clients, client_id, requester_id).unwrap();

        assert!(updated[0].requesters.is_empty());
        assert!(find_project(&updated, "Q-1").is_none());
    }

    #[test]
    fn test_add_project_requires_a_requester() {
        let client = Client::new("Empty Co".into());
        let client_id = client.id;
        let clients = add_client(&[], client);

        let result = add_project(&clients, client_id, Uuid::new_v4(), new_project_data("Q-9", "X"));

        assert_eq!(result, Err(MutateError::NoRequesters));
    }

    #[test]
    fn test_add_project_rejects_duplicate_quote_number() {
        let (clients, client_id, requester_id) = seed();

        let result =
            add_project(&clients, client_id, requester_id, new_project_data("Q-1", "Again"));

        assert_eq!(result, Err(MutateError::DuplicateProjectId("Q-1".into())));
    }

    #[test]
    fn test_sibling_ids_stay_unique() {
        let (mut clients, client_id, requester_id) = seed();

        for i in 2..6 {
            clients = add_requester(&clients, client_id, Requester::new(format!("R{}", i))).unwrap();
            clients = add_project(
                &clients,
                client_id,
                requester_id,
                new_project_data(&format!("Q-{}", i), "Assay"),
            )
            .unwrap();
        }

        let client = &clients[0];
        for (i, a) in client.requesters.iter().enumerate() {
            for b in &client.requesters[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
        let projects = &client.requesters[0].projects;
        for (i, a) in projects.iter().enumerate() {
            for b in &projects[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn test_edit_project_preserves_sub_collections() {
        let (clients, _, _) = seed();
        let clients = add_test(
            &clients,
            "Q-1",
            LabTest::new("P-100".into(), "T-1".into(), "HPLC".into(), "Kim".into()),
        )
        .unwrap();
        let stage_ids: Vec<Uuid> = find_project(&clients, "Q-1")
            .unwrap()
            .stages
            .iter()
            .map(|s| s.id)
            .collect();

        let updated = edit_project(
            &clients,
            "Q-1",
            ProjectEdit {
                id: "Q-1".into(),
                project_no: Some("P-100".into()),
                test_item: "Assay A (rev)".into(),
                quote_date: NaiveDate::from_ymd_opt(2024, 2, 1),
                quoted_amount: 2000,
                contracted_amount: 1800,
                status_text: "contracted".into(),
            },
        )
        .unwrap();

        let project = find_project(&updated, "Q-1").unwrap();
        assert_eq!(project.test_item, "Assay A (rev)");
        assert_eq!(project.quoted_amount, 2000);
        assert_eq!(project.tests.len(), 1);
        let updated_ids: Vec<Uuid> = project.stages.iter().map(|s| s.id).collect();
        assert_eq!(updated_ids, stage_ids);
    }

    #[test]
    fn test_edit_project_can_renumber_unless_taken() {
        let (clients, client_id, requester_id) = seed();
        let clients =
            add_project(&clients, client_id, requester_id, new_project_data("Q-2", "B")).unwrap();

        let renamed = edit_project(
            &clients,
            "Q-1",
            ProjectEdit { id: "Q-3".into(), ..new_project_data("Q-3", "Assay A") },
        )
        .unwrap();
        assert!(find_project(&renamed, "Q-3").is_some());
        assert!(find_project(&renamed, "Q-1").is_none());

        let clash = edit_project(
            &clients,
            "Q-1",
            ProjectEdit { id: "Q-2".into(), ..new_project_data("Q-2", "Assay A") },
        );
        assert_eq!(clash, Err(MutateError::DuplicateProjectId("Q-2".into())));
    }

    #[test]
    fn test_update_project_requires_known_requester() {
        let (clients, _, _) = seed();
        let project = find_project(&clients, "Q-1").unwrap().clone();

        let bogus = Uuid::new_v4();
        let result = update_project(&clients, bogus, project);

        assert_eq!(result, Err(MutateError::RequesterNotFound(bogus)));
    }

    #[test]
    fn test_delete_project_filters_every_requester() {
        let (clients, client_id, _) = seed();
        // A second requester that unexpectedly holds a copy of Q-1
        let mut stray = Requester::new("Stray".into());
        stray.projects.push(find_project(&clients, "Q-1").unwrap().clone());
        let clients = {
            let mut updated = clients.clone();
            updated[0].requesters.push(stray);
            updated
        };

        let updated = delete_project(&clients, client_id, "Q-1").unwrap();

        for r in &updated[0].requesters {
            assert!(r.projects.iter().all(|p| p.id != "Q-1"));
        }
    }

    #[test]
    fn test_delete_project_reports_missing() {
        let (clients, client_id, _) = seed();

        let result = delete_project(&clients, client_id, "Q-404");

        assert_eq!(result, Err(MutateError::ProjectNotFound("Q-404".into())));
    }

    #[test]
    fn test_stage_template_invariant_survives_mutations() {
        let (clients, _, _) = seed();
        let stage_id = find_project(&clients, "Q-1").unwrap().stages[0].id;

        let clients = advance_stage(&clients, "Q-1", stage_id).unwrap();
        let clients = edit_stage(
            &clients,
            "Q-1",
            stage_id,
            StageEdit {
                status: StageStatus::OnHold,
                date: NaiveDate::from_ymd_opt(2024, 3, 1),
                notes: Some("waiting on sample".into()),
            },
        )
        .unwrap();

        let project = find_project(&clients, "Q-1").unwrap();
        assert_eq!(project.stages.len(), STAGE_TEMPLATE.len());
        for (stage, name) in project.stages.iter().zip(STAGE_TEMPLATE.iter()) {
            assert_eq!(stage.name, *name);
        }
    }

    #[test]
    fn test_advance_stage_cycles_without_on_hold() {
        let (mut clients, _, _) = seed();
        let stage_id = find_project(&clients, "Q-1").unwrap().stages[0].id;

        let mut statuses = Vec::new();
        for _ in 0..6 {
            clients = advance_stage(&clients, "Q-1", stage_id).unwrap();
            statuses.push(find_project(&clients, "Q-1").unwrap().stages[0].status);
        }

        assert_eq!(
            statuses,
            vec![
                StageStatus::InProgress,
                StageStatus::Completed,
                StageStatus::Pending,
                StageStatus::InProgress,
                StageStatus::Completed,
                StageStatus::Pending,
            ]
        );
    }

    #[test]
    fn test_edit_stage_reaches_on_hold() {
        let (clients, _, _) = seed();
        let stage_id = find_project(&clients, "Q-1").unwrap().stages[2].id;

        let updated = edit_stage(
            &clients,
            "Q-1",
            stage_id,
            StageEdit { status: StageStatus::OnHold, date: None, notes: None },
        )
        .unwrap();

        assert_eq!(
            find_project(&updated, "Q-1").unwrap().stages[2].status,
            StageStatus::OnHold
        );
    }

    #[test]
    fn test_test_lifecycle() {
        let (clients, _, _) = seed();

        let test = LabTest::new("P-100".into(), "T-1".into(), "HPLC".into(), "Kim".into());
        let test_id = test.id;
        let clients = add_test(&clients, "Q-1", test).unwrap();
        assert_eq!(find_project(&clients, "Q-1").unwrap().tests.len(), 1);

        let clients = edit_test(
            &clients,
            "Q-1",
            test_id,
            TestEdit {
                test_no: "T-1".into(),
                name: "HPLC purity".into(),
                manager: "Lee".into(),
                start_date: NaiveDate::from_ymd_opt(2024, 4, 1),
                end_date: None,
            },
        )
        .unwrap();
        assert_eq!(find_project(&clients, "Q-1").unwrap().tests[0].manager, "Lee");

        let clients = delete_test(&clients, "Q-1", test_id).unwrap();
        assert!(find_project(&clients, "Q-1").unwrap().tests.is_empty());

        let missing = delete_test(&clients, "Q-1", test_id);
        assert_eq!(missing, Err(MutateError::TestNotFound(test_id)));
    }

    #[test]
    fn test_follow_up_lifecycle() {
        let (clients, _, _) = seed();

        let record = FollowUpRecord::new(
            ContactMethod::Phone,
            "Jane".into(),
            "Discussed quote".into(),
            FollowUpResult::Positive,
        );
        let record_id = record.id;
        let clients = add_follow_up(&clients, "Q-1", record).unwrap();

        let clients = edit_follow_up(
            &clients,
            "Q-1",
            record_id,
            FollowUpEdit {
                date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
                method: ContactMethod::Email,
                person: "Jane".into(),
                content: "Sent revised quote".into(),
                result: FollowUpResult::Neutral,
                next_action: Some("Call next week".into()),
                next_action_date: NaiveDate::from_ymd_opt(2024, 5, 9),
            },
        )
        .unwrap();
        let stored = &find_project(&clients, "Q-1").unwrap().follow_ups[0];
        assert_eq!(stored.method, ContactMethod::Email);
        assert_eq!(stored.next_action.as_deref(), Some("Call next week"));

        let clients = delete_follow_up(&clients, "Q-1", record_id).unwrap();
        assert!(find_project(&clients, "Q-1").unwrap().follow_ups.is_empty());
    }

    #[test]
    fn test_missing_parent_is_reported_not_swallowed() {
        let (clients, _, _) = seed();
        let bogus = Uuid::new_v4();

        assert_eq!(
            add_requester(&clients, bogus, Requester::new("X".into())),
            Err(MutateError::ClientNotFound(bogus))
        );
        assert_eq!(
            advance_stage(&clients, "Q-404", bogus),
            Err(MutateError::ProjectNotFound("Q-404".into()))
        );
    }
}
