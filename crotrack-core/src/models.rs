use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::select::Selection;

/// The fixed workflow every project moves through, in order.
///
/// Projects are created with exactly these stages and the list is never
/// resized afterwards - only the status, date and notes of each stage change.
pub const STAGE_TEMPLATE: [&str; 7] = [
    "Inquiry",
    "Quote",
    "Contract",
    "Sample Receipt",
    "Testing",
    "Report",
    "Invoice",
];

/// Represents the status of a single project stage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StageStatus {
    Pending,
    InProgress,
    Completed,
    OnHold,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Pending => write!(f, "Pending"),
            StageStatus::InProgress => write!(f, "In Progress"),
            StageStatus::Completed => write!(f, "Completed"),
            StageStatus::OnHold => write!(f, "On Hold"),
        }
    }
}

impl StageStatus {
    /// Parse a stage status from a string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "pending" => Some(StageStatus::Pending),
            "inprogress" => Some(StageStatus::InProgress),
            "completed" | "complete" | "done" => Some(StageStatus::Completed),
            "onhold" | "hold" => Some(StageStatus::OnHold),
            _ => None,
        }
    }

    /// The next status in the click-to-advance cycle.
    ///
    /// The cycle is Pending -> In Progress -> Completed -> Pending and never
    /// produces On Hold; a stage put on hold through the edit form resumes
    /// at In Progress when advanced.
    pub fn advanced(self) -> Self {
        match self {
            StageStatus::Pending => StageStatus::InProgress,
            StageStatus::InProgress => StageStatus::Completed,
            StageStatus::Completed => StageStatus::Pending,
            StageStatus::OnHold => StageStatus::InProgress,
        }
    }
}

/// How a follow-up contact was made
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContactMethod {
    Phone,
    Email,
    Meeting,
    Visit,
    Messenger,
}

impl fmt::Display for ContactMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContactMethod::Phone => write!(f, "Phone"),
            ContactMethod::Email => write!(f, "Email"),
            ContactMethod::Meeting => write!(f, "Meeting"),
            ContactMethod::Visit => write!(f, "Visit"),
            ContactMethod::Messenger => write!(f, "Messenger"),
        }
    }
}

impl ContactMethod {
    /// Parse a contact method from a string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "phone" | "call" => Some(ContactMethod::Phone),
            "email" | "mail" => Some(ContactMethod::Email),
            "meeting" => Some(ContactMethod::Meeting),
            "visit" => Some(ContactMethod::Visit),
            "messenger" | "chat" => Some(ContactMethod::Messenger),
            _ => None,
        }
    }
}

/// Outcome of a follow-up contact
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FollowUpResult {
    Positive,
    Neutral,
    Negative,
    NoResponse,
}

impl fmt::Display for FollowUpResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowUpResult::Positive => write!(f, "Positive"),
            FollowUpResult::Neutral => write!(f, "Neutral"),
            FollowUpResult::Negative => write!(f, "Negative"),
            FollowUpResult::NoResponse => write!(f, "No Response"),
        }
    }
}

impl FollowUpResult {
    /// Parse a follow-up result from a string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "positive" => Some(FollowUpResult::Positive),
            "neutral" => Some(FollowUpResult::Neutral),
            "negative" => Some(FollowUpResult::Negative),
            "noresponse" | "none" => Some(FollowUpResult::NoResponse),
            _ => None,
        }
    }
}

/// One step of a project's fixed workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectStage {
    /// Unique identifier for the stage
    pub id: Uuid,

    /// Stage name, one of `STAGE_TEMPLATE`
    pub name: String,

    /// Current status of the stage
    pub status: StageStatus,

    /// Date the stage was reached or scheduled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    /// Free-text notes for the stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ProjectStage {
    /// Creates a pending stage with the given template name
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status: StageStatus::Pending,
            date: None,
            notes: None,
        }
    }
}

/// Builds a fresh stage list from the fixed template, all pending
pub fn stages_from_template() -> Vec<ProjectStage> {
    STAGE_TEMPLATE.iter().map(|name| ProjectStage::new(name)).collect()
}

/// A scheduled laboratory test belonging to a project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabTest {
    /// Unique identifier for the test
    pub id: Uuid,

    /// Project number the test belongs to (denormalized, not a foreign key)
    pub project_no: String,

    /// Lab-assigned test number
    pub test_no: String,

    /// Name of the test
    pub name: String,

    /// Person managing the test
    pub manager: String,

    /// Scheduled start date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    /// Scheduled end date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl LabTest {
    /// Creates a new test record
    pub fn new(project_no: String, test_no: String, name: String, manager: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_no,
            test_no,
            name,
            manager,
            start_date: None,
            end_date: None,
        }
    }
}

/// A logged contact-history record for sales follow-up on a project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowUpRecord {
    /// Unique identifier for the record
    pub id: Uuid,

    /// When the contact happened
    pub date: NaiveDate,

    /// How the contact was made
    pub method: ContactMethod,

    /// Who was contacted
    pub person: String,

    /// What was discussed
    pub content: String,

    /// Outcome of the contact
    pub result: FollowUpResult,

    /// Planned next action, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,

    /// When the next action is due
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action_date: Option<NaiveDate>,
}

impl FollowUpRecord {
    /// Creates a new follow-up record dated today
    pub fn new(method: ContactMethod, person: String, content: String, result: FollowUpResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: Utc::now().date_naive(),
            method,
            person,
            content,
            result,
            next_action: None,
            next_action_date: None,
        }
    }
}

/// A unit of quoted/contracted work, identified by its quote number
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    /// User-supplied quote number, used for lookup across the whole book
    pub id: String,

    /// Secondary project number assigned once contracted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_no: Option<String>,

    /// What is being tested
    pub test_item: String,

    /// Date the quote was issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_date: Option<NaiveDate>,

    /// Quoted amount
    pub quoted_amount: i64,

    /// Contracted amount (0 until a contract is signed)
    pub contracted_amount: i64,

    /// Free-text status note shown in listings
    pub status_text: String,

    /// Fixed workflow stages, built from `STAGE_TEMPLATE` at creation
    pub stages: Vec<ProjectStage>,

    /// Scheduled lab tests
    #[serde(default)]
    pub tests: Vec<LabTest>,

    /// Contact-history records
    #[serde(default)]
    pub follow_ups: Vec<FollowUpRecord>,
}

impl Project {
    /// Creates a new project with a full pending stage list from the template
    pub fn new(id: String, test_item: String) -> Self {
        Self {
            id,
            project_no: None,
            test_item,
            quote_date: None,
            quoted_amount: 0,
            contracted_amount: 0,
            status_text: String::new(),
            stages: stages_from_template(),
            tests: Vec::new(),
            follow_ups: Vec::new(),
        }
    }
}

/// A named contact within a client who originates projects
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requester {
    /// Unique identifier for the requester
    pub id: Uuid,

    /// Contact name
    pub name: String,

    /// Department within the client organization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    /// Phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Projects originated by this requester
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl Requester {
    /// Creates a new requester with no projects
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            department: None,
            phone: None,
            email: None,
            projects: Vec::new(),
        }
    }
}

/// A top-level customer organization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    /// Unique identifier for the client
    pub id: Uuid,

    /// Company name
    pub name: String,

    /// Business registration number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_no: Option<String>,

    /// Industry sector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    /// Mailing address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Free-text memo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,

    /// Contacts within this client
    #[serde(default)]
    pub requesters: Vec<Requester>,
}

impl Client {
    /// Creates a new client with no requesters
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            business_no: None,
            industry: None,
            address: None,
            memo: None,
            requesters: Vec::new(),
        }
    }
}

/// The single logical document the whole application reads and writes.
///
/// The metadata fields are informational stamps: `version` increases
/// monotonically on every save but is never checked before an overwrite,
/// so concurrent writers are last-write-wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientBook {
    pub clients: Vec<Client>,

    /// When the book was last saved
    pub last_modified: DateTime<Utc>,

    /// Email of the user who last saved the book
    #[serde(default)]
    pub modified_by: String,

    /// Monotonically increasing save counter
    #[serde(default)]
    pub version: u64,

    /// Ids of the currently displayed client/project; entities are always
    /// re-derived from `clients`, never referenced directly
    #[serde(default)]
    pub selection: Selection,
}

impl ClientBook {
    /// Creates an empty book
    pub fn new() -> Self {
        Self {
            clients: Vec::new(),
            last_modified: Utc::now(),
            modified_by: String::new(),
            version: 0,
            selection: Selection::default(),
        }
    }

    /// Gets a client by id
    pub fn get_client(&self, id: &Uuid) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == *id)
    }

    /// Finds a project anywhere in the book by its quote number
    pub fn get_project(&self, project_id: &str) -> Option<&Project> {
        self.clients
            .iter()
            .flat_map(|c| c.requesters.iter())
            .flat_map(|r| r.projects.iter())
            .find(|p| p.id == project_id)
    }

    /// Total number of requesters across all clients
    pub fn requester_count(&self) -> usize {
        self.clients.iter().map(|c| c.requesters.len()).sum()
    }

    /// Total number of projects across all clients
    pub fn project_count(&self) -> usize {
        self.clients
            .iter()
            .flat_map(|c| c.requesters.iter())
            .map(|r| r.projects.len())
            .sum()
    }
}

impl Default for ClientBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_from_template() {
        let stages = stages_from_template();

        assert_eq!(stages.len(), STAGE_TEMPLATE.len());
        for (stage, name) in stages.iter().zip(STAGE_TEMPLATE.iter()) {
            assert_eq!(stage.name, *name);
            assert_eq!(stage.status, StageStatus::Pending);
            assert!(stage.date.is_none());
            assert!(stage.notes.is_none());
        }
    }

    #[test]
    fn test_template_stage_ids_are_unique() {
        let stages = stages_from_template();
        for (i, a) in stages.iter().enumerate() {
            for b in &stages[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn test_stage_status_cycle_never_visits_on_hold() {
        let mut status = StageStatus::Pending;
        let mut seen = Vec::new();

        for _ in 0..9 {
            status = status.advanced();
            seen.push(status);
        }

        assert!(!seen.contains(&StageStatus::OnHold));
        // Three advances return to the starting point
        assert_eq!(seen[2], StageStatus::Pending);
        assert_eq!(seen[5], StageStatus::Pending);
        assert_eq!(seen[8], StageStatus::Pending);
    }

    #[test]
    fn test_stage_status_advance_from_on_hold_resumes() {
        assert_eq!(StageStatus::OnHold.advanced(), StageStatus::InProgress);
    }

    #[test]
    fn test_stage_status_from_str() {
        assert_eq!(StageStatus::from_str("pending"), Some(StageStatus::Pending));
        assert_eq!(StageStatus::from_str("In Progress"), Some(StageStatus::InProgress));
        assert_eq!(StageStatus::from_str("in-progress"), Some(StageStatus::InProgress));
        assert_eq!(StageStatus::from_str("done"), Some(StageStatus::Completed));
        assert_eq!(StageStatus::from_str("on hold"), Some(StageStatus::OnHold));
        assert_eq!(StageStatus::from_str("unknown"), None);
    }

    #[test]
    fn test_project_new_has_full_stage_list() {
        let project = Project::new("Q-100".into(), "Stability assay".into());

        assert_eq!(project.stages.len(), STAGE_TEMPLATE.len());
        assert!(project.tests.is_empty());
        assert!(project.follow_ups.is_empty());
    }

    #[test]
    fn test_book_get_project_searches_all_clients() {
        let mut book = ClientBook::new();

        let mut client_a = Client::new("Acme".into());
        let mut requester = Requester::new("Jane".into());
        requester.projects.push(Project::new("Q-1".into(), "Assay A".into()));
        client_a.requesters.push(requester);

        let mut client_b = Client::new("Globex".into());
        let mut requester_b = Requester::new("Bob".into());
        requester_b.projects.push(Project::new("Q-2".into(), "Assay B".into()));
        client_b.requesters.push(requester_b);

        book.clients.push(client_a);
        book.clients.push(client_b);

        assert_eq!(book.get_project("Q-2").map(|p| p.test_item.as_str()), Some("Assay B"));
        assert!(book.get_project("Q-9").is_none());
        assert_eq!(book.project_count(), 2);
        assert_eq!(book.requester_count(), 2);
    }
}
