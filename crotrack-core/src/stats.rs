//! Read-only pipeline summaries for the dashboard view.

use std::collections::HashMap;

use crate::models::{Client, Project, ProjectStage, StageStatus};

/// Aggregate view of the sales pipeline
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub client_count: usize,
    pub requester_count: usize,
    pub project_count: usize,

    /// Sum of quoted amounts across all projects
    pub quoted_total: i64,

    /// Sum of contracted amounts across all projects
    pub contracted_total: i64,

    /// Number of projects currently sitting at each stage name
    pub stage_counts: Vec<(String, usize)>,

    /// Number of projects whose current stage carries each status
    pub status_counts: HashMap<StageStatus, usize>,

    /// Projects with every stage completed
    pub completed_projects: usize,

    /// Total follow-up records across all projects
    pub follow_up_count: usize,
}

/// The stage a project is currently at: the first stage that is not yet
/// completed. `None` means every stage is done.
pub fn current_stage(project: &Project) -> Option<&ProjectStage> {
    project.stages.iter().find(|s| s.status != StageStatus::Completed)
}

/// Computes the pipeline summary from the full client list
pub fn pipeline_summary(clients: &[Client]) -> PipelineSummary {
    let mut stage_counts: Vec<(String, usize)> = Vec::new();
    let mut status_counts: HashMap<StageStatus, usize> = HashMap::new();
    let mut quoted_total = 0i64;
    let mut contracted_total = 0i64;
    let mut project_count = 0usize;
    let mut completed_projects = 0usize;
    let mut follow_up_count = 0usize;

    for client in clients {
        for requester in &client.requesters {
            for project in &requester.projects {
                project_count += 1;
                quoted_total += project.quoted_amount;
                contracted_total += project.contracted_amount;
                follow_up_count += project.follow_ups.len();

                match current_stage(project) {
                    Some(stage) => {
                        match stage_counts.iter_mut().find(|(name, _)| name == &stage.name) {
                            Some((_, count)) => *count += 1,
                            None => stage_counts.push((stage.name.clone(), 1)),
                        }
                        *status_counts.entry(stage.status).or_insert(0) += 1;
                    }
                    None => completed_projects += 1,
                }
            }
        }
    }

    PipelineSummary {
        client_count: clients.len(),
        requester_count: clients.iter().map(|c| c.requesters.len()).sum(),
        project_count,
        quoted_total,
        contracted_total,
        stage_counts,
        status_counts,
        completed_projects,
        follow_up_count,
    }
}
