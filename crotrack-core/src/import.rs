//! Bulk CSV import.
//!
//! One row describes one project under a named client and requester;
//! clients and requesters are created on first sight. Malformed rows are
//! skipped and counted while valid rows still apply - import is partial
//! success, never all-or-nothing. The produced list satisfies the same
//! invariants as interactively entered data: fresh unique ids, stages
//! built from the fixed template, globally unique quote numbers.
//!
//! Expected columns:
//! `client,requester,quote_no,project_no,test_item,quote_date,quoted_amount,contracted_amount,status`

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;

use crate::models::{Client, Project, Requester, StageStatus};
use crate::mutate::NewProject;

/// Outcome of a bulk import
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Rows turned into projects
    pub imported: usize,
    /// Rows skipped as malformed or duplicate
    pub skipped: usize,
    /// One message per skipped row
    pub errors: Vec<String>,
}

/// Splits one CSV line into fields, honoring double-quoted fields and
/// doubled-quote escapes
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    fields
}

/// Infers stage progress from a free-text status column.
///
/// The latest stage keyword found names the stage currently in progress;
/// everything before it is marked completed. "hold" puts that stage on
/// hold instead, and "paid"/"complete"/"done" completes the whole project.
fn apply_status_heuristic(project: &mut Project, status_text: &str) {
    let text = status_text.to_lowercase();

    if text.contains("paid") || text.contains("complete") || text.contains("done") {
        for stage in &mut project.stages {
            stage.status = StageStatus::Completed;
        }
        return;
    }

    // Latest stage first, so "contract signed, testing" lands on Testing
    let keywords: [(&str, usize); 7] = [
        ("invoice", 6),
        ("report", 5),
        ("test", 4),
        ("sample", 3),
        ("contract", 2),
        ("quote", 1),
        ("inquiry", 0),
    ];

    let Some(&(_, current)) = keywords.iter().find(|(kw, _)| text.contains(kw)) else {
        return; // No keyword: everything stays pending
    };

    for stage in project.stages.iter_mut().take(current) {
        stage.status = StageStatus::Completed;
    }
    project.stages[current].status = if text.contains("hold") {
        StageStatus::OnHold
    } else {
        StageStatus::InProgress
    };
}

fn parse_amount(field: &str, row: usize, name: &str) -> Result<i64, String> {
    if field.is_empty() {
        return Ok(0);
    }
    field
        .replace(',', "")
        .parse::<i64>()
        .map_err(|_| format!("row {}: invalid {} '{}'", row, name, field))
}

fn parse_date(field: &str, row: usize) -> Result<Option<NaiveDate>, String> {
    if field.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(field, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| format!("row {}: invalid date '{}'", row, field))
}

/// Imports clients from CSV, returning the new client list and a report
/// of skipped rows
pub fn import_clients_csv<R: BufRead>(reader: R) -> Result<(Vec<Client>, ImportReport)> {
    let mut clients: Vec<Client> = Vec::new();
    let mut report = ImportReport::default();
    let mut seen_quote_numbers: HashSet<String> = HashSet::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read CSV line")?;
        let row = index + 1;

        // Header and blank lines
        if line.trim().is_empty() {
            continue;
        }
        if index == 0 && line.to_lowercase().starts_with("client") {
            continue;
        }

        let fields = split_csv_line(&line);
        if fields.len() < 9 {
            report.skipped += 1;
            report
                .errors
                .push(format!("row {}: expected 9 columns, got {}", row, fields.len()));
            continue;
        }

        let client_name = fields[0].clone();
        let requester_name = fields[1].clone();
        let quote_no = fields[2].clone();
        if client_name.is_empty() || requester_name.is_empty() || quote_no.is_empty() {
            report.skipped += 1;
            report
                .errors
                .push(format!("row {}: client, requester and quote_no are required", row));
            continue;
        }
        if !seen_quote_numbers.insert(quote_no.clone()) {
            report.skipped += 1;
            report
                .errors
                .push(format!("row {}: duplicate quote number '{}'", row, quote_no));
            continue;
        }

        let parsed = (|| -> Result<Project, String> {
            let quote_date = parse_date(&fields[5], row)?;
            let quoted_amount = parse_amount(&fields[6], row, "quoted amount")?;
            let contracted_amount = parse_amount(&fields[7], row, "contracted amount")?;

            let mut project = NewProject {
                id: quote_no.clone(),
                project_no: if fields[3].is_empty() { None } else { Some(fields[3].clone()) },
                test_item: fields[4].clone(),
                quote_date,
                quoted_amount,
                contracted_amount,
                status_text: fields[8].clone(),
            }
            .into_project();
            apply_status_heuristic(&mut project, &fields[8]);
            Ok(project)
        })();

        let project = match parsed {
            Ok(project) => project,
            Err(message) => {
                seen_quote_numbers.remove(&quote_no);
                report.skipped += 1;
                report.errors.push(message);
                continue;
            }
        };

        // Find or create the client, then the requester under it
        let client = match clients.iter_mut().find(|c| c.name == client_name) {
            Some(client) => client,
            None => {
                clients.push(Client::new(client_name));
                clients.last_mut().unwrap()
            }
        };
        let requester = match client.requesters.iter_mut().find(|r| r.name == requester_name) {
            Some(requester) => requester,
            None => {
                client.requesters.push(Requester::new(requester_name));
                client.requesters.last_mut().unwrap()
            }
        };
        requester.projects.push(project);
        report.imported += 1;
    }

    Ok((clients, report))
}

/// Imports clients from a CSV file on disk
pub fn import_clients_csv_file<P: AsRef<Path>>(path: P) -> Result<(Vec<Client>, ImportReport)> {
    let file = std::fs::File::open(&path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path.as_ref()))?;
    import_clients_csv(std::io::BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::STAGE_TEMPLATE;
    use std::io::Cursor;

    const HEADER: &str =
        "client,requester,quote_no,project_no,test_item,quote_date,quoted_amount,contracted_amount,status\n";

    #[test]
    fn test_import_groups_by_client_and_requester() {
        let csv = format!(
            "{}Acme,Jane,Q-1,,Assay A,2024-01-01,1000,0,quote sent\n\
             Acme,Jane,Q-2,P-9,Assay B,,2000,1800,contract signed\n\
             Globex,Bob,Q-3,,Assay C,2024-02-01,500,0,\n",
            HEADER
        );

        let (clients, report) = import_clients_csv(Cursor::new(csv)).unwrap();

        assert_eq!(report.imported, 3);
        assert_eq!(report.skipped, 0);
        assert_eq!(clients.len(), 2);
        assert_eq!(clients[0].requesters.len(), 1);
        assert_eq!(clients[0].requesters[0].projects.len(), 2);
        assert_eq!(clients[1].name, "Globex");
    }

    #[test]
    fn test_import_builds_template_stages() {
        let csv = format!("{}Acme,Jane,Q-1,,Assay A,,1000,0,\n", HEADER);

        let (clients, _) = import_clients_csv(Cursor::new(csv)).unwrap();

        let project = &clients[0].requesters[0].projects[0];
        assert_eq!(project.stages.len(), STAGE_TEMPLATE.len());
        for (stage, name) in project.stages.iter().zip(STAGE_TEMPLATE.iter()) {
            assert_eq!(stage.name, *name);
        }
        assert!(project.stages.iter().all(|s| s.status == StageStatus::Pending));
    }

    #[test]
    fn test_status_heuristic_marks_progress() {
        let csv = format!(
            "{}Acme,Jane,Q-1,,A,,0,0,testing in progress\n\
             Acme,Jane,Q-2,,B,,0,0,report on hold\n\
             Acme,Jane,Q-3,,C,,0,0,paid\n",
            HEADER
        );

        let (clients, _) = import_clients_csv(Cursor::new(csv)).unwrap();
        let projects = &clients[0].requesters[0].projects;

        // "testing": stages before Testing completed, Testing in progress
        assert!(projects[0].stages[..4].iter().all(|s| s.status == StageStatus::Completed));
        assert_eq!(projects[0].stages[4].status, StageStatus::InProgress);

        // "report on hold": Report stage on hold
        assert_eq!(projects[1].stages[5].status, StageStatus::OnHold);

        // "paid": everything completed
        assert!(projects[2].stages.iter().all(|s| s.status == StageStatus::Completed));
    }

    #[test]
    fn test_malformed_rows_are_partial_success() {
        let csv = format!(
            "{}Acme,Jane,Q-1,,Assay A,,1000,0,\n\
             ,Jane,Q-2,,Missing client,,0,0,\n\
             Acme,Jane,Q-3,,Bad amount,,abc,0,\n\
             Acme,Jane,Q-1,,Duplicate,,0,0,\n\
             short,row\n",
            HEADER
        );

        let (clients, report) = import_clients_csv(Cursor::new(csv)).unwrap();

        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 4);
        assert_eq!(report.errors.len(), 4);
        assert_eq!(clients[0].requesters[0].projects.len(), 1);
    }

    #[test]
    fn test_quoted_fields_keep_commas() {
        let csv = format!(
            "{}\"Acme, Inc.\",Jane,Q-1,,\"Assay \"\"A\"\", round 2\",,1000,0,\n",
            HEADER
        );

        let (clients, report) = import_clients_csv(Cursor::new(csv)).unwrap();

        assert_eq!(report.imported, 1);
        assert_eq!(clients[0].name, "Acme, Inc.");
        assert_eq!(
            clients[0].requesters[0].projects[0].test_item,
            "Assay \"A\", round 2"
        );
    }

    #[test]
    fn test_imported_ids_are_unique() {
        let csv = format!(
            "{}Acme,Jane,Q-1,,A,,0,0,\nAcme,Kim,Q-2,,B,,0,0,\n",
            HEADER
        );

        let (clients, _) = import_clients_csv(Cursor::new(csv)).unwrap();

        let requesters = &clients[0].requesters;
        assert_eq!(requesters.len(), 2);
        assert_ne!(requesters[0].id, requesters[1].id);
    }
}
