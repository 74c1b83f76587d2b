//! Read-only export projections of the client book.

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::models::{Client, ClientBook};
use crate::stats::{current_stage, pipeline_summary};

/// Escapes a CSV field, quoting when it contains separators or quotes
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Exports the whole book to pretty-printed JSON
pub fn export_json(book: &ClientBook, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(book)?;
    fs::write(output_path, json)?;

    println!("Exported to JSON: {}", output_path.display());
    println!("  Total clients: {}", book.clients.len());
    println!("  Total projects: {}", book.project_count());

    Ok(())
}

/// Exports one row per project, with flattened client/requester columns.
///
/// Uses the same column layout the bulk import reads.
pub fn export_csv(clients: &[Client], output_path: &Path) -> Result<()> {
    let mut output = String::from(
        "client,requester,quote_no,project_no,test_item,quote_date,quoted_amount,contracted_amount,status\n",
    );

    let mut project_count = 0;
    for client in clients {
        for requester in &client.requesters {
            for project in &requester.projects {
                project_count += 1;
                let row = [
                    csv_escape(&client.name),
                    csv_escape(&requester.name),
                    csv_escape(&project.id),
                    csv_escape(project.project_no.as_deref().unwrap_or("")),
                    csv_escape(&project.test_item),
                    project
                        .quote_date
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_default(),
                    project.quoted_amount.to_string(),
                    project.contracted_amount.to_string(),
                    csv_escape(&project.status_text),
                ];
                output.push_str(&row.join(","));
                output.push('\n');
            }
        }
    }

    fs::write(output_path, output)?;

    println!("Exported to CSV: {}", output_path.display());
    println!("  Total projects: {}", project_count);

    Ok(())
}

/// Exports a Markdown pipeline summary grouped per client
pub fn export_pipeline_md(clients: &[Client], output_path: &Path) -> Result<()> {
    let summary = pipeline_summary(clients);
    let mut output = String::new();

    output.push_str("# Sales Pipeline\n\n");
    output.push_str(&format!(
        "{} clients, {} requesters, {} projects\n\n",
        summary.client_count, summary.requester_count, summary.project_count
    ));
    output.push_str(&format!(
        "**Quoted total:** {} | **Contracted total:** {}\n\n",
        summary.quoted_total, summary.contracted_total
    ));

    if !summary.stage_counts.is_empty() {
        output.push_str("## Projects by current stage\n\n");
        for (stage, count) in &summary.stage_counts {
            output.push_str(&format!("- {}: {}\n", stage, count));
        }
        if summary.completed_projects > 0 {
            output.push_str(&format!("- Completed: {}\n", summary.completed_projects));
        }
        output.push('\n');
    }

    for client in clients {
        output.push_str(&format!("## {}\n\n", client.name));

        for requester in &client.requesters {
            for project in &requester.projects {
                let stage = current_stage(project)
                    .map(|s| format!("{} ({})", s.name, s.status))
                    .unwrap_or_else(|| "Completed".to_string());
                output.push_str(&format!(
                    "- **{}** {} - {} - quoted {} / contracted {} ({})\n",
                    project.id,
                    project.test_item,
                    stage,
                    project.quoted_amount,
                    project.contracted_amount,
                    requester.name
                ));
            }
        }
        output.push('\n');
    }

    fs::write(output_path, output)?;

    println!("Exported pipeline summary: {}", output_path.display());
    println!("  Total projects: {}", summary.project_count);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Project, Requester};
    use tempfile::tempdir;

    fn sample_book() -> ClientBook {
        let mut book = ClientBook::new();
        let mut client = Client::new("Acme, Inc.".into());
        let mut requester = Requester::new("Jane".into());
        let mut project = Project::new("Q-1".into(), "Assay \"A\"".into());
        project.quoted_amount = 1000;
        requester.projects.push(project);
        client.requesters.push(requester);
        book.clients.push(client);
        book
    }

    #[test]
    fn test_export_json_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("book.json");
        let book = sample_book();

        export_json(&book, &path)?;

        let loaded: ClientBook = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(loaded.clients.len(), 1);
        assert_eq!(loaded.clients[0].name, "Acme, Inc.");
        Ok(())
    }

    #[test]
    fn test_export_csv_escapes_fields() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("projects.csv");
        let book = sample_book();

        export_csv(&book.clients, &path)?;

        let content = fs::read_to_string(&path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("\"Acme, Inc.\",Jane,Q-1,"));
        assert!(lines[1].contains("\"Assay \"\"A\"\"\""));
        Ok(())
    }

    #[test]
    fn test_export_pipeline_md_lists_projects() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("pipeline.md");
        let book = sample_book();

        export_pipeline_md(&book.clients, &path)?;

        let content = fs::read_to_string(&path)?;
        assert!(content.contains("# Sales Pipeline"));
        assert!(content.contains("## Acme, Inc."));
        assert!(content.contains("**Q-1**"));
        assert!(content.contains("Inquiry (Pending)"));
        Ok(())
    }
}
