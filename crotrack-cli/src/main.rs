mod cli;
mod prompts;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use colored::Colorize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crotrack_core::{
    create_store, current_stage, determine_book_path, export, get_registry_path,
    import_clients_csv_file, import_from_json, migrate_sqlite_to_yaml, migrate_yaml_to_sqlite,
    mutate, pipeline_summary, selected_client, selected_project, selected_requester, Client,
    ClientBook, ContactMethod, DocumentStore, EnvAuthProvider, FollowUpRecord, FollowUpResult,
    LabTest, MutateError, NewProject, Project, Registry, StageEdit, StageStatus, SyncSession,
};

use crate::cli::{
    BookCommand, Cli, ClientCommand, Command, FollowUpCommand, ImportCommand, ProjectCommand,
    RequesterCommand, SelectCommand, StageCommand, TestCommand,
};

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    // Book management and identity commands work without an open book
    match &cli.command {
        Command::Book(book_cmd) => return handle_book_command(book_cmd),
        Command::Whoami => return whoami(),
        _ => {}
    }

    let book_path = determine_book_path(cli.book.as_deref())?;
    let store = create_store(&book_path, None)?;
    let auth = Arc::new(EnvAuthProvider::new());
    let session = SyncSession::new(store.clone(), auth);

    if let Command::Signout = &cli.command {
        session.sign_out();
        println!("Signed out. Unset CROTRACK_USER_EMAIL to stay signed out.");
        return Ok(());
    }

    let Some(mut book) = session.load()? else {
        println!(
            "{}",
            "Not signed in - set CROTRACK_USER_EMAIL to work with this book.".red()
        );
        return Ok(());
    };

    match &cli.command {
        Command::Client(cmd) => handle_client_command(cmd, &session, &mut book)?,
        Command::Requester(cmd) => handle_requester_command(cmd, &session, &mut book)?,
        Command::Project(cmd) => handle_project_command(cmd, &session, &mut book)?,
        Command::Stage(cmd) => handle_stage_command(cmd, &session, &mut book)?,
        Command::Test(cmd) => handle_test_command(cmd, &session, &mut book)?,
        Command::Followup(cmd) => handle_follow_up_command(cmd, &session, &mut book)?,
        Command::Select(cmd) => handle_select_command(cmd, &session, &mut book)?,
        Command::Dashboard => show_dashboard(&book),
        Command::Import(cmd) => handle_import_command(cmd, &session, store.as_ref(), &mut book)?,
        Command::Export { format, output } => handle_export(format, output.as_deref(), &book)?,
        Command::Watch { interval } => watch_book(&session, *interval)?,
        Command::Book(_) | Command::Whoami | Command::Signout => unreachable!(),
    }

    Ok(())
}

/// Replaces the book's client list and pushes the result to the store.
/// Save failures are logged by the session, not surfaced here.
fn commit(session: &SyncSession, book: &mut ClientBook, clients: Vec<Client>) {
    book.clients = clients;
    session.save(&book.clients, &book.selection);
}

/// Applies a mutation result: commits on success, prints the error as a
/// user-facing message otherwise. Returns true when the mutation applied.
fn apply(
    session: &SyncSession,
    book: &mut ClientBook,
    result: Result<Vec<Client>, MutateError>,
) -> bool {
    match result {
        Ok(clients) => {
            commit(session, book, clients);
            true
        }
        Err(e) => {
            println!("{}", e.to_string().red());
            false
        }
    }
}

fn resolve_client(clients: &[Client], needle: &str) -> Option<Uuid> {
    if let Ok(id) = Uuid::parse_str(needle) {
        if clients.iter().any(|c| c.id == id) {
            return Some(id);
        }
    }
    clients
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(needle))
        .map(|c| c.id)
}

fn resolve_client_or_report(clients: &[Client], needle: &str) -> Option<Uuid> {
    let found = resolve_client(clients, needle);
    if found.is_none() {
        println!("{}", format!("No client named '{}'", needle).red());
    }
    found
}

fn resolve_requester(client: &Client, needle: &str) -> Option<Uuid> {
    if let Ok(id) = Uuid::parse_str(needle) {
        if client.requesters.iter().any(|r| r.id == id) {
            return Some(id);
        }
    }
    client
        .requesters
        .iter()
        .find(|r| r.name.eq_ignore_ascii_case(needle))
        .map(|r| r.id)
}

/// Resolves a stage by template name or 1-based position
fn resolve_stage(project: &Project, needle: &str) -> Option<Uuid> {
    if let Ok(position) = needle.parse::<usize>() {
        if position >= 1 && position <= project.stages.len() {
            return Some(project.stages[position - 1].id);
        }
    }
    project
        .stages
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(needle))
        .map(|s| s.id)
}

fn find_project_or_report<'a>(clients: &'a [Client], quote_no: &str) -> Option<&'a Project> {
    let found = mutate::find_project(clients, quote_no);
    if found.is_none() {
        println!("{}", format!("No project with quote number '{}'", quote_no).red());
    }
    found
}

fn parse_date_flag(value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s)),
    }
}

// =============================================================================
// Clients
// =============================================================================

fn handle_client_command(
    cmd: &ClientCommand,
    session: &SyncSession,
    book: &mut ClientBook,
) -> Result<()> {
    match cmd {
        ClientCommand::Add {
            name,
            business_no,
            industry,
            address,
            memo,
            interactive,
        } => {
            let should_be_interactive = *interactive
                || (name.is_none()
                    && business_no.is_none()
                    && industry.is_none()
                    && address.is_none()
                    && memo.is_none());

            let client = if should_be_interactive {
                prompts::prompt_new_client()?
            } else {
                let mut client = Client::new(name.clone().unwrap_or_default());
                client.business_no = business_no.clone();
                client.industry = industry.clone();
                client.address = address.clone();
                client.memo = memo.clone();
                client
            };

            // Name validation belongs to the form layer, not the mutation core
            if client.name.trim().is_empty() {
                println!("{}", "Client name must not be blank".red());
                return Ok(());
            }

            let client_id = client.id;
            let name = client.name.clone();
            let clients = mutate::add_client(&book.clients, client);
            book.selection.select_client(client_id);
            commit(session, book, clients);
            println!("{}", format!("Added client '{}'", name).green());
        }
        ClientCommand::List => {
            if book.clients.is_empty() {
                println!("No clients yet");
                return Ok(());
            }
            println!("{}", format!("{:<28} {:<12} {:>10} {:>9}", "NAME", "INDUSTRY", "REQUESTERS", "PROJECTS").bold());
            for client in &book.clients {
                let project_count: usize =
                    client.requesters.iter().map(|r| r.projects.len()).sum();
                println!(
                    "{:<28} {:<12} {:>10} {:>9}",
                    client.name,
                    client.industry.as_deref().unwrap_or("-"),
                    client.requesters.len(),
                    project_count
                );
            }
        }
        ClientCommand::Show { client } => {
            let Some(client_id) = resolve_client_or_report(&book.clients, client) else {
                return Ok(());
            };
            let client = book.get_client(&client_id).unwrap();
            println!("{}", client.name.bold());
            println!("  Id: {}", client.id);
            if let Some(business_no) = &client.business_no {
                println!("  Business no: {}", business_no);
            }
            if let Some(industry) = &client.industry {
                println!("  Industry: {}", industry);
            }
            if let Some(address) = &client.address {
                println!("  Address: {}", address);
            }
            if let Some(memo) = &client.memo {
                println!("  Memo: {}", memo);
            }
            for requester in &client.requesters {
                println!(
                    "  {} {} ({} projects)",
                    "Requester:".cyan(),
                    requester.name,
                    requester.projects.len()
                );
            }
        }
        ClientCommand::Edit { client } => {
            let Some(client_id) = resolve_client_or_report(&book.clients, client) else {
                return Ok(());
            };
            let current = book.get_client(&client_id).unwrap().clone();
            let edit = prompts::prompt_edit_client(&current)?;
            if edit.name.trim().is_empty() {
                println!("{}", "Client name must not be blank".red());
                return Ok(());
            }
            let result = mutate::edit_client(&book.clients, client_id, edit);
            if apply(session, book, result) {
                println!("{}", "Updated client".green());
            }
        }
        ClientCommand::Del { client, yes } => {
            let Some(client_id) = resolve_client_or_report(&book.clients, client) else {
                return Ok(());
            };
            let name = book.get_client(&client_id).unwrap().name.clone();
            if !*yes && !prompts::confirm_delete(&format!("client '{}' and all its data", name))? {
                println!("Cancelled");
                return Ok(());
            }
            let clients = mutate::delete_client(&book.clients, client_id);
            if book.selection.client_id == Some(client_id) {
                book.selection.clear();
            }
            commit(session, book, clients);
            println!("{}", format!("Deleted client '{}'", name).green());
        }
    }
    Ok(())
}

// =============================================================================
// Requesters
// =============================================================================

fn handle_requester_command(
    cmd: &RequesterCommand,
    session: &SyncSession,
    book: &mut ClientBook,
) -> Result<()> {
    match cmd {
        RequesterCommand::Add {
            client,
            name,
            department,
            phone,
            email,
            interactive,
        } => {
            let Some(client_id) = resolve_client_or_report(&book.clients, client) else {
                return Ok(());
            };
            let should_be_interactive = *interactive
                || (name.is_none() && department.is_none() && phone.is_none() && email.is_none());

            let requester = if should_be_interactive {
                prompts::prompt_new_requester()?
            } else {
                let mut requester = crotrack_core::Requester::new(name.clone().unwrap_or_default());
                requester.department = department.clone();
                requester.phone = phone.clone();
                requester.email = email.clone();
                requester
            };
            if requester.name.trim().is_empty() {
                println!("{}", "Requester name must not be blank".red());
                return Ok(());
            }

            let requester_name = requester.name.clone();
            let result = mutate::add_requester(&book.clients, client_id, requester);
            if apply(session, book, result) {
                println!("{}", format!("Added requester '{}'", requester_name).green());
            }
        }
        RequesterCommand::List { client } => {
            let Some(client_id) = resolve_client_or_report(&book.clients, client) else {
                return Ok(());
            };
            let client = book.get_client(&client_id).unwrap();
            if client.requesters.is_empty() {
                println!("No requesters yet");
                return Ok(());
            }
            println!("{}", format!("{:<20} {:<16} {:<24} {:>9}", "NAME", "DEPARTMENT", "EMAIL", "PROJECTS").bold());
            for requester in &client.requesters {
                println!(
                    "{:<20} {:<16} {:<24} {:>9}",
                    requester.name,
                    requester.department.as_deref().unwrap_or("-"),
                    requester.email.as_deref().unwrap_or("-"),
                    requester.projects.len()
                );
            }
        }
        RequesterCommand::Edit { client, requester } => {
            let Some(client_id) = resolve_client_or_report(&book.clients, client) else {
                return Ok(());
            };
            let client_ref = book.get_client(&client_id).unwrap();
            let Some(requester_id) = resolve_requester(client_ref, requester) else {
                println!("{}", format!("No requester named '{}'", requester).red());
                return Ok(());
            };
            let current = client_ref
                .requesters
                .iter()
                .find(|r| r.id == requester_id)
                .unwrap();

            let edit = prompts::prompt_edit_requester(current)?;
            let result = mutate::edit_requester(&book.clients, client_id, requester_id, edit);
            if apply(session, book, result) {
                println!("{}", "Updated requester".green());
            }
        }
        RequesterCommand::Del {
            client,
            requester,
            yes,
        } => {
            let Some(client_id) = resolve_client_or_report(&book.clients, client) else {
                return Ok(());
            };
            let client_ref = book.get_client(&client_id).unwrap();
            let Some(requester_id) = resolve_requester(client_ref, requester) else {
                println!("{}", format!("No requester named '{}'", requester).red());
                return Ok(());
            };
            if !*yes
                && !prompts::confirm_delete(&format!("requester '{}' and all its projects", requester))?
            {
                println!("Cancelled");
                return Ok(());
            }
            let result = mutate::delete_requester(&book.clients, client_id, requester_id);
            if apply(session, book, result) {
                println!("{}", format!("Deleted requester '{}'", requester).green());
            }
        }
    }
    Ok(())
}

// =============================================================================
// Projects
// =============================================================================

fn handle_project_command(
    cmd: &ProjectCommand,
    session: &SyncSession,
    book: &mut ClientBook,
) -> Result<()> {
    match cmd {
        ProjectCommand::Add {
            client,
            requester,
            quote_no,
            project_no,
            test_item,
            quote_date,
            quoted_amount,
            contracted_amount,
            status,
            interactive,
        } => {
            let Some(client_id) = resolve_client_or_report(&book.clients, client) else {
                return Ok(());
            };
            let client_ref = book.get_client(&client_id).unwrap();
            if client_ref.requesters.is_empty() {
                println!("{}", MutateError::NoRequesters.to_string().red());
                return Ok(());
            }

            let requester_id = match requester {
                Some(needle) => match resolve_requester(client_ref, needle) {
                    Some(id) => id,
                    None => {
                        println!("{}", format!("No requester named '{}'", needle).red());
                        return Ok(());
                    }
                },
                None => prompts::prompt_select_requester(client_ref)?,
            };

            let should_be_interactive = *interactive || quote_no.is_none();
            let data = if should_be_interactive {
                prompts::prompt_new_project()?
            } else {
                NewProject {
                    id: quote_no.clone().unwrap_or_default(),
                    project_no: project_no.clone(),
                    test_item: test_item.clone().unwrap_or_default(),
                    quote_date: parse_date_flag(quote_date.as_deref())?,
                    quoted_amount: quoted_amount.unwrap_or(0),
                    contracted_amount: contracted_amount.unwrap_or(0),
                    status_text: status.clone().unwrap_or_default(),
                }
            };
            if data.id.trim().is_empty() {
                println!("{}", "Quote number must not be blank".red());
                return Ok(());
            }

            let new_id = data.id.clone();
            match mutate::add_project(&book.clients, client_id, requester_id, data) {
                Ok(clients) => {
                    // Newly created projects become the selection
                    book.selection.select_client(client_id);
                    book.selection.select_project(new_id.clone());
                    commit(session, book, clients);
                    println!("{}", format!("Added project '{}'", new_id).green());
                }
                Err(e) => println!("{}", e.to_string().red()),
            }
        }
        ProjectCommand::List { client } => {
            let filter_id = match client {
                Some(needle) => match resolve_client_or_report(&book.clients, needle) {
                    Some(id) => Some(id),
                    None => return Ok(()),
                },
                None => None,
            };
            println!(
                "{}",
                format!(
                    "{:<10} {:<24} {:<20} {:<16} {:>12} {:>12}",
                    "QUOTE", "TEST ITEM", "CLIENT", "STAGE", "QUOTED", "CONTRACTED"
                )
                .bold()
            );
            for c in &book.clients {
                if filter_id.is_some_and(|id| id != c.id) {
                    continue;
                }
                for r in &c.requesters {
                    for p in &r.projects {
                        let stage = current_stage(p)
                            .map(|s| s.name.clone())
                            .unwrap_or_else(|| "Completed".to_string());
                        println!(
                            "{:<10} {:<24} {:<20} {:<16} {:>12} {:>12}",
                            p.id, p.test_item, c.name, stage, p.quoted_amount, p.contracted_amount
                        );
                    }
                }
            }
        }
        ProjectCommand::Show { quote_no } => {
            let Some(project) = find_project_or_report(&book.clients, quote_no) else {
                return Ok(());
            };
            print_project(project, &book.clients);
        }
        ProjectCommand::Edit { quote_no } => {
            let Some(project) = find_project_or_report(&book.clients, quote_no) else {
                return Ok(());
            };
            let edit = prompts::prompt_edit_project(project)?;
            let result = mutate::edit_project(&book.clients, quote_no, edit);
            if apply(session, book, result) {
                println!("{}", "Updated project".green());
            }
        }
        ProjectCommand::Del {
            client,
            quote_no,
            yes,
        } => {
            let Some(client_id) = resolve_client_or_report(&book.clients, client) else {
                return Ok(());
            };
            if !*yes && !prompts::confirm_delete(&format!("project '{}'", quote_no))? {
                println!("Cancelled");
                return Ok(());
            }
            if book.selection.project_id.as_deref() == Some(quote_no.as_str()) {
                book.selection.project_id = None;
            }
            let result = mutate::delete_project(&book.clients, client_id, quote_no);
            if apply(session, book, result) {
                println!("{}", format!("Deleted project '{}'", quote_no).green());
            }
        }
    }
    Ok(())
}

fn print_project(project: &Project, clients: &[Client]) {
    println!("{} {}", project.id.bold(), project.test_item);
    if let Some(project_no) = &project.project_no {
        println!("  Project no: {}", project_no);
    }
    if let Some(requester_id) = mutate::owning_requester_id(clients, &project.id) {
        for client in clients {
            if let Some(requester) = client.requesters.iter().find(|r| r.id == requester_id) {
                println!("  Client: {} / {}", client.name, requester.name);
            }
        }
    }
    if let Some(date) = project.quote_date {
        println!("  Quote date: {}", date);
    }
    println!(
        "  Quoted: {} | Contracted: {}",
        project.quoted_amount, project.contracted_amount
    );
    if !project.status_text.is_empty() {
        println!("  Status: {}", project.status_text);
    }

    println!("  {}", "Stages:".cyan());
    for (i, stage) in project.stages.iter().enumerate() {
        let status = match stage.status {
            StageStatus::Completed => stage.status.to_string().green(),
            StageStatus::InProgress => stage.status.to_string().yellow(),
            StageStatus::OnHold => stage.status.to_string().red(),
            StageStatus::Pending => stage.status.to_string().normal(),
        };
        let date = stage
            .date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let notes = stage.notes.as_deref().unwrap_or("");
        println!("  {:>2}. {:<16} {:<12} {:<12} {}", i + 1, stage.name, status, date, notes);
    }

    if !project.tests.is_empty() {
        println!("  {}", "Tests:".cyan());
        for test in &project.tests {
            println!(
                "    {} {} (manager: {}, {} - {})",
                test.test_no,
                test.name,
                test.manager,
                test.start_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                test.end_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            );
        }
    }

    if !project.follow_ups.is_empty() {
        println!("  {}", "Follow-ups:".cyan());
        for (i, record) in project.follow_ups.iter().enumerate() {
            println!(
                "    {}. {} {} with {} - {} ({})",
                i + 1,
                record.date,
                record.method,
                record.person,
                record.content,
                record.result
            );
            if let Some(next_action) = &record.next_action {
                let due = record
                    .next_action_date
                    .map(|d| format!(" by {}", d))
                    .unwrap_or_default();
                println!("       Next: {}{}", next_action, due);
            }
        }
    }
}

// =============================================================================
// Stages
// =============================================================================

fn handle_stage_command(
    cmd: &StageCommand,
    session: &SyncSession,
    book: &mut ClientBook,
) -> Result<()> {
    match cmd {
        StageCommand::List { quote_no } => {
            let Some(project) = find_project_or_report(&book.clients, quote_no) else {
                return Ok(());
            };
            for (i, stage) in project.stages.iter().enumerate() {
                println!("{:>2}. {:<16} {}", i + 1, stage.name, stage.status);
            }
        }
        StageCommand::Advance { quote_no, stage } => {
            let Some(project) = find_project_or_report(&book.clients, quote_no) else {
                return Ok(());
            };
            let Some(stage_id) = resolve_stage(project, stage) else {
                println!("{}", format!("No stage '{}'", stage).red());
                return Ok(());
            };
            let result = mutate::advance_stage(&book.clients, quote_no, stage_id);
            if apply(session, book, result) {
                let project = mutate::find_project(&book.clients, quote_no).unwrap();
                let stage = project.stages.iter().find(|s| s.id == stage_id).unwrap();
                println!(
                    "{}",
                    format!("{} is now {}", stage.name, stage.status).green()
                );
            }
        }
        StageCommand::Edit {
            quote_no,
            stage,
            status,
            date,
            notes,
            interactive,
        } => {
            let Some(project) = find_project_or_report(&book.clients, quote_no) else {
                return Ok(());
            };
            let Some(stage_id) = resolve_stage(project, stage) else {
                println!("{}", format!("No stage '{}'", stage).red());
                return Ok(());
            };
            let current = project.stages.iter().find(|s| s.id == stage_id).unwrap();

            let should_be_interactive =
                *interactive || (status.is_none() && date.is_none() && notes.is_none());
            let edit = if should_be_interactive {
                prompts::prompt_edit_stage(current)?
            } else {
                let status = match status {
                    Some(s) => match StageStatus::from_str(s) {
                        Some(status) => status,
                        None => {
                            println!("{}", format!("Unknown status '{}'", s).red());
                            return Ok(());
                        }
                    },
                    None => current.status,
                };
                StageEdit {
                    status,
                    date: match date {
                        Some(_) => parse_date_flag(date.as_deref())?,
                        None => current.date,
                    },
                    notes: notes.clone().or_else(|| current.notes.clone()),
                }
            };

            let result = mutate::edit_stage(&book.clients, quote_no, stage_id, edit);
            if apply(session, book, result) {
                println!("{}", "Updated stage".green());
            }
        }
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

fn resolve_test(project: &Project, test_no: &str) -> Option<Uuid> {
    project
        .tests
        .iter()
        .find(|t| t.test_no == test_no)
        .map(|t| t.id)
}

fn handle_test_command(
    cmd: &TestCommand,
    session: &SyncSession,
    book: &mut ClientBook,
) -> Result<()> {
    match cmd {
        TestCommand::Add {
            quote_no,
            test_no,
            name,
            manager,
            start_date,
            end_date,
            interactive,
        } => {
            let Some(project) = find_project_or_report(&book.clients, quote_no) else {
                return Ok(());
            };
            let reference_no = project.project_no.clone().unwrap_or_else(|| project.id.clone());

            let should_be_interactive = *interactive || test_no.is_none();
            let test = if should_be_interactive {
                prompts::prompt_new_test(&reference_no)?
            } else {
                let mut test = LabTest::new(
                    reference_no,
                    test_no.clone().unwrap_or_default(),
                    name.clone().unwrap_or_default(),
                    manager.clone().unwrap_or_default(),
                );
                test.start_date = parse_date_flag(start_date.as_deref())?;
                test.end_date = parse_date_flag(end_date.as_deref())?;
                test
            };

            let label = test.test_no.clone();
            let result = mutate::add_test(&book.clients, quote_no, test);
            if apply(session, book, result) {
                println!("{}", format!("Added test '{}'", label).green());
            }
        }
        TestCommand::List { quote_no } => {
            let Some(project) = find_project_or_report(&book.clients, quote_no) else {
                return Ok(());
            };
            if project.tests.is_empty() {
                println!("No tests yet");
                return Ok(());
            }
            println!("{}", format!("{:<10} {:<24} {:<14} {:<12} {:<12}", "TEST NO", "NAME", "MANAGER", "START", "END").bold());
            for test in &project.tests {
                println!(
                    "{:<10} {:<24} {:<14} {:<12} {:<12}",
                    test.test_no,
                    test.name,
                    test.manager,
                    test.start_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                    test.end_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                );
            }
        }
        TestCommand::Edit { quote_no, test_no } => {
            let Some(project) = find_project_or_report(&book.clients, quote_no) else {
                return Ok(());
            };
            let Some(test_id) = resolve_test(project, test_no) else {
                println!("{}", format!("No test '{}'", test_no).red());
                return Ok(());
            };
            let current = project.tests.iter().find(|t| t.id == test_id).unwrap();
            let edit = prompts::prompt_edit_test(current)?;
            let result = mutate::edit_test(&book.clients, quote_no, test_id, edit);
            if apply(session, book, result) {
                println!("{}", "Updated test".green());
            }
        }
        TestCommand::Del {
            quote_no,
            test_no,
            yes,
        } => {
            let Some(project) = find_project_or_report(&book.clients, quote_no) else {
                return Ok(());
            };
            let Some(test_id) = resolve_test(project, test_no) else {
                println!("{}", format!("No test '{}'", test_no).red());
                return Ok(());
            };
            if !*yes && !prompts::confirm_delete(&format!("test '{}'", test_no))? {
                println!("Cancelled");
                return Ok(());
            }
            let result = mutate::delete_test(&book.clients, quote_no, test_id);
            if apply(session, book, result) {
                println!("{}", format!("Deleted test '{}'", test_no).green());
            }
        }
    }
    Ok(())
}

// =============================================================================
// Follow-ups
// =============================================================================

fn handle_follow_up_command(
    cmd: &FollowUpCommand,
    session: &SyncSession,
    book: &mut ClientBook,
) -> Result<()> {
    match cmd {
        FollowUpCommand::Add {
            quote_no,
            method,
            person,
            content,
            result,
            next_action,
            next_action_date,
            interactive,
        } => {
            if find_project_or_report(&book.clients, quote_no).is_none() {
                return Ok(());
            }

            let should_be_interactive = *interactive || method.is_none();
            let record = if should_be_interactive {
                prompts::prompt_new_follow_up()?
            } else {
                let Some(method) = method.as_deref().and_then(ContactMethod::from_str) else {
                    println!("{}", "Unknown contact method".red());
                    return Ok(());
                };
                let result = result
                    .as_deref()
                    .and_then(FollowUpResult::from_str)
                    .unwrap_or(FollowUpResult::Neutral);
                let mut record = FollowUpRecord::new(
                    method,
                    person.clone().unwrap_or_default(),
                    content.clone().unwrap_or_default(),
                    result,
                );
                record.next_action = next_action.clone();
                record.next_action_date = parse_date_flag(next_action_date.as_deref())?;
                record
            };

            let result = mutate::add_follow_up(&book.clients, quote_no, record);
            if apply(session, book, result) {
                println!("{}", "Logged follow-up".green());
            }
        }
        FollowUpCommand::List { quote_no } => {
            let Some(project) = find_project_or_report(&book.clients, quote_no) else {
                return Ok(());
            };
            if project.follow_ups.is_empty() {
                println!("No follow-ups yet");
                return Ok(());
            }
            for (i, record) in project.follow_ups.iter().enumerate() {
                println!(
                    "{}. {} {} with {} - {} ({})",
                    i + 1,
                    record.date,
                    record.method,
                    record.person,
                    record.content,
                    record.result
                );
            }
        }
        FollowUpCommand::Edit { quote_no, position } => {
            let Some(project) = find_project_or_report(&book.clients, quote_no) else {
                return Ok(());
            };
            let Some(record) = position.checked_sub(1).and_then(|i| project.follow_ups.get(i))
            else {
                println!("{}", format!("No follow-up at position {}", position).red());
                return Ok(());
            };
            let record_id = record.id;
            let edit = prompts::prompt_edit_follow_up(record)?;
            let result = mutate::edit_follow_up(&book.clients, quote_no, record_id, edit);
            if apply(session, book, result) {
                println!("{}", "Updated follow-up".green());
            }
        }
        FollowUpCommand::Del {
            quote_no,
            position,
            yes,
        } => {
            let Some(project) = find_project_or_report(&book.clients, quote_no) else {
                return Ok(());
            };
            let Some(record) = position.checked_sub(1).and_then(|i| project.follow_ups.get(i))
            else {
                println!("{}", format!("No follow-up at position {}", position).red());
                return Ok(());
            };
            let record_id = record.id;
            if !*yes && !prompts::confirm_delete("this follow-up record")? {
                println!("Cancelled");
                return Ok(());
            }
            let result = mutate::delete_follow_up(&book.clients, quote_no, record_id);
            if apply(session, book, result) {
                println!("{}", "Deleted follow-up".green());
            }
        }
    }
    Ok(())
}

// =============================================================================
// Selection
// =============================================================================

fn handle_select_command(
    cmd: &SelectCommand,
    session: &SyncSession,
    book: &mut ClientBook,
) -> Result<()> {
    match cmd {
        SelectCommand::Client { client } => {
            let Some(client_id) = resolve_client_or_report(&book.clients, client) else {
                return Ok(());
            };
            book.selection.select_client(client_id);
            session.save(&book.clients, &book.selection);
            println!("{}", format!("Selected client '{}'", client).green());
        }
        SelectCommand::Project { quote_no } => {
            // The project must live under the selected client for the
            // detail view to resolve it
            let Some(client) = selected_client(&book.clients, &book.selection) else {
                println!("{}", "Select a client first".red());
                return Ok(());
            };
            let owns = client
                .requesters
                .iter()
                .any(|r| r.projects.iter().any(|p| p.id == *quote_no));
            if !owns {
                println!(
                    "{}",
                    format!("No project '{}' under the selected client", quote_no).red()
                );
                return Ok(());
            }
            book.selection.select_project(quote_no.clone());
            session.save(&book.clients, &book.selection);
            println!("{}", format!("Selected project '{}'", quote_no).green());
        }
        SelectCommand::Clear => {
            book.selection.clear();
            session.save(&book.clients, &book.selection);
            println!("Selection cleared");
        }
        SelectCommand::Show => {
            match selected_client(&book.clients, &book.selection) {
                Some(client) => println!("Client: {}", client.name),
                None => println!("Client: (none)"),
            }
            match selected_requester(&book.clients, &book.selection) {
                Some(requester) => println!("Requester: {}", requester.name),
                None => println!("Requester: (none)"),
            }
            match selected_project(&book.clients, &book.selection) {
                Some(project) => println!("Project: {} {}", project.id, project.test_item),
                None => println!("Project: (none)"),
            }
        }
    }
    Ok(())
}

// =============================================================================
// Dashboard, import/export, watch
// =============================================================================

fn show_dashboard(book: &ClientBook) {
    let summary = pipeline_summary(&book.clients);

    println!("{}", "Pipeline".bold());
    println!(
        "  {} clients / {} requesters / {} projects",
        summary.client_count, summary.requester_count, summary.project_count
    );
    println!(
        "  Quoted total: {}  Contracted total: {}",
        summary.quoted_total.to_string().yellow(),
        summary.contracted_total.to_string().green()
    );
    println!("  Follow-ups logged: {}", summary.follow_up_count);

    if !summary.stage_counts.is_empty() {
        println!("{}", "Projects by current stage".bold());
        for (stage, count) in &summary.stage_counts {
            println!("  {:<16} {}", stage, count);
        }
    }
    if summary.completed_projects > 0 {
        println!("  {:<16} {}", "Completed", summary.completed_projects);
    }
    if let Some(on_hold) = summary.status_counts.get(&StageStatus::OnHold) {
        println!("{}", format!("  {} project(s) on hold", on_hold).red());
    }
}

fn handle_import_command(
    cmd: &ImportCommand,
    session: &SyncSession,
    store: &dyn DocumentStore,
    book: &mut ClientBook,
) -> Result<()> {
    match cmd {
        ImportCommand::Csv { path } => {
            let (imported, report) = import_clients_csv_file(path)?;

            let (merged, added, merge_skips) = merge_imported(&book.clients, imported);
            commit(session, book, merged);

            println!("{}", format!("Imported {} project(s)", added).green());
            let skipped = report.skipped + merge_skips.len();
            if skipped > 0 {
                println!("{}", format!("Skipped {} malformed or duplicate row(s)", skipped).yellow());
                for error in report.errors.iter().chain(merge_skips.iter()) {
                    println!("  {}", error);
                }
            }
        }
        ImportCommand::Json { path } => {
            let count = import_from_json(path, store)?;
            *book = store.load()?;
            println!("{}", format!("Restored book with {} client(s)", count).green());
        }
    }
    Ok(())
}

/// Merges an imported client list into the book: clients and requesters
/// are matched by name, and projects whose quote number already exists in
/// the book are skipped.
fn merge_imported(
    existing: &[Client],
    imported: Vec<Client>,
) -> (Vec<Client>, usize, Vec<String>) {
    let taken: HashSet<String> = existing
        .iter()
        .flat_map(|c| c.requesters.iter())
        .flat_map(|r| r.projects.iter())
        .map(|p| p.id.clone())
        .collect();

    let mut merged = existing.to_vec();
    let mut added = 0usize;
    let mut skips = Vec::new();

    for client in imported {
        for requester in client.requesters {
            for project in requester.projects {
                if taken.contains(&project.id) {
                    skips.push(format!("quote number '{}' already exists in the book", project.id));
                    continue;
                }

                let target_client = match merged.iter_mut().find(|c| c.name == client.name) {
                    Some(c) => c,
                    None => {
                        let mut fresh = Client::new(client.name.clone());
                        fresh.business_no = client.business_no.clone();
                        fresh.industry = client.industry.clone();
                        fresh.address = client.address.clone();
                        fresh.memo = client.memo.clone();
                        merged.push(fresh);
                        merged.last_mut().unwrap()
                    }
                };
                let target_requester = match target_client
                    .requesters
                    .iter_mut()
                    .find(|r| r.name == requester.name)
                {
                    Some(r) => r,
                    None => {
                        let mut fresh = crotrack_core::Requester::new(requester.name.clone());
                        fresh.department = requester.department.clone();
                        fresh.phone = requester.phone.clone();
                        fresh.email = requester.email.clone();
                        target_client.requesters.push(fresh);
                        target_client.requesters.last_mut().unwrap()
                    }
                };
                target_requester.projects.push(project);
                added += 1;
            }
        }
    }

    (merged, added, skips)
}

fn handle_export(
    format: &str,
    output: Option<&std::path::Path>,
    book: &ClientBook,
) -> Result<()> {
    match format {
        "json" => {
            let path = output.unwrap_or_else(|| std::path::Path::new("book.json"));
            export::export_json(book, path)?;
        }
        "csv" => {
            let path = output.unwrap_or_else(|| std::path::Path::new("projects.csv"));
            export::export_csv(&book.clients, path)?;
        }
        "pipeline" => {
            let path = output.unwrap_or_else(|| std::path::Path::new("pipeline.md"));
            export::export_pipeline_md(&book.clients, path)?;
        }
        other => {
            println!(
                "{}",
                format!("Unknown format '{}' (expected json, csv or pipeline)", other).red()
            );
        }
    }
    Ok(())
}

fn watch_book(session: &SyncSession, interval: u64) -> Result<()> {
    let subscribed = session.subscribe(Duration::from_secs(interval.max(1)), |book| {
        let who = if book.modified_by.is_empty() {
            "unknown"
        } else {
            book.modified_by.as_str()
        };
        println!(
            "[v{}] {} by {} - {} clients, {} projects",
            book.version,
            book.last_modified.format("%Y-%m-%d %H:%M:%S"),
            who,
            book.clients.len(),
            book.project_count()
        );
    });
    if !subscribed {
        println!("{}", "Not signed in".red());
        return Ok(());
    }

    println!("Watching for changes, Ctrl-C to stop");
    loop {
        std::thread::sleep(Duration::from_secs(3600));
    }
}

// =============================================================================
// Identity and book registry
// =============================================================================

fn whoami() -> Result<()> {
    let auth = EnvAuthProvider::new();
    use crotrack_core::AuthProvider;
    match auth.current_user() {
        Some(user) => println!("Signed in as {}", user.email.green()),
        None => println!("Not signed in - set CROTRACK_USER_EMAIL"),
    }
    Ok(())
}

fn handle_book_command(cmd: &BookCommand) -> Result<()> {
    let registry_path = get_registry_path()?;
    if !registry_path.exists() {
        Registry::create_default(&registry_path)?;
    }

    match cmd {
        BookCommand::Register {
            name,
            path,
            description,
            default,
            interactive,
        } => {
            let should_be_interactive = *interactive || name.is_none() || path.is_none();
            let (name, path, description) = if should_be_interactive {
                let name = inquire::Text::new("Book name:").prompt()?;
                let path = inquire::Text::new("Path to book file:").prompt()?;
                let description = inquire::Text::new("Description:").prompt()?;
                (name, path, description)
            } else {
                (
                    name.clone().unwrap(),
                    path.clone().unwrap().display().to_string(),
                    description.clone().unwrap_or_default(),
                )
            };

            let mut registry = Registry::load(&registry_path)?;
            registry.register_book(name.clone(), path, description);
            if *default {
                registry.set_default_book(&name)?;
            }
            registry.save(&registry_path)?;
            println!("{}", format!("Registered book '{}'", name).green());
        }
        BookCommand::List => {
            let registry = Registry::load(&registry_path)?;
            let default = registry.default_book.clone();
            let mut names: Vec<&str> = registry.list_books();
            names.sort();
            for name in names {
                let entry = registry.get_book(name).unwrap();
                let marker = if default.as_deref() == Some(name) { "*" } else { " " };
                println!("{} {:<16} {:<32} {}", marker, name, entry.path, entry.description);
            }
        }
        BookCommand::Path { name } => {
            let path = match name {
                Some(book_name) => {
                    let registry = Registry::load(&registry_path)?;
                    match registry.get_book(book_name) {
                        Some(entry) => std::path::PathBuf::from(&entry.path),
                        None => anyhow::bail!("Book '{}' not found in registry", book_name),
                    }
                }
                None => determine_book_path(None)?,
            };
            println!("{}", path.display());
        }
        BookCommand::Default { name } => {
            let mut registry = Registry::load(&registry_path)?;
            registry.set_default_book(name)?;
            registry.save(&registry_path)?;
            println!("{}", format!("Default book is now '{}'", name).green());
        }
        BookCommand::Migrate { source, dest } => {
            let is_sqlite = |p: &std::path::Path| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("db") | Some("sqlite") | Some("sqlite3")
                )
            };
            let count = if is_sqlite(dest) && !is_sqlite(source) {
                migrate_yaml_to_sqlite(source, dest)?
            } else if is_sqlite(source) && !is_sqlite(dest) {
                migrate_sqlite_to_yaml(source, dest)?
            } else {
                anyhow::bail!("Migration needs one YAML path and one SQLite path");
            };
            println!("{}", format!("Migrated {} client(s)", count).green());
        }
    }
    Ok(())
}
