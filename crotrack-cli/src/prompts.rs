use anyhow::Result;
use chrono::NaiveDate;
use inquire::{Confirm, Select, Text};

use crotrack_core::{
    Client, ClientEdit, ContactMethod, FollowUpEdit, FollowUpRecord, FollowUpResult, LabTest,
    NewProject, ProjectStage, Requester, StageEdit, StageStatus,
};

fn optional(input: String) -> Option<String> {
    if input.trim().is_empty() {
        None
    } else {
        Some(input)
    }
}

fn prompt_date(label: &str, default: Option<NaiveDate>) -> Result<Option<NaiveDate>> {
    let initial = default.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
    loop {
        let input = Text::new(label)
            .with_initial_value(&initial)
            .with_help_message("YYYY-MM-DD, empty for none")
            .prompt()?;
        if input.trim().is_empty() {
            return Ok(None);
        }
        match NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d") {
            Ok(date) => return Ok(Some(date)),
            Err(_) => println!("Invalid date, expected YYYY-MM-DD"),
        }
    }
}

/// Prompts the user for a new client
pub fn prompt_new_client() -> Result<Client> {
    let name = Text::new("Company name:").prompt()?;

    let mut client = Client::new(name);
    client.business_no = optional(Text::new("Business registration number:").prompt()?);
    client.industry = optional(Text::new("Industry:").prompt()?);
    client.address = optional(Text::new("Address:").prompt()?);
    client.memo = optional(Text::new("Memo:").prompt()?);

    Ok(client)
}

/// Prompts the user for edits to an existing client
pub fn prompt_edit_client(client: &Client) -> Result<ClientEdit> {
    let name = Text::new("Company name:")
        .with_initial_value(&client.name)
        .prompt()?;
    let business_no = Text::new("Business registration number:")
        .with_initial_value(client.business_no.as_deref().unwrap_or(""))
        .prompt()?;
    let industry = Text::new("Industry:")
        .with_initial_value(client.industry.as_deref().unwrap_or(""))
        .prompt()?;
    let address = Text::new("Address:")
        .with_initial_value(client.address.as_deref().unwrap_or(""))
        .prompt()?;
    let memo = Text::new("Memo:")
        .with_initial_value(client.memo.as_deref().unwrap_or(""))
        .prompt()?;

    Ok(ClientEdit {
        name,
        business_no: optional(business_no),
        industry: optional(industry),
        address: optional(address),
        memo: optional(memo),
    })
}

/// Prompts the user for a new requester
pub fn prompt_new_requester() -> Result<Requester> {
    let name = Text::new("Contact name:").prompt()?;

    let mut requester = Requester::new(name);
    requester.department = optional(Text::new("Department:").prompt()?);
    requester.phone = optional(Text::new("Phone:").prompt()?);
    requester.email = optional(Text::new("Email:").prompt()?);

    Ok(requester)
}

/// Prompts the user for edits to an existing requester
pub fn prompt_edit_requester(requester: &Requester) -> Result<crotrack_core::RequesterEdit> {
    let name = Text::new("Contact name:")
        .with_initial_value(&requester.name)
        .prompt()?;
    let department = Text::new("Department:")
        .with_initial_value(requester.department.as_deref().unwrap_or(""))
        .prompt()?;
    let phone = Text::new("Phone:")
        .with_initial_value(requester.phone.as_deref().unwrap_or(""))
        .prompt()?;
    let email = Text::new("Email:")
        .with_initial_value(requester.email.as_deref().unwrap_or(""))
        .prompt()?;

    Ok(crotrack_core::RequesterEdit {
        name,
        department: optional(department),
        phone: optional(phone),
        email: optional(email),
    })
}

/// Prompts the user to pick a requester from the client's list
pub fn prompt_select_requester(client: &Client) -> Result<uuid::Uuid> {
    let options: Vec<String> = client.requesters.iter().map(|r| r.name.clone()).collect();
    let picked = Select::new("Requester:", options).raw_prompt()?;
    Ok(client.requesters[picked.index].id)
}

/// Prompts the user for a new project
pub fn prompt_new_project() -> Result<NewProject> {
    let id = Text::new("Quote number:").prompt()?;
    let test_item = Text::new("Test item:").prompt()?;
    let project_no = optional(Text::new("Project number:").prompt()?);
    let quote_date = prompt_date("Quote date:", None)?;
    let quoted_amount = Text::new("Quoted amount:")
        .with_initial_value("0")
        .prompt()?
        .trim()
        .parse::<i64>()
        .unwrap_or(0);
    let contracted_amount = Text::new("Contracted amount:")
        .with_initial_value("0")
        .prompt()?
        .trim()
        .parse::<i64>()
        .unwrap_or(0);
    let status_text = Text::new("Status note:").prompt()?;

    Ok(NewProject {
        id,
        project_no,
        test_item,
        quote_date,
        quoted_amount,
        contracted_amount,
        status_text,
    })
}

/// Prompts the user for edits to a project's editable fields
pub fn prompt_edit_project(project: &crotrack_core::Project) -> Result<NewProject> {
    let id = Text::new("Quote number:")
        .with_initial_value(&project.id)
        .prompt()?;
    let test_item = Text::new("Test item:")
        .with_initial_value(&project.test_item)
        .prompt()?;
    let project_no = optional(
        Text::new("Project number:")
            .with_initial_value(project.project_no.as_deref().unwrap_or(""))
            .prompt()?,
    );
    let quote_date = prompt_date("Quote date:", project.quote_date)?;
    let quoted_amount = Text::new("Quoted amount:")
        .with_initial_value(&project.quoted_amount.to_string())
        .prompt()?
        .trim()
        .parse::<i64>()
        .unwrap_or(project.quoted_amount);
    let contracted_amount = Text::new("Contracted amount:")
        .with_initial_value(&project.contracted_amount.to_string())
        .prompt()?
        .trim()
        .parse::<i64>()
        .unwrap_or(project.contracted_amount);
    let status_text = Text::new("Status note:")
        .with_initial_value(&project.status_text)
        .prompt()?;

    Ok(NewProject {
        id,
        project_no,
        test_item,
        quote_date,
        quoted_amount,
        contracted_amount,
        status_text,
    })
}

/// Prompts the user for edits to an existing lab test
pub fn prompt_edit_test(test: &LabTest) -> Result<crotrack_core::TestEdit> {
    let test_no = Text::new("Test number:")
        .with_initial_value(&test.test_no)
        .prompt()?;
    let name = Text::new("Test name:")
        .with_initial_value(&test.name)
        .prompt()?;
    let manager = Text::new("Manager:")
        .with_initial_value(&test.manager)
        .prompt()?;
    let start_date = prompt_date("Start date:", test.start_date)?;
    let end_date = prompt_date("End date:", test.end_date)?;

    Ok(crotrack_core::TestEdit {
        test_no,
        name,
        manager,
        start_date,
        end_date,
    })
}

/// Prompts the user for stage edits; this is the only path that can put a
/// stage on hold
pub fn prompt_edit_stage(stage: &ProjectStage) -> Result<StageEdit> {
    let status_options = vec![
        StageStatus::Pending,
        StageStatus::InProgress,
        StageStatus::Completed,
        StageStatus::OnHold,
    ];
    let status = Select::new("Status:", status_options).prompt()?;
    let date = prompt_date("Stage date:", stage.date)?;
    let notes = Text::new("Notes:")
        .with_initial_value(stage.notes.as_deref().unwrap_or(""))
        .prompt()?;

    Ok(StageEdit {
        status,
        date,
        notes: optional(notes),
    })
}

/// Prompts the user for a new lab test
pub fn prompt_new_test(project_no: &str) -> Result<LabTest> {
    let test_no = Text::new("Test number:").prompt()?;
    let name = Text::new("Test name:").prompt()?;
    let manager = Text::new("Manager:").prompt()?;

    let mut test = LabTest::new(project_no.to_string(), test_no, name, manager);
    test.start_date = prompt_date("Start date:", None)?;
    test.end_date = prompt_date("End date:", None)?;

    Ok(test)
}

/// Prompts the user for a new follow-up record
pub fn prompt_new_follow_up() -> Result<FollowUpRecord> {
    let method_options = vec![
        ContactMethod::Phone,
        ContactMethod::Email,
        ContactMethod::Meeting,
        ContactMethod::Visit,
        ContactMethod::Messenger,
    ];
    let method = Select::new("Contact method:", method_options).prompt()?;
    let person = Text::new("Contact person:").prompt()?;
    let content = inquire::Editor::new("Content:").prompt()?;

    let result_options = vec![
        FollowUpResult::Positive,
        FollowUpResult::Neutral,
        FollowUpResult::Negative,
        FollowUpResult::NoResponse,
    ];
    let result = Select::new("Result:", result_options).prompt()?;

    let mut record = FollowUpRecord::new(method, person, content, result);
    record.next_action = optional(Text::new("Next action:").prompt()?);
    if record.next_action.is_some() {
        record.next_action_date = prompt_date("Next action date:", None)?;
    }

    Ok(record)
}

/// Prompts the user for edits to an existing follow-up record
pub fn prompt_edit_follow_up(record: &FollowUpRecord) -> Result<FollowUpEdit> {
    let date = prompt_date("Contact date:", Some(record.date))?
        .unwrap_or(record.date);

    let method_options = vec![
        ContactMethod::Phone,
        ContactMethod::Email,
        ContactMethod::Meeting,
        ContactMethod::Visit,
        ContactMethod::Messenger,
    ];
    let method = Select::new("Contact method:", method_options).prompt()?;
    let person = Text::new("Contact person:")
        .with_initial_value(&record.person)
        .prompt()?;
    let content = inquire::Editor::new("Content:")
        .with_predefined_text(&record.content)
        .prompt()?;

    let result_options = vec![
        FollowUpResult::Positive,
        FollowUpResult::Neutral,
        FollowUpResult::Negative,
        FollowUpResult::NoResponse,
    ];
    let result = Select::new("Result:", result_options).prompt()?;

    let next_action = optional(
        Text::new("Next action:")
            .with_initial_value(record.next_action.as_deref().unwrap_or(""))
            .prompt()?,
    );
    let next_action_date = if next_action.is_some() {
        prompt_date("Next action date:", record.next_action_date)?
    } else {
        None
    };

    Ok(FollowUpEdit {
        date,
        method,
        person,
        content,
        result,
        next_action,
        next_action_date,
    })
}

/// Asks for confirmation before a destructive operation
pub fn confirm_delete(what: &str) -> Result<bool> {
    Ok(Confirm::new(&format!("Delete {}? This cannot be undone.", what))
        .with_default(false)
        .prompt()?)
}
