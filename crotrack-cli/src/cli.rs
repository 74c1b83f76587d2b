use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Sales-pipeline and project tracking for a contract research lab")]
pub struct Cli {
    /// Book name to use from the central registry
    #[clap(long, short = 'b')]
    pub book: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum ClientCommand {
    /// Add a new client
    Add {
        /// Company name
        #[clap(long)]
        name: Option<String>,

        /// Business registration number
        #[clap(long)]
        business_no: Option<String>,

        /// Industry sector
        #[clap(long)]
        industry: Option<String>,

        /// Mailing address
        #[clap(long)]
        address: Option<String>,

        /// Free-text memo
        #[clap(long)]
        memo: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// List all clients
    List,

    /// Show details for a specific client
    Show {
        /// The name or id of the client to show
        client: String,
    },

    /// Edit an existing client
    Edit {
        /// The name or id of the client to edit
        client: String,
    },

    /// Delete a client and everything under it
    Del {
        /// The name or id of the client to delete
        client: String,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum RequesterCommand {
    /// Add a requester under a client
    Add {
        /// The name or id of the client
        client: String,

        /// Contact name
        #[clap(long)]
        name: Option<String>,

        /// Department within the client organization
        #[clap(long)]
        department: Option<String>,

        /// Phone number
        #[clap(long)]
        phone: Option<String>,

        /// Email address
        #[clap(long)]
        email: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// List requesters under a client
    List {
        /// The name or id of the client
        client: String,
    },

    /// Edit an existing requester
    Edit {
        /// The name or id of the client
        client: String,

        /// The name or id of the requester
        requester: String,
    },

    /// Delete a requester and all of its projects
    Del {
        /// The name or id of the client
        client: String,

        /// The name or id of the requester
        requester: String,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Add a project under a requester
    Add {
        /// The name or id of the client
        client: String,

        /// The name or id of the requester
        #[clap(long)]
        requester: Option<String>,

        /// Quote number (unique across the whole book)
        #[clap(long)]
        quote_no: Option<String>,

        /// Secondary project number
        #[clap(long)]
        project_no: Option<String>,

        /// What is being tested
        #[clap(long)]
        test_item: Option<String>,

        /// Quote date (YYYY-MM-DD)
        #[clap(long)]
        quote_date: Option<String>,

        /// Quoted amount
        #[clap(long)]
        quoted_amount: Option<i64>,

        /// Contracted amount
        #[clap(long)]
        contracted_amount: Option<i64>,

        /// Free-text status note
        #[clap(long)]
        status: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// List all projects, optionally under one client
    List {
        /// Restrict to a single client (name or id)
        #[clap(long)]
        client: Option<String>,
    },

    /// Show details for a project, including stages, tests and follow-ups
    Show {
        /// Quote number of the project
        quote_no: String,
    },

    /// Edit the editable fields of a project
    Edit {
        /// Quote number of the project
        quote_no: String,
    },

    /// Delete a project
    Del {
        /// The name or id of the client owning the project
        client: String,

        /// Quote number of the project
        quote_no: String,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum StageCommand {
    /// List the stages of a project
    List {
        /// Quote number of the project
        quote_no: String,
    },

    /// Advance a stage one step along the Pending -> In Progress ->
    /// Completed cycle
    Advance {
        /// Quote number of the project
        quote_no: String,

        /// Stage name or 1-based position
        stage: String,
    },

    /// Edit a stage's status, date and notes (the only path to On Hold)
    Edit {
        /// Quote number of the project
        quote_no: String,

        /// Stage name or 1-based position
        stage: String,

        /// New status (pending, in-progress, completed, on-hold)
        #[clap(long)]
        status: Option<String>,

        /// Stage date (YYYY-MM-DD)
        #[clap(long)]
        date: Option<String>,

        /// Stage notes
        #[clap(long)]
        notes: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum TestCommand {
    /// Add a lab test to a project
    Add {
        /// Quote number of the project
        quote_no: String,

        /// Lab-assigned test number
        #[clap(long)]
        test_no: Option<String>,

        /// Name of the test
        #[clap(long)]
        name: Option<String>,

        /// Person managing the test
        #[clap(long)]
        manager: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[clap(long)]
        start_date: Option<String>,

        /// End date (YYYY-MM-DD)
        #[clap(long)]
        end_date: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// List the tests of a project
    List {
        /// Quote number of the project
        quote_no: String,
    },

    /// Edit an existing test
    Edit {
        /// Quote number of the project
        quote_no: String,

        /// Test number of the test to edit
        test_no: String,
    },

    /// Delete a test
    Del {
        /// Quote number of the project
        quote_no: String,

        /// Test number of the test to delete
        test_no: String,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum FollowUpCommand {
    /// Log a follow-up contact on a project
    Add {
        /// Quote number of the project
        quote_no: String,

        /// Contact method (phone, email, meeting, visit, messenger)
        #[clap(long)]
        method: Option<String>,

        /// Who was contacted
        #[clap(long)]
        person: Option<String>,

        /// What was discussed
        #[clap(long)]
        content: Option<String>,

        /// Outcome (positive, neutral, negative, no-response)
        #[clap(long)]
        result: Option<String>,

        /// Planned next action
        #[clap(long)]
        next_action: Option<String>,

        /// Next action date (YYYY-MM-DD)
        #[clap(long)]
        next_action_date: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// List the follow-up records of a project
    List {
        /// Quote number of the project
        quote_no: String,
    },

    /// Edit a follow-up record by its position in the list
    Edit {
        /// Quote number of the project
        quote_no: String,

        /// 1-based position from `followup list`
        position: usize,
    },

    /// Delete a follow-up record by its position in the list
    Del {
        /// Quote number of the project
        quote_no: String,

        /// 1-based position from `followup list`
        position: usize,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum SelectCommand {
    /// Select a client for the detail view
    Client {
        /// The name or id of the client
        client: String,
    },

    /// Select a project under the selected client
    Project {
        /// Quote number of the project
        quote_no: String,
    },

    /// Clear the selection
    Clear,

    /// Show what the current selection resolves to
    Show,
}

#[derive(Subcommand, Debug)]
pub enum BookCommand {
    /// Register a book in the registry
    Register {
        /// Name of the book
        #[clap(long)]
        name: Option<String>,

        /// Path to the book file
        #[clap(long)]
        path: Option<PathBuf>,

        /// Description of the book
        #[clap(long)]
        description: Option<String>,

        /// Set this book as the default
        #[clap(long)]
        default: bool,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// List all registered books
    List,

    /// Print the path to the book file
    Path {
        /// The name of the book to look up
        #[clap(long)]
        name: Option<String>,
    },

    /// Set the default book
    Default {
        /// The name of the book
        name: String,
    },

    /// Migrate a book between YAML and SQLite backends
    Migrate {
        /// Source file (.yaml or .db)
        source: PathBuf,

        /// Destination file (.yaml or .db)
        dest: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ImportCommand {
    /// Import projects from a CSV file
    Csv {
        /// Path to the CSV file
        path: PathBuf,
    },

    /// Restore a book from a JSON backup
    Json {
        /// Path to the JSON file
        path: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Client management commands
    #[clap(subcommand)]
    Client(ClientCommand),

    /// Requester management commands
    #[clap(subcommand)]
    Requester(RequesterCommand),

    /// Project management commands
    #[clap(subcommand)]
    Project(ProjectCommand),

    /// Stage management commands
    #[clap(subcommand)]
    Stage(StageCommand),

    /// Lab test management commands
    #[clap(subcommand)]
    Test(TestCommand),

    /// Follow-up record commands
    #[clap(subcommand)]
    Followup(FollowUpCommand),

    /// Selection commands
    #[clap(subcommand)]
    Select(SelectCommand),

    /// Show a pipeline summary
    Dashboard,

    /// Bulk import commands
    #[clap(subcommand)]
    Import(ImportCommand),

    /// Export the book to different formats
    Export {
        /// Output format (json, csv, pipeline)
        #[clap(long, short = 'f', default_value = "json")]
        format: String,

        /// Output file path
        #[clap(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Book management commands
    #[clap(subcommand)]
    Book(BookCommand),

    /// Watch the book for remote changes and print them as they arrive
    Watch {
        /// Poll interval in seconds
        #[clap(long, default_value_t = 2)]
        interval: u64,
    },

    /// Show the signed-in user
    Whoami,

    /// Sign out and stop syncing
    Signout,
}
