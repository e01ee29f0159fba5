use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use xnat_access::XnatClient;
use xnat_access::config::{Config, ConfigLoader};
use xnat_access::error::XnatError;
use xnat_access::output::{OutputMode, Printer};
use xnat_access::transport::Transport;

#[derive(Parser)]
#[command(name = "xnat-nav")]
#[command(about = "Browse an XNAT server: projects, subjects, sessions, scans, resources and files")]
#[command(version, author)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(flatten)]
    path: PathArgs,

    #[arg(long, global = true, help = "Print results as JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnectionArgs {
    #[arg(long, global = true, help = "Connection profile (default: ./xnat.json)")]
    config: Option<String>,

    #[arg(long, global = true)]
    server: Option<String>,

    #[arg(long, global = true)]
    user: Option<String>,

    #[arg(long, global = true)]
    password: Option<String>,

    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Args, Default)]
struct PathArgs {
    #[arg(long, global = true)]
    project: Option<String>,

    #[arg(long, global = true)]
    subject: Option<String>,

    #[arg(long, global = true)]
    session: Option<String>,

    #[arg(long, global = true)]
    scan: Option<String>,

    #[arg(long, global = true)]
    resource: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Issue a short-lived alias/secret token pair")]
    Token,
    #[command(about = "Print a JSESSION id")]
    Jsession,
    #[command(about = "List project ids")]
    Projects,
    #[command(about = "List subject labels of --project")]
    Subjects,
    #[command(about = "List session labels of --subject")]
    Sessions,
    #[command(about = "Print the xsiType of a session")]
    SessionType { label: String },
    #[command(about = "Print the server-side id of --session")]
    SessionId,
    #[command(about = "List scan ids of --session")]
    Scans,
    #[command(about = "List resource labels of --session")]
    Resources,
    #[command(about = "Check whether --session has a resource")]
    ResourceExists { label: String },
    #[command(about = "List file names in --resource")]
    Files,
    #[command(about = "Print a file from --resource")]
    Cat { file: String },
    #[command(about = "Print a scan data field, or all of them to stderr")]
    ScanField {
        scan_number: String,
        field: Option<String>,
    },
    #[command(about = "Print a scan meta value, or all of them to stderr")]
    ScanMeta {
        scan_number: String,
        field: Option<String>,
    },
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<XnatError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &XnatError) -> u8 {
    if error.is_not_found() {
        2
    } else if error.is_upstream() {
        3
    } else {
        1
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let printer = Printer::new(if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Plain
    });

    let overrides = Config {
        server: cli.connection.server,
        user: cli.connection.user,
        password: cli.connection.password,
        timeout_secs: cli.connection.timeout_secs,
    };
    let resolved = ConfigLoader::resolve(cli.connection.config.as_deref(), overrides)?;
    let mut client = XnatClient::from_config(&resolved)?;

    navigate(&mut client, &cli.path)?;
    run_command(cli.command, &client, &printer)
}

/// Selects every level given on the command line, top-down.
fn navigate<T: Transport>(client: &mut XnatClient<T>, path: &PathArgs) -> Result<(), XnatError> {
    if let Some(project) = &path.project {
        client.set_project(project)?;
    }
    if let Some(subject) = &path.subject {
        client.set_subject(subject)?;
    }
    if let Some(session) = &path.session {
        client.set_session(session)?;
    }
    if let Some(scan) = &path.scan {
        client.set_scan(scan)?;
    }
    if let Some(resource) = &path.resource {
        client.set_resource(resource)?;
    }
    Ok(())
}

fn run_command<T: Transport>(
    command: Commands,
    client: &XnatClient<T>,
    printer: &Printer,
) -> miette::Result<()> {
    let result = match command {
        Commands::Token => printer.print_token(&client.issue_token()?),
        Commands::Jsession => printer.print_text(&client.jsession_id()?),
        Commands::Projects => printer.print_list(&client.project_ids()?),
        Commands::Subjects => printer.print_list(&client.subject_labels()?),
        Commands::Sessions => printer.print_list(&client.session_labels()?),
        Commands::SessionType { label } => printer.print_text(&client.session_type(&label)?),
        Commands::SessionId => printer.print_text(&client.xnat_session_id()?),
        Commands::Scans => printer.print_list(&client.scan_ids()?),
        Commands::Resources => printer.print_list(&client.resource_labels()?),
        Commands::ResourceExists { label } => {
            printer.print_flag(client.does_resource_exist(&label)?)
        }
        Commands::Files => printer.print_list(&client.resource_file_names()?),
        Commands::Cat { file } => printer.print_text(&client.file_content(&file)?),
        Commands::ScanField { scan_number, field } => match field {
            Some(field) => printer.print_value(&client.scan_data_field(&scan_number, &field)?),
            None => {
                client.show_scan_data_fields(&scan_number, &mut std::io::stderr())?;
                Ok(())
            }
        },
        Commands::ScanMeta { scan_number, field } => match field {
            Some(field) => printer.print_value(&client.scan_meta_value(&scan_number, &field)?),
            None => {
                client.show_scan_meta(&scan_number, &mut std::io::stderr())?;
                Ok(())
            }
        },
    };
    result.into_diagnostic()
}
