use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    auth::{LOGIN_FAILED_MESSAGE, REGISTER_FAILED_MESSAGE},
    config::normalize_server_url,
    load_settings, local_now, parse_booking_date, AppointmentClient, AuthClient, ClientError,
    ClientEvent, ClientResult, ConfirmOutcome, Credentials, CustomerRegistration, NoticeKind,
    SessionToken, SubmitOutcome,
};
use shared::domain::{format_display_date, AppointmentId, CompanyId, Role};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::broadcast,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "appointments", about = "Book and manage appointments")]
struct Args {
    /// Overrides the server url from client.toml / environment.
    #[arg(long, global = true)]
    server_url: Option<String>,
    #[arg(long, env = "APPOINTMENTS_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,
    #[arg(long, value_enum, default_value_t = RoleArg::Customer, global = true)]
    role: RoleArg,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Customer,
    CompanyAdmin,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Customer => Role::Customer,
            RoleArg::CompanyAdmin => Role::CompanyAdmin,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and print the session token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "APPOINTMENTS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create a customer account.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "APPOINTMENTS_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        firstname: String,
        #[arg(long)]
        lastname: String,
    },
    /// List appointments, earliest first.
    Appointments,
    /// List companies that accept bookings.
    Companies,
    /// Book an appointment with a company.
    Book {
        #[arg(long)]
        company: String,
        /// Local date and time, e.g. 2030-01-01T10:00. Defaults to now.
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Change an appointment's status.
    SetStatus {
        id: String,
        /// One of Pending, Confirmed, Cancelled, Completed.
        status: String,
    },
    /// Delete an appointment after confirmation.
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings()?;
    if let Some(server_url) = &args.server_url {
        settings.server_url = normalize_server_url(server_url)?;
    }
    let role = Role::from(args.role);
    debug!(server_url = %settings.server_url, ?role, "cli: settings loaded");

    let client = AppointmentClient::new(&settings, role);
    let mut events = client.subscribe_events();
    if let Some(token) = args.token.as_deref().filter(|token| !token.trim().is_empty()) {
        client.session().establish(SessionToken::new(token)).await;
    }

    let result = match args.command {
        Command::Login { email, password } => {
            let credentials = Credentials {
                email,
                password,
                role,
            };
            match AuthClient::new(&settings.server_url)
                .login(&credentials, client.session())
                .await
            {
                Ok(token) => {
                    println!("{}", token.expose());
                    Ok(())
                }
                Err(err) => {
                    eprintln!("{}", err.user_message(LOGIN_FAILED_MESSAGE));
                    Err(err)
                }
            }
        }
        Command::Register {
            email,
            password,
            firstname,
            lastname,
        } => {
            let registration = CustomerRegistration {
                email,
                password,
                firstname,
                lastname,
            };
            match AuthClient::new(&settings.server_url)
                .register_customer(&registration)
                .await
            {
                Ok(()) => {
                    println!("Registration complete. You can sign in now.");
                    Ok(())
                }
                Err(err) => {
                    eprintln!("{}", err.user_message(REGISTER_FAILED_MESSAGE));
                    Err(err)
                }
            }
        }
        Command::Appointments => list_appointments(&client).await,
        Command::Companies => list_companies(&client).await,
        Command::Book {
            company,
            date,
            notes,
        } => book(&client, CompanyId::new(company), date, &notes).await,
        Command::SetStatus { id, status } => {
            client
                .coordinator()
                .update_status(&AppointmentId::new(id), &status)
                .await
        }
        Command::Delete { id, yes } => delete(&client, AppointmentId::new(id), yes).await,
    };

    print_events(&mut events);
    Ok(match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(ClientError::Validation(err)) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
        Err(err) => {
            debug!("cli: command failed: {err}");
            ExitCode::FAILURE
        }
    })
}

async fn list_appointments(client: &AppointmentClient) -> ClientResult<()> {
    client.store().load().await?;
    let snapshot = client.store().snapshot().await;
    if snapshot.appointments.is_empty() {
        println!("No appointments.");
    }
    for appointment in snapshot.appointments_by_date() {
        let counterpart = match client.role() {
            Role::Customer => appointment.company_name.as_deref(),
            Role::CompanyAdmin => appointment.customer_full_name.as_deref(),
        };
        println!(
            "{}  {}  {:<9}  {}  {}",
            appointment.id,
            format_display_date(&appointment.date),
            appointment.status.label(),
            counterpart.unwrap_or("-"),
            appointment.notes.as_deref().unwrap_or(""),
        );
    }
    Ok(())
}

async fn list_companies(client: &AppointmentClient) -> ClientResult<()> {
    let (_, companies) = client.store().load().await?;
    for company in companies {
        println!(
            "{}  {}  {}  {}",
            company.id, company.name, company.address, company.phone_number
        );
    }
    Ok(())
}

async fn book(
    client: &AppointmentClient,
    company_id: CompanyId,
    date: Option<String>,
    notes: &str,
) -> ClientResult<()> {
    let date = date.as_deref().map(parse_booking_date).transpose()?;
    client.store().load().await?;
    let company = client.store().snapshot().await.company(&company_id)?.clone();

    let workflow = client.booking_workflow();
    workflow.open(company, local_now()).await;
    if date.is_some() {
        workflow.set_date(date).await?;
    }
    workflow.set_notes(notes).await?;

    if let SubmitOutcome::Created(created) = workflow.submit(client.coordinator()).await? {
        println!(
            "{}  {}  {}",
            created.id,
            format_display_date(&created.date),
            created.status.label()
        );
    }
    Ok(())
}

async fn delete(client: &AppointmentClient, id: AppointmentId, yes: bool) -> ClientResult<()> {
    let workflow = client.confirmation_workflow();
    workflow.request(id.clone()).await;

    if !yes && !prompt_confirmation(&id).await {
        workflow.decline().await;
        println!("Cancelled.");
        return Ok(());
    }

    if let ConfirmOutcome::Deleted(deleted) = workflow.confirm(client.coordinator()).await? {
        debug!(appointment_id = %deleted, "cli: deleted");
    }
    Ok(())
}

async fn prompt_confirmation(id: &AppointmentId) -> bool {
    let mut stdout = tokio::io::stdout();
    let question = format!(
        "Delete appointment ({}...)? This cannot be undone. [y/N] ",
        id.short()
    );
    if stdout.write_all(question.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
        return false;
    }

    let mut line = String::new();
    let answered = BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read confirmation");
    match answered {
        Ok(_) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(err) => {
            debug!("cli: {err:#}");
            false
        }
    }
}

fn print_events(events: &mut broadcast::Receiver<ClientEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            ClientEvent::Notice(notice) => match notice.kind {
                NoticeKind::Error => eprintln!("{}", notice.text),
                NoticeKind::Success | NoticeKind::InProgress => println!("{}", notice.text),
            },
            ClientEvent::RedirectScheduled { reason, .. } => eprintln!("{}", reason.message()),
            ClientEvent::NavigateToLogin { .. }
            | ClientEvent::NoticesCleared
            | ClientEvent::StoreReloaded { .. } => {}
        }
    }
}
