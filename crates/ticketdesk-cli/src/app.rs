//! Application root.
//!
//! Builds the shared credential store, session provider and unauthorized
//! bridge, mounts the redirect handler once, and runs a single command.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use ticketdesk_core::api::{AuthFetch, DashboardClient};
use ticketdesk_core::auth::{
    CredentialStore, FileSessionProvider, MountedRedirectHandler, RedirectHandler, RedirectState, Role,
    UnauthorizedBridge,
};
use ticketdesk_core::models::{NewOrganizer, NewParticipant, NewUser, TransactionTotals};
use ticketdesk_core::Config;

use crate::cli::{Command, RegisterOrganizerArgs, RegisterParticipantArgs, RegisterUserArgs};
use crate::navigator::TerminalNavigator;

/// Environment variable with the login email
const EMAIL_ENV: &str = "TICKETDESK_EMAIL";

/// Environment variable with the login password
const PASSWORD_ENV: &str = "TICKETDESK_PASSWORD";

/// How long to wait for an in-flight redirect before exiting
const REDIRECT_WAIT_SECS: u64 = 5;

pub struct App {
    config: Config,
    store: CredentialStore,
    session: Arc<FileSessionProvider>,
    client: DashboardClient,
    navigator: Arc<TerminalNavigator>,
    redirect: MountedRedirectHandler,
}

impl App {
    /// Must be called inside the Tokio runtime (the redirect handler needs it).
    pub fn new(config: Config, cache_dir: PathBuf, location: &str) -> Result<Self> {
        debug!(?cache_dir, storage = ?config.storage, "Building application");

        let store = config.credential_store(cache_dir.clone());
        let session = Arc::new(FileSessionProvider::new(cache_dir));
        let bridge = UnauthorizedBridge::new();
        let navigator = Arc::new(TerminalNavigator::new(location));

        let redirect = RedirectHandler::new(
            store.clone(),
            session.clone(),
            navigator.clone(),
            config.login_route.clone(),
        )
        .mount(&bridge)
        .context("Failed to mount redirect handler")?;

        let fetch = AuthFetch::new(
            config.api_base_url.clone(),
            store.clone(),
            session.clone(),
            bridge,
            config.request_timeout(),
        )
        .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            store,
            session,
            client: DashboardClient::new(fetch),
            navigator,
            redirect,
        })
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        let result = self.dispatch(command).await;

        // A 401 anywhere above has started a redirect; let it finish so the
        // session is really signed out before the process exits.
        if self.redirect.state() == RedirectState::Redirecting {
            if tokio::time::timeout(Duration::from_secs(REDIRECT_WAIT_SECS), self.redirect.wait_redirected())
                .await
                .is_err()
            {
                warn!("Timed out waiting for sign-out to finish");
            }
            let target = self.navigator.redirected_to().unwrap_or_else(|| self.config.login_route.clone());
            return Err(anyhow::anyhow!("Not signed in (redirected to {})", target));
        }

        result
    }

    async fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Login { email } => self.login(email).await,
            Command::Logout => {
                self.client.logout().await?;
                println!("Signed out.");
                Ok(())
            }
            Command::Whoami => self.whoami().await,
            Command::Summary => {
                let summary = self.client.summary().await;
                let show = |n: Option<usize>| n.map(|n| n.to_string()).unwrap_or_else(|| "unavailable".into());
                println!("Organizers:   {}", show(summary.organizers));
                println!("Participants: {}", show(summary.participants));
                println!("Users:        {}", show(summary.users));
                Ok(())
            }
            Command::Organizers => {
                let organizers = self.client.organizers().await?;
                for o in &organizers {
                    println!("{:<24} {:<32} {}", o.id, o.name, o.contact());
                }
                println!("{} organizer(s)", organizers.len());
                Ok(())
            }
            Command::Organizer { id } => {
                let organizer = self.client.organizer(&id).await?;
                println!("{}", serde_json::to_string_pretty(&organizer)?);
                Ok(())
            }
            Command::RegisterOrganizer(args) => self.register_organizer(args).await,
            Command::Participants { organizer } => {
                let participants = self.client.participants(organizer.as_deref()).await?;
                for p in &participants {
                    println!(
                        "{:<24} {:<32} {}",
                        p.id,
                        p.name,
                        p.email.as_deref().unwrap_or("-")
                    );
                }
                println!("{} participant(s)", participants.len());
                Ok(())
            }
            Command::RegisterParticipant(args) => self.register_participant(args).await,
            Command::Users => {
                let users = self.client.users().await?;
                for u in &users {
                    println!(
                        "{:<24} {:<32} {:<10} {}",
                        u.id,
                        u.email,
                        u.role.display_name(),
                        u.organizer_id.as_deref().unwrap_or("-")
                    );
                }
                println!("{} user(s)", users.len());
                Ok(())
            }
            Command::RegisterUser(args) => self.register_user(args).await,
            Command::Transactions { organizer } => {
                let transactions = self.client.transactions(&organizer).await?;
                for t in &transactions {
                    let when = t
                        .created_at
                        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".into());
                    println!("{:<24} {:>12.2} {}", t.id, t.amount, when);
                }
                let totals = TransactionTotals::from_transactions(&transactions);
                println!("{} transaction(s), total {:.2}", totals.count, totals.amount);
                Ok(())
            }
            Command::Get { path } => {
                let response = self.client.fetch().get(&path).await;
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                println!("{}", status);
                println!("{}", body);
                Ok(())
            }
        }
    }

    async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email
            .or_else(|| std::env::var(EMAIL_ENV).ok())
            .or_else(|| self.config.last_email.clone())
        {
            Some(email) => email,
            None => Self::prompt("Email: ")?,
        };
        let password = match std::env::var(PASSWORD_ENV) {
            Ok(password) if !password.is_empty() => password,
            _ => rpassword::prompt_password(format!("Password for {}: ", email))?,
        };

        let data = match self.client.login(&email, &password).await {
            Ok(data) => data,
            Err(e) if e.is_unauthorized() => anyhow::bail!("Invalid email or password"),
            Err(e) => return Err(e.into()),
        };

        self.config.last_email = Some(email);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        println!(
            "Signed in as {} ({}).",
            data.email,
            data.role.display_name()
        );
        Ok(())
    }

    async fn whoami(&self) -> Result<()> {
        match self.session.current().await {
            Some(data) => {
                println!("Email:     {}", data.email);
                println!("Role:      {}", data.role.display_name());
                println!("Organizer: {}", data.organizer_id.as_deref().unwrap_or("-"));
                println!("Expires:   in {} day(s)", data.days_until_expiry());
                if self.store.get().is_none() {
                    // The fetch wrapper will fall back to the session token
                    println!("Note:      no stored credential, using session token");
                }
            }
            None => println!("Not signed in."),
        }
        Ok(())
    }

    async fn register_organizer(&self, args: RegisterOrganizerArgs) -> Result<()> {
        let organizer = self
            .client
            .register_organizer(&NewOrganizer {
                name: args.name,
                email: args.email,
                phone: args.phone,
            })
            .await?;
        println!("Registered organizer {} ({}).", organizer.name, organizer.id);
        Ok(())
    }

    async fn register_participant(&self, args: RegisterParticipantArgs) -> Result<()> {
        let participant = self
            .client
            .register_participant(&NewParticipant {
                name: args.name,
                email: args.email,
                organizer_id: args.organizer,
            })
            .await?;
        println!("Registered participant {} ({}).", participant.name, participant.id);
        Ok(())
    }

    async fn register_user(&self, args: RegisterUserArgs) -> Result<()> {
        let role: Role = args.role.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        let password = rpassword::prompt_password(format!("Password for {}: ", args.email))?;

        let user = self
            .client
            .register_user(&NewUser {
                email: args.email,
                password,
                role,
                organizer_id: args.organizer,
            })
            .await?;
        info!(id = %user.id, "User created");
        println!("Created user {} ({}).", user.email, user.role.display_name());
        Ok(())
    }

    fn prompt(label: &str) -> Result<String> {
        print!("{}", label);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }
}
