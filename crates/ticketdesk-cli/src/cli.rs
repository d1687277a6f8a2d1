use clap::{Args, Parser, Subcommand};

/// Ticketdesk - admin client for the event ticketing backend
#[derive(Parser)]
#[command(name = "ticketdesk")]
#[command(about = "Manage organizers, participants, users and transactions", long_about = None)]
pub struct Cli {
    /// Log filter when RUST_LOG is unset (e.g. "debug", "ticketdesk_core=trace")
    #[arg(short, long, value_name = "FILTER", default_value = "warn")]
    pub log_level: String,

    /// Override the API base URL from the config file
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in and store the session token
    Login {
        /// Account email (defaults to TICKETDESK_EMAIL or the last used email)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Clear the stored token and end the session
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Counts for organizers, participants and users
    Summary,

    /// List event organizers
    Organizers,

    /// Show one organizer
    Organizer {
        id: String,
    },

    /// Register a new organizer
    RegisterOrganizer(RegisterOrganizerArgs),

    /// List participants
    Participants {
        /// Only participants of this organizer
        #[arg(short, long)]
        organizer: Option<String>,
    },

    /// Register a participant with an organizer
    RegisterParticipant(RegisterParticipantArgs),

    /// List staff accounts
    Users,

    /// Create a staff account
    RegisterUser(RegisterUserArgs),

    /// List an organizer's transactions with totals
    Transactions {
        organizer: String,
    },

    /// Send an authenticated GET and print the raw response
    Get {
        /// Path under the API base URL, or an absolute URL
        path: String,
    },
}

#[derive(Args)]
pub struct RegisterOrganizerArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub phone: Option<String>,
}

#[derive(Args)]
pub struct RegisterParticipantArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub organizer: String,
}

#[derive(Args)]
pub struct RegisterUserArgs {
    #[arg(long)]
    pub email: String,

    /// One of: admin, organizer, staff
    #[arg(long, default_value = "staff")]
    pub role: String,

    /// Organizer the account belongs to
    #[arg(long)]
    pub organizer: Option<String>,
}
