use clap::Subcommand;

use crmdesk_client::QuoteFilters;
use crmdesk_client::services::QuoteService;
use crmdesk_core::records::{QuoteInput, QuoteStatus};

use super::crud::{DataArgs, create, delete, get, list, update, usage_error};

#[derive(Subcommand, Debug)]
pub enum QuoteCommands {
    /// List quotes, most recently modified first (first 50)
    List {
        /// Only quotes whose name contains this text
        #[arg(long)]
        search: Option<String>,
        /// Only quotes with this status (draft, sent, accepted, rejected)
        #[arg(long)]
        status: Option<QuoteStatus>,
    },
    /// Fetch one quote by id
    Get { id: i64 },
    /// Create a quote. Date defaults to today and status to Draft.
    Create {
        #[command(flatten)]
        data: DataArgs,
        /// Use the billing address as the shipping address
        #[arg(long)]
        same_shipping: bool,
    },
    /// Update a quote
    Update {
        id: i64,
        #[command(flatten)]
        data: DataArgs,
        /// Use the billing address as the shipping address
        #[arg(long)]
        same_shipping: bool,
    },
    /// Delete a quote
    Delete { id: i64 },
}

pub async fn run(service: &QuoteService, command: QuoteCommands) -> i32 {
    match command {
        QuoteCommands::List { search, status } => {
            list(service, QuoteFilters { search, status }).await
        }
        QuoteCommands::Get { id } => get(service, id).await,
        QuoteCommands::Create {
            data,
            same_shipping,
        } => match decode(&data, same_shipping) {
            Ok(mut input) => {
                fill_form_defaults(&mut input, chrono::Local::now().date_naive());
                create(service, &input).await
            }
            Err(message) => usage_error(&message),
        },
        QuoteCommands::Update {
            id,
            data,
            same_shipping,
        } => match decode(&data, same_shipping) {
            Ok(input) => update(service, id, &input).await,
            Err(message) => usage_error(&message),
        },
        QuoteCommands::Delete { id } => delete(service, id).await,
    }
}

fn decode(data: &DataArgs, same_shipping: bool) -> Result<QuoteInput, String> {
    let mut input: QuoteInput = data.decode()?;
    if same_shipping {
        input.copy_billing_to_shipping();
    }
    Ok(input)
}

/// A new quote starts as a draft dated today unless the payload says otherwise.
fn fill_form_defaults(input: &mut QuoteInput, today: chrono::NaiveDate) {
    let draft = QuoteInput::draft(String::new(), today);
    if input.quote_date.as_deref().is_none_or(|d| d.trim().is_empty()) {
        input.quote_date = draft.quote_date;
    }
    if input.status.is_none() {
        input.status = draft.status;
    }
}
