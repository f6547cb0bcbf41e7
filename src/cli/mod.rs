//! Command line parsing and the non-interactive subcommands.

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::api::ApiClient;
use crate::directory::{self, ProviderFilter, SortKey};
use crate::models::Provider;
use crate::session::{
    auth::{self, MAGIC_LINK_FAILED},
    SessionStore,
};

#[derive(Parser, Debug)]
#[command(name = "chivito")]
#[command(about = "Browse local service providers from the terminal")]
#[command(version)]
pub struct Cli {
    /// Backend root, e.g. http://127.0.0.1:8002/api
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// Where the session files live
    #[arg(long, global = true)]
    pub session_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Run the terminal UI (default)
    Tui,

    /// Print the provider directory
    List(ListArgs),

    /// Validate a magic link token and store the session
    Magic {
        #[arg(long)]
        token: Option<String>,
    },

    /// Forget the stored session
    Logout,
}

#[derive(Args, Debug, Default, PartialEq)]
pub struct ListArgs {
    /// Category id; repeat to match any of several
    #[arg(long = "category")]
    pub categories: Vec<i64>,

    /// Service area name; repeat to match any of several
    #[arg(long = "area")]
    pub areas: Vec<String>,

    #[arg(long = "subcategory")]
    pub subcategories: Vec<i64>,

    /// price, rating, area or service
    #[arg(long)]
    pub sort: Option<SortKey>,
}

impl ListArgs {
    pub fn filter(&self) -> ProviderFilter {
        ProviderFilter {
            category_ids: self.categories.iter().copied().collect(),
            subcategory_ids: self.subcategories.iter().copied().collect(),
            areas: self.areas.clone(),
        }
    }
}

pub fn format_row(provider: &Provider) -> String {
    let rating = provider
        .effective_rating()
        .map(|r| format!("{r:.1}★"))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{:>5}  {:<40}  {:<18}  {:<20}  {:>17}  {}",
        provider.id,
        provider.title(),
        provider.first_category_name(),
        provider.display_area(),
        provider.display_price(),
        rating
    )
}

pub async fn list(api: &ApiClient, args: &ListArgs) -> Result<()> {
    let providers = api
        .list_providers()
        .await
        .map_err(|e| anyhow!(e.user_message("Could not load providers right now.")))?;

    let visible = directory::arrange(&providers, &args.filter(), args.sort);
    info!("Listing {} of {} providers", visible.len(), providers.len());

    if visible.is_empty() {
        println!("No providers match these filters.");
        return Ok(());
    }
    for provider in visible {
        println!("{}", format_row(provider));
    }
    Ok(())
}

pub async fn magic(api: &ApiClient, store: &SessionStore, token: Option<&str>) -> Result<()> {
    let user = auth::redeem_magic_link(api, store, token)
        .await
        .map_err(|e| anyhow!(e.user_message(MAGIC_LINK_FAILED)))?;
    println!("Logged in as {} <{}>", user.name, user.email);
    Ok(())
}

pub fn logout(store: &SessionStore) -> Result<()> {
    let had_user = store.is_logged_in();
    store.logout()?;
    if had_user {
        println!("Logged out.");
    } else {
        println!("No stored session.");
    }
    Ok(())
}
