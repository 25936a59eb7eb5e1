use std::{env, process};

use structopt::StructOpt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use userdesk::{
    persist::{Config, FileStorage, Persistor},
    store::{Status, Store},
    view::{self, Lookup, NewUser, SortOption},
    Client,
};

#[derive(Debug, StructOpt)]
enum Opt {
    /// List users, fetching them first if nothing is stored yet.
    List {
        /// Only show users whose name or email contains this.
        #[structopt(long, short, default_value = "")]
        search: String,
        /// default, name-asc, name-desc, email-asc or email-desc.
        #[structopt(long, default_value = "default")]
        sort: SortOption,
    },
    /// Show one user.
    Show { id: String },
    /// Add a user.
    Add {
        #[structopt(long)]
        name: String,
        #[structopt(long)]
        email: String,
        #[structopt(long, default_value = "")]
        company: String,
    },
    /// Edit fields of a user, e.g. `edit 1 address.street="Victor Plains"`.
    Edit { id: String, fields: Vec<String> },
    /// Delete a user.
    Delete { id: String },
    /// Fetch the remote list again, replacing local changes.
    Refresh,
    /// Forget everything stored locally.
    Purge,
}

fn print_state(store: &Store) {
    match store.status() {
        Status::Loading => println!("Loading users..."),
        Status::Failed => println!("Error: {}", store.error().unwrap_or_default()),
        _ => {}
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let opt = Opt::from_args();
    let client = Client::new()?;
    let state_dir = env::var("USERDESK_STATE_DIR").unwrap_or_else(|_| ".userdesk".to_string());
    let store = Store::open(Persistor::new(FileStorage::new(state_dir), Config::default()));
    tracing::debug!(version = %client.version(), url = %client.url(), "starting");

    match opt {
        Opt::List { search, sort } => {
            store.ensure_loaded(&client.users).await;
            if store.status() == Status::Failed {
                print_state(&store);
                process::exit(1);
            }
            let users = store.users();
            for user in view::filter_and_sort(&users, &search, sort) {
                println!(
                    "{:>14}  {:<26} {:<28} {}",
                    user.id, user.name, user.email, user.company.name
                );
            }
        }
        Opt::Show { id } => {
            store.ensure_loaded(&client.users).await;
            match view::lookup(&store.snapshot(), &id) {
                Lookup::Found(user) => {
                    println!("{}", user.name);
                    println!("Email:   {}", user.email);
                    println!("Company: {}", user.company.name);
                    println!("Address: {}", user.full_address());
                    println!("Phone:   {}", user.phone);
                    println!("Website: {}", user.website);
                }
                Lookup::NotFound => {
                    println!("User not found.");
                    process::exit(1);
                }
                Lookup::Loading => print_state(&store),
            }
        }
        Opt::Add {
            name,
            email,
            company,
        } => {
            let user = NewUser {
                name,
                email,
                company_name: company,
            }
            .into_user_now()?;
            println!("Added user {}", user.id);
            store.add(user);
        }
        Opt::Edit { id, fields } => {
            let mut user = match view::lookup(&store.snapshot(), &id) {
                Lookup::Found(user) => user,
                _ => {
                    println!("User not found.");
                    process::exit(1);
                }
            };
            for field in fields {
                let (name, value) = field
                    .split_once('=')
                    .ok_or_else(|| format!("expected field=value, got {field}"))?;
                view::apply_edit(&mut user, name, value)?;
            }
            store.update(user);
        }
        Opt::Delete { id } => match view::parse_route_id(&id) {
            Some(id) if store.delete(id) => println!("Deleted user {id}"),
            _ => println!("User not found."),
        },
        Opt::Refresh => {
            store.fetch_all(&client.users).await;
            print_state(&store);
            println!("{} users", store.users().len());
        }
        Opt::Purge => store.purge()?,
    };

    Ok(())
}
