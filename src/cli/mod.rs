// Management commands, operating directly on the configured store. The
// server does not need to be running.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::auth;
use crate::config;
use crate::model::PASSWORD_FIELD;
use crate::state::AppState;
use crate::store::Document;

#[derive(Parser)]
#[command(name = "mytasks")]
#[command(about = "MyTasks management CLI")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create a user")]
    Useradd {
        name: String,
        #[arg(long, help = "Password for the new user; without one the user cannot log in")]
        password: Option<String>,
    },

    #[command(about = "Set a user's password")]
    Passwd { name: String, password: String },

    #[command(about = "List users")]
    Users,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::from_config(config::config());
    let tree = &state.tree;

    match cli.command {
        Commands::Useradd { name, password } => {
            let mut attributes = Document::new();
            attributes.insert("name".into(), Value::String(name));
            if let Some(password) = password {
                let hash = auth::hash_password(&password)?;
                attributes.insert(PASSWORD_FIELD.into(), Value::String(hash));
            }
            let user = tree.create_user(attributes).await.context("cannot create user")?;
            println!("created user {} ({})", user.name(), user.id);
        }
        Commands::Passwd { name, password } => {
            let mut user = tree
                .find_user_by_name(&name)
                .await?
                .with_context(|| format!("user not found: {}", name))?;
            auth::set_password(&mut user, &password)?;
            let mut partial = Document::new();
            partial.insert(
                PASSWORD_FIELD.into(),
                user.attributes.get(PASSWORD_FIELD).cloned().unwrap_or(Value::Null),
            );
            tree.update(&user, partial).await.context("cannot save password")?;
            println!("password updated for {}", name);
        }
        Commands::Users => {
            let docs = tree
                .store()
                .list(crate::store::Collection::Users, &crate::store::ListFilter::default())
                .await?;
            for doc in docs {
                let id = doc.get("id").and_then(Value::as_str).unwrap_or_default();
                let name = doc.get("name").and_then(Value::as_str).unwrap_or_default();
                println!("{}\t{}", id, name);
            }
        }
    }
    Ok(())
}
