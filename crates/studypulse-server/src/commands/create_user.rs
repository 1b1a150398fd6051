//! The `studypulse create-user` command.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use uuid::Uuid;

use studypulse_core::model::{normalize_email, Role, User};
use studypulse_core::store::StorageError;
use studypulse_server::auth::hash_password;
use studypulse_server::load_app_config;

pub async fn execute(
    email: String,
    name: String,
    password: String,
    admin: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let email = normalize_email(&email);
    if !email.contains('@') {
        bail!("invalid email address: {email}");
    }
    if password.chars().count() < 6 {
        bail!("password must be at least 6 characters long");
    }

    let config = load_app_config(config_path.as_deref())?;
    let storage = super::open_storage(&config).await?;

    let user = User {
        id: Uuid::new_v4(),
        email,
        name: name.trim().to_string(),
        password_hash: hash_password(&password).context("failed to hash password")?,
        role: if admin { Role::Admin } else { Role::Student },
        created_at: Utc::now(),
    };
    match storage.users.insert(&user).await {
        Ok(()) => {}
        Err(StorageError::Conflict) => bail!("a user with email {} already exists", user.email),
        Err(e) => return Err(e.into()),
    }

    println!("Created {} {} ({})", user.role, user.email, user.id);
    Ok(())
}
