use time::OffsetDateTime;
use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::services::seed;

pub(crate) async fn ensure_superuser(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_superuser_password.is_empty() {
        tracing::warn!("FIRST_SUPERUSER_PASSWORD not configured; skipping superuser creation");
        return Ok(());
    }

    let username = &admin.first_superuser_username;
    let memory_kib = state.settings().security().password_hash_memory_kib;
    let now = OffsetDateTime::now_utc();

    if let Some(mut user) = state.store().find_user_by_username(username).await? {
        let password_matches =
            security::verify_password(&admin.first_superuser_password, &user.hashed_password)
                .unwrap_or(false);
        if password_matches && user.role == UserRole::Admin {
            tracing::info!("Default superuser already up to date");
            return Ok(());
        }

        if !password_matches {
            user.hashed_password =
                security::hash_password(&admin.first_superuser_password, memory_kib)?;
        }
        user.role = UserRole::Admin;
        user.updated_at = now;
        state.store().save_user(&user).await?;

        tracing::info!("Updated default superuser {username}");
        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_superuser_password, memory_kib)?;
    state
        .store()
        .create_user(User {
            id: Uuid::new_v4().to_string(),
            username: username.clone(),
            hashed_password,
            first_name: "Kambaz".to_string(),
            last_name: "Administrator".to_string(),
            email: None,
            section: None,
            role: UserRole::Admin,
            last_activity: None,
            created_at: now,
            updated_at: now,
        })
        .await?;

    tracing::info!("Created default superuser {username}");
    Ok(())
}

/// Loads the configured seed file into an empty store. Must run before
/// `ensure_superuser`, which would otherwise make the store non-empty.
pub(crate) async fn load_seed_data(state: &AppState) -> anyhow::Result<()> {
    let Some(path) = state.settings().seed().path.clone() else {
        tracing::info!("Seed data disabled");
        return Ok(());
    };
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Seed file not found; starting with an empty store");
        return Ok(());
    }

    let data = seed::read_seed(&path)?;
    seed::load_seed(state, data).await?;
    Ok(())
}
