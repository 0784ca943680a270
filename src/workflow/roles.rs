use sqlx::PgPool;
use tracing::warn;

use crate::db::models::Role;
use crate::db::repositories::ProfileRepository;
use crate::providers::Principal;

/// Pure role resolution: a stored admin role wins; otherwise the optional
/// configured fallback email grants admin; everyone else is a user.
pub fn resolve_role(
    stored_role: Option<Role>,
    email: &str,
    fallback_admin_email: Option<&str>,
) -> Role {
    if stored_role == Some(Role::Admin) {
        return Role::Admin;
    }
    match fallback_admin_email {
        Some(admin_email) if admin_email.eq_ignore_ascii_case(email) => Role::Admin,
        _ => Role::User,
    }
}

/// Resolve a principal's role from the profile mirror. An unreadable
/// profile degrades to the fallback rule rather than failing the request.
pub async fn role_for(
    pool: &PgPool,
    principal: &Principal,
    fallback_admin_email: Option<&str>,
) -> Role {
    let stored_role = match ProfileRepository::role_of(pool, principal.id).await {
        Ok(role) => role,
        Err(err) => {
            warn!(
                user_id = %principal.id,
                error = %err,
                "unable to read profile role, using fallback rule"
            );
            None
        }
    };

    resolve_role(stored_role, &principal.email, fallback_admin_email)
}
