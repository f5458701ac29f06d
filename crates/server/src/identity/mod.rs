//! Registration, credential checks, and bearer-token sessions.

use chrono::{DateTime, Duration, Utc};
use shared::{IssuedToken, LoginRequest, RegisterRequest, Role};

use crate::{
    config::AuthConfig,
    db::{Database, NewProfile, User},
    error::AppError,
};

mod password;
mod token;

pub use password::{hash_password, verify_password};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_TOKEN: &str = "Invalid or missing access token";

/// Validated registration input.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub full_name: Option<String>,
    pub email: String,
    pub password: String,
    pub profile: NewProfile,
}

/// The authenticated caller of a request, as resolved from its bearer token.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: User,
    pub token_id: i64,
}

#[derive(Clone)]
pub struct IdentityService {
    db: Database,
    config: AuthConfig,
}

impl IdentityService {
    pub fn new(db: Database, config: AuthConfig) -> Self {
        Self { db, config }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<User, AppError> {
        let registration = validate_registration(req, self.config.min_password_length)?;

        // Check if user already exists
        if self.db.get_user_by_email(&registration.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&registration.password)?;

        let user = self
            .db
            .create_user_with_profile(
                registration.full_name.as_deref(),
                &registration.email,
                &password_hash,
                &registration.profile,
            )
            .await
            .map_err(|e| {
                // Lost a race with a concurrent registration
                if is_unique_violation(&e) {
                    AppError::Conflict("Email already registered".to_string())
                } else {
                    AppError::from(e)
                }
            })?;

        tracing::info!("Registered {} account {}", user.role, user.id);
        Ok(user)
    }

    pub async fn login(&self, req: LoginRequest) -> Result<(User, IssuedToken), AppError> {
        let mut errors = Vec::new();
        check_email(&req.email, &mut errors);
        check_password(&req.password, self.config.min_password_length, &mut errors);
        if !errors.is_empty() {
            return Err(AppError::Validation(errors.join("; ")));
        }

        let user = match self.db.get_user_by_email(req.email.trim()).await? {
            Some(user) => user,
            None => {
                // Spend the same hashing cost as a real check
                hash_password(&req.password)?;
                return Err(AppError::AuthError(INVALID_CREDENTIALS.to_string()));
            }
        };

        if !verify_password(&req.password, &user.password_hash)? {
            return Err(AppError::AuthError(INVALID_CREDENTIALS.to_string()));
        }

        let token = self
            .issue_token(user.id, Duration::days(self.config.token_expiry_days))
            .await?;
        tracing::info!("User {} logged in", user.id);
        Ok((user, token))
    }

    pub async fn issue_token(&self, user_id: i64, ttl: Duration) -> Result<IssuedToken, AppError> {
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Internal("Failed to calculate expiration".to_string()))?
            .to_rfc3339();

        let secret = token::generate_secret();
        let id = self
            .db
            .create_access_token(user_id, &token::hash_secret(&secret), &expires_at)
            .await?;

        Ok(IssuedToken {
            token_type: "bearer".to_string(),
            token: token::format_token(id, &secret),
            expires_at,
        })
    }

    /// Resolve a raw bearer token to its owner.
    pub async fn authenticate(&self, raw_token: &str) -> Result<Caller, AppError> {
        let parsed = token::parse_token(raw_token)
            .ok_or_else(|| AppError::AuthError(INVALID_TOKEN.to_string()))?;

        let stored = self
            .db
            .get_access_token(parsed.id)
            .await?
            .ok_or_else(|| AppError::AuthError(INVALID_TOKEN.to_string()))?;

        if !token::secret_matches(parsed.secret, &stored.token_hash) {
            return Err(AppError::AuthError(INVALID_TOKEN.to_string()));
        }

        let expires_at = DateTime::parse_from_rfc3339(&stored.expires_at)
            .map_err(|_| AppError::Internal("Invalid token expiration date".to_string()))?;
        if Utc::now() >= expires_at {
            return Err(AppError::AuthError("Access token has expired".to_string()));
        }

        let user = self
            .db
            .get_user_by_id(stored.user_id)
            .await?
            .ok_or_else(|| AppError::AuthError(INVALID_TOKEN.to_string()))?;

        Ok(Caller {
            user,
            token_id: stored.id,
        })
    }

    /// Revoke the token the caller authenticated with. Other tokens survive.
    pub async fn logout(&self, caller: &Caller) -> Result<(), AppError> {
        if !self.db.delete_access_token(caller.token_id).await? {
            return Err(AppError::NotFound("Access token not found".to_string()));
        }
        tracing::info!("User {} logged out", caller.user.id);
        Ok(())
    }
}

pub fn require_role(user: &User, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden(format!("{}s only", role)));
    }
    Ok(())
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

pub fn validate_registration(
    req: RegisterRequest,
    min_password_length: usize,
) -> Result<Registration, AppError> {
    let mut errors = Vec::new();

    check_email(&req.email, &mut errors);
    check_password(&req.password, min_password_length, &mut errors);

    let full_name = clean(req.full_name);
    if let Some(name) = &full_name {
        if name.chars().count() < 3 {
            errors.push("fullName must be at least 3 characters".to_string());
        }
    }

    let role = match req.role.parse::<Role>() {
        Ok(role) => Some(role),
        Err(_) => {
            errors.push("role must be one of: student, mentor".to_string());
            None
        }
    };

    // Only mentors keep experience
    if role == Some(Role::Mentor) && matches!(req.experience, Some(years) if years < 0) {
        errors.push("experience must not be negative".to_string());
    }

    let profile = match role {
        Some(Role::Student) => Some(NewProfile::Student {
            grade: clean(req.grade),
            class_name: clean(req.class_name),
            school: clean(req.school),
        }),
        Some(Role::Mentor) => Some(NewProfile::Mentor {
            department: clean(req.department),
            experience: req.experience,
            school: clean(req.school),
        }),
        None => None,
    };

    match profile {
        Some(profile) if errors.is_empty() => Ok(Registration {
            full_name,
            email: req.email.trim().to_string(),
            password: req.password,
            profile,
        }),
        _ => Err(AppError::Validation(errors.join("; "))),
    }
}

fn check_email(email: &str, errors: &mut Vec<String>) {
    if !is_valid_email(email.trim()) {
        errors.push("email must be a valid email address".to_string());
    }
}

fn check_password(password: &str, min_length: usize, errors: &mut Vec<String>) {
    if password.chars().count() < min_length {
        errors.push(format!("password must be at least {} characters", min_length));
    }
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Trim, and treat blank strings as absent.
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
