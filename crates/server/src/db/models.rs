use shared::{Role, StudentSummary, UserInfo};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub full_name: Option<String>,
    pub email: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl User {
    pub fn info(&self) -> UserInfo {
        UserInfo {
            id: self.id,
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

#[cfg(test)]
#[derive(Debug, Clone, FromRow)]
pub struct StudentProfile {
    pub id: i64,
    pub user_id: i64,
    pub grade: Option<String>,
    pub class_name: Option<String>,
    pub school: Option<String>,
    pub progress_summary: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct MentorProfile {
    pub id: i64,
    pub user_id: i64,
    pub department: Option<String>,
    pub experience: Option<i64>,
    pub school: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Student profile joined with the owning user's display name.
#[derive(Debug, Clone, FromRow)]
pub struct CohortStudent {
    pub id: i64,
    pub user_id: i64,
    pub full_name: Option<String>,
    pub grade: Option<String>,
    pub class_name: Option<String>,
    pub progress_summary: Option<String>,
}

impl CohortStudent {
    pub fn summary(&self) -> StudentSummary {
        StudentSummary {
            id: self.id,
            user_id: self.user_id,
            full_name: self.full_name.clone(),
            grade: self.grade.clone(),
            class_name: self.class_name.clone(),
            progress_summary: self.progress_summary.clone(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StudentChat {
    pub id: i64,
    pub user_id: i64,
    pub question: String,
    pub answer: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AccessToken {
    pub id: i64,
    pub user_id: i64,
    /// Hex SHA-256 of the secret part; the raw secret is never stored
    pub token_hash: String,
    /// RFC 3339
    pub expires_at: String,
    pub created_at: Option<String>,
}

/// Role-specific part of a new account. Each variant carries only the
/// fields that make sense for that role.
#[derive(Debug, Clone, PartialEq)]
pub enum NewProfile {
    Student {
        grade: Option<String>,
        class_name: Option<String>,
        school: Option<String>,
    },
    Mentor {
        department: Option<String>,
        experience: Option<i64>,
        school: Option<String>,
    },
}

impl NewProfile {
    pub fn role(&self) -> Role {
        match self {
            NewProfile::Student { .. } => Role::Student,
            NewProfile::Mentor { .. } => Role::Mentor,
        }
    }
}
