use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;

mod models;

pub use models::*;

const USER_COLUMNS: &str =
    "id, full_name, email, password_hash, role, created_at, updated_at";

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(path: &str) -> Result<Self> {
        // Ensure the directory exists
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", path);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name TEXT,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL CHECK (role IN ('student', 'mentor')),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS student_profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                grade TEXT,
                class_name TEXT,
                school TEXT,
                progress_summary TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mentor_profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                department TEXT,
                experience INTEGER,
                school TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS student_chats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_student_chats_user ON student_chats (user_id, id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_student_profiles_school ON student_profiles (school)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS access_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                token_hash TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("Database migrations completed");
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // User operations

    /// Insert a user and its role profile in one transaction.
    pub async fn create_user_with_profile(
        &self,
        full_name: Option<&str>,
        email: &str,
        password_hash: &str,
        profile: &NewProfile,
    ) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let user_id = sqlx::query(
            "INSERT INTO users (full_name, email, password_hash, role) VALUES (?, ?, ?, ?)",
        )
        .bind(full_name)
        .bind(email)
        .bind(password_hash)
        .bind(profile.role().as_str())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        match profile {
            NewProfile::Student {
                grade,
                class_name,
                school,
            } => {
                sqlx::query(
                    r#"
                    INSERT INTO student_profiles (user_id, grade, class_name, school, progress_summary)
                    VALUES (?, ?, ?, ?, ?)
                    "#,
                )
                .bind(user_id)
                .bind(grade)
                .bind(class_name)
                .bind(school)
                .bind(INITIAL_PROGRESS_SUMMARY)
                .execute(&mut *tx)
                .await?;
            }
            NewProfile::Mentor {
                department,
                experience,
                school,
            } => {
                sqlx::query(
                    "INSERT INTO mentor_profiles (user_id, department, experience, school) VALUES (?, ?, ?, ?)",
                )
                .bind(user_id)
                .bind(department)
                .bind(experience)
                .bind(school)
                .execute(&mut *tx)
                .await?;
            }
        }

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    // Profile operations
    pub async fn get_mentor_profile(&self, user_id: i64) -> Result<Option<MentorProfile>> {
        let profile = sqlx::query_as::<_, MentorProfile>(
            "SELECT id, user_id, department, experience, school, created_at, updated_at FROM mentor_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    /// Students whose profile school equals `school`, with display names.
    pub async fn get_students_at_school(&self, school: &str) -> Result<Vec<CohortStudent>> {
        let students = sqlx::query_as::<_, CohortStudent>(
            r#"
            SELECT sp.id, sp.user_id, u.full_name, sp.grade, sp.class_name, sp.progress_summary
            FROM student_profiles sp
            JOIN users u ON u.id = sp.user_id
            WHERE sp.school = ?
            ORDER BY sp.id ASC
            "#,
        )
        .bind(school)
        .fetch_all(&self.pool)
        .await?;
        Ok(students)
    }

    pub async fn update_progress_summary(&self, user_id: i64, summary: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE student_profiles SET progress_summary = ? WHERE user_id = ?")
                .bind(summary)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    // Chat operations
    pub async fn save_chat(&self, user_id: i64, question: &str, answer: &str) -> Result<()> {
        sqlx::query("INSERT INTO student_chats (user_id, question, answer) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(question)
            .bind(answer)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Most recent chats for a user, newest first.
    pub async fn get_recent_chats(&self, user_id: i64, limit: u32) -> Result<Vec<StudentChat>> {
        let chats = sqlx::query_as::<_, StudentChat>(
            "SELECT id, user_id, question, answer, created_at FROM student_chats WHERE user_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(chats)
    }

    /// All chats owned by any of `user_ids`, oldest first, in a single query.
    pub async fn get_chats_for_users(&self, user_ids: &[i64]) -> Result<Vec<StudentChat>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, user_id, question, answer, created_at FROM student_chats WHERE user_id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in user_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id ASC");

        let chats = builder
            .build_query_as::<StudentChat>()
            .fetch_all(&self.pool)
            .await?;
        Ok(chats)
    }

    // Access token operations
    pub async fn create_access_token(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: &str,
    ) -> Result<i64> {
        let id = sqlx::query(
            "INSERT INTO access_tokens (user_id, token_hash, expires_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    pub async fn get_access_token(&self, id: i64) -> Result<Option<AccessToken>> {
        let token = sqlx::query_as::<_, AccessToken>(
            "SELECT id, user_id, token_hash, expires_at, created_at FROM access_tokens WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token)
    }

    pub async fn delete_access_token(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub const INITIAL_PROGRESS_SUMMARY: &str =
    "Student has just registered. No progress to report yet.";

#[cfg(test)]
impl Database {
    /// Full student profile row.
    pub async fn get_student_profile(&self, user_id: i64) -> Result<Option<StudentProfile>> {
        let profile = sqlx::query_as::<_, StudentProfile>(
            "SELECT id, user_id, grade, class_name, school, progress_summary FROM student_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    /// Single-connection in-memory database with the schema applied.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Row count of `table`, optionally restricted to one user.
    pub async fn count_rows(&self, table: &str, user_id: Option<i64>) -> Result<i64> {
        let count: i64 = match user_id {
            Some(id) => {
                sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE user_id = ?"))
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }

    /// Force a token's expiry, for exercising the expired path.
    pub async fn set_token_expiry(&self, id: i64, expires_at: &str) -> Result<()> {
        sqlx::query("UPDATE access_tokens SET expires_at = ? WHERE id = ?")
            .bind(expires_at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
