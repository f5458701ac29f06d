//! Builds the context for a bot question and forwards it to the answer service.

use std::sync::Arc;

use shared::Role;
use thiserror::Error;

use crate::{
    answer::{AnswerError, AnswerRequest, AnswerService},
    config::ChatConfig,
    db::{CohortStudent, Database, MentorProfile, User},
};

mod prompt;
mod summary;

pub use summary::{ProgressSummarizer, SummaryQueue};

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Answer(#[from] AnswerError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// A mentor's profile and the students who share its school.
pub struct Cohort {
    pub mentor: MentorProfile,
    pub school: String,
    pub students: Vec<CohortStudent>,
}

#[derive(Clone)]
pub struct ChatAssembler {
    db: Database,
    answers: Arc<dyn AnswerService>,
    summaries: SummaryQueue,
    config: ChatConfig,
}

impl ChatAssembler {
    pub fn new(
        db: Database,
        answers: Arc<dyn AnswerService>,
        summaries: SummaryQueue,
        config: ChatConfig,
    ) -> Self {
        Self {
            db,
            answers,
            summaries,
            config,
        }
    }

    pub async fn ask(&self, user: &User, question: &str) -> Result<String, ChatError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::Validation("question is required".to_string()));
        }

        match user.role {
            Role::Student => self.ask_as_student(user, question).await,
            Role::Mentor => self.ask_as_mentor(user, question).await,
        }
    }

    async fn ask_as_student(&self, user: &User, question: &str) -> Result<String, ChatError> {
        let recent = self
            .db
            .get_recent_chats(user.id, self.config.history_window)
            .await?;
        let chat_history = prompt::format_history(&recent);

        let answer = self
            .answers
            .ask(&AnswerRequest::student(question, chat_history))
            .await?;

        self.db.save_chat(user.id, question, &answer).await?;
        self.summaries.submit(user.id);

        Ok(answer)
    }

    async fn ask_as_mentor(&self, user: &User, question: &str) -> Result<String, ChatError> {
        let cohort = self.cohort(user).await?;

        let student_ids: Vec<i64> = cohort.students.iter().map(|s| s.user_id).collect();
        let chats = self.db.get_chats_for_users(&student_ids).await?;
        let questions = prompt::questions_by_owner(chats);

        tracing::debug!(
            "Mentor {} asking about {} students at {}",
            user.id,
            cohort.students.len(),
            cohort.school
        );

        let data_context =
            prompt::format_mentor_context(&cohort.school, &cohort.students, &questions);
        let answer = self
            .answers
            .ask(&AnswerRequest::mentor(
                question,
                prompt::MENTOR_SYSTEM_PROMPT,
                data_context,
            ))
            .await?;

        Ok(answer)
    }

    /// The students visible to a mentor.
    pub async fn cohort(&self, user: &User) -> Result<Cohort, ChatError> {
        let mentor = self
            .db
            .get_mentor_profile(user.id)
            .await?
            .ok_or_else(|| ChatError::Forbidden("Mentor profile not found".to_string()))?;

        let (school, students) = match mentor.school.clone() {
            Some(school) => {
                let students = self.db.get_students_at_school(&school).await?;
                (school, students)
            }
            None => (String::new(), Vec::new()),
        };

        Ok(Cohort {
            mentor,
            school,
            students,
        })
    }
}
