//! Background refresh of a student's progress summary.
//!
//! Jobs go through an unbounded channel to a worker started with the server.
//! Each job runs as its own task, so a slow summary never holds up a request
//! or the next job. Overlapping jobs for one student race; the last write wins.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use super::prompt::{format_transcript, SUMMARY_QUESTION, SUMMARY_SYSTEM_PROMPT};
use crate::{
    answer::{AnswerRequest, AnswerService},
    db::Database,
};

/// Fewer chats than this and there is nothing worth summarizing.
const MIN_CHATS_FOR_SUMMARY: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryJob {
    pub user_id: i64,
}

#[derive(Debug, PartialEq)]
pub enum SummaryOutcome {
    Skipped,
    /// The service answered with nothing usable
    Unchanged,
    Updated(String),
}

#[derive(Clone)]
pub struct ProgressSummarizer {
    db: Database,
    answers: Arc<dyn AnswerService>,
    window: u32,
}

impl ProgressSummarizer {
    pub fn new(db: Database, answers: Arc<dyn AnswerService>, window: u32) -> Self {
        Self { db, answers, window }
    }

    pub async fn refresh(&self, user_id: i64) -> Result<SummaryOutcome> {
        let chats = self.db.get_recent_chats(user_id, self.window).await?;
        if chats.len() < MIN_CHATS_FOR_SUMMARY {
            return Ok(SummaryOutcome::Skipped);
        }

        let request = AnswerRequest::mentor(
            SUMMARY_QUESTION,
            SUMMARY_SYSTEM_PROMPT,
            format_transcript(&chats),
        );
        let answer = self.answers.ask(&request).await?;

        let summary = answer.trim();
        if summary.is_empty() {
            return Ok(SummaryOutcome::Unchanged);
        }

        self.db.update_progress_summary(user_id, summary).await?;
        Ok(SummaryOutcome::Updated(summary.to_string()))
    }
}

#[derive(Clone)]
pub struct SummaryQueue {
    tx: mpsc::UnboundedSender<SummaryJob>,
}

impl SummaryQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SummaryJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Create the queue and spawn its worker on the current runtime.
    pub fn start(summarizer: ProgressSummarizer) -> Self {
        let (queue, rx) = Self::channel();
        tokio::spawn(run_worker(rx, summarizer));
        queue
    }

    /// Fire and forget.
    pub fn submit(&self, user_id: i64) {
        if self.tx.send(SummaryJob { user_id }).is_err() {
            tracing::warn!("Summary worker is gone, dropping job for user {}", user_id);
        }
    }
}

pub async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<SummaryJob>,
    summarizer: ProgressSummarizer,
) {
    tracing::info!("Progress summary worker started");
    while let Some(job) = rx.recv().await {
        let summarizer = summarizer.clone();
        tokio::spawn(async move {
            match summarizer.refresh(job.user_id).await {
                Ok(SummaryOutcome::Updated(summary)) => {
                    tracing::debug!(
                        "Updated progress summary for user {}: {}",
                        job.user_id,
                        summary
                    );
                }
                Ok(outcome) => {
                    tracing::debug!(
                        "Progress summary for user {} not updated: {:?}",
                        job.user_id,
                        outcome
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Progress summary refresh failed for user {}: {:#}",
                        job.user_id,
                        e
                    );
                }
            }
        });
    }
    tracing::info!("Progress summary worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::testing::{Reply, StubAnswers};
    use crate::db::{NewProfile, INITIAL_PROGRESS_SUMMARY};

    async fn setup() -> (Database, i64) {
        let db = Database::in_memory().await.unwrap();
        let user = db
            .create_user_with_profile(
                Some("Kai"),
                "kai@test.io",
                "hash",
                &NewProfile::Student {
                    grade: None,
                    class_name: None,
                    school: Some("North High".to_string()),
                },
            )
            .await
            .unwrap();
        (db, user.id)
    }

    async fn summary_of(db: &Database, user_id: i64) -> Option<String> {
        db.get_student_profile(user_id)
            .await
            .unwrap()
            .unwrap()
            .progress_summary
    }

    #[tokio::test]
    async fn test_fewer_than_two_chats_leaves_summary_alone() {
        let (db, user_id) = setup().await;
        db.save_chat(user_id, "Q1", "A1").await.unwrap();
        let answers = Arc::new(StubAnswers::answering("Doing great."));
        let summarizer = ProgressSummarizer::new(db.clone(), answers.clone(), 10);

        assert_eq!(summarizer.refresh(user_id).await.unwrap(), SummaryOutcome::Skipped);
        assert!(answers.requests().is_empty());
        assert_eq!(
            summary_of(&db, user_id).await.as_deref(),
            Some(INITIAL_PROGRESS_SUMMARY)
        );
    }

    #[tokio::test]
    async fn test_summary_overwritten_from_recent_window() {
        let (db, user_id) = setup().await;
        for i in 1..=12 {
            db.save_chat(user_id, &format!("Q{i}"), &format!("A{i}"))
                .await
                .unwrap();
        }
        let answers = Arc::new(StubAnswers::answering(
            "  Working on gear ratios; unsure about torque.  ",
        ));
        let summarizer = ProgressSummarizer::new(db.clone(), answers.clone(), 10);

        let outcome = summarizer.refresh(user_id).await.unwrap();
        assert_eq!(
            outcome,
            SummaryOutcome::Updated("Working on gear ratios; unsure about torque.".to_string())
        );
        assert_eq!(
            summary_of(&db, user_id).await.as_deref(),
            Some("Working on gear ratios; unsure about torque.")
        );

        let sent = answers.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].role, shared::Role::Mentor);
        assert_eq!(sent[0].system_prompt.as_deref(), Some(SUMMARY_SYSTEM_PROMPT));
        let transcript = sent[0].data_context.clone().unwrap();
        assert!(!transcript.contains("Student: Q2\n"));
        assert!(transcript.starts_with("Student: Q3\n"));
        assert!(transcript.ends_with("Tutor: A12"));
    }

    #[tokio::test]
    async fn test_blank_summary_is_ignored() {
        let (db, user_id) = setup().await;
        db.save_chat(user_id, "Q1", "A1").await.unwrap();
        db.save_chat(user_id, "Q2", "A2").await.unwrap();
        let summarizer =
            ProgressSummarizer::new(db.clone(), Arc::new(StubAnswers::answering("   ")), 10);

        assert_eq!(summarizer.refresh(user_id).await.unwrap(), SummaryOutcome::Unchanged);
        assert_eq!(
            summary_of(&db, user_id).await.as_deref(),
            Some(INITIAL_PROGRESS_SUMMARY)
        );
    }

    #[tokio::test]
    async fn test_service_failure_is_an_error_not_a_write() {
        let (db, user_id) = setup().await;
        db.save_chat(user_id, "Q1", "A1").await.unwrap();
        db.save_chat(user_id, "Q2", "A2").await.unwrap();
        let summarizer =
            ProgressSummarizer::new(db.clone(), Arc::new(StubAnswers::new(Reply::Unavailable)), 10);

        assert!(summarizer.refresh(user_id).await.is_err());
        assert_eq!(
            summary_of(&db, user_id).await.as_deref(),
            Some(INITIAL_PROGRESS_SUMMARY)
        );
    }

    #[tokio::test]
    async fn test_submit_enqueues_job() {
        let (queue, mut rx) = SummaryQueue::channel();
        queue.submit(7);
        assert_eq!(rx.recv().await, Some(SummaryJob { user_id: 7 }));
    }

    #[tokio::test]
    async fn test_worker_applies_submitted_jobs() {
        let (db, user_id) = setup().await;
        db.save_chat(user_id, "Q1", "A1").await.unwrap();
        db.save_chat(user_id, "Q2", "A2").await.unwrap();
        let summarizer =
            ProgressSummarizer::new(db.clone(), Arc::new(StubAnswers::answering("On track.")), 10);
        let queue = SummaryQueue::start(summarizer);

        queue.submit(user_id);

        let mut summary = None;
        for _ in 0..50 {
            summary = summary_of(&db, user_id).await;
            if summary.as_deref() == Some("On track.") {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(summary.as_deref(), Some("On track."));
    }
}
