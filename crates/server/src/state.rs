use crate::{
    answer::AnswerService,
    chat::{ChatAssembler, ProgressSummarizer, SummaryQueue},
    config::Config,
    db::Database,
    identity::IdentityService,
};
use std::sync::Arc;

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub identity: IdentityService,
    pub chat: ChatAssembler,
}

impl AppState {
    /// Build the services and start the progress summary worker.
    pub fn new(db: Database, config: &Config, answers: Arc<dyn AnswerService>) -> Self {
        let summarizer =
            ProgressSummarizer::new(db.clone(), answers.clone(), config.chat.summary_window);
        let summaries = SummaryQueue::start(summarizer);
        Self::with_summaries(db, config, answers, summaries)
    }

    pub fn with_summaries(
        db: Database,
        config: &Config,
        answers: Arc<dyn AnswerService>,
        summaries: SummaryQueue,
    ) -> Self {
        let identity = IdentityService::new(db.clone(), config.auth.clone());
        let chat = ChatAssembler::new(db.clone(), answers, summaries, config.chat.clone());

        Self {
            db,
            identity,
            chat,
        }
    }
}
