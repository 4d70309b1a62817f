use std::sync::Arc;

use storage::Storage;
use study_core::model::{Mission, Syllabus, WeeklyPlan};
use study_core::time::Clock;

use crate::config::AppConfig;
use crate::error::AppServicesError;
use crate::mentor::{ChatCompletionsClient, MentorService, TextGeneration};
use crate::progress_store::ProgressStore;
use crate::sessions::FocusSession;
use crate::syllabus::load_syllabus;

/// Everything the console driver needs, wired from one [`AppConfig`].
pub struct AppServices {
    pub config: AppConfig,
    pub clock: Clock,
    pub syllabus: Syllabus,
    pub plan: WeeklyPlan,
    pub store: ProgressStore,
    pub session: FocusSession,
    pub mentor: MentorService,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the configured AI endpoint.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database or the syllabus file cannot
    /// be opened.
    pub async fn new_sqlite(config: AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        let generator: Arc<dyn TextGeneration> =
            Arc::new(ChatCompletionsClient::new(config.ai.clone()));
        Self::with_storage(config, clock, storage, generator).await
    }

    /// Build services over an existing storage backend.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Syllabus` if the syllabus file is unusable.
    pub async fn with_storage(
        config: AppConfig,
        clock: Clock,
        storage: Storage,
        generator: Arc<dyn TextGeneration>,
    ) -> Result<Self, AppServicesError> {
        let syllabus = match &config.syllabus_path {
            Some(path) => load_syllabus(path)?,
            None => Syllabus::sample(),
        };
        tracing::info!(topics = syllabus.len(), "syllabus loaded");

        let store = ProgressStore::open(storage.snapshots, clock, syllabus.len()).await;
        let session = FocusSession::new(config.timer);

        Ok(Self {
            config,
            clock,
            syllabus,
            plan: WeeklyPlan::default(),
            store,
            session,
            mentor: MentorService::new(generator),
        })
    }

    /// Today's date as shown in the weekly dossier request.
    #[must_use]
    pub fn dossier_date(&self) -> String {
        self.clock.today().format("%d/%m/%Y").to_string()
    }

    /// Today's missions from the weekly plan.
    #[must_use]
    pub fn missions_today(&self) -> Vec<Mission<'_>> {
        self.plan
            .missions(self.clock.weekday(), &self.syllabus, self.store.progress())
    }
}
