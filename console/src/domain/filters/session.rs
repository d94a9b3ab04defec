//! Builder session
//!
//! Owns everything one user edits at a time: the catalog, both filter
//! contexts, the estimation trigger and the notice board. Every UI action
//! is a [`FilterCommand`] applied through the session, which keeps the
//! estimate in step with the active expression.

use std::sync::Arc;
use std::time::Duration;

use super::catalog::FieldCatalog;
use super::custom_field::{self, CustomFieldError, CustomFieldRequest};
use super::error::FilterError;
use super::expression::{FilterCommand, GroupIdPolicy};
use super::notices::{NoticeBoard, NoticeChannel};
use super::payload::EstimateRequest;
use super::save::{FilterDetails, SaveError, SaveMode, SaveOutcome, SaveService};
use super::workspace::{FilterContext, FilterWorkspace};
use crate::data::{AudienceBackend, BackendError};
use crate::domain::estimate::EstimateTrigger;

/// Tunables for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub debounce: Duration,
    pub notice_ttl: Duration,
    pub group_ids: GroupIdPolicy,
}

#[derive(Debug)]
pub struct BuilderSession {
    backend: Arc<dyn AudienceBackend>,
    catalog: FieldCatalog,
    workspace: FilterWorkspace,
    estimator: EstimateTrigger,
    notices: NoticeBoard,
    saver: SaveService,
    mode: SaveMode,
    settings: SessionSettings,
    applied_generation: u64,
}

impl BuilderSession {
    pub fn new(
        backend: Arc<dyn AudienceBackend>,
        catalog: FieldCatalog,
        settings: SessionSettings,
    ) -> Self {
        Self {
            estimator: EstimateTrigger::new(backend.clone(), settings.debounce),
            saver: SaveService::new(backend.clone()),
            backend,
            catalog,
            workspace: FilterWorkspace::new(settings.group_ids),
            notices: NoticeBoard::new(settings.notice_ttl),
            mode: SaveMode::Create,
            settings,
            applied_generation: 0,
        }
    }

    /// New session for a fresh filter, with the catalog fetched from the backend
    pub async fn start(
        backend: Arc<dyn AudienceBackend>,
        settings: SessionSettings,
    ) -> Result<Self, BackendError> {
        let catalog = FieldCatalog::from_entries(backend.fetch_catalog().await?);
        tracing::debug!(fields = catalog.len(), "Catalog loaded");
        Ok(Self::new(backend, catalog, settings))
    }

    /// Session editing a stored filter
    pub async fn open(
        backend: Arc<dyn AudienceBackend>,
        settings: SessionSettings,
        filter_id: &str,
    ) -> Result<Self, BackendError> {
        let mut session = Self::start(backend, settings).await?;
        let saved = session.backend.get_filter(filter_id).await?;
        let expression = saved.to_expression(&session.catalog, settings.group_ids);
        session.workspace.load(saved.context(), expression);
        session.mode = SaveMode::Edit {
            filter_id: filter_id.to_string(),
        };
        tracing::debug!(filter_id, context = %saved.context(), "Filter loaded for editing");
        Ok(session)
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn workspace(&self) -> &FilterWorkspace {
        &self.workspace
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn mode(&self) -> &SaveMode {
        &self.mode
    }

    /// Target a stored filter (or a new one) on the next save
    pub fn set_mode(&mut self, mode: SaveMode) {
        self.mode = mode;
    }

    /// Apply a builder command to the active context
    pub fn apply(&mut self, command: FilterCommand) -> Result<(), FilterError> {
        let channel = match command {
            FilterCommand::DropCriteria { .. } => NoticeChannel::Filter,
            _ => NoticeChannel::Main,
        };
        if let Err(e) = self.workspace.active_mut().apply(&self.catalog, command) {
            self.notices.post(channel, e.to_string());
            return Err(e);
        }
        self.after_mutation();
        Ok(())
    }

    /// Change the active context, refused while it holds criteria
    pub fn switch_context(&mut self, target: FilterContext) -> Result<(), FilterError> {
        if let Err(e) = self.workspace.switch_context(target) {
            self.notices.post(NoticeChannel::Filter, e.to_string());
            return Err(e);
        }
        self.after_mutation();
        Ok(())
    }

    fn after_mutation(&mut self) {
        self.apply_estimate();
        let active = self.workspace.active();
        if active.groups().is_empty() {
            self.estimator.cancel();
            return;
        }
        let request = EstimateRequest::from_expression(active);
        self.estimator
            .schedule(self.workspace.active_context(), request);
    }

    /// Copy an accepted estimate into its expression once
    ///
    /// The trigger only publishes responses that were current when they
    /// arrived, so any newer update is kept even if later edits are pending.
    fn apply_estimate(&mut self) {
        if let Some(update) = self.estimator.latest()
            && update.generation > self.applied_generation
        {
            self.applied_generation = update.generation;
            self.workspace
                .expression_mut(update.context)
                .set_estimated_audience(update.estimate);
        }
    }

    /// Wait for the pending estimate and return the active context's value
    pub async fn settle_estimate(&mut self) -> u64 {
        self.estimator.settle().await;
        self.apply_estimate();
        self.workspace.active().estimated_audience()
    }

    pub async fn save(&mut self, details: &FilterDetails) -> Result<SaveOutcome, SaveError> {
        self.apply_estimate();
        let result = self
            .saver
            .save(&mut self.workspace, details, &self.mode)
            .await;
        self.after_save(result)
    }

    pub async fn save_draft(&mut self, details: &FilterDetails) -> Result<SaveOutcome, SaveError> {
        self.apply_estimate();
        let result = self
            .saver
            .save_draft(&mut self.workspace, details, &self.mode)
            .await;
        self.after_save(result)
    }

    fn after_save(
        &mut self,
        result: Result<SaveOutcome, SaveError>,
    ) -> Result<SaveOutcome, SaveError> {
        match &result {
            Ok(outcome) => {
                self.mode = SaveMode::Edit {
                    filter_id: outcome.filter_id.clone(),
                };
            }
            Err(SaveError::Validation(errors)) => {
                self.notices
                    .post_all(NoticeChannel::Main, errors.messages.iter().cloned());
            }
            Err(e @ SaveError::Persistence(_)) => {
                self.notices.post(NoticeChannel::Main, e.to_string());
            }
        }
        result
    }

    /// Register a custom field in the active context and reload the catalog
    pub async fn create_custom_field(
        &mut self,
        request: &CustomFieldRequest,
    ) -> Result<(), CustomFieldError> {
        let context = self.workspace.active_context();
        let result =
            custom_field::create_custom_field(self.backend.as_ref(), request, context).await;
        match result {
            Ok(entry) => {
                let entries = self.backend.fetch_catalog().await?;
                self.catalog = FieldCatalog::from_entries(entries);
                tracing::debug!(key = %entry.key, fields = self.catalog.len(), "Catalog reloaded");
                Ok(())
            }
            Err(CustomFieldError::Invalid(messages)) => {
                self.notices
                    .post_all(NoticeChannel::Criteria, messages.iter().cloned());
                Err(CustomFieldError::Invalid(messages))
            }
            Err(e) => {
                self.notices.post(NoticeChannel::Criteria, e.to_string());
                Err(e)
            }
        }
    }

    /// Settings this session was built with
    pub fn settings(&self) -> SessionSettings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::data::testing::RecordingBackend;
    use crate::domain::filters::catalog::CatalogEntry;
    use crate::domain::filters::group::CriteriaUpdate;
    use crate::domain::filters::payload::SavedFilter;
    use crate::domain::filters::save::MSG_NO_GROUPS;

    fn entry(key: &str, label: &str, ty: &str, category: &str, ops: &[&str]) -> CatalogEntry {
        CatalogEntry {
            key: key.into(),
            label: label.into(),
            data_type: ty.into(),
            category: category.into(),
            operators: ops.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn backend() -> Arc<RecordingBackend> {
        Arc::new(RecordingBackend::with_catalog(vec![
            entry("city", "City", "string", "filterComponent", &["equals", "contains"]),
            entry("age", "Age", "number", "filterComponent", &["greaterThan"]),
            entry("opened", "Opened Email", "date", "triggerFilter", &["after"]),
        ]))
    }

    fn settings() -> SessionSettings {
        SessionSettings {
            debounce: Duration::from_millis(600),
            notice_ttl: Duration::from_secs(6),
            group_ids: GroupIdPolicy::Positional,
        }
    }

    fn drop_cmd(group_id: u64, field: &str) -> FilterCommand {
        FilterCommand::DropCriteria {
            group_id,
            field_key: field.into(),
        }
    }

    fn set_value(group_id: u64, field: &str, value: &str) -> FilterCommand {
        FilterCommand::UpdateCriteria {
            group_id,
            field_key: field.into(),
            update: CriteriaUpdate::Value(value.into()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_debounce_into_one_estimate() {
        let backend = backend();
        backend.estimate_result.store(4200, Ordering::SeqCst);
        let mut session = BuilderSession::start(backend.clone(), settings())
            .await
            .unwrap();
        assert_eq!(session.catalog().len(), 3);

        session.apply(FilterCommand::AddGroup).unwrap();
        session.apply(drop_cmd(0, "city")).unwrap();
        session.apply(set_value(0, "city", "B")).unwrap();
        session.apply(set_value(0, "city", "Bo")).unwrap();
        session.apply(set_value(0, "city", "Boston")).unwrap();

        assert_eq!(session.settle_estimate().await, 4200);
        assert_eq!(backend.estimate_calls(), 1);
        let sent = backend.estimates.lock()[0].clone();
        assert_eq!(sent.conditions[0].criteria[0].value, "Boston");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_estimate_keeps_earlier_success() {
        let backend = backend();
        backend.estimate_result.store(4200, Ordering::SeqCst);
        let mut session = BuilderSession::start(backend.clone(), settings())
            .await
            .unwrap();
        session.apply(FilterCommand::AddGroup).unwrap();
        session.apply(drop_cmd(0, "city")).unwrap();
        session.apply(set_value(0, "city", "Boston")).unwrap();

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(backend.estimate_calls(), 1);

        backend.fail_estimates.store(true, Ordering::SeqCst);
        session.apply(set_value(0, "city", "Bos")).unwrap();
        assert_eq!(session.settle_estimate().await, 4200);
        assert_eq!(backend.estimate_calls(), 2);

        let details = FilterDetails {
            name: "Boston".into(),
            description: "City match".into(),
            tags: String::new(),
        };
        let outcome = session.save(&details).await.unwrap();
        assert_eq!(outcome.filter.estimated_audience, 4200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_estimate_for_empty_canvas() {
        let backend = backend();
        let mut session = BuilderSession::start(backend.clone(), settings())
            .await
            .unwrap();
        session.apply(FilterCommand::AddGroup).unwrap();
        session
            .apply(FilterCommand::DeleteGroup { group_id: 0 })
            .unwrap();
        session.settle_estimate().await;
        assert_eq!(backend.estimate_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejections_post_notices() {
        let mut session = BuilderSession::start(backend(), settings()).await.unwrap();
        session.apply(FilterCommand::AddGroup).unwrap();
        session.apply(drop_cmd(0, "city")).unwrap();

        let err = session.apply(drop_cmd(0, "city")).unwrap_err();
        assert!(matches!(err, FilterError::DuplicateField { .. }));
        assert_eq!(
            session.notices().latest(NoticeChannel::Filter),
            Some("Cannot drag \"City\" as it already exists in this group.")
        );

        let err = session
            .switch_context(FilterContext::TriggerFilters)
            .unwrap_err();
        assert_eq!(err, FilterError::SwitchBlocked);
        assert_eq!(
            session.notices().latest(NoticeChannel::Filter),
            Some("As already added 1 block, cannot switch tab")
        );

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(session.notices().latest(NoticeChannel::Filter), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_flow() {
        let backend = backend();
        backend.estimate_result.store(55, Ordering::SeqCst);
        let mut session = BuilderSession::start(backend.clone(), settings())
            .await
            .unwrap();

        let err = session.save(&FilterDetails::default()).await.unwrap_err();
        assert_eq!(err.to_string(), MSG_NO_GROUPS);
        assert_eq!(session.notices().latest(NoticeChannel::Main), Some(MSG_NO_GROUPS));
        assert_eq!(backend.save_calls(), 0);

        session.apply(FilterCommand::AddGroup).unwrap();
        session.apply(drop_cmd(0, "age")).unwrap();
        session.apply(set_value(0, "age", "30")).unwrap();
        session.settle_estimate().await;

        let details = FilterDetails {
            name: "Over Thirty".into(),
            description: "Adults".into(),
            tags: String::new(),
        };
        let outcome = session.save(&details).await.unwrap();
        assert_eq!(outcome.filter.estimated_audience, 55);
        assert_eq!(
            session.mode(),
            &SaveMode::Edit {
                filter_id: outcome.filter_id.clone()
            }
        );

        // Second save updates the stored filter
        session.save(&details).await.unwrap();
        assert_eq!(backend.updated.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_mode_targets_existing_filter() {
        let backend = backend();
        let mut session = BuilderSession::start(backend.clone(), settings())
            .await
            .unwrap();
        session.apply(FilterCommand::AddGroup).unwrap();
        session.apply(drop_cmd(0, "city")).unwrap();
        session.apply(set_value(0, "city", "Boston")).unwrap();
        session.set_mode(SaveMode::Edit {
            filter_id: "f-42".into(),
        });

        let outcome = session.save_draft(&FilterDetails::default()).await.unwrap();
        assert_eq!(outcome.filter_id, "f-42");
        assert!(backend.created.lock().is_empty());
        let updated = backend.updated.lock();
        assert_eq!(updated[0].0, "f-42");
        assert_eq!(updated[0].1.name, "Untitled Draft");
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_existing_filter() {
        let backend = backend();
        let saved: SavedFilter = serde_json::from_value(serde_json::json!({
            "_id": "f-7",
            "name": "Openers",
            "description": "Opened recently",
            "conditions": [
                {"groupId": "group-1-0", "groupOperator": "AND",
                 "criteria": [{"field": "opened", "operator": "after", "value": "2024-01-01"}]},
                {"groupId": "group-1-1", "groupOperator": "OR",
                 "criteria": [{"field": "opened", "operator": "after", "value": "2024-06-01"}]}
            ],
            "isTriggerFilter": true,
            "logicalOperator": "AND",
            "estimatedAudience": 12
        }))
        .unwrap();
        *backend.stored.lock() = Some(saved);

        let mut session = BuilderSession::open(backend.clone(), settings(), "f-7")
            .await
            .unwrap();
        assert_eq!(session.workspace().active_context(), FilterContext::TriggerFilters);
        assert_eq!(session.workspace().active().groups().len(), 2);
        assert_eq!(session.workspace().active().estimated_audience(), 12);

        let details = FilterDetails {
            name: "Copy of Openers".into(),
            description: "Opened recently".into(),
            tags: String::new(),
        };
        let err = session.save(&details).await.unwrap_err();
        assert_eq!(err.to_string(), "Filter name can't start with 'Copy'");

        assert!(matches!(
            BuilderSession::open(Arc::new(RecordingBackend::default()), settings(), "nope").await,
            Err(BackendError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_field_reloads_catalog() {
        let backend = backend();
        let mut session = BuilderSession::start(backend.clone(), settings())
            .await
            .unwrap();
        session
            .create_custom_field(&CustomFieldRequest {
                label: "Loyalty Tier".into(),
                data_type: "string".into(),
                operator: "equals".into(),
            })
            .await
            .unwrap();
        assert!(session.catalog().lookup("loyalty_tier").is_ok());

        let err = session
            .create_custom_field(&CustomFieldRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CustomFieldError::Invalid(_)));
        assert_eq!(
            session.notices().messages(NoticeChannel::Criteria).len(),
            4
        );
        assert_eq!(session.settings().group_ids, GroupIdPolicy::Positional);
    }
}
