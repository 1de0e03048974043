//! Metering client routed through the resilient executor
//!
//! Vendor calls are split across three circuit breakers: [`OPENMETER`] for usage
//! ingestion, features and meters, [`SUBJECT_SERVICE`] for subject management and
//! [`ENTITLEMENT_SERVICE`] for entitlements. A failing entitlement API therefore
//! never blocks usage recording.

use std::future::Future;
use std::sync::Arc;

use meterguard_core::{
    CallError, CallOptions, DependencyName, FailureKind, MeterError, MeterResult,
    OpenMeterConfig, Recoverable, ResilientExecutor, ServiceError,
};
use uuid::Uuid;

use crate::client::MeteringClient;
use crate::models::{
    CloudEvent, Entitlement, EntitlementGrant, MeterDefinition, Subject, TokenQuota, UsageEvent,
};

/// Breaker for usage ingestion, features and meters
pub const OPENMETER: &str = "OpenMeter";
/// Breaker for subject management
pub const SUBJECT_SERVICE: &str = "SubjectService";
/// Breaker for entitlement lookups and grants
pub const ENTITLEMENT_SERVICE: &str = "EntitlementService";

/// Billing operations with circuit breaking, error translation and benign-failure defaults
pub struct ResilientMeteringClient {
    client: Arc<dyn MeteringClient>,
    executor: Arc<ResilientExecutor>,
    metering: DependencyName,
    subjects: DependencyName,
    entitlements: DependencyName,
    settings: OpenMeterConfig,
    quota_fallback: Option<TokenQuota>,
}

impl ResilientMeteringClient {
    pub fn new(
        client: Arc<dyn MeteringClient>,
        executor: Arc<ResilientExecutor>,
        settings: OpenMeterConfig,
    ) -> MeterResult<Self> {
        Ok(Self {
            client,
            executor,
            metering: DependencyName::new(OPENMETER)?,
            subjects: DependencyName::new(SUBJECT_SERVICE)?,
            entitlements: DependencyName::new(ENTITLEMENT_SERVICE)?,
            settings,
            quota_fallback: None,
        })
    }

    /// Quota returned by [`get_usage`](Self::get_usage) while the circuit is open
    pub fn with_quota_fallback(mut self, quota: TokenQuota) -> Self {
        self.quota_fallback = Some(quota);
        self
    }

    pub fn metering_dependency(&self) -> &DependencyName {
        &self.metering
    }

    pub fn subject_dependency(&self) -> &DependencyName {
        &self.subjects
    }

    pub fn entitlement_dependency(&self) -> &DependencyName {
        &self.entitlements
    }

    pub fn settings(&self) -> &OpenMeterConfig {
        &self.settings
    }

    pub fn executor(&self) -> &Arc<ResilientExecutor> {
        &self.executor
    }

    async fn run<T, F, Fut>(
        &self,
        dependency: &DependencyName,
        options: CallOptions<T>,
        operation: F,
    ) -> MeterResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        self.executor
            .call(dependency, options, operation)
            .await
            .map_err(MeterError::from)
    }

    /// Ingest one usage event for `subject_id`; zero-token events are ingested as well
    pub async fn record_usage(&self, subject_id: &str, event: &UsageEvent) -> MeterResult<bool> {
        if subject_id.trim().is_empty() {
            return Err(MeterError::invalid_field(
                "subject_id",
                "Usage must be attributed to a subject",
            ));
        }

        let cloud_event = CloudEvent::usage(
            subject_id,
            &self.settings.token_event_type,
            &self.settings.source,
            event,
        );
        self.run(&self.metering, CallOptions::new(), || {
            self.client.ingest_event(&cloud_event)
        })
        .await?;

        tracing::debug!(
            subject = subject_id,
            tokens = event.tokens,
            event_id = %cloud_event.id,
            "Recorded token usage"
        );
        Ok(true)
    }

    /// Token quota of a subject; permissive default when the vendor cannot report usage
    pub async fn get_usage(&self, subject_id: &str) -> MeterResult<TokenQuota> {
        let mut options = CallOptions::new().recover(Recoverable::Unsupported, TokenQuota::default());
        if let Some(quota) = &self.quota_fallback {
            options = options.fallback(quota.clone());
        }

        self.run(&self.metering, options, || self.client.get_usage(subject_id))
            .await
    }

    pub async fn create_subject(&self, subject: &Subject) -> MeterResult<()> {
        let records = vec![subject.to_record()];
        self.run(&self.subjects, CallOptions::new(), || {
            self.client.upsert_subjects(records)
        })
        .await
    }

    pub async fn delete_subject(&self, subject_id: Uuid) -> MeterResult<()> {
        let key = subject_id.to_string();
        self.executor
            .call(&self.subjects, CallOptions::new(), || {
                self.client.delete_subject(&key)
            })
            .await
            .map_err(|err| match err {
                CallError::Operation(e) if e.kind == FailureKind::NotFound => {
                    tracing::error!(subject = %subject_id, "Subject not found for deletion: {}", e);
                    MeterError::not_found_resource("subject", "Subject not found")
                }
                other => other.into(),
            })
    }

    /// Subjects whose key is a UUID; other keys are skipped
    pub async fn list_subjects(&self) -> MeterResult<Vec<Subject>> {
        let records = self
            .run(&self.subjects, CallOptions::new(), || self.client.list_subjects())
            .await?;

        let subjects: Vec<Subject> = records
            .into_iter()
            .filter_map(|record| {
                let key = record.key.clone();
                Subject::try_from(record)
                    .map_err(|e| {
                        tracing::warn!(key = %key, "Skipping subject with non-UUID key: {}", e);
                    })
                    .ok()
            })
            .collect();

        tracing::debug!(count = subjects.len(), "Listed subjects");
        Ok(subjects)
    }

    /// Subjects without any entitlement.
    ///
    /// A subject the entitlement API does not know is reported as having none; those
    /// lookups do not count against the entitlement breaker.
    pub async fn list_subjects_without_entitlement(&self) -> MeterResult<Vec<Uuid>> {
        let mut without = Vec::new();
        for subject in self.list_subjects().await? {
            let filter = [subject.id.to_string()];
            let options = CallOptions::new()
                .recover(Recoverable::Unsupported, Vec::new())
                .recover(Recoverable::NotFound, Vec::new());
            let entitlements = self
                .run(&self.entitlements, options, || {
                    self.client.list_entitlements(&filter)
                })
                .await?;
            if entitlements.is_empty() {
                without.push(subject.id);
            }
        }

        tracing::debug!(count = without.len(), "Found subjects without entitlements");
        Ok(without)
    }

    pub async fn list_features(&self) -> MeterResult<Vec<String>> {
        self.run(&self.metering, CallOptions::new(), || {
            self.client.list_features()
        })
        .await
    }

    /// Create a feature; creating one that already exists is a no-op
    pub async fn create_feature(&self, feature_key: &str) -> MeterResult<()> {
        self.run(
            &self.metering,
            CallOptions::new().recover(Recoverable::AlreadyExists, ()),
            || self.client.create_feature(feature_key),
        )
        .await
    }

    /// Create the configured token meter
    pub async fn create_meter(&self) -> MeterResult<bool> {
        let meter = MeterDefinition::from(&self.settings.meter);
        self.run(&self.metering, CallOptions::new(), || {
            self.client.create_meter(&meter)
        })
        .await?;
        Ok(true)
    }

    /// Entitlements of the given subjects; empty when the vendor cannot list them
    pub async fn list_entitlements(&self, subjects: &[String]) -> MeterResult<Vec<Entitlement>> {
        self.run(
            &self.entitlements,
            CallOptions::new().recover(Recoverable::Unsupported, Vec::new()),
            || self.client.list_entitlements(subjects),
        )
        .await
    }

    pub async fn get_entitlement(
        &self,
        subject_id: Uuid,
        feature_key: &str,
    ) -> MeterResult<Entitlement> {
        let key = subject_id.to_string();
        self.executor
            .call(&self.entitlements, CallOptions::new(), || {
                self.client.get_entitlement(&key, feature_key)
            })
            .await
            .map_err(|err| match err {
                CallError::Operation(e) if e.kind == FailureKind::NotFound => {
                    tracing::error!(
                        subject = %subject_id,
                        feature = feature_key,
                        "Entitlement lookup failed: {}",
                        e
                    );
                    self.missing_entitlement(feature_key)
                }
                other => other.into(),
            })
    }

    pub async fn has_access(&self, subject_id: Uuid, feature_key: &str) -> MeterResult<bool> {
        Ok(self.get_entitlement(subject_id, feature_key).await?.has_access)
    }

    pub async fn grant_entitlement(
        &self,
        subject_id: Uuid,
        grant: EntitlementGrant,
    ) -> MeterResult<()> {
        let key = subject_id.to_string();
        let entitlement = Entitlement::from(grant);
        self.run(&self.entitlements, CallOptions::new(), || {
            self.client.create_entitlement(&key, &entitlement)
        })
        .await
    }

    fn missing_entitlement(&self, feature_key: &str) -> MeterError {
        if feature_key == self.settings.feature_key {
            MeterError::not_found_resource(
                "feature",
                format!(
                    "Feature '{}' not found. Run ensure_features to create the feature.",
                    feature_key
                ),
            )
        } else {
            MeterError::not_found_resource("entitlement", "Subject or feature not found")
        }
    }
}
