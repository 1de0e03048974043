//! Contract for the metering vendor client

use async_trait::async_trait;
use meterguard_core::ServiceError;
use uuid::Uuid;

use crate::models::{
    CloudEvent, Entitlement, MeterDefinition, Payment, PaymentRequest, PaymentStatus,
    SubjectRecord, TokenQuota,
};

/// Raw operations of a usage-metering vendor.
///
/// Implementations talk to the vendor and report failures as [`ServiceError`]s tagged
/// with a [`FailureKind`](meterguard_core::FailureKind); they do no circuit breaking
/// of their own. Wrap one in [`ResilientMeteringClient`](crate::ResilientMeteringClient).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MeteringClient: Send + Sync {
    async fn ingest_event(&self, event: &CloudEvent) -> Result<(), ServiceError>;

    /// Fails with `Conflict` when a meter with the same slug exists
    async fn create_meter(&self, meter: &MeterDefinition) -> Result<(), ServiceError>;

    /// Fails with `Unsupported` when the vendor has no usage endpoint
    async fn get_usage(&self, subject_id: &str) -> Result<TokenQuota, ServiceError>;

    async fn upsert_subjects(&self, subjects: Vec<SubjectRecord>) -> Result<(), ServiceError>;

    async fn delete_subject(&self, subject_id: &str) -> Result<(), ServiceError>;

    async fn list_subjects(&self) -> Result<Vec<SubjectRecord>, ServiceError>;

    async fn list_features(&self) -> Result<Vec<String>, ServiceError>;

    /// Fails with `Conflict` when the feature already exists
    async fn create_feature(&self, feature_key: &str) -> Result<(), ServiceError>;

    /// Entitlements of the given subjects, or of everyone when `subjects` is empty
    async fn list_entitlements(&self, subjects: &[String]) -> Result<Vec<Entitlement>, ServiceError>;

    async fn get_entitlement(
        &self,
        subject_id: &str,
        feature_key: &str,
    ) -> Result<Entitlement, ServiceError>;

    async fn create_entitlement(
        &self,
        subject_id: &str,
        entitlement: &Entitlement,
    ) -> Result<(), ServiceError>;
}

/// Raw operations of a payment provider.
///
/// Same contract as [`MeteringClient`]: failures carry a
/// [`FailureKind`](meterguard_core::FailureKind) and circuit breaking is left to
/// [`ResilientPaymentClient`](crate::ResilientPaymentClient).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentClient: Send + Sync {
    async fn process_payment(&self, request: &PaymentRequest) -> Result<Payment, ServiceError>;

    /// Fails with `NotFound` for an unknown id
    async fn get_payment(&self, payment_id: Uuid) -> Result<Payment, ServiceError>;

    async fn list_payments(&self, subscription_id: Uuid) -> Result<Vec<Payment>, ServiceError>;

    /// Refund `amount`, or the whole payment when `None`; `NotFound` for an unknown id
    async fn refund_payment(
        &self,
        payment_id: Uuid,
        amount: Option<f64>,
    ) -> Result<Payment, ServiceError>;

    /// Fails with `NotFound` for an unknown id
    async fn update_payment_status(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Payment, ServiceError>;
}
