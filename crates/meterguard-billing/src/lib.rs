//! Meterguard billing adapters
//!
//! Usage recording, subject and entitlement management on top of a metering vendor,
//! plus payments and subscriptions, with every vendor call protected by the
//! `meterguard-core` resilience layer.

pub mod client;
pub mod models;
pub mod payments;
pub mod provisioning;
pub mod resilient;
pub mod subscriptions;

pub use client::{MeteringClient, PaymentClient};
pub use models::{
    CloudEvent, Entitlement, EntitlementGrant, MeterDefinition, NewSubscription, Payment,
    PaymentRequest, PaymentStatus, Subject, SubjectRecord, Subscription, SubscriptionStatus,
    SubscriptionUpdate, TokenQuota, UsageEvent, UsagePeriod,
};
pub use payments::{InMemoryPaymentClient, PAYMENT_SERVICE, ResilientPaymentClient};
pub use provisioning::{create_meter, ensure_features};
pub use resilient::{ENTITLEMENT_SERVICE, OPENMETER, ResilientMeteringClient, SUBJECT_SERVICE};
pub use subscriptions::SubscriptionService;
