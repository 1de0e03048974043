//! In-memory subscription store with optional payment processing

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use meterguard_core::MeterResult;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::{
    NewSubscription, PaymentRequest, Subscription, SubscriptionStatus, SubscriptionUpdate,
};
use crate::payments::ResilientPaymentClient;

/// Subscriptions of subjects to plans.
///
/// With a payment client attached, a subscription created with a charge is paid for
/// on creation and cancellation can refund its latest payment. Payment failures never
/// fail the subscription operation itself.
#[derive(Default)]
pub struct SubscriptionService {
    subscriptions: DashMap<Uuid, Subscription>,
    payments: Option<Arc<ResilientPaymentClient>>,
}

impl SubscriptionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payments(payments: Arc<ResilientPaymentClient>) -> Self {
        Self {
            subscriptions: DashMap::new(),
            payments: Some(payments),
        }
    }

    /// Store a new active subscription and charge for it when requested.
    ///
    /// A failed charge leaves the subscription in `PaymentFailed`.
    pub async fn create(&self, request: NewSubscription) -> Subscription {
        let mut subscription = Subscription {
            id: Uuid::new_v4(),
            subject_id: request.subject_id,
            plan_id: request.plan_id,
            status: SubscriptionStatus::Active,
            start_date: request.start_date.unwrap_or_else(Utc::now),
            end_date: request.end_date,
            auto_renew: request.auto_renew,
            metadata: request.metadata,
        };

        if let (Some(amount), Some(payments)) = (request.amount, &self.payments) {
            let mut metadata = Map::new();
            metadata.insert("subscription_id".to_string(), subscription.id.to_string().into());
            metadata.insert("plan_id".to_string(), Value::from(subscription.plan_id.clone()));
            metadata.insert(
                "subject_id".to_string(),
                subscription.subject_id.to_string().into(),
            );
            metadata.insert("type".to_string(), "subscription_creation".into());
            metadata.extend(subscription.metadata.clone());

            let charge = PaymentRequest {
                currency: request.currency,
                payment_method: Some(request.payment_method),
                metadata,
                ..PaymentRequest::new(subscription.id, amount)
            };
            match payments.process_payment(&charge).await {
                Ok(payment) => tracing::info!(
                    subscription = %subscription.id,
                    payment = %payment.id,
                    "Payment processed for subscription"
                ),
                Err(e) => {
                    tracing::error!(
                        subscription = %subscription.id,
                        "Failed to process payment for subscription: {}",
                        e
                    );
                    subscription.status = SubscriptionStatus::PaymentFailed;
                }
            }
        }

        self.subscriptions.insert(subscription.id, subscription.clone());
        subscription
    }

    pub fn get(&self, subscription_id: Uuid) -> Option<Subscription> {
        self.subscriptions
            .get(&subscription_id)
            .map(|subscription| subscription.value().clone())
    }

    pub fn list_for_subject(&self, subject_id: Uuid) -> Vec<Subscription> {
        self.subscriptions
            .iter()
            .filter(|entry| entry.subject_id == subject_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Apply `update`; `None` when the subscription does not exist
    pub fn update(&self, subscription_id: Uuid, update: SubscriptionUpdate) -> Option<Subscription> {
        let mut subscription = self.subscriptions.get_mut(&subscription_id)?;
        if let Some(status) = update.status {
            subscription.status = status;
        }
        if let Some(end_date) = update.end_date {
            subscription.end_date = Some(end_date);
        }
        if let Some(auto_renew) = update.auto_renew {
            subscription.auto_renew = auto_renew;
        }
        if let Some(metadata) = update.metadata {
            subscription.metadata = metadata;
        }
        Some(subscription.value().clone())
    }

    /// Cancel a subscription, optionally refunding its latest payment.
    ///
    /// `refund_amount` of `None` refunds the whole payment. Refund failures are logged
    /// and do not undo the cancellation.
    pub async fn cancel(
        &self,
        subscription_id: Uuid,
        refund: bool,
        refund_amount: Option<f64>,
    ) -> Option<Subscription> {
        let subscription = self.update(
            subscription_id,
            SubscriptionUpdate {
                status: Some(SubscriptionStatus::Cancelled),
                ..Default::default()
            },
        )?;

        if let (true, Some(payments)) = (refund, &self.payments) {
            if let Err(e) = self
                .refund_latest(payments, subscription_id, refund_amount)
                .await
            {
                tracing::error!(
                    subscription = %subscription_id,
                    "Failed to process refund for subscription: {}",
                    e
                );
            }
        }

        Some(subscription)
    }

    async fn refund_latest(
        &self,
        payments: &ResilientPaymentClient,
        subscription_id: Uuid,
        amount: Option<f64>,
    ) -> MeterResult<()> {
        let latest = payments
            .list_payments(subscription_id)
            .await?
            .into_iter()
            .max_by_key(|payment| payment.payment_date);

        match latest {
            Some(payment) => {
                payments.refund_payment(payment.id, amount).await?;
                tracing::info!(
                    subscription = %subscription_id,
                    payment = %payment.id,
                    "Refund processed for subscription"
                );
            }
            None => tracing::warn!(
                subscription = %subscription_id,
                "No payments found for subscription to refund"
            ),
        }
        Ok(())
    }
}
