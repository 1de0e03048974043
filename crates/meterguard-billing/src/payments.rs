//! Payment processing routed through the resilient executor
//!
//! Every payment-provider call goes through the [`PAYMENT_SERVICE`] breaker.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use meterguard_core::{
    CallOptions, DependencyName, MeterError, MeterResult, Recoverable, ResilientExecutor,
    ServiceError,
};
use serde_json::Value;
use uuid::Uuid;

use crate::client::PaymentClient;
use crate::models::{Payment, PaymentRequest, PaymentStatus};

/// Breaker for the payment provider
pub const PAYMENT_SERVICE: &str = "PaymentService";

/// Payment operations with circuit breaking and error translation
pub struct ResilientPaymentClient {
    client: Arc<dyn PaymentClient>,
    executor: Arc<ResilientExecutor>,
    dependency: DependencyName,
}

impl ResilientPaymentClient {
    pub fn new(
        client: Arc<dyn PaymentClient>,
        executor: Arc<ResilientExecutor>,
    ) -> MeterResult<Self> {
        Ok(Self {
            client,
            executor,
            dependency: DependencyName::new(PAYMENT_SERVICE)?,
        })
    }

    pub fn dependency(&self) -> &DependencyName {
        &self.dependency
    }

    pub fn executor(&self) -> &Arc<ResilientExecutor> {
        &self.executor
    }

    async fn run<T, F, Fut>(&self, options: CallOptions<T>, operation: F) -> MeterResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        self.executor
            .call(&self.dependency, options, operation)
            .await
            .map_err(MeterError::from)
    }

    pub async fn process_payment(&self, request: &PaymentRequest) -> MeterResult<Payment> {
        self.run(CallOptions::new(), || self.client.process_payment(request))
            .await
            .inspect_err(|e| {
                tracing::error!(
                    subscription = %request.subscription_id,
                    "Error processing payment: {}",
                    e
                );
            })
    }

    /// The payment, or `None` when the provider does not know it
    pub async fn get_payment(&self, payment_id: Uuid) -> MeterResult<Option<Payment>> {
        self.run(
            CallOptions::new().recover(Recoverable::NotFound, None),
            || async move { self.client.get_payment(payment_id).await.map(Some) },
        )
        .await
    }

    pub async fn list_payments(&self, subscription_id: Uuid) -> MeterResult<Vec<Payment>> {
        self.run(CallOptions::new(), || self.client.list_payments(subscription_id))
            .await
    }

    /// Refund `amount`, or the whole payment when `None`
    pub async fn refund_payment(
        &self,
        payment_id: Uuid,
        amount: Option<f64>,
    ) -> MeterResult<Payment> {
        self.run(CallOptions::new(), || {
            self.client.refund_payment(payment_id, amount)
        })
        .await
        .inspect_err(|e| {
            tracing::error!(payment = %payment_id, "Error refunding payment: {}", e);
        })
    }

    pub async fn update_payment_status(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> MeterResult<Payment> {
        self.run(CallOptions::new(), || {
            self.client.update_payment_status(payment_id, status)
        })
        .await
        .inspect_err(|e| {
            tracing::error!(payment = %payment_id, "Error updating payment status: {}", e);
        })
    }
}

/// Payment provider keeping payments in memory; every charge succeeds
#[derive(Debug, Default)]
pub struct InMemoryPaymentClient {
    payments: DashMap<Uuid, Payment>,
}

impl InMemoryPaymentClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.payments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }

    fn missing(payment_id: Uuid) -> ServiceError {
        ServiceError::not_found(format!("Payment with ID {} not found", payment_id))
    }
}

#[async_trait]
impl PaymentClient for InMemoryPaymentClient {
    async fn process_payment(&self, request: &PaymentRequest) -> Result<Payment, ServiceError> {
        let payment = Payment {
            id: Uuid::new_v4(),
            subscription_id: request.subscription_id,
            amount: request.amount,
            currency: request.currency.clone(),
            status: PaymentStatus::Processed,
            payment_date: Utc::now(),
            payment_method: request.payment_method.clone(),
            metadata: request.metadata.clone(),
        };
        self.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn get_payment(&self, payment_id: Uuid) -> Result<Payment, ServiceError> {
        self.payments
            .get(&payment_id)
            .map(|payment| payment.value().clone())
            .ok_or_else(|| Self::missing(payment_id))
    }

    async fn list_payments(&self, subscription_id: Uuid) -> Result<Vec<Payment>, ServiceError> {
        Ok(self
            .payments
            .iter()
            .filter(|entry| entry.subscription_id == subscription_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn refund_payment(
        &self,
        payment_id: Uuid,
        amount: Option<f64>,
    ) -> Result<Payment, ServiceError> {
        let mut payment = self
            .payments
            .get_mut(&payment_id)
            .ok_or_else(|| Self::missing(payment_id))?;

        match amount {
            Some(amount) if amount < payment.amount => {
                payment.status = PaymentStatus::PartiallyRefunded;
                payment
                    .metadata
                    .insert("refunded_amount".to_string(), Value::from(amount));
            }
            _ => payment.status = PaymentStatus::Refunded,
        }
        Ok(payment.value().clone())
    }

    async fn update_payment_status(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Payment, ServiceError> {
        let mut payment = self
            .payments
            .get_mut(&payment_id)
            .ok_or_else(|| Self::missing(payment_id))?;
        payment.status = status;
        Ok(payment.value().clone())
    }
}
