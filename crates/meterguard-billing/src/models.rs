//! Billing and metering data models

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use meterguard_core::MeterConfig;
use serde_json::{Map, Value, json};
use uuid::Uuid;

const UNKNOWN_MODEL: &str = "unknown_model";
const UNKNOWN_PROMPT: &str = "unknown_prompt";

/// Tokens consumed by one model invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub tokens: u64,
    pub model: Option<String>,
    pub prompt: Option<String>,
}

impl UsageEvent {
    pub fn new(tokens: u64) -> Self {
        Self {
            tokens,
            model: None,
            prompt: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Event payload as ingested by the metering vendor
    pub fn to_data(&self) -> Value {
        json!({
            "tokens": self.tokens,
            "model": self.model.as_deref().unwrap_or(UNKNOWN_MODEL),
            "prompt": self.prompt.as_deref().unwrap_or(UNKNOWN_PROMPT),
        })
    }
}

/// CloudEvents envelope for a single usage event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent {
    pub id: String,
    pub specversion: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub subject: String,
    pub time: DateTime<Utc>,
    pub datacontenttype: String,
    pub data: Value,
}

impl CloudEvent {
    pub fn usage(
        subject: impl Into<String>,
        event_type: impl Into<String>,
        source: impl Into<String>,
        event: &UsageEvent,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            specversion: "1.0".to_string(),
            event_type: event_type.into(),
            source: source.into(),
            subject: subject.into(),
            time: Utc::now(),
            datacontenttype: "application/json".to_string(),
            data: event.to_data(),
        }
    }
}

/// Remaining token budget of a subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenQuota {
    pub sufficient: bool,
    pub token_limit: u64,
    pub consumed_tokens: u64,
    pub remaining_tokens: u64,
}

impl Default for TokenQuota {
    /// Quota reported when usage is unknown: allow, with a nominal 1000-token budget
    fn default() -> Self {
        Self {
            sufficient: true,
            token_limit: 1000,
            consumed_tokens: 0,
            remaining_tokens: 1000,
        }
    }
}

/// A metered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl Subject {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            email: None,
            display_name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Email, then display name, then the id
    pub fn label(&self) -> String {
        self.email
            .clone()
            .or_else(|| self.display_name.clone())
            .unwrap_or_else(|| self.id.to_string())
    }

    pub fn to_record(&self) -> SubjectRecord {
        SubjectRecord {
            key: self.id.to_string(),
            display_name: Some(self.label()),
        }
    }
}

/// Subject as stored by the metering vendor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRecord {
    pub key: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl TryFrom<SubjectRecord> for Subject {
    type Error = uuid::Error;

    fn try_from(record: SubjectRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&record.key)?,
            email: record.display_name.clone(),
            display_name: record.display_name,
        })
    }
}

/// Reset interval of a metered entitlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UsagePeriod {
    Day,
    Week,
    Month,
    Year,
}

impl fmt::Display for UsagePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let period = match self {
            Self::Day => "DAY",
            Self::Week => "WEEK",
            Self::Month => "MONTH",
            Self::Year => "YEAR",
        };
        write!(f, "{}", period)
    }
}

/// Request to grant a subject a metered allowance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementGrant {
    pub feature: String,
    pub max_limit: u64,
    pub period: UsagePeriod,
}

/// Access of a subject to a feature
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Entitlement {
    pub feature_key: String,
    pub has_access: bool,
    pub balance: Option<i64>,
    pub limit: Option<u64>,
    pub usage: Option<u64>,
    pub period: Option<String>,
}

impl From<EntitlementGrant> for Entitlement {
    fn from(grant: EntitlementGrant) -> Self {
        Self {
            feature_key: grant.feature,
            has_access: true,
            limit: Some(grant.max_limit),
            period: Some(grant.period.to_string()),
            ..Default::default()
        }
    }
}

/// Meter as created on the metering vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterDefinition {
    pub slug: String,
    pub description: String,
    pub event_type: String,
    pub aggregation: String,
    /// JSONPath into the event data, e.g. `$.tokens`
    pub value_property: String,
    /// Group-by key mapped to its JSONPath
    pub group_by: Map<String, Value>,
    pub window_size: String,
}

impl From<&MeterConfig> for MeterDefinition {
    fn from(config: &MeterConfig) -> Self {
        Self {
            slug: config.slug.clone(),
            description: config.description.clone(),
            event_type: config.event_type.clone(),
            aggregation: config.aggregation.clone(),
            value_property: format!("$.{}", config.value_property),
            group_by: config
                .group_by
                .iter()
                .map(|key| (key.clone(), Value::String(format!("$.{}", key))))
                .collect(),
            window_size: config.window_size.clone(),
        }
    }
}

/// Lifecycle of a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processed,
    Failed,
    Refunded,
    PartiallyRefunded,
}

/// A charge made for a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_date: DateTime<Utc>,
    pub payment_method: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Request to charge a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub subscription_id: Uuid,
    pub amount: f64,
    pub currency: String,
    pub payment_method: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl PaymentRequest {
    pub fn new(subscription_id: Uuid, amount: f64) -> Self {
        Self {
            subscription_id,
            amount,
            currency: "USD".to_string(),
            payment_method: None,
            metadata: Map::new(),
        }
    }
}

/// Lifecycle of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    PaymentFailed,
    Expired,
}

/// A subject's subscription to a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub plan_id: String,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub auto_renew: bool,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Fields of a subscription to change; `None` leaves a field as it is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionUpdate {
    pub status: Option<SubscriptionStatus>,
    pub end_date: Option<DateTime<Utc>>,
    pub auto_renew: Option<bool>,
    /// Replaces the existing metadata
    pub metadata: Option<Map<String, Value>>,
}

/// Request to open a subscription, optionally charging for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSubscription {
    pub subject_id: Uuid,
    pub plan_id: String,
    /// Defaults to now
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub auto_renew: bool,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Charged on creation when set
    pub amount: Option<f64>,
    pub currency: String,
    pub payment_method: String,
}

impl NewSubscription {
    pub fn new(subject_id: Uuid, plan_id: impl Into<String>) -> Self {
        Self {
            subject_id,
            plan_id: plan_id.into(),
            start_date: None,
            end_date: None,
            auto_renew: false,
            metadata: Map::new(),
            amount: None,
            currency: "USD".to_string(),
            payment_method: "credit_card".to_string(),
        }
    }

    pub fn with_charge(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_data_defaults_unknown_model_and_prompt() {
        let data = UsageEvent::new(42).to_data();
        assert_eq!(data["tokens"], 42);
        assert_eq!(data["model"], "unknown_model");
        assert_eq!(data["prompt"], "unknown_prompt");

        let data = UsageEvent::new(7).with_model("gpt-4o").with_prompt("summary").to_data();
        assert_eq!(data["model"], "gpt-4o");
        assert_eq!(data["prompt"], "summary");
    }

    #[test]
    fn test_cloud_event_serializes_type_attribute() {
        let event = CloudEvent::usage("subject-1", "tokens", "billing", &UsageEvent::new(5));
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], "tokens");
        assert_eq!(value["source"], "billing");
        assert_eq!(value["subject"], "subject-1");
        assert_eq!(value["specversion"], "1.0");
        assert!(Uuid::parse_str(value["id"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_default_quota_is_permissive() {
        let quota = TokenQuota::default();
        assert!(quota.sufficient);
        assert_eq!(quota.token_limit, 1000);
        assert_eq!(quota.consumed_tokens, 0);
        assert_eq!(quota.remaining_tokens, 1000);
    }

    #[test]
    fn test_subject_label_prefers_email() {
        let id = Uuid::new_v4();
        assert_eq!(Subject::new(id).label(), id.to_string());

        let subject = Subject::new(id).with_email("ada@example.com");
        let record = subject.to_record();
        assert_eq!(record.key, id.to_string());
        assert_eq!(record.display_name.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_subject_record_requires_uuid_key() {
        let record = SubjectRecord {
            key: "not-a-uuid".to_string(),
            display_name: None,
        };
        assert!(Subject::try_from(record).is_err());
    }

    #[test]
    fn test_entitlement_from_vendor_json() {
        let entitlement: Entitlement = serde_json::from_str(
            r#"{"featureKey": "ai_tokens", "hasAccess": true, "balance": 250, "usage": 750}"#,
        )
        .unwrap();
        assert_eq!(entitlement.feature_key, "ai_tokens");
        assert!(entitlement.has_access);
        assert_eq!(entitlement.balance, Some(250));
        assert_eq!(entitlement.limit, None);

        let missing: Entitlement = serde_json::from_str("{}").unwrap();
        assert!(!missing.has_access);
    }

    #[test]
    fn test_grant_becomes_accessible_entitlement() {
        let entitlement = Entitlement::from(EntitlementGrant {
            feature: "ai_tokens".to_string(),
            max_limit: 10_000,
            period: UsagePeriod::Month,
        });
        assert!(entitlement.has_access);
        assert_eq!(entitlement.limit, Some(10_000));
        assert_eq!(entitlement.period.as_deref(), Some("MONTH"));
    }

    #[test]
    fn test_meter_definition_uses_json_paths() {
        let meter = MeterDefinition::from(&MeterConfig::default());
        let value = serde_json::to_value(&meter).unwrap();

        assert_eq!(value["slug"], "ai_tokens");
        assert_eq!(value["eventType"], "tokens");
        assert_eq!(value["aggregation"], "SUM");
        assert_eq!(value["valueProperty"], "$.tokens");
        assert_eq!(value["groupBy"]["model"], "$.model");
        assert_eq!(value["groupBy"]["prompt"], "$.prompt");
        assert_eq!(value["windowSize"], "DAY");
    }

    #[test]
    fn test_statuses_serialize_snake_case() {
        assert_eq!(
            serde_json::to_value(PaymentStatus::PartiallyRefunded).unwrap(),
            "partially_refunded"
        );
        assert_eq!(
            serde_json::to_value(SubscriptionStatus::PaymentFailed).unwrap(),
            "payment_failed"
        );
    }
}
