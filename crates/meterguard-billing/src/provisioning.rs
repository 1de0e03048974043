//! Provisioning of entitlement features and the token meter

use meterguard_core::MeterResult;

use crate::resilient::ResilientMeteringClient;

/// Make sure every feature in `feature_keys` exists, creating the missing ones.
///
/// Falls back to `default_key` when no keys are given; blank keys are ignored.
/// Returns the keys that were created. Stops at the first failure.
pub async fn ensure_features(
    client: &ResilientMeteringClient,
    feature_keys: &[String],
    default_key: &str,
) -> MeterResult<Vec<String>> {
    let requested: Vec<&str> = if feature_keys.is_empty() {
        vec![default_key]
    } else {
        feature_keys.iter().map(String::as_str).collect()
    };
    let requested: Vec<&str> = requested
        .into_iter()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .collect();

    if requested.is_empty() {
        tracing::warn!("No feature keys provided or configured, nothing to ensure");
        return Ok(Vec::new());
    }

    let existing = client.list_features().await.inspect_err(|e| {
        tracing::error!("Failed to list existing features: {}", e);
    })?;

    let mut created = Vec::new();
    for key in requested {
        if existing.iter().any(|feature| feature == key) || created.iter().any(|c| c == key) {
            tracing::info!(feature = key, "Feature already exists");
            continue;
        }

        tracing::info!(feature = key, "Feature does not exist, creating it");
        client.create_feature(key).await.inspect_err(|e| {
            tracing::error!(feature = key, "Error creating feature: {}", e);
        })?;
        created.push(key.to_string());
    }

    Ok(created)
}

/// Create the token meter described by the client's meter settings
pub async fn create_meter(client: &ResilientMeteringClient) -> MeterResult<bool> {
    let slug = &client.settings().meter.slug;
    match client.create_meter().await {
        Ok(created) => {
            tracing::info!(meter = %slug, "Meter created successfully");
            Ok(created)
        }
        Err(e) => {
            tracing::error!(meter = %slug, "Error creating meter: {}", e);
            Err(e)
        }
    }
}
