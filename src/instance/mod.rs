pub mod api;

use serde::{Deserialize, Serialize};

use crate::infrastructure::ReviewError;

/// The contact-center instance a review targets. Built once from
/// configuration and handed to every analyzer as opaque context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceContext {
    pub instance_id: String,
    pub region: String,
    pub account_id: String,
    pub instance_arn: String,
    /// Log group the flow-log analyzer queries; absent when flow logging is
    /// not configured for the instance.
    pub log_group: Option<String>,
}

impl InstanceContext {
    pub fn from_arn(instance_arn: &str, log_group: Option<String>) -> Result<Self, ReviewError> {
        let parsed = parse_instance_arn(instance_arn)?;
        Ok(Self {
            instance_id: parsed.instance_id,
            region: parsed.region,
            account_id: parsed.account_id,
            instance_arn: instance_arn.to_string(),
            log_group,
        })
    }
}

/// Components of a contact-center instance ARN,
/// `arn:<partition>:connect:<region>:<account-id>:instance/<instance-id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceArn {
    pub partition: String,
    pub region: String,
    pub account_id: String,
    pub instance_id: String,
}

pub fn parse_instance_arn(arn: &str) -> Result<InstanceArn, ReviewError> {
    if arn.is_empty() {
        return Err(ReviewError::validation(
            "instance ARN must not be empty",
            Some("instance_arn".to_string()),
        ));
    }

    let parts: Vec<&str> = arn.split(':').collect();
    if parts.len() < 6 || parts[0] != "arn" || parts[2] != "connect" {
        return Err(ReviewError::validation(
            format!("invalid instance ARN format: {arn}"),
            Some("instance_arn".to_string()),
        ));
    }

    let resource = parts[5];
    let instance_id = resource.strip_prefix("instance/").ok_or_else(|| {
        ReviewError::validation(
            format!("invalid resource type in ARN: {resource}"),
            Some("instance_arn".to_string()),
        )
    })?;

    if instance_id.is_empty() {
        return Err(ReviewError::validation(
            "instance ARN has an empty instance id",
            Some("instance_arn".to_string()),
        ));
    }

    Ok(InstanceArn {
        partition: parts[1].to_string(),
        region: parts[3].to_string(),
        account_id: parts[4].to_string(),
        instance_id: instance_id.to_string(),
    })
}
