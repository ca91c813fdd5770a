use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use tracing::error;

use crate::models::{RepositoryError, RepositoryResult};
use crate::observability::DatabaseTracingMiddleware;

/// Connection details shared by every DynamoDB-backed repository
#[derive(Clone)]
pub struct TableContext {
    pub table_name: String,
    pub region: String,
    pub tracing: Option<DatabaseTracingMiddleware>,
}

impl TableContext {
    pub fn new(table_name: String, region: String) -> Self {
        Self {
            table_name,
            region,
            tracing: None,
        }
    }

    /// Create a DynamoDB subsegment span with X-Ray attributes
    pub fn span(&self, operation: &str) -> tracing::Span {
        tracing::info_span!(
            "DynamoDB",
            "aws.service" = "DynamoDB",
            "aws.operation" = operation,
            "aws.region" = %self.region,
            "aws.dynamodb.table_name" = %self.table_name,
            "aws.request_id" = tracing::field::Empty,
            "aws.agent" = "rust-aws-sdk",

            "aws.remote.service" = "AWS::DynamoDB",
            "aws.remote.operation" = operation,
            "aws.remote.resource.type" = "AWS::DynamoDB::Table",
            "aws.remote.resource.identifier" = %self.table_name,

            "otel.kind" = "client",
            "otel.name" = format!("DynamoDB.{}", operation),

            "rpc.system" = "aws-api",
            "rpc.service" = "AmazonDynamoDBv2",
            "rpc.method" = operation,

            "db.system" = "dynamodb",
            "db.name" = %self.table_name,
            "db.operation" = operation,

            "component" = "aws-sdk-dynamodb",
        )
    }

    /// Run a table operation, recording it in the database metrics when enabled
    pub async fn traced<F, T>(&self, operation: &str, future: F) -> RepositoryResult<T>
    where
        F: Future<Output = RepositoryResult<T>>,
    {
        match &self.tracing {
            Some(tracing) => {
                tracing
                    .trace_operation(operation, &self.table_name, future)
                    .await
            }
            None => future.await,
        }
    }
}

/// Map an SDK failure to a repository error
pub fn sdk_error<E>(table_name: &str, error: E) -> RepositoryError
where
    E: std::error::Error + ProvideErrorMetadata,
{
    error!(table = %table_name, "DynamoDB error: {:?}", error);
    if error.code() == Some("ResourceNotFoundException") {
        return RepositoryError::TableNotFound {
            table_name: table_name.to_string(),
        };
    }
    RepositoryError::AwsSdk {
        message: DisplayErrorContext(&error).to_string(),
    }
}

pub fn get_string(
    item: &HashMap<String, AttributeValue>,
    key: &str,
) -> RepositoryResult<String> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| RepositoryError::InvalidData {
            message: format!("Missing {}", key),
        })
}

pub fn get_timestamp(
    item: &HashMap<String, AttributeValue>,
    key: &str,
) -> Option<DateTime<Utc>> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
