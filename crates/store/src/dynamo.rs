//! DynamoDB store backend.
//!
//! Items are converted between the tree-valued [`Attributes`] map and
//! DynamoDB attribute maps with `serde_dynamo`. Every expression uses
//! placeholder names, so attribute names never collide with reserved words.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, PutRequest, ReturnValue, WriteRequest};
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, to_attribute_value, to_item};
use telemetry::metrics;
use tokio::time::sleep;
use tracing::{debug, warn};
use tracker_core::limits::STORE_BATCH_WRITE_LIMIT;
use tracker_core::{Error, Result};

use crate::client::{KvStore, Query};
use crate::config::StoreConfig;
use crate::item::{Attributes, Item, ItemKey, TableSchema};

type DynamoItem = HashMap<String, AttributeValue>;

/// Retries for items a bulk write leaves unprocessed.
const BATCH_MAX_RETRIES: u32 = 5;
const BATCH_INITIAL_DELAY: Duration = Duration::from_millis(100);
const BATCH_MAX_DELAY: Duration = Duration::from_millis(1600);

/// DynamoDB-backed table.
pub struct DynamoStore {
    client: Client,
    schema: TableSchema,
    /// Upper bound on items per `BatchWriteItem` request
    batch_write_size: usize,
}

impl DynamoStore {
    pub fn new(client: Client, schema: TableSchema) -> Self {
        Self {
            client,
            schema,
            batch_write_size: STORE_BATCH_WRITE_LIMIT,
        }
    }

    pub fn with_batch_write_size(mut self, size: usize) -> Self {
        self.batch_write_size = size.clamp(1, STORE_BATCH_WRITE_LIMIT);
        self
    }

    /// Builds a client from the environment's credential chain plus the
    /// region, endpoint, and timeout overrides in `config`.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(Duration::from_secs(config.timeout_secs))
                .build(),
        );
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_dynamodb::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(
            Self::new(Client::from_conf(builder.build()), config.schema())
                .with_batch_write_size(config.batch_write_size),
        )
    }

    fn table(&self) -> &str {
        &self.schema.table_name
    }

    fn key_attributes(&self, key: &ItemKey) -> DynamoItem {
        HashMap::from([
            (
                self.schema.partition_key.clone(),
                AttributeValue::S(key.partition.clone()),
            ),
            (
                self.schema.sort_key.clone(),
                AttributeValue::S(key.sort.clone()),
            ),
        ])
    }

    fn reject_key_fields(&self, fields: &Attributes) -> Result<()> {
        if let Some(name) = fields.keys().find(|n| self.schema.is_key_attribute(n)) {
            return Err(Error::store(format!("key attribute '{}' cannot be updated", name)));
        }
        Ok(())
    }

    async fn query_page(
        &self,
        query: &Query,
        start_key: Option<DynamoItem>,
        limit: Option<usize>,
    ) -> Result<(Vec<Item>, Option<DynamoItem>)> {
        let (pk_attr, sk_attr) = match query.index.as_deref() {
            Some(name) => {
                let index = self.schema.index(name)?;
                (index.partition_key.as_str(), index.sort_key.as_str())
            }
            None => (
                self.schema.partition_key.as_str(),
                self.schema.sort_key.as_str(),
            ),
        };

        let mut request = self
            .client
            .query()
            .table_name(self.table())
            .set_index_name(query.index.clone())
            .expression_attribute_names("#pk", pk_attr)
            .expression_attribute_values(":pk", AttributeValue::S(query.partition.clone()))
            .scan_index_forward(true)
            .set_exclusive_start_key(start_key)
            .set_limit(limit.map(|l| l.min(i32::MAX as usize) as i32));

        request = match &query.sort_prefix {
            Some(prefix) => request
                .key_condition_expression("#pk = :pk AND begins_with(#sk, :prefix)")
                .expression_attribute_names("#sk", sk_attr)
                .expression_attribute_values(":prefix", AttributeValue::S(prefix.clone())),
            None => request.key_condition_expression("#pk = :pk"),
        };

        let output = request.send().await.map_err(|e| sdk_error("query", e))?;
        let items = output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<_>>>()?;

        Ok((items, output.last_evaluated_key))
    }

    async fn write_batch(&self, requests: Vec<WriteRequest>) -> Result<Vec<WriteRequest>> {
        let output = self
            .client
            .batch_write_item()
            .request_items(self.table(), requests)
            .send()
            .await
            .map_err(|e| sdk_error("batch_write_item", e))?;

        Ok(output
            .unprocessed_items
            .unwrap_or_default()
            .into_values()
            .flatten()
            .collect())
    }
}

#[async_trait]
impl KvStore for DynamoStore {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn put(&self, item: Item) -> Result<()> {
        self.schema.key_of(&item)?;
        let start = Instant::now();

        let result = self
            .client
            .put_item()
            .table_name(self.table())
            .set_item(Some(encode(&item)?))
            .send()
            .await
            .map_err(|e| sdk_error("put_item", e));

        record(start, &result);
        result.map(|_| ())
    }

    async fn get(&self, key: &ItemKey) -> Result<Option<Item>> {
        let start = Instant::now();

        let result = self
            .client
            .get_item()
            .table_name(self.table())
            .set_key(Some(self.key_attributes(key)))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| sdk_error("get_item", e));

        record(start, &result);
        result?.item.map(decode).transpose()
    }

    async fn query(&self, query: &Query) -> Result<Vec<Item>> {
        let start = Instant::now();
        let mut items = Vec::new();
        let mut start_key = None;

        let result = loop {
            let remaining = query.limit.map(|l| l.saturating_sub(items.len()));
            if remaining == Some(0) {
                break Ok(());
            }

            match self.query_page(query, start_key.take(), remaining).await {
                Ok((page, next)) => {
                    items.extend(page);
                    match next {
                        Some(key) => start_key = Some(key),
                        None => break Ok(()),
                    }
                }
                Err(e) => break Err(e),
            }
        };

        record(start, &result);
        result?;

        debug!(
            partition = %query.partition,
            index = ?query.index,
            count = items.len(),
            "Query complete"
        );
        Ok(items)
    }

    async fn update(&self, key: &ItemKey, fields: Attributes) -> Result<Option<Item>> {
        self.reject_key_fields(&fields)?;
        if fields.is_empty() {
            return self.get(key).await;
        }

        let start = Instant::now();
        let mut request = self
            .client
            .update_item()
            .table_name(self.table())
            .set_key(Some(self.key_attributes(key)))
            .condition_expression("attribute_exists(#pk)")
            .expression_attribute_names("#pk", self.schema.partition_key.as_str())
            .return_values(ReturnValue::AllNew);

        let mut assignments = Vec::with_capacity(fields.len());
        for (index, (name, value)) in fields.into_iter().enumerate() {
            assignments.push(format!("#f{index} = :v{index}"));
            request = request
                .expression_attribute_names(format!("#f{index}"), name)
                .expression_attribute_values(format!(":v{index}"), encode_value(&value)?);
        }
        request = request.update_expression(format!("SET {}", assignments.join(", ")));

        let result = match request.send().await {
            Ok(output) => Ok(output.attributes),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|s| s.is_conditional_check_failed_exception()) =>
            {
                Ok(None)
            }
            Err(e) => Err(sdk_error("update_item", e)),
        };

        record(start, &result);
        result?.map(decode).transpose()
    }

    async fn increment(
        &self,
        key: &ItemKey,
        attribute: &str,
        delta: i64,
        fields: Attributes,
    ) -> Result<Option<Item>> {
        self.reject_key_fields(&fields)?;

        let start = Instant::now();
        let mut request = self
            .client
            .update_item()
            .table_name(self.table())
            .set_key(Some(self.key_attributes(key)))
            .expression_attribute_names("#pk", self.schema.partition_key.as_str())
            .expression_attribute_names("#c", attribute)
            .expression_attribute_values(":d", AttributeValue::N(delta.to_string()))
            .return_values(ReturnValue::AllNew);

        // A decrement only applies while the counter covers it.
        request = if delta < 0 {
            request
                .condition_expression("attribute_exists(#pk) AND #c >= :min")
                .expression_attribute_values(":min", AttributeValue::N((-delta).to_string()))
        } else {
            request.condition_expression("attribute_exists(#pk)")
        };

        let mut assignments = Vec::with_capacity(fields.len());
        for (index, (name, value)) in fields.into_iter().enumerate() {
            assignments.push(format!("#f{index} = :v{index}"));
            request = request
                .expression_attribute_names(format!("#f{index}"), name)
                .expression_attribute_values(format!(":v{index}"), encode_value(&value)?);
        }
        let expression = if assignments.is_empty() {
            "ADD #c :d".to_string()
        } else {
            format!("SET {} ADD #c :d", assignments.join(", "))
        };
        request = request.update_expression(expression);

        let result = match request.send().await {
            Ok(output) => Ok(output.attributes),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|s| s.is_conditional_check_failed_exception()) =>
            {
                Ok(None)
            }
            Err(e) => Err(sdk_error("update_item", e)),
        };

        record(start, &result);
        result?.map(decode).transpose()
    }

    async fn delete(&self, key: &ItemKey) -> Result<()> {
        let start = Instant::now();

        let result = self
            .client
            .delete_item()
            .table_name(self.table())
            .set_key(Some(self.key_attributes(key)))
            .send()
            .await
            .map_err(|e| sdk_error("delete_item", e));

        record(start, &result);
        result.map(|_| ())
    }

    async fn batch_put(&self, items: Vec<Item>, max_batch_size: usize) -> Result<usize> {
        let mut requests = Vec::with_capacity(items.len());
        for item in &items {
            self.schema.key_of(item)?;
            let put = PutRequest::builder()
                .set_item(Some(encode(item)?))
                .build()
                .map_err(|e| Error::store(e.to_string()))?;
            requests.push(WriteRequest::builder().put_request(put).build());
        }

        let start = Instant::now();
        let mut written = 0;

        let chunk_size = max_batch_size.clamp(1, self.batch_write_size);
        for chunk in requests.chunks(chunk_size) {
            let mut pending = self.write_batch(chunk.to_vec()).await?;
            let mut delay = BATCH_INITIAL_DELAY;
            let mut retries = 0;

            while !pending.is_empty() && retries < BATCH_MAX_RETRIES {
                warn!(
                    unprocessed = pending.len(),
                    retry = retries + 1,
                    "Retrying unprocessed bulk writes"
                );
                sleep(delay).await;
                delay = (delay * 2).min(BATCH_MAX_DELAY);
                retries += 1;
                pending = self.write_batch(pending).await?;
            }

            if !pending.is_empty() {
                metrics().store_errors.inc();
                return Err(Error::store(format!(
                    "{} of {} items left unprocessed after {} retries ({} written)",
                    pending.len(),
                    items.len(),
                    BATCH_MAX_RETRIES,
                    written + chunk.len() - pending.len()
                )));
            }
            written += chunk.len();
        }

        metrics()
            .store_latency_ms
            .observe(start.elapsed().as_millis() as u64);
        Ok(written)
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .describe_table()
            .table_name(self.table())
            .send()
            .await
            .map_err(|e| sdk_error("describe_table", e))?;
        Ok(())
    }
}

fn encode(item: &Item) -> Result<DynamoItem> {
    to_item(item.attributes()).map_err(|e| Error::codec(e.to_string()))
}

fn encode_value(value: &serde_json::Value) -> Result<AttributeValue> {
    to_attribute_value(value).map_err(|e| Error::codec(e.to_string()))
}

fn decode(item: DynamoItem) -> Result<Item> {
    let attributes: Attributes = from_item(item).map_err(|e| Error::codec(e.to_string()))?;
    Ok(Item::from_attributes(attributes))
}

fn sdk_error<E>(operation: &str, err: E) -> Error
where
    E: std::error::Error,
{
    Error::store(format!("{} failed: {}", operation, DisplayErrorContext(&err)))
}

fn record<T>(start: Instant, result: &Result<T>) {
    let m = metrics();
    m.store_latency_ms
        .observe(start.elapsed().as_millis() as u64);
    if result.is_err() {
        m.store_errors.inc();
    }
}
