//! Helpers shared by in-process suites.
//!
//! Everything here works against the collaborator traits so a suite can be
//! exercised with fakes. The bundled binary drives external command suites
//! and does not call these; they are library API for suites written in Rust.

use regex::Regex;
use tracing::{info, warn};

use crate::collaborators::{DownstreamStore, Record, RecordProducer, TopicAdmin};
use crate::error::SuiteError;

/// Records produced between two flushes.
pub const DEFAULT_FLUSH_EVERY: usize = 5000;

pub fn stage_name(connector: &str, topic: &str) -> String {
    format!("SNOWFLAKE_KAFKA_CONNECTOR_{}_STAGE_{}", connector, topic)
}

pub fn pipe_name(connector: &str, topic: &str, partition: u32) -> String {
    format!("SNOWFLAKE_KAFKA_CONNECTOR_{}_PIPE_{}_{}", connector, topic, partition)
}

/// Produce `records` to `topic`, flushing after every `flush_every` records
/// and once more at the end. Returns the number of records sent.
pub async fn send_batched<I>(
    producer: &dyn RecordProducer,
    topic: &str,
    records: I,
    flush_every: usize,
) -> Result<usize, SuiteError>
where
    I: IntoIterator<Item = Record>,
{
    let flush_every = flush_every.max(1);
    let mut sent = 0;

    for record in records {
        producer.send(topic, record).await?;
        sent += 1;
        if sent % flush_every == 0 {
            producer.flush().await?;
        }
    }
    producer.flush().await?;

    Ok(sent)
}

/// Drop the table, stage and per-partition pipes a connector created for
/// `topic`. Every statement is `IF EXISTS`, so this is safe to repeat.
pub async fn clean_table_stage_pipe(
    store: &dyn DownstreamStore,
    connector: &str,
    topic: &str,
    partitions: u32,
) -> Result<(), SuiteError> {
    info!(table = %topic, "Drop table");
    store.execute(&format!("DROP table IF EXISTS {}", topic)).await?;

    let stage = stage_name(connector, topic);
    info!(stage = %stage, "Drop stage");
    store.execute(&format!("DROP stage IF EXISTS {}", stage)).await?;

    for p in 0..partitions {
        let pipe = pipe_name(connector, topic, p);
        info!(pipe = %pipe, "Drop pipe");
        store.execute(&format!("DROP pipe IF EXISTS {}", pipe)).await?;
    }

    Ok(())
}

/// A stage that still lists files has not been purged by the connector yet.
pub async fn verify_stage_is_cleaned(
    store: &dyn DownstreamStore,
    connector: &str,
    topic: &str,
) -> Result<(), SuiteError> {
    let rows = store
        .execute(&format!("list @{}", stage_name(connector, topic)))
        .await?;
    if !rows.is_empty() {
        return Err(SuiteError::retryable("stage not cleaned up"));
    }
    Ok(())
}

fn gold_pattern(gold: &str) -> String {
    let mut pattern = String::with_capacity(gold.len() + 8);
    pattern.push('^');
    for c in gold.chars() {
        if matches!(c, '{' | '}' | '[' | ']' | '+') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('$');
    pattern
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| *c != ' ' && *c != '\n').collect()
}

fn match_gold(label: &str, actual: &str, gold: &str) -> Result<(), SuiteError> {
    let pattern = gold_pattern(gold);
    let re = Regex::new(&pattern)
        .map_err(|e| SuiteError::non_retryable(format!("invalid gold regex {}: {}", pattern, e)))?;
    let actual = strip_whitespace(actual);
    if !re.is_match(&actual) {
        return Err(SuiteError::non_retryable(format!(
            "Record {}:\n{}\ndoes not match gold regex label:\n{}",
            label, actual, pattern
        )));
    }
    Ok(())
}

/// Match one downstream row's metadata and content columns against gold
/// patterns. Spaces and newlines are ignored on the row side; literal
/// braces, brackets and `+` in the gold text need no escaping.
pub fn regex_match_one_line(
    meta: &str,
    content: &str,
    gold_meta: &str,
    gold_content: &str,
) -> Result<(), SuiteError> {
    match_gold("meta data", meta, gold_meta)?;
    match_gold("content", content, gold_content)
}

/// Delete a topic; a failure is only logged since the topic may never
/// have been created.
pub async fn clean_topic(admin: &dyn TopicAdmin, topic: &str) {
    match admin.delete_topic(topic).await {
        Ok(()) => info!(topic, "Topic deletion successful"),
        Err(e) => warn!(topic, error = %e, "Failed to delete topic"),
    }
}

pub async fn log_topic_config(admin: &dyn TopicAdmin, topic: &str) {
    match admin.describe_topic(topic).await {
        Ok(configs) => {
            for (key, value) in configs {
                info!(topic, key = %key, value = %value, "Topic config");
            }
        }
        Err(e) => warn!(topic, error = %e, "Failed to describe topic"),
    }
}
