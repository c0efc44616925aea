//! Consumers of resolution results.
//!
//! Hosts that keep an audit trail of access checks implement
//! [`DecisionSink`]. The resolver hands every decision it produces to its
//! sink; what happens next is up to the host.

use crate::{AccessDecision, ContentRef, SubjectId};
use async_trait::async_trait;
use lectern_common::Timestamp;
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// A resolved decision together with what it was resolved for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRecord {
    /// Who asked.
    pub subject_id: SubjectId,
    /// What they asked for.
    pub content: ContentRef,
    /// The instant the decision was evaluated at.
    pub evaluated_at: Timestamp,
    /// The outcome.
    pub decision: AccessDecision,
}

/// A sink could not accept a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Audit sink failed: {0}")]
pub struct SinkError(pub String);

/// Receives every decision a resolver produces.
#[async_trait]
pub trait DecisionSink: Send + Sync {
    /// Accept one record.
    async fn record(&self, record: &AccessRecord) -> Result<(), SinkError>;
}

/// [`DecisionSink`] that keeps records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink(Arc<Mutex<Vec<AccessRecord>>>);

impl MemorySink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record received so far, oldest first.
    pub fn records(&self) -> Vec<AccessRecord> {
        match self.0.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl DecisionSink for MemorySink {
    async fn record(&self, record: &AccessRecord) -> Result<(), SinkError> {
        self.0
            .lock()
            .map_err(|_| SinkError("memory sink poisoned".into()))?
            .push(record.clone());
        Ok(())
    }
}

/// [`DecisionSink`] that emits each record as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl DecisionSink for TracingSink {
    async fn record(&self, record: &AccessRecord) -> Result<(), SinkError> {
        tracing::info!(
            target: "lectern_access::audit",
            subject = %record.subject_id,
            content = %record.content,
            evaluated_at = %record.evaluated_at,
            has_access = record.decision.has_access,
            access_type = ?record.decision.access_type,
            reason = ?record.decision.reason,
            "Access decision"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ContentType, Reason};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    fn record(subject: &str, decision: AccessDecision) -> TestResult<AccessRecord> {
        Ok(AccessRecord {
            subject_id: subject.into(),
            content: ContentRef::new(ContentType::Tool, "t1"),
            evaluated_at: Utc
                .with_ymd_and_hms(2025, 2, 3, 4, 5, 6)
                .single()
                .ok_or("invalid date")?,
            decision,
        })
    }

    #[tokio::test]
    async fn it_keeps_records_in_arrival_order() -> TestResult {
        let sink = MemorySink::new();
        let first = record("u1", AccessDecision::creator())?;
        let second = record("u2", AccessDecision::denied(Reason::NoGrantFound))?;

        sink.record(&first).await?;
        sink.clone().record(&second).await?;

        assert_eq!(sink.records(), vec![first, second]);
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn it_accepts_records_as_events() -> TestResult {
        TracingSink
            .record(&record("u1", AccessDecision::creator())?)
            .await?;
        Ok(())
    }

    #[test]
    fn it_serializes_records_in_camel_case() -> TestResult {
        let json = serde_json::to_value(record("u1", AccessDecision::creator())?)?;

        assert_eq!(json["subjectId"], "u1");
        assert_eq!(json["content"]["type"], "tool");
        assert_eq!(json["evaluatedAt"], "2025-02-03T04:05:06Z");
        assert_eq!(json["decision"]["accessType"], "creator");
        Ok(())
    }
}
