//! Background recording queue and worker pool.
//!
//! # Responsibilities
//! - Accept recording jobs from the recorder without blocking the request
//! - Process jobs on a fixed pool under an independent per-job timeout
//! - Drain outstanding jobs on shutdown
//!
//! # Design Decisions
//! - The queue is bounded; on overflow the oldest pending job is dropped
//!   and counted, so a slow store sheds load instead of growing memory
//! - Job failures are logged and swallowed, never surfaced to clients

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::analytics::record::{
    parse_key_values, AnalyticsRecord, HitSummary, MultiSearchResponse, RecorderJob,
    SearchResponse, MAX_RECORDED_HITS,
};
use crate::analytics::store::AnalyticsStore;
use crate::iplookup::GeoIp;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Bounded multi-producer queue of pending recording jobs.
#[derive(Clone)]
pub struct RecorderQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    jobs: Mutex<VecDeque<RecorderJob>>,
    notify: Notify,
    capacity: usize,
}

impl RecorderQueue {
    pub fn new(capacity: usize) -> RecorderQueue {
        RecorderQueue {
            inner: Arc::new(QueueInner {
                jobs: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Enqueue a job, dropping the oldest pending one on overflow.
    pub fn enqueue(&self, job: RecorderJob) {
        let depth;
        {
            let mut jobs = self.inner.jobs.lock().expect("recorder queue poisoned");
            if jobs.len() >= self.inner.capacity {
                if let Some(dropped) = jobs.pop_front() {
                    tracing::warn!(doc_id = %dropped.doc_id, "analytics queue full, dropping oldest job");
                    metrics::record_analytics_dropped();
                }
            }
            jobs.push_back(job);
            depth = jobs.len();
        }
        metrics::record_analytics_enqueued(depth);
        self.inner.notify.notify_one();
    }

    pub fn try_pop(&self) -> Option<RecorderJob> {
        self.inner
            .jobs
            .lock()
            .expect("recorder queue poisoned")
            .pop_front()
    }

    async fn pop(&self) -> RecorderJob {
        loop {
            if let Some(job) = self.try_pop() {
                return job;
            }
            self.inner.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.jobs.lock().expect("recorder queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spawn the recording workers. Each worker pulls jobs until shutdown,
/// then drains whatever is still queued.
pub fn spawn_workers(
    queue: RecorderQueue,
    store: Arc<AnalyticsStore>,
    geoip: Arc<dyn GeoIp>,
    workers: usize,
    job_timeout: Duration,
    shutdown: &Shutdown,
) -> Vec<JoinHandle<()>> {
    (0..workers.max(1))
        .map(|id| {
            let queue = queue.clone();
            let store = store.clone();
            let geoip = geoip.clone();
            let mut shutdown_rx = shutdown.subscribe();
            tokio::spawn(async move {
                tracing::debug!(worker = id, "analytics worker started");
                loop {
                    tokio::select! {
                        job = queue.pop() => {
                            process(job, &store, geoip.as_ref(), job_timeout).await;
                        }
                        _ = shutdown_rx.recv() => {
                            while let Some(job) = queue.try_pop() {
                                process(job, &store, geoip.as_ref(), job_timeout).await;
                            }
                            break;
                        }
                    }
                }
                tracing::debug!(worker = id, "analytics worker stopped");
            })
        })
        .collect()
}

async fn process(job: RecorderJob, store: &AnalyticsStore, geoip: &dyn GeoIp, timeout: Duration) {
    let doc_id = job.doc_id.clone();
    let result = tokio::time::timeout(timeout, async {
        let Some(record) = build_record(&job, geoip) else {
            return Ok(());
        };
        store.write_record(&job.doc_id, &record).await
    })
    .await;

    match result {
        Ok(Ok(())) => metrics::record_analytics_written(),
        Ok(Err(err)) => {
            tracing::error!(doc_id = %doc_id, error = %err, "failed to store analytics record");
            metrics::record_analytics_failed();
        }
        Err(_) => {
            tracing::warn!(doc_id = %doc_id, "analytics job timed out");
            metrics::record_analytics_failed();
        }
    }
}

/// Assemble the stored record from a job. Returns None when the response
/// body does not parse as a search response (logged, job abandoned).
pub fn build_record(job: &RecorderJob, geoip: &dyn GeoIp) -> Option<AnalyticsRecord> {
    let response = if job.msearch {
        let multi: MultiSearchResponse = match serde_json::from_slice(&job.body) {
            Ok(multi) => multi,
            Err(err) => {
                tracing::warn!(doc_id = %job.doc_id, error = %err, "cannot decode _msearch response");
                return None;
            }
        };
        // Only the first sub-response is recorded.
        multi.responses.into_iter().next().unwrap_or_default()
    } else {
        match serde_json::from_slice::<SearchResponse>(&job.body) {
            Ok(single) => single,
            Err(err) => {
                tracing::warn!(doc_id = %job.doc_id, error = %err, "cannot decode search response");
                return None;
            }
        }
    };

    let mut record = AnalyticsRecord {
        took: Some(response.took),
        ip: job.ip.clone(),
        ..AnalyticsRecord::default()
    };

    if !job.follow_up {
        let hits = response
            .hits
            .hits
            .iter()
            .take(MAX_RECORDED_HITS)
            .map(|hit| HitSummary {
                id: hit.id.clone(),
                doc_type: hit.doc_type.clone(),
                source: hit.source.to_string(),
            })
            .collect();

        record.indices = Some(job.indices.to_vec());
        record.search_query = job.search_query.clone();
        record.hits_in_response = Some(hits);
        record.total_hits = Some(response.hits.total.value());
        record.timestamp = Some(chrono::Utc::now().to_rfc3339());

        if let Some(raw) = &job.filters {
            let filters = parse_key_values(raw);
            if !filters.is_empty() {
                record.search_filters = Some(filters);
            }
        }
    }

    record.location = geoip.coordinates(&job.ip);
    record.country = geoip.country(&job.ip);

    if let Some(raw) = &job.click {
        match raw.parse::<bool>() {
            Ok(clicked) => record.click = Some(clicked),
            Err(_) => {
                tracing::warn!(value = %raw, header = "X-Search-Click", "invalid bool header value")
            }
        }
    }
    if let Some(raw) = &job.click_position {
        match raw.parse::<i64>() {
            Ok(position) => record.click_position = Some(position),
            Err(_) => tracing::warn!(
                value = %raw,
                header = "X-Search-Click-Position",
                "invalid int header value"
            ),
        }
    }
    if let Some(raw) = &job.conversion {
        match raw.parse::<bool>() {
            Ok(converted) => record.conversion = Some(converted),
            Err(_) => tracing::warn!(
                value = %raw,
                header = "X-Search-Conversion",
                "invalid bool header value"
            ),
        }
    }
    if let Some(raw) = &job.custom_events {
        let events = parse_key_values(raw);
        if !events.is_empty() {
            record.custom_events = Some(events);
        }
    }

    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iplookup::NoGeoIp;
    use crate::model::IndexSet;
    use axum::body::Bytes;

    const SEARCH_BODY: &str = r#"{
        "took": 5,
        "hits": {
            "total": {"value": 2, "relation": "eq"},
            "hits": [
                {"_id": "1", "_type": "tweet", "_source": {"user": "sam"}},
                {"_id": "2", "_type": "tweet", "_source": {"user": "kim"}}
            ]
        }
    }"#;

    fn job(follow_up: bool, body: &str) -> RecorderJob {
        let mut indices = IndexSet::new();
        indices.insert("twitter");
        RecorderJob {
            doc_id: "doc-1".into(),
            follow_up,
            msearch: false,
            body: Bytes::from(body.to_string()),
            indices,
            search_query: Some("foo".into()),
            filters: Some("lang:en".into()),
            click: None,
            click_position: None,
            conversion: None,
            custom_events: None,
            ip: "1.2.3.4".into(),
        }
    }

    #[test]
    fn test_new_search_records_full_fields() {
        let record = build_record(&job(false, SEARCH_BODY), &NoGeoIp).unwrap();
        assert_eq!(record.indices.as_deref(), Some(&["twitter".to_string()][..]));
        assert_eq!(record.search_query.as_deref(), Some("foo"));
        assert_eq!(record.total_hits, Some(2));
        assert_eq!(record.took, Some(5.0));
        assert!(record.timestamp.is_some());
        let hits = record.hits_in_response.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "1");
        assert_eq!(hits[0].source, r#"{"user":"sam"}"#);
        assert_eq!(
            record.search_filters.unwrap().get("lang").map(String::as_str),
            Some("en")
        );
    }

    #[test]
    fn test_follow_up_omits_search_fields() {
        let mut follow = job(true, SEARCH_BODY);
        follow.click = Some("true".into());
        follow.click_position = Some("3".into());
        let record = build_record(&follow, &NoGeoIp).unwrap();
        assert!(record.indices.is_none());
        assert!(record.search_query.is_none());
        assert!(record.hits_in_response.is_none());
        assert!(record.total_hits.is_none());
        assert!(record.timestamp.is_none());
        assert_eq!(record.click, Some(true));
        assert_eq!(record.click_position, Some(3));
        assert_eq!(record.ip, "1.2.3.4");
    }

    #[test]
    fn test_unparseable_event_values_omitted() {
        let mut follow = job(true, SEARCH_BODY);
        follow.click = Some("maybe".into());
        follow.conversion = Some("yes!".into());
        let record = build_record(&follow, &NoGeoIp).unwrap();
        assert!(record.click.is_none());
        assert!(record.conversion.is_none());
    }

    #[test]
    fn test_hits_capped_at_ten() {
        let hits: Vec<String> = (0..15)
            .map(|i| format!(r#"{{"_id":"{i}","_type":"t","_source":{{}}}}"#))
            .collect();
        let body = format!(
            r#"{{"took":1,"hits":{{"total":15,"hits":[{}]}}}}"#,
            hits.join(",")
        );
        let record = build_record(&job(false, &body), &NoGeoIp).unwrap();
        assert_eq!(record.hits_in_response.unwrap().len(), MAX_RECORDED_HITS);
        assert_eq!(record.total_hits, Some(15));
    }

    #[test]
    fn test_msearch_records_first_sub_response() {
        let body = format!(
            r#"{{"responses":[{},{{"took":9,"hits":{{"total":0,"hits":[]}}}}]}}"#,
            SEARCH_BODY
        );
        let mut msearch = job(false, &body);
        msearch.msearch = true;
        let record = build_record(&msearch, &NoGeoIp).unwrap();
        assert_eq!(record.total_hits, Some(2));
        assert_eq!(record.took, Some(5.0));
    }

    #[test]
    fn test_unparseable_body_abandons_job() {
        assert!(build_record(&job(false, "not json"), &NoGeoIp).is_none());
    }

    #[tokio::test]
    async fn test_queue_drops_oldest_on_overflow() {
        let queue = RecorderQueue::new(2);
        for id in ["a", "b", "c"] {
            let mut j = job(false, SEARCH_BODY);
            j.doc_id = id.into();
            queue.enqueue(j);
        }
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop().unwrap().doc_id, "b");
        assert_eq!(queue.try_pop().unwrap().doc_id, "c");
        assert!(queue.try_pop().is_none());
    }
}
