//! Routed execution runtime.
//!
//! The gateway itself is a synchronous surface. This module provides a
//! small, bounded, thread-based runtime that routes requests into separate
//! worker pools so heavy read-side work (impact aggregation, wide queries)
//! never blocks report ingestion.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::debug;

use crate::cascade::{ConfidenceScores, VerificationRecord};
use crate::derive::{AlertLevel, ImpactFilter, ImpactSummary, Payout, ReportOutcome};
use crate::error::{ExecutionError, WitnessError, WitnessResult};
use crate::event::{EventType, ReportedEvent};
use crate::gateway::{QueryGateway, StoreStats};
use crate::pattern::{Binding, Pattern};
use crate::store::Namespace;
use crate::user::User;

/// Execution path selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionPath {
    /// Write-bearing operations: submissions, rejections, derivations that
    /// record atoms.
    Submit,
    /// Read-only operations: queries, aggregates, stats.
    Query,
}

impl ExecutionPath {
    fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Query => "query",
        }
    }
}

/// A request routable through the runtime.
#[derive(Debug, Clone)]
pub enum WitnessRequest {
    /// Submit a report for verification.
    Submit {
        /// The report.
        event: ReportedEvent,
        /// The reporter.
        user: User,
        /// Caller-supplied model confidence.
        scores: ConfidenceScores,
    },
    /// Reject a report (admin action).
    Reject {
        /// The report being rejected.
        event: ReportedEvent,
        /// Why.
        reason: String,
    },
    /// Apply a report outcome to a user's trust score.
    TrustDelta {
        /// The user whose score changes.
        user: User,
        /// The adjudicated outcome.
        outcome: ReportOutcome,
    },
    /// Compute (and record) the payout for a verified event.
    Payout {
        /// The verified event.
        event: ReportedEvent,
    },
    /// Compute the alert level for a (region, event type) pair.
    Alert {
        /// Region key.
        region: String,
        /// Hazard type.
        event_type: EventType,
        /// Trailing window.
        window: chrono::Duration,
    },
    /// Match a pattern against one namespace.
    Query {
        /// The namespace to search.
        namespace: Namespace,
        /// The pattern to match.
        pattern: Pattern,
    },
    /// Aggregate verified events into an impact summary.
    Impact {
        /// Region and window constraints.
        filter: ImpactFilter,
    },
    /// Report store and history sizes.
    Stats,
}

/// The result of one routed request.
#[derive(Debug, Clone)]
pub enum WitnessResponse {
    /// Outcome of a submission.
    Verification(VerificationRecord),
    /// A rejection was recorded.
    Rejected,
    /// The user's trust score after the delta.
    TrustScore(i64),
    /// The computed payout, if preconditions held.
    Payout(Option<Payout>),
    /// The computed alert level.
    Alert(AlertLevel),
    /// Pattern-match bindings.
    Bindings(Vec<Binding>),
    /// Impact aggregate.
    Impact(ImpactSummary),
    /// Store and history sizes.
    Stats(StoreStats),
}

/// Routes requests to an execution path.
pub trait RequestRouter: Send + Sync {
    /// Selects the execution path for the given request.
    fn route(&self, request: &WitnessRequest) -> ExecutionPath;
}

/// Default router: anything that writes atoms is Submit, pure reads are
/// Query.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRouter;

impl RequestRouter for DefaultRouter {
    fn route(&self, request: &WitnessRequest) -> ExecutionPath {
        match request {
            WitnessRequest::Submit { .. }
            | WitnessRequest::Reject { .. }
            | WitnessRequest::TrustDelta { .. }
            | WitnessRequest::Payout { .. }
            | WitnessRequest::Alert { .. } => ExecutionPath::Submit,
            WitnessRequest::Query { .. }
            | WitnessRequest::Impact { .. }
            | WitnessRequest::Stats => ExecutionPath::Query,
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct WitnessRuntimeConfig {
    /// Number of Submit workers.
    pub submit_workers: usize,
    /// Number of Query workers.
    pub query_workers: usize,
    /// Maximum queued jobs per pool.
    pub queue_capacity: usize,
}

impl Default for WitnessRuntimeConfig {
    fn default() -> Self {
        Self {
            submit_workers: 2,
            query_workers: 2,
            queue_capacity: 1024,
        }
    }
}

fn dispatch(gateway: &QueryGateway, request: WitnessRequest) -> WitnessResult<WitnessResponse> {
    match request {
        WitnessRequest::Submit {
            event,
            user,
            scores,
        } => Ok(WitnessResponse::Verification(
            gateway.submit(&event, &user, scores)?,
        )),
        WitnessRequest::Reject { event, reason } => {
            gateway.reject(&event, &reason)?;
            Ok(WitnessResponse::Rejected)
        }
        WitnessRequest::TrustDelta { user, outcome } => Ok(WitnessResponse::TrustScore(
            gateway.derive_trust_delta(&user, outcome)?,
        )),
        WitnessRequest::Payout { event } => {
            Ok(WitnessResponse::Payout(gateway.derive_payout(&event)?))
        }
        WitnessRequest::Alert {
            region,
            event_type,
            window,
        } => Ok(WitnessResponse::Alert(
            gateway.derive_alert(&region, &event_type, window)?,
        )),
        WitnessRequest::Query { namespace, pattern } => Ok(WitnessResponse::Bindings(
            gateway.query(namespace, &pattern)?,
        )),
        WitnessRequest::Impact { filter } => {
            Ok(WitnessResponse::Impact(gateway.economic_impact(&filter)?))
        }
        WitnessRequest::Stats => Ok(WitnessResponse::Stats(gateway.stats()?)),
    }
}

enum Job {
    Execute {
        request: WitnessRequest,
        reply: Sender<WitnessResult<WitnessResponse>>,
    },

    #[cfg(test)]
    Sleep {
        duration: Duration,
        reply: Sender<()>,
    },
}

struct WorkerPool {
    tx: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    queue_capacity: usize,
}

impl WorkerPool {
    fn start(
        name: &'static str,
        workers: usize,
        queue_capacity: usize,
        gateway: Arc<QueryGateway>,
    ) -> Self {
        let workers = workers.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (tx, rx) = bounded::<Job>(queue_capacity);

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx: Receiver<Job> = rx.clone();
            let gateway = Arc::clone(&gateway);
            let thread_name = format!("witnesskb-{name}-{idx}");
            let handle = thread::Builder::new()
                .name(thread_name)
                .spawn(move || loop {
                    match rx.recv() {
                        Ok(Job::Execute { request, reply }) => {
                            let result = dispatch(&gateway, request);
                            let _ = reply.send(result);
                        }
                        Err(_) => break,

                        #[cfg(test)]
                        Ok(Job::Sleep { duration, reply }) => {
                            thread::sleep(duration);
                            let _ = reply.send(());
                        }
                    }
                })
                .expect("failed to spawn witnesskb worker");
            handles.push(handle);
        }

        Self {
            tx,
            workers: handles,
            queue_capacity,
        }
    }

    fn try_submit(&self, job: Job, path: ExecutionPath) -> Result<(), WitnessError> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                Err(WitnessError::Execution(ExecutionError::QueueFull {
                    path: path.as_str().to_string(),
                    capacity: self.queue_capacity,
                }))
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(WitnessError::Execution(ExecutionError::Disconnected {
                    path: path.as_str().to_string(),
                }))
            }
        }
    }

    fn shutdown(self) {
        // Close the channel: workers will drain queued jobs then exit.
        drop(self.tx);
        for handle in self.workers {
            let _ = handle.join();
        }
    }
}

/// Handle returned by `execute_async`.
pub struct ExecutionHandle {
    path: ExecutionPath,
    rx: Receiver<WitnessResult<WitnessResponse>>,
}

impl ExecutionHandle {
    /// Returns the path selected by the router.
    #[must_use]
    pub const fn path(&self) -> ExecutionPath {
        self.path
    }

    /// Waits for the execution to complete.
    ///
    /// # Errors
    ///
    /// `ExecutionError::Disconnected` if the worker went away, or the
    /// request's own error.
    pub fn join(self) -> WitnessResult<WitnessResponse> {
        self.rx.recv().map_err(|_| {
            WitnessError::Execution(ExecutionError::Disconnected {
                path: self.path.as_str().to_string(),
            })
        })?
    }

    /// Waits for the execution to complete with a timeout.
    ///
    /// # Errors
    ///
    /// `ExecutionError::Timeout` if the wait elapses,
    /// `ExecutionError::Disconnected` if the worker went away, or the
    /// request's own error.
    pub fn join_timeout(self, timeout: Duration) -> WitnessResult<WitnessResponse> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            crossbeam_channel::RecvTimeoutError::Timeout => {
                WitnessError::Execution(ExecutionError::Timeout {
                    duration_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
                })
            }
            crossbeam_channel::RecvTimeoutError::Disconnected => {
                WitnessError::Execution(ExecutionError::Disconnected {
                    path: self.path.as_str().to_string(),
                })
            }
        })?
    }
}

/// A routed runtime enforcing Submit/Query isolation over one gateway.
///
/// Writes to a namespace are further serialized by the store locks, so two
/// concurrent submissions cannot interleave partial atom sets.
pub struct WitnessRuntime<R: RequestRouter = DefaultRouter> {
    router: R,
    gateway: Arc<QueryGateway>,
    submit: WorkerPool,
    query: WorkerPool,
}

impl WitnessRuntime<DefaultRouter> {
    /// Create a runtime with the default router.
    #[must_use]
    pub fn new(gateway: QueryGateway, config: WitnessRuntimeConfig) -> Self {
        Self::with_router(gateway, DefaultRouter, config)
    }
}

impl<R: RequestRouter> WitnessRuntime<R> {
    /// Create a runtime with a custom router.
    pub fn with_router(gateway: QueryGateway, router: R, config: WitnessRuntimeConfig) -> Self {
        let gateway = Arc::new(gateway);
        let submit = WorkerPool::start(
            "submit",
            config.submit_workers,
            config.queue_capacity,
            Arc::clone(&gateway),
        );
        let query = WorkerPool::start(
            "query",
            config.query_workers,
            config.queue_capacity,
            Arc::clone(&gateway),
        );
        Self {
            router,
            gateway,
            submit,
            query,
        }
    }

    /// Execute a request asynchronously on the routed path.
    ///
    /// # Errors
    ///
    /// `ExecutionError::QueueFull` or `ExecutionError::Disconnected` if the
    /// routed pool cannot accept the job.
    pub fn execute_async(&self, request: WitnessRequest) -> Result<ExecutionHandle, WitnessError> {
        let path = self.router.route(&request);
        debug!(path = path.as_str(), "routing request");
        let (tx, rx) = bounded::<WitnessResult<WitnessResponse>>(1);
        let job = Job::Execute { request, reply: tx };
        match path {
            ExecutionPath::Submit => self.submit.try_submit(job, path)?,
            ExecutionPath::Query => self.query.try_submit(job, path)?,
        }
        Ok(ExecutionHandle { path, rx })
    }

    /// Execute a request synchronously on the routed path.
    ///
    /// # Errors
    ///
    /// Queue errors from [`Self::execute_async`], or the request's own
    /// error.
    pub fn execute(&self, request: WitnessRequest) -> WitnessResult<WitnessResponse> {
        self.execute_async(request)?.join()
    }

    /// Returns a shared reference to the underlying gateway.
    #[must_use]
    pub fn gateway(&self) -> &QueryGateway {
        &self.gateway
    }

    #[cfg(test)]
    fn submit_sleep(
        &self,
        path: ExecutionPath,
        duration: Duration,
    ) -> Result<Receiver<()>, WitnessError> {
        let (tx, rx) = bounded::<()>(1);
        let job = Job::Sleep { duration, reply: tx };
        match path {
            ExecutionPath::Submit => self.submit.try_submit(job, path)?,
            ExecutionPath::Query => self.query.try_submit(job, path)?,
        }
        Ok(rx)
    }
}

impl<R: RequestRouter> Drop for WitnessRuntime<R> {
    fn drop(&mut self) {
        // Deterministic shutdown: stop workers and join threads.
        // This should be fast because worker loops are blocking on `recv()`.
        let submit = std::mem::replace(
            &mut self.submit,
            WorkerPool {
                tx: bounded::<Job>(1).0,
                workers: Vec::new(),
                queue_capacity: 1,
            },
        );
        let query = std::mem::replace(
            &mut self.query,
            WorkerPool {
                tx: bounded::<Job>(1).0,
                workers: Vec::new(),
                queue_capacity: 1,
            },
        );

        submit.shutdown();
        query.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::CascadeConfig;
    use crate::pattern::Term;
    use chrono::Utc;

    fn runtime() -> WitnessRuntime {
        WitnessRuntime::new(
            QueryGateway::new(CascadeConfig::default()),
            WitnessRuntimeConfig {
                submit_workers: 1,
                query_workers: 1,
                queue_capacity: 16,
            },
        )
    }

    fn submit_request(id: &str) -> WitnessRequest {
        WitnessRequest::Submit {
            event: ReportedEvent::new(id, EventType::Drought, "user-1")
                .with_coords(3.1, 35.6)
                .with_timestamp(Utc::now())
                .with_evidence("/uploads/1.jpg"),
            user: User::new("user-1"),
            scores: ConfidenceScores::new(0.9, 0.0),
        }
    }

    #[test]
    fn router_separates_writes_from_reads() {
        let router = DefaultRouter;
        assert_eq!(router.route(&submit_request("evt-1")), ExecutionPath::Submit);
        assert_eq!(
            router.route(&WitnessRequest::Stats),
            ExecutionPath::Query
        );
        assert_eq!(
            router.route(&WitnessRequest::Query {
                namespace: Namespace::Event,
                pattern: Pattern::identity("event", Term::var("e")),
            }),
            ExecutionPath::Query
        );
        assert_eq!(
            router.route(&WitnessRequest::Payout {
                event: ReportedEvent::new("evt-1", EventType::Drought, "user-1"),
            }),
            ExecutionPath::Submit
        );
    }

    #[test]
    fn submission_flows_through_the_runtime() {
        let runtime = runtime();
        let response = runtime.execute(submit_request("evt-1")).unwrap();
        let WitnessResponse::Verification(record) = response else {
            panic!("expected Verification, got {response:?}");
        };
        assert!(record.verified);

        let WitnessResponse::Bindings(events) = runtime
            .execute(WitnessRequest::Query {
                namespace: Namespace::Event,
                pattern: Pattern::identity("event", Term::var("e")),
            })
            .unwrap()
        else {
            panic!("expected Bindings");
        };
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn query_work_is_not_starved_by_submit_work() {
        let runtime = runtime();

        // Occupy the submit worker.
        let sleep = runtime
            .submit_sleep(ExecutionPath::Submit, Duration::from_millis(200))
            .unwrap();

        let started = std::time::Instant::now();
        let handle = runtime.execute_async(WitnessRequest::Stats).unwrap();
        assert_eq!(handle.path(), ExecutionPath::Query);
        let _ = handle.join_timeout(Duration::from_millis(50)).unwrap();
        assert!(started.elapsed() < Duration::from_millis(100));

        sleep.recv_timeout(Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn join_reports_disconnected_when_reply_sender_dropped() {
        let (_tx, rx) = bounded::<WitnessResult<WitnessResponse>>(1);
        drop(_tx);

        let handle = ExecutionHandle {
            path: ExecutionPath::Submit,
            rx,
        };

        let err = handle.join().unwrap_err();
        let WitnessError::Execution(ExecutionError::Disconnected { path }) = err else {
            panic!("expected Disconnected, got {err:?}");
        };
        assert_eq!(path, "submit");
    }

    #[test]
    fn join_timeout_reports_timeout_when_worker_is_busy() {
        let runtime = runtime();
        let _sleep = runtime
            .submit_sleep(ExecutionPath::Submit, Duration::from_millis(300))
            .unwrap();

        let handle = runtime.execute_async(submit_request("evt-1")).unwrap();
        let err = handle.join_timeout(Duration::from_millis(10)).unwrap_err();
        assert!(err.is_retryable());
    }
}
