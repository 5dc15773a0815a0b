//! Lifecycle fan-out - parallel dispatch across the pool with a join barrier

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use hive_core::{AggregateError, HiveError, HiveResult, Netcore, NetcoreError, NetcoreFault};
use hive_registry::NetcorePool;
use tracing::warn;

/// Outcome of one fan-out: which netcores completed and which failed.
pub(crate) struct FanoutReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<NetcoreFault>,
}

impl FanoutReport {
    /// Collapse into the caller-facing result: all-success is `Ok`, anything
    /// else is an aggregate error naming both sides.
    pub fn into_result(self, operation: &'static str) -> HiveResult<()> {
        if self.failed.is_empty() {
            Ok(())
        } else {
            Err(HiveError::Aggregate(AggregateError {
                operation,
                succeeded: self.succeeded,
                failed: self.failed,
            }))
        }
    }
}

/// Dispatch `make`'s operation to every netcore in the pool, then join.
///
/// All per-netcore calls are issued before any completion is awaited;
/// completions land in whatever order the drivers finish. The barrier
/// releases only once every dispatched call has completed - there is no
/// timeout here, so a driver that never completes stalls the aggregate
/// operation forever.
pub(crate) async fn fan_out<Fut>(
    pool: &NetcorePool,
    operation: &'static str,
    make: impl Fn(Arc<dyn Netcore>) -> Fut,
) -> FanoutReport
where
    Fut: Future<Output = Result<(), NetcoreError>>,
{
    let dispatched: Vec<_> = pool
        .all()
        .into_iter()
        .map(|nc| {
            let name = nc.name().to_string();
            let fut = make(nc);
            async move { (name, fut.await) }
        })
        .collect();

    let mut report = FanoutReport {
        succeeded: Vec::new(),
        failed: Vec::new(),
    };
    for (name, result) in join_all(dispatched).await {
        match result {
            Ok(()) => report.succeeded.push(name),
            Err(error) => {
                warn!(netcore = %name, operation, error = %error, "netcore failed during fan-out");
                report.failed.push(NetcoreFault {
                    netcore: name,
                    error,
                });
            }
        }
    }
    report
}
