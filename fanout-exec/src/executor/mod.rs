pub mod events;
pub mod metrics;
pub mod progress;
mod result;
mod scheduler;
mod session;
mod task_runner;
mod types;

pub use events::{
    CompositeEventSink, Event, EventSink, NoOpEventSink, StdoutEventSink, TracingEventSink,
};
pub use metrics::{MetricsCollector, MetricsEventSink, RunMetrics};
pub use progress::{CountingTracker, ProgressTracker};
pub use result::{ExecutionError, ExecutionResult, Records, TaskRecord, TaskStatus};
pub use scheduler::Executor;
pub use session::{SessionProvider, StaticSessionProvider, TaskContext};
pub use types::{ExecutionConfig, MAX_WORKERS};
