//! Reel engine: HTTP transport, progress streaming and effect execution.
mod backgrounds;
mod channel;
mod coordinator;
mod persist;
mod progress;
mod settings;
mod sink;
mod sse;
mod submit;

pub use backgrounds::{BackgroundAuthor, BackgroundCatalog, BackgroundVideo};
pub use channel::{
    ChannelHandle, ChannelWatcher, ProgressChannel, ProgressSink, SseProgressChannel,
    StreamTransportError,
};
pub use coordinator::{DeliveryStatus, JobCoordinator};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use progress::{parse_progress_message, StreamParseError};
pub use settings::{ApiSettings, DEFAULT_API_URL};
pub use sink::{FileSink, ResultSink, SinkError};
pub use sse::SseDecoder;
pub use submit::{
    JobSubmitter, ReqwestSubmitter, DEFAULT_ARTIFACT_MIME, GENERIC_FAILURE_MESSAGE,
    NETWORK_FAILURE_MESSAGE, TIMEOUT_FAILURE_MESSAGE,
};
