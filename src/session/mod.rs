//! One animation session: config handshake, concurrent audio upload and
//! video download, and their shared lifecycle.

pub mod controller;
pub mod demux;
pub mod handshake;
pub mod sink;
pub mod state;
pub mod upload;

pub use controller::{SessionController, SessionReport};
pub use demux::{DemuxStats, Inbound, ResponseDemultiplexer};
pub use sink::{CollectorSink, FileSink, VideoSink};
pub use state::{Completion, DownloadState, Session, SessionState, StreamEvent, UploadState};
pub use upload::AudioUploadPump;
