mod port;
mod recording;

pub use port::Transport;
pub use recording::RecordingTransport;
