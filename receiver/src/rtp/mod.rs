pub mod format;
pub mod packet;
pub mod pipeline;
pub mod reader;
pub mod recorder;
pub mod sdp;
pub mod stream;
pub mod time;
pub mod track;

pub use pipeline::run_receiver;
pub use recorder::SampleRecorder;
pub use stream::SampleStream;
