pub mod app;
pub mod channel;
pub mod markdown;
pub mod protocol;
pub mod session;
pub mod theme;
pub mod transcript;
pub mod tui;
pub mod ui;

pub use app::{App, CONNECTION_ERROR_NOTICE};
pub use channel::{ChannelHandle, ChannelMsg, Endpoint, ReconnectPolicy};
pub use protocol::{AskRequest, SearchHit, ServerEvent};
pub use session::{Renderer, StreamSession};
pub use transcript::{AskOutput, Exchange, Message, Node, SourceOutput, Transcript};
