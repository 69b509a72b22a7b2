pub mod domain;
pub mod ports;

pub use domain::{Language, Message, MessageRole, Notice, NoticeLevel};
pub use ports::{
    AssistantService, CaptureService, PortError, PortResult, SpeakOptions, SynthVoice,
    SynthesisService,
};
