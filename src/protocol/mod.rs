//! Wire protocol: header codec, frame I/O, body layouts.

mod body;
mod frame;
mod wire;

pub use body::{
    register_body, BodyError, FailureBody, FunctionBody, ProgressBody, MAX_FAILURE_CODE_LEN,
    MAX_MESSAGE_LEN,
};
pub use frame::{frame_bytes, read_frame, Frame};
pub use wire::{
    Action, Header, HEADER_SIZE, MAX_BODY_LEN, PID_LEN, PING_TOKEN_LEN, PROTOCOL_VERSION,
    REGISTER_BODY_LEN,
};
