//! WebSocket protocol core (RFC 6455, server role).

pub mod assembler;
pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;
pub mod reassembler;

pub use assembler::{AssembledMessage, MessageAssembler};
pub use frame::{Frame, MAX_CONTROL_FRAME_PAYLOAD};
pub use handshake::{UpgradeRequest, WS_GUID, compute_accept_key};
pub use mask::apply_mask;
pub use opcode::OpCode;
pub use reassembler::StreamReassembler;
