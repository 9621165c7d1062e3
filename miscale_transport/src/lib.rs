//! Frame sources without a BLE stack: capture replay and a simulated scale.
//!
//! Both implement `miscale_traits::FrameSource`, so they drop into the same runners
//! as a real GATT notification stream.
pub mod encode;
pub mod error;
pub mod replay;
pub mod simulated;

pub use encode::{FrameLayout, encode_frame};
pub use error::TransportError;
pub use replay::{ReplayTransport, ScriptedFrame};
pub use simulated::SimulatedScale;
