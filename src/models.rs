//! Objects passed between the agent loop, the conversation store and the LLM.
//!
//! The provider wire format is never used directly inside the loop. Responses
//! are converted into these structs as soon as they arrive, and converted back
//! when a request is built.
pub mod message;
pub mod objectid;
pub mod role;
pub mod tool;
