//! Ad Copy MCP Server
//!
//! Model Context Protocol server exposing the ad copy pipeline as a tool for AI assistants.

pub mod server;
pub mod tools;

pub use server::AdCopyService;
