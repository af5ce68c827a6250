//! Model server client

pub mod client;

pub use client::{InferenceClient, InferenceError, InvocationRequest};
