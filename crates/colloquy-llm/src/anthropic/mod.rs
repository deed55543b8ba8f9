pub mod client;

pub use client::AnthropicClient;
