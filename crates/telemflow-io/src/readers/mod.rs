//! Streaming readers that produce small event batches.

pub mod jsonl;
