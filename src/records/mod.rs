//! Sharded record output

mod example;
mod shard;
mod writer;

pub use example::{decode_example, encode_example};
pub use shard::ShardWriter;
pub use writer::write_records;
