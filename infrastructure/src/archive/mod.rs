//! Run archive adapters implementing the application's `RunArchive` port.

mod jsonl;

pub use jsonl::JsonlRunArchive;
