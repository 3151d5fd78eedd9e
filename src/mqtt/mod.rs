pub mod client;
pub mod topics;

pub use client::run_event_loop;
pub use topics::{dispatch, Topic, TopicMap};
