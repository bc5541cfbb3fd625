mod dto;
mod services;

pub use dto::{Timeline, TimelineEntry, TimelineKind};
