//! # Feed Engine
//!
//! Interest shelves, the diversity-interleaving feed assembler and the
//! request-time services built on them.

pub mod ancestors;
pub mod catalog;
pub mod feed;
pub mod reader;
pub mod search;
pub mod shelf;

pub use ancestors::{resolve_story_id, AncestorError};
pub use catalog::{keyword_query, seed_catalog, INTEREST_GROUPS};
pub use feed::{interleave, FeedAssembler, FeedEntry, FeedError};
pub use reader::{ReadReceipt, ReaderError, ReaderService, StoryDetail, SummaryRequest};
pub use search::{normalize_query, SearchError, SearchService};
pub use shelf::{rank, ShelfManager};
