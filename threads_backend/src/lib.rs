pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod hydration;
pub mod mutation;
pub mod profiles;
pub mod session;
pub mod storage;
pub mod telemetry;
pub mod threading;
pub mod utils;

pub use error::{FeedError, FeedResult};
pub use hydration::{FeedHydrator, HydratedFeed, ProfileJoinCache, ThreadEntity};
pub use mutation::ThreadMutationService;
pub use profiles::ProfileService;
pub use session::Session;
pub use threading::ThreadService;
