pub mod feed;
pub mod screens;
mod session;

pub use feed::CommitFeed;
pub use screens::{Browse, FilterForm, RepoBranches, RepoSelect};
pub use session::{Screen, Session, SessionEvent};
