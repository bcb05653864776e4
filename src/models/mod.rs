//! Domain entities (§3). These are the strongly-typed internal records that every
//! adapter and component projects into immediately after touching the wire — per
//! the "dynamic payload shapes" design note, nothing untyped travels past an adapter
//! boundary.

pub mod article;
pub mod category;
pub mod keyword;
pub mod source;
pub mod trending;

pub use article::Article;
pub use category::Category;
pub use keyword::{ArticleKeywordLink, Keyword};
pub use source::{HealthStatus, Source};
pub use trending::{TrendingScope, TrendingSnapshot, TrendingTopic};
