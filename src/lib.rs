//! Terminal client for Hacker News: post lists with infinite scrolling, link
//! previews, and threaded comments that collapse and expand.
//!
//! The comment model ([`comment`], [`comment_tree`], [`presenter`]) does not
//! depend on the terminal; [`app`] and [`ui`] drive it from crossterm events.

pub mod app;
pub mod comment;
pub mod comment_tree;
pub mod config;
pub mod error;
pub mod feed;
pub mod markup;
pub mod presenter;
pub mod source;
pub mod theme;
pub mod ui;

pub use comment::{CommentId, CommentNode, Visibility};
pub use comment_tree::CommentTree;
pub use error::{Error, Result};
pub use presenter::{CommentListPresenter, RenderSurface, RowChange};
