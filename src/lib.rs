//! Live, filterable reader for a portfolio's posts, projects and tips.
//!
//! Each page keeps a live subscription to one store collection, normalizes
//! the documents it receives, and derives its view from the current list and
//! the page's own filter criteria. The contact form is validated locally and
//! relayed to the site's email function.

pub mod config;
pub mod contact;
pub mod filter;
pub mod live;
pub mod model;
pub mod page;
pub mod render;
pub mod store;
pub mod util;
