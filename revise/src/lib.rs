//! Iterative HTML artifact generation with versioned, branchable history.
//!
//! A session starts from a natural-language query that produces an HTML
//! artifact; every later piece of feedback revises the version currently on
//! display. The crate keeps the same split throughout:
//!
//! - **[`core`]**: Pure, deterministic logic (history store, version labels,
//!   prompt assembly). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting collaborators (generation service, artifact
//!   storage, config files, HTML export). Behind traits so tests can script them.
//!
//! [`controller`] coordinates core logic with the collaborators; [`repl`] is the
//! interactive front end used by the `revise session` command.

pub mod controller;
pub mod core;
pub mod io;
pub mod logging;
pub mod repl;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
