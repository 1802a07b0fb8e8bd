//! A small job-control shell: pipelines, `<`/`>`/`>>` redirections, `;` sequencing and
//! `&` background jobs.
//!
//! | module | role |
//! |--------|------|
//! | [`parser`], [`types`] | one input line to [`types::Line`] |
//! | [`dispatch`] | validates a line and runs its pipelines in order |
//! | [`eval`] | pipe chain, builtin fast path, foreground waits |
//! | [`launch`] | fork, descriptor wiring, redirections, exec |
//! | [`job`] | tracking of children, reaping, background reports |
//! | [`signals`] | saved dispositions, SIGCHLD blocking |

pub mod builtin;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod eval;
pub mod global;
pub mod job;
pub mod launch;
pub mod parser;
pub mod reader;
pub mod signals;
pub mod types;
