//! Matching engine for fzgate, backed by nucleo.
//!
//! # Design
//!
//! - One worker thread per session owns the haystack and a nucleo `Matcher`.
//! - The session's engine handle sends requests over a channel; the worker
//!   answers every `Search` request with exactly one result, in request order.
//! - `Terminate` (or dropping the handle) stops the worker, which drops its
//!   result sink and so closes the session's result stream.
//!
//! # Query syntax
//!
//! With `extended` on, needles use fzf's extended syntax: whitespace-separated
//! terms that must all match, `'exact`, `^prefix`, `suffix$` and `!negation`.
//! With `fuzzy` off, plain terms match as substrings and `'` makes a term fuzzy.
//! With `extended` off, the whole needle is a single term.

mod engine;

pub use engine::NucleoEngine;
