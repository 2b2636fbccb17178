//! Token stream transformations
//!
//! Each transformation receives a token stream and returns a token stream,
//! preserving every span. Context rules that would make the base grammar
//! context-sensitive live here instead.

pub mod delimiter_demotion;
