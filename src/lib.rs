//! # stencil
//!
//! A template-expansion engine for double-brace macros.
//!
//! Given a text document containing inline invocations written with double-brace
//! delimiters (`{{name}}`, `{{setvar::key::value}}`, `{{reverse::{{user}}}}`),
//! the engine produces a fully expanded document where every recognized
//! invocation has been replaced by the string value returned by its handler.
//! Unrecognized or malformed invocations are preserved verbatim, so the
//! document stays lossless outside of the spans the engine recognizes.
//!
//! The pipeline runs in stages, each receiving the output of the previous one:
//!
//!     input -> preprocess -> lex -> parse (with recovery) -> walk
//!           -> resolve each invocation via registry + environment
//!           -> postprocess -> output
//!
//! The entry point for most callers is [`stencil::engine::Engine`], or the
//! convenience function [`stencil::engine::evaluate`] which uses the
//! process-wide registry seeded with the builtin definitions.
//!
//! For testing guidelines and shared fixtures, see the
//! [testing module](stencil::testing).

pub mod stencil;
