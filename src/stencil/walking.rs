//! CST walker and evaluator
//!
//!     The walker turns a document CST back into a string, replacing each
//!     well-formed invocation with whatever the resolver callback returns for
//!     it and reproducing every other byte of the input verbatim.
//!
//! Flattening
//!
//!     An invocation whose close delimiter is recovery-inserted never reaches
//!     the resolver. It is flattened back to plaintext: its delimiter,
//!     identifier, separator, and text spans become plaintext items, while
//!     complete nested invocations inside it survive as invocation items.
//!     `{{ hehe {{user}}` therefore renders the literal `{{ hehe ` followed
//!     by the evaluated `{{user}}`.
//!
//! Offset bookkeeping
//!
//!     The join is cursor-based over half-open byte spans. Items are walked
//!     in `(start, end)` order; gaps between items are copied from the input
//!     verbatim, which is what preserves separators, whitespace, and
//!     everything the grammar has no opinion about. A nested invocation
//!     whose span starts before the cursor would have to overlap an already
//!     emitted region and is dropped defensively.
//!
//! Inside-out expansion
//!
//!     Arguments expand before the invocation that contains them, so by the
//!     time a handler sees its arguments every nested value is already a
//!     plain string. The reconstructed inner text (`raw_inner`) interleaves
//!     the verbatim gaps with those evaluated values; it is what "preserve
//!     the invocation raw" means after nested expansion has happened.

use crate::stencil::cst::{Document, DocumentItem, Invocation, Piece, Span};
use crate::stencil::diagnostics::{DiagnosticSink, RuntimeReport};
use crate::stencil::env::Environment;
use crate::stencil::registry::Call;

/// Maximum recursion depth for invocation expansion. The parser enforces the
/// same bound structurally; this guard is for CSTs built by other means.
pub const MAX_EXPANSION_DEPTH: usize = 64;

/// Walks a document and resolves invocations through a callback.
pub struct Walker<'a, R>
where
    R: FnMut(&Call<'_>) -> String,
{
    input: &'a str,
    env: &'a Environment,
    sink: &'a dyn DiagnosticSink,
    resolver: R,
}

/// A top-level work item after recovery flattening.
enum FlatItem<'d> {
    Plain(Span),
    Invocation(&'d Invocation),
}

impl<'d> FlatItem<'d> {
    fn span(&self) -> Span {
        match self {
            FlatItem::Plain(span) => span.clone(),
            FlatItem::Invocation(inv) => inv.span(),
        }
    }
}

impl<'a, R> Walker<'a, R>
where
    R: FnMut(&Call<'_>) -> String,
{
    pub fn new(
        input: &'a str,
        env: &'a Environment,
        sink: &'a dyn DiagnosticSink,
        resolver: R,
    ) -> Self {
        Self {
            input,
            env,
            sink,
            resolver,
        }
    }

    /// Produce the evaluated document string.
    pub fn walk(&mut self, document: &Document) -> String {
        let mut items = Vec::new();
        for item in &document.items {
            match item {
                DocumentItem::Plaintext(span) => items.push(FlatItem::Plain(span.clone())),
                DocumentItem::Invocation(inv) => Self::collect_invocation(inv, &mut items),
            }
        }
        items.sort_by_key(|item| {
            let span = item.span();
            (span.start, span.end)
        });

        let mut output = String::new();
        let mut cursor = 0;
        for item in &items {
            let span = item.span();
            if span.start > cursor {
                output.push_str(&self.input[cursor..span.start]);
            }
            match item {
                FlatItem::Plain(span) => {
                    // Clip against the cursor in case recovery produced overlap.
                    let start = span.start.max(cursor);
                    if start < span.end {
                        output.push_str(&self.input[start..span.end]);
                    }
                }
                FlatItem::Invocation(inv) => {
                    if span.start < cursor {
                        continue;
                    }
                    output.push_str(&self.evaluate_invocation(inv, 0));
                }
            }
            cursor = cursor.max(span.end);
        }
        if cursor < self.input.len() {
            output.push_str(&self.input[cursor..]);
        }
        output
    }

    /// Emit an invocation as a work item, flattening it when its close
    /// delimiter is recovery-inserted.
    fn collect_invocation<'d>(inv: &'d Invocation, out: &mut Vec<FlatItem<'d>>) {
        if !inv.close.is_synthetic() {
            out.push(FlatItem::Invocation(inv));
            return;
        }
        out.push(FlatItem::Plain(inv.open.clone()));
        out.push(FlatItem::Plain(inv.ident.span.clone()));
        for piece in &inv.head {
            Self::collect_piece(piece, out);
        }
        for arg in &inv.args {
            out.push(FlatItem::Plain(arg.sep.clone()));
            for piece in &arg.pieces {
                Self::collect_piece(piece, out);
            }
        }
        // A synthetic close has no bytes to emit.
    }

    fn collect_piece<'d>(piece: &'d Piece, out: &mut Vec<FlatItem<'d>>) {
        match piece {
            Piece::Text(span) => out.push(FlatItem::Plain(span.clone())),
            Piece::Invocation(inv) => Self::collect_invocation(inv, out),
        }
    }

    /// Expand one well-formed invocation: arguments inside-out, raw inner
    /// text reconstructed, then the resolver decides the value.
    fn evaluate_invocation(&mut self, inv: &Invocation, depth: usize) -> String {
        let input = self.input;
        let range = inv.span();
        let raw_with_braces = &input[range.clone()];
        if depth >= MAX_EXPANSION_DEPTH {
            self.sink.runtime_warning(&RuntimeReport {
                macro_name: &inv.ident.text,
                range: range.clone(),
                raw: raw_with_braces,
                message: format!("expansion depth limit ({MAX_EXPANSION_DEPTH}) reached"),
            });
            return raw_with_braces.to_string();
        }

        // Evaluate each argument region in source order.
        let mut regions: Vec<(Span, String)> = Vec::new();
        if let Some(head_span) = inv.head_span() {
            let value = self.evaluate_pieces(&inv.head, head_span.clone(), depth);
            regions.push((head_span, value));
        }
        let mut sep_values = Vec::with_capacity(inv.args.len());
        for arg in &inv.args {
            let span = arg.value_span();
            let value = self.evaluate_pieces(&arg.pieces, span.clone(), depth);
            sep_values.push(value.clone());
            regions.push((span, value));
        }

        // Reconstruct the inner text: verbatim gaps, evaluated regions.
        let inner = inv.inner_span();
        let mut raw_inner = String::new();
        let mut cursor = inner.start;
        for (span, value) in &regions {
            if span.start > cursor {
                raw_inner.push_str(&self.input[cursor..span.start]);
            }
            raw_inner.push_str(value);
            cursor = cursor.max(span.end);
        }
        if cursor < inner.end {
            raw_inner.push_str(&self.input[cursor..inner.end]);
        }

        // The legacy head payload becomes the single argument only when no
        // separated arguments exist.
        let args = if !sep_values.is_empty() {
            sep_values
        } else if let Some((_, head_value)) = regions.first() {
            vec![strip_leading_separator(head_value)]
        } else {
            Vec::new()
        };

        let call = Call {
            name: inv.ident.text.clone(),
            args,
            raw_inner,
            raw_with_braces: raw_with_braces.to_string(),
            range,
            node: inv,
            env: self.env,
        };
        (self.resolver)(&call)
    }

    /// Expand the pieces of one argument region. Regions without nested
    /// invocations are returned verbatim from the input.
    fn evaluate_pieces(&mut self, pieces: &[Piece], span: Span, depth: usize) -> String {
        let has_nested = pieces
            .iter()
            .any(|piece| matches!(piece, Piece::Invocation(_)));
        if !has_nested {
            return self.input[span].to_string();
        }

        let mut output = String::new();
        let mut cursor = span.start;
        for piece in pieces {
            let Piece::Invocation(nested) = piece else {
                // Text pieces are covered by the verbatim gap copy.
                continue;
            };
            let nested_span = nested.span();
            if nested_span.start < cursor {
                // Overlapping ranges out of recovery; drop the invocation.
                continue;
            }
            output.push_str(&self.input[cursor..nested_span.start]);
            output.push_str(&self.evaluate_invocation(nested, depth + 1));
            cursor = nested_span.end;
        }
        if cursor < span.end {
            output.push_str(&self.input[cursor..span.end]);
        }
        output
    }
}

/// Drop the single separator character that introduced a legacy payload: the
/// colon of `{{name:arg}}` or the first whitespace character of
/// `{{name arg}}`. Everything after it, interior whitespace included, is the
/// argument.
fn strip_leading_separator(head: &str) -> String {
    let mut chars = head.chars();
    match chars.next() {
        Some(':') => chars.as_str().to_string(),
        Some(c) if c.is_whitespace() => chars.as_str().to_string(),
        _ => head.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencil::parsing::parse;

    /// Walk with a resolver that brackets each call's name and arguments,
    /// making the dispatch visible in the output.
    fn walk_tracing(source: &str) -> String {
        let env = Environment::default();
        let sink = crate::stencil::testing::CaptureSink::default();
        let output = parse(source);
        let mut walker = Walker::new(source, &env, &sink, |call: &Call<'_>| {
            format!("<{}:{}>", call.name, call.args.join(","))
        });
        walker.walk(&output.document)
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(walk_tracing("no invocations"), "no invocations");
    }

    #[test]
    fn test_surrounding_text_preserved() {
        assert_eq!(walk_tracing("a {{x}} b"), "a <x:> b");
    }

    #[test]
    fn test_arguments_reach_resolver() {
        assert_eq!(walk_tracing("{{x::1::2}}"), "<x:1,2>");
    }

    #[test]
    fn test_nested_expand_inside_out() {
        assert_eq!(walk_tracing("{{outer::{{inner}}}}"), "<outer:<inner:>>");
    }

    #[test]
    fn test_legacy_colon_payload() {
        assert_eq!(walk_tracing("{{x:arg text}}"), "<x:arg text>");
    }

    #[test]
    fn test_legacy_whitespace_payload_with_nested() {
        assert_eq!(walk_tracing("{{x abc {{inner}}}}"), "<x:abc <inner:>>");
    }

    #[test]
    fn test_unterminated_flattens_but_nested_survives() {
        assert_eq!(walk_tracing("Test {{outer::{{inner}}"), "Test {{outer::<inner:>");
    }

    #[test]
    fn test_demoted_open_stays_literal() {
        assert_eq!(walk_tracing("{{{{x}}"), "{{<x:>");
    }

    #[test]
    fn test_raw_inner_carries_nested_values() {
        let source = "{{unknown::my {{inner}} example}}";
        let env = Environment::default();
        let sink = crate::stencil::testing::CaptureSink::default();
        let output = parse(source);
        let mut captured = Vec::new();
        let mut walker = Walker::new(source, &env, &sink, |call: &Call<'_>| {
            captured.push(call.raw_inner.clone());
            if call.name == "inner" {
                "NL".to_string()
            } else {
                call.raw_preserved()
            }
        });
        let result = walker.walk(&output.document);
        drop(walker);
        assert_eq!(result, "{{unknown::my NL example}}");
        assert_eq!(captured, vec!["inner".to_string(), "unknown::my NL example".to_string()]);
    }

    #[test]
    fn test_empty_args_have_positions() {
        assert_eq!(walk_tracing("{{x::::last}}"), "<x:,last>");
    }

    #[test]
    fn test_depth_guard_leaves_raw() {
        // Build a CST deeper than the guard by hand is awkward; instead rely
        // on the parser cap producing text and check nothing panics at the
        // parser limit.
        let mut source = String::new();
        for _ in 0..70 {
            source.push_str("{{a::");
        }
        let result = walk_tracing(&source);
        assert!(result.contains("{{a::"));
    }
}
