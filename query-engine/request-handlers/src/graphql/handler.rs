use super::GraphQlAdapter;
use graph_value::ValueObject;
use graphql_parser::query::ParseError;
use query_core::{ElabResult, Operation, Problem, QueryCompiler};

/// The compile-from-text entry point: parse, convert, compile.
pub struct GraphQlHandler<'a> {
    compiler: &'a QueryCompiler,
}

impl<'a> GraphQlHandler<'a> {
    pub fn new(compiler: &'a QueryCompiler) -> Self {
        GraphQlHandler { compiler }
    }

    /// Compiles a textual operation. Parse errors surface as a single
    /// `ParseError` problem carrying position information; they are
    /// never mixed with semantic problems.
    #[tracing::instrument(skip_all)]
    pub fn compile(
        &self,
        source: &str,
        variables: ValueObject,
        operation_name: Option<&str>,
    ) -> ElabResult<Operation> {
        let document = match graphql_parser::parse_query::<String>(source) {
            Ok(document) => document,
            Err(error) => return ElabResult::failure(parse_problem(source, &error)),
        };

        GraphQlAdapter::convert(document, operation_name)
            .and_then(|operation| self.compiler.compile(operation, variables))
    }
}

/// Recovers line/column from the parser's error rendering and rebuilds
/// a source snippet with a caret marker. The parser does not expose
/// structured positions, so this falls back to the raw message when the
/// rendering is not in the expected shape.
fn parse_problem(source: &str, error: &ParseError) -> Problem {
    let rendered = error.to_string();

    let Some((line, column)) = extract_position(&rendered) else {
        return Problem::ParseError {
            line: 0,
            column: 0,
            snippet: rendered,
        };
    };

    let snippet = match source.lines().nth(line.saturating_sub(1)) {
        Some(source_line) => {
            let caret = " ".repeat(column.saturating_sub(1)) + "^";
            format!("{source_line}\n{caret}")
        }
        None => rendered,
    };

    Problem::ParseError {
        line,
        column,
        snippet,
    }
}

fn extract_position(rendered: &str) -> Option<(usize, usize)> {
    let tail = rendered.split("Parse error at ").nth(1)?;

    // Positions render either as `L:C` or as `line: L, column: C`.
    if let Some(rest) = tail.strip_prefix("line: ") {
        let line = rest.split(',').next()?.trim().parse().ok()?;
        let column = rest
            .split("column: ")
            .nth(1)?
            .split(|c: char| !c.is_ascii_digit())
            .next()?
            .parse()
            .ok()?;
        return Some((line, column));
    }

    let position = tail.split_whitespace().next()?;
    let (line, column) = position.split_once(':')?;
    Some((
        line.trim().parse().ok()?,
        column.trim().trim_end_matches(':').parse().ok()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_extraction() {
        assert_eq!(
            extract_position("query parse error: Parse error at 2:9\nUnexpected `}`"),
            Some((2, 9))
        );
        assert_eq!(
            extract_position("Parse error at line: 3, column: 14\nUnexpected `}`"),
            Some((3, 14))
        );
        assert_eq!(extract_position("something else entirely"), None);
    }

    #[test]
    fn snippet_carries_a_caret() {
        let source = "{ character {\n  name }";
        let problem = parse_problem(
            source,
            &graphql_parser::parse_query::<String>(source).unwrap_err(),
        );

        match problem {
            Problem::ParseError { line, column, snippet } => {
                assert!(line > 0);
                assert!(column > 0);
                assert!(snippet.contains('^'), "snippet: {snippet}");
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }
}
