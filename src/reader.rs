// ABOUTME: Reader module turning a token stream into unevaluated forms
//! Recursive-descent reader: turns a token stream into unevaluated forms.

use crate::cell::Cell;
use crate::error::ReadError;
use crate::token::TokenStream;

/// Reads one top-level form from `stream`.
///
/// `first` mirrors the original parser's `expr(bool getfirst)`: when true,
/// the reader fetches its own first token (skipping comment lines as it
/// goes); when false, the caller has already fetched the current token
/// (typically an `Lp` it just consumed while walking a list) and the
/// reader should act on `stream.current()` without advancing first.
pub fn read_expr(stream: &mut TokenStream, first: bool) -> Result<Vec<Cell>, ReadError> {
    if first {
        loop {
            let tok = stream.get()?;
            if matches!(tok, Cell::Comment) {
                stream.ignore_line();
                continue;
            }
            break;
        }
    }

    match stream.current().clone() {
        Cell::Lp => read_list(stream),
        Cell::Quote => {
            let target = read_quoted_datum(stream)?;
            Ok(vec![Cell::Quote, target])
        }
        Cell::Rp => Err(ReadError::UnexpectedCloseParen),
        Cell::End => Ok(vec![Cell::End]),
        other => Ok(vec![other]),
    }
}

/// Reads the single datum immediately following a `'`, grouping a
/// parenthesised list into one `Expr` cell so that `Quote`'s evaluator
/// rule ("consume exactly one following cell") holds uniformly whether
/// the quoted datum is an atom, a list, or another quoted form.
fn read_quoted_datum(stream: &mut TokenStream) -> Result<Cell, ReadError> {
    let tok = stream.get()?;
    match tok {
        Cell::Lp => Ok(Cell::Expr(read_list(stream)?)),
        Cell::Quote => {
            let inner = read_quoted_datum(stream)?;
            Ok(Cell::Expr(vec![Cell::Quote, inner]))
        }
        Cell::Rp => Err(ReadError::UnexpectedCloseParen),
        Cell::End => Err(ReadError::DanglingQuote),
        other => Ok(other),
    }
}

/// Reads the body of a list, assuming `stream.current()` is the opening `Lp`.
fn read_list(stream: &mut TokenStream) -> Result<Vec<Cell>, ReadError> {
    let mut items = Vec::new();
    loop {
        let tok = stream.get()?;
        match tok {
            Cell::Rp => return Ok(items),
            Cell::Comment => {
                stream.ignore_line();
            }
            Cell::End => return Err(ReadError::UnterminatedList),
            Cell::Lp => {
                let nested = read_list(stream)?;
                items.push(Cell::Expr(nested));
            }
            Cell::Quote => {
                let target = read_quoted_datum(stream)?;
                items.push(Cell::Expr(vec![Cell::Quote, target]));
            }
            other => items.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(src: &str) -> Vec<Cell> {
        let mut ts = TokenStream::from_string(src);
        read_expr(&mut ts, true).unwrap()
    }

    #[test]
    fn reads_bare_number() {
        let form = read_all("42");
        assert!(matches!(form.as_slice(), [Cell::Number(n)] if *n == 42.0));
    }

    #[test]
    fn reads_simple_list() {
        let form = read_all("(+ 1 2)");
        assert!(matches!(form.as_slice(), [Cell::Add, Cell::Number(a), Cell::Number(b)]
            if *a == 1.0 && *b == 2.0));
    }

    #[test]
    fn reads_nested_list() {
        let form = read_all("(+ 1 (* 2 3))");
        match form.as_slice() {
            [Cell::Add, Cell::Number(a), Cell::Expr(nested)] => {
                assert_eq!(*a, 1.0);
                assert!(matches!(nested.as_slice(), [Cell::Mul, Cell::Number(b), Cell::Number(c)]
                    if *b == 2.0 && *c == 3.0));
            }
            other => panic!("unexpected form: {other:?}"),
        }
    }

    #[test]
    fn quote_unwraps_single_atom() {
        let form = read_all("'x");
        assert!(matches!(form.as_slice(), [Cell::Quote, Cell::Name(n)] if n == "x"));
    }

    #[test]
    fn quote_of_list_groups_into_expr() {
        let form = read_all("'(a b)");
        match form.as_slice() {
            [Cell::Quote, Cell::Expr(items)] => {
                assert!(matches!(items.as_slice(), [Cell::Name(a), Cell::Name(b)]
                    if a == "a" && b == "b"));
            }
            other => panic!("unexpected form: {other:?}"),
        }
    }

    #[test]
    fn unterminated_list_errors() {
        let mut ts = TokenStream::from_string("(+ 1 2");
        assert!(matches!(
            read_expr(&mut ts, true),
            Err(ReadError::UnterminatedList)
        ));
    }

    #[test]
    fn dangling_quote_errors() {
        let mut ts = TokenStream::from_string("'");
        assert!(matches!(read_expr(&mut ts, true), Err(ReadError::DanglingQuote)));
    }

    #[test]
    fn skips_comment_lines() {
        let form = read_all("; a comment\n42");
        assert!(matches!(form.as_slice(), [Cell::Number(n)] if *n == 42.0));
    }
}
