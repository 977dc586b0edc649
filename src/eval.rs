// ABOUTME: Evaluator module for executing parsed Lisp expressions
//! The tree-walking evaluator: `eval`, `evlist`, `apply`, and `apply_prim`.

use crate::cell::{Cell, Procedure};
use crate::env::Environment;
use crate::error::EvalError;
use crate::token::TokenStream;
use std::rc::Rc;

/// Evaluates a single form, returning its one result.
///
/// A "form" is whatever [`crate::reader::read_expr`] produced for one
/// top-level read: either a single atom, or a list's flattened head plus
/// arguments (parens already stripped by the reader).
pub fn eval(form: &[Cell], env: &Rc<Environment>, stream: &mut TokenStream) -> Result<Cell, EvalError> {
    if form.is_empty() {
        return Ok(Cell::End);
    }
    let (cell, _) = eval_step(form, 0, env, stream)?;
    Ok(cell)
}

/// Evaluates `items` left to right, accumulating one result per logical
/// item. A "consuming" item (a special form, a primitive, or a name bound
/// to a procedure) claims the rest of the slice for its own arguments and
/// ends the walk immediately, matching the evaluator's single dispatch
/// table used by both `eval` and `evlist` — [`eval_step`] is that shared
/// dispatcher, parameterised by how much of the slice it consumes.
pub fn evlist(items: &[Cell], env: &Rc<Environment>, stream: &mut TokenStream) -> Result<Vec<Cell>, EvalError> {
    let mut out = Vec::new();
    let mut idx = 0;
    while idx < items.len() {
        let (cell, next) = eval_step(items, idx, env, stream)?;
        out.push(cell);
        if next >= items.len() {
            break;
        }
        idx = next;
    }
    Ok(out)
}

/// Evaluates the item at `items[idx]`, returning its value and the index
/// just past everything it consumed. Non-consuming kinds (self-evaluating
/// atoms, a nested `Expr`, a plain variable reference) consume just
/// themselves; special forms, primitives, and procedure calls consume
/// everything from `idx` to the end of `items`.
fn eval_step(
    items: &[Cell],
    idx: usize,
    env: &Rc<Environment>,
    stream: &mut TokenStream,
) -> Result<(Cell, usize), EvalError> {
    let head = &items[idx];
    match head {
        Cell::Number(_) | Cell::True | Cell::False => Ok((head.clone(), idx + 1)),

        Cell::Quote => {
            let target = items
                .get(idx + 1)
                .cloned()
                .ok_or(EvalError::DanglingQuote)?;
            Ok((target, idx + 2))
        }

        Cell::Expr(inner) => {
            let mut result = evlist(inner, env, stream)?;
            let cell = if result.len() == 1 {
                result.pop().unwrap()
            } else {
                Cell::Expr(result)
            };
            Ok((cell, idx + 1))
        }

        Cell::Name(name) => {
            let value = env.lookup(name)?;
            if let Cell::Proc(proc) = value {
                let args = evlist(&items[idx + 1..], env, stream)?;
                let result = apply(proc, args, stream)?;
                Ok((result, items.len()))
            } else {
                Ok((value, idx + 1))
            }
        }

        Cell::Proc(p) => Ok((Cell::Proc(p.clone()), idx + 1)),

        Cell::Lambda => {
            let cell = eval_lambda(&items[idx + 1..], env)?;
            Ok((cell, items.len()))
        }
        Cell::Define => {
            let cell = eval_define(&items[idx + 1..], env, stream)?;
            Ok((cell, items.len()))
        }
        Cell::Let => {
            let cell = eval_let(&items[idx + 1..], env, stream)?;
            Ok((cell, items.len()))
        }
        Cell::Cond => {
            let cell = eval_cond(&items[idx + 1..], env, stream)?;
            Ok((cell, items.len()))
        }
        Cell::Begin => {
            let cell = eval_begin(&items[idx + 1..], env, stream)?;
            Ok((cell, items.len()))
        }
        Cell::Include => {
            let cell = eval_include(&items[idx + 1..], stream)?;
            Ok((cell, items.len()))
        }

        prim @ (Cell::Add
        | Cell::Sub
        | Cell::Mul
        | Cell::Div
        | Cell::Cat
        | Cell::Less
        | Cell::Equal
        | Cell::Greater
        | Cell::And
        | Cell::Or
        | Cell::Not
        | Cell::Cons
        | Cell::Car
        | Cell::Cdr
        | Cell::List
        | Cell::Empty) => {
            let args = evlist(&items[idx + 1..], env, stream)?;
            let cell = apply_prim(prim, args)?;
            Ok((cell, items.len()))
        }

        Cell::End => Ok((Cell::End, idx + 1)),

        // Lp/Rp/Else/Comment cannot legally appear as a form's head; the
        // reader never emits them there.
        _ => Err(EvalError::NotCallable),
    }
}

fn eval_lambda(rest: &[Cell], env: &Rc<Environment>) -> Result<Cell, EvalError> {
    if rest.len() != 2 {
        return Err(EvalError::MalformedLambda);
    }
    let params = match &rest[0] {
        Cell::Expr(items) => items,
        _ => return Err(EvalError::MalformedLambda),
    };
    let mut names = Vec::with_capacity(params.len());
    for p in params {
        match p {
            Cell::Name(n) => names.push(n.clone()),
            _ => return Err(EvalError::MalformedLambda),
        }
    }
    Ok(Cell::Proc(Rc::new(Procedure {
        params: names,
        body: vec![rest[1].clone()],
        env: env.clone(),
    })))
}

fn eval_define(rest: &[Cell], env: &Rc<Environment>, stream: &mut TokenStream) -> Result<Cell, EvalError> {
    if rest.is_empty() {
        return Err(EvalError::MalformedDefine);
    }
    match &rest[0] {
        Cell::Name(name) => {
            if rest.len() < 2 {
                return Err(EvalError::MalformedDefine);
            }
            let value = eval(&rest[1..], env, stream)?;
            env.define(name.clone(), value.clone());
            Ok(value)
        }
        Cell::Expr(signature) => {
            if rest.len() != 2 || signature.is_empty() {
                return Err(EvalError::MalformedDefine);
            }
            let name = match &signature[0] {
                Cell::Name(n) => n.clone(),
                _ => return Err(EvalError::MalformedDefine),
            };
            let mut params = Vec::with_capacity(signature.len() - 1);
            for p in &signature[1..] {
                match p {
                    Cell::Name(n) => params.push(n.clone()),
                    _ => return Err(EvalError::MalformedDefine),
                }
            }
            let proc = Cell::Proc(Rc::new(Procedure {
                params,
                body: vec![rest[1].clone()],
                env: env.clone(),
            }));
            env.define(name, proc.clone());
            Ok(proc)
        }
        _ => Err(EvalError::MalformedDefine),
    }
}

fn eval_let(rest: &[Cell], env: &Rc<Environment>, stream: &mut TokenStream) -> Result<Cell, EvalError> {
    if rest.len() != 2 {
        return Err(EvalError::MalformedLet);
    }
    let bindings = match &rest[0] {
        Cell::Expr(items) => items,
        _ => return Err(EvalError::MalformedLet),
    };

    let inner_env = Environment::with_outer(env.clone());
    for binding in bindings {
        let pair = match binding {
            Cell::Expr(p) if p.len() >= 2 => p,
            _ => return Err(EvalError::MalformedLet),
        };
        let name = match &pair[0] {
            Cell::Name(n) => n.clone(),
            _ => return Err(EvalError::MalformedLet),
        };
        // Bound values are evaluated against the OUTER environment, not
        // the new frame, so `(let ((x x)) ...)` refers to the enclosing x.
        let value = eval(&pair[1..], env, stream)?;
        inner_env.define(name, value);
    }

    eval(&rest[1..2], &inner_env, stream)
}

fn eval_cond(rest: &[Cell], env: &Rc<Environment>, stream: &mut TokenStream) -> Result<Cell, EvalError> {
    for (i, clause) in rest.iter().enumerate() {
        let pair = match clause {
            Cell::Expr(p) if p.len() >= 2 => p,
            _ => return Err(EvalError::MalformedCond),
        };
        if matches!(pair[0], Cell::Else) {
            if i != rest.len() - 1 {
                return Err(EvalError::ElseNotLast);
            }
            return eval(&pair[1..], env, stream);
        }
        let test = eval(&pair[0..1], env, stream)?;
        if test.is_truthy() {
            return eval(&pair[1..], env, stream);
        }
    }
    Err(EvalError::CondFellThrough)
}

fn eval_begin(rest: &[Cell], env: &Rc<Environment>, stream: &mut TokenStream) -> Result<Cell, EvalError> {
    if rest.is_empty() {
        return Ok(Cell::End);
    }
    if rest.len() > 1 {
        evlist(&rest[..rest.len() - 1], env, stream)?;
    }
    eval(&rest[rest.len() - 1..], env, stream)
}

fn eval_include(rest: &[Cell], stream: &mut TokenStream) -> Result<Cell, EvalError> {
    let path = match rest.first() {
        Some(Cell::Name(p)) => p.clone(),
        _ => return Err(EvalError::MalformedInclude),
    };
    stream
        .set_input(&path)
        .map_err(|source| EvalError::Include {
            path: std::path::PathBuf::from(&path),
            source,
        })?;
    Ok(Cell::Include)
}

/// Calls a user procedure with already-evaluated arguments: binds
/// parameters positionally in a new frame extending the closure's
/// captured environment, then evaluates the body against that frame.
pub fn apply(proc: Rc<Procedure>, args: Vec<Cell>, stream: &mut TokenStream) -> Result<Cell, EvalError> {
    if args.len() != proc.params.len() {
        return Err(EvalError::arity("proc", proc.params.len().to_string(), args.len()));
    }
    let call_env = Environment::with_outer(proc.env.clone());
    for (name, value) in proc.params.iter().zip(args) {
        call_env.define(name.clone(), value);
    }
    eval(&proc.body, &call_env, stream)
}

fn bool_cell(b: bool) -> Cell {
    if b {
        Cell::True
    } else {
        Cell::False
    }
}

fn as_number(function: &str, cell: &Cell) -> Result<f64, EvalError> {
    match cell {
        Cell::Number(n) => Ok(*n),
        other => Err(EvalError::type_mismatch(function, "number", other.kind_name())),
    }
}

fn fold_numeric(function: &str, args: Vec<Cell>, f: impl Fn(f64, f64) -> f64) -> Result<Cell, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity(function, crate::error::ARITY_AT_LEAST_ONE, 0));
    }
    let mut acc = as_number(function, &args[0])?;
    for cell in &args[1..] {
        acc = f(acc, as_number(function, cell)?);
    }
    Ok(Cell::Number(acc))
}

fn fold_cat(args: Vec<Cell>) -> Result<Cell, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity("cat", crate::error::ARITY_AT_LEAST_ONE, 0));
    }
    let joined = args.iter().map(|c| c.to_string()).collect::<String>();
    Ok(Cell::Name(joined))
}

/// `<`, `>` (handled by swapping operands and reusing `<`), and `=`: the
/// comparison type is inferred from the first operand.
fn compare(function: &str, args: Vec<Cell>) -> Result<std::cmp::Ordering, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity(function, crate::error::ARITY_TWO, args.len()));
    }
    match (&args[0], &args[1]) {
        (Cell::Number(a), Cell::Number(b)) => Ok(a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)),
        (Cell::Number(_), other) => Err(EvalError::type_mismatch(function, "number", other.kind_name())),
        (Cell::Name(a), Cell::Name(b)) => Ok(a.cmp(b)),
        (Cell::Name(_), other) => Err(EvalError::type_mismatch(function, "name", other.kind_name())),
        (other, _) => Err(EvalError::type_mismatch(function, "number or name", other.kind_name())),
    }
}

pub fn apply_prim(op: &Cell, args: Vec<Cell>) -> Result<Cell, EvalError> {
    match op {
        Cell::Add => fold_numeric("+", args, |a, b| a + b),
        Cell::Sub => fold_numeric("-", args, |a, b| a - b),
        Cell::Mul => fold_numeric("*", args, |a, b| a * b),
        Cell::Div => fold_numeric("/", args, |a, b| a / b),
        Cell::Cat => fold_cat(args),

        Cell::Less => compare("<", args).map(|o| bool_cell(o == std::cmp::Ordering::Less)),
        Cell::Greater => {
            let swapped = if args.len() == 2 {
                vec![args[1].clone(), args[0].clone()]
            } else {
                args
            };
            compare(">", swapped).map(|o| bool_cell(o == std::cmp::Ordering::Less))
        }
        Cell::Equal => compare("=", args).map(|o| bool_cell(o == std::cmp::Ordering::Equal)),

        Cell::And => {
            for a in args {
                if !a.is_truthy() {
                    return Ok(a);
                }
            }
            Ok(Cell::True)
        }
        Cell::Or => {
            for a in args {
                if a.is_truthy() {
                    return Ok(a);
                }
            }
            Ok(Cell::False)
        }
        Cell::Not => {
            if args.len() != 1 {
                return Err(EvalError::arity("not", crate::error::ARITY_ONE, args.len()));
            }
            Ok(bool_cell(!args[0].is_truthy()))
        }

        Cell::Cons | Cell::List => Ok(Cell::Expr(args)),

        Cell::Car => {
            if args.len() != 1 {
                return Err(EvalError::arity("car", crate::error::ARITY_ONE, args.len()));
            }
            match &args[0] {
                Cell::Expr(items) if !items.is_empty() => Ok(items[0].clone()),
                _ => Ok(args[0].clone()),
            }
        }
        Cell::Cdr => {
            if args.len() != 1 {
                return Err(EvalError::arity("cdr", crate::error::ARITY_ONE, args.len()));
            }
            match &args[0] {
                Cell::Expr(items) => match items.len() {
                    0 | 1 => Ok(Cell::Expr(Vec::new())),
                    2 => Ok(items[1].clone()),
                    _ => Ok(Cell::Expr(items[1..].to_vec())),
                },
                _ => Ok(Cell::Expr(Vec::new())),
            }
        }
        Cell::Empty => {
            if args.len() != 1 {
                return Err(EvalError::arity("empty?", crate::error::ARITY_ONE, args.len()));
            }
            Ok(bool_cell(matches!(&args[0], Cell::Expr(items) if items.is_empty())))
        }

        _ => Err(EvalError::NotCallable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_expr;

    fn run(src: &str) -> Cell {
        let mut stream = TokenStream::from_string(src);
        let env = Environment::new();
        let mut last = Cell::End;
        loop {
            let form = read_expr(&mut stream, true).unwrap();
            if matches!(form.as_slice(), [Cell::End]) {
                break;
            }
            last = eval(&form, &env, &mut stream).unwrap();
        }
        last
    }

    #[test]
    fn arithmetic_left_fold() {
        assert!(matches!(run("(+ 1 2 3)"), Cell::Number(n) if n == 6.0));
        assert!(matches!(run("(* 2 3 4)"), Cell::Number(n) if n == 24.0));
    }

    #[test]
    fn closures_capture_definition_time_scope() {
        let result = run("(define x 1) (define f (lambda () x)) (define x 2) (f)");
        assert!(matches!(result, Cell::Number(n) if n == 1.0));
    }

    #[test]
    fn sugared_define_and_call() {
        let result = run("(define (sq x) (* x x)) (sq 5)");
        assert!(matches!(result, Cell::Number(n) if n == 25.0));
    }

    #[test]
    fn cond_with_else() {
        let result = run("(cond ((< 2 1) 'a) (else 'b))");
        assert!(matches!(result, Cell::Name(n) if n == "b"));
    }

    #[test]
    fn let_evaluates_bindings_against_outer_env() {
        let result = run("(let ((x 10) (y 20)) (+ x y))");
        assert!(matches!(result, Cell::Number(n) if n == 30.0));
    }

    #[test]
    fn recursive_factorial_via_cond() {
        let result = run("(define (fact n) (cond ((< n 2) 1) (else (* n (fact (- n 1)))))) (fact 5)");
        assert!(matches!(result, Cell::Number(n) if n == 120.0));
    }

    #[test]
    fn car_cdr_list_semantics() {
        assert!(matches!(run("(car (cdr (list 1 2 3)))"), Cell::Number(n) if n == 2.0));
        match run("(cdr (cdr (list 1 2 3)))") {
            Cell::Expr(items) => assert!(matches!(items.as_slice(), [Cell::Number(n)] if *n == 3.0)),
            other => panic!("expected (3), got {other:?}"),
        }
        match run("(cdr (list 1))") {
            Cell::Expr(items) => assert!(items.is_empty()),
            other => panic!("expected empty list, got {other:?}"),
        }
    }

    #[test]
    fn cdr_of_two_element_list_is_bare_element() {
        let result = run("(cdr (cons 'a 'b))");
        assert!(matches!(result, Cell::Name(n) if n == "b"));
    }

    #[test]
    fn empty_predicate() {
        assert!(matches!(run("(empty? (list))"), Cell::True));
        assert!(matches!(run("(empty? (list 1))"), Cell::False));
    }

    #[test]
    fn not_and_truthiness() {
        assert!(matches!(run("(not (< 2 1))"), Cell::True));
        assert!(matches!(run("(not (< 1 2))"), Cell::False));
    }

    #[test]
    fn and_or_short_circuit_values() {
        assert!(matches!(run("(and (< 1 2) 5)"), Cell::Number(n) if n == 5.0));
        assert!(matches!(run("(or (< 2 1) 5)"), Cell::Number(n) if n == 5.0));
    }

    #[test]
    fn begin_returns_last_value() {
        assert!(matches!(run("(begin 1 2 3)"), Cell::Number(n) if n == 3.0));
    }

    #[test]
    fn quote_returns_unevaluated_atom() {
        assert!(matches!(run("'x"), Cell::Name(n) if n == "x"));
    }

    #[test]
    fn else_must_be_last_clause() {
        let mut stream = TokenStream::from_string("(cond (else 1) ((< 1 2) 2))");
        let env = Environment::new();
        let form = read_expr(&mut stream, true).unwrap();
        assert!(matches!(eval(&form, &env, &mut stream), Err(EvalError::ElseNotLast)));
    }

    #[test]
    fn arity_mismatch_on_call() {
        let mut stream = TokenStream::from_string("(define (id x) x) (id 1 2)");
        let env = Environment::new();
        let form1 = read_expr(&mut stream, true).unwrap();
        eval(&form1, &env, &mut stream).unwrap();
        let form2 = read_expr(&mut stream, true).unwrap();
        assert!(matches!(
            eval(&form2, &env, &mut stream),
            Err(EvalError::ArityMismatch { .. })
        ));
    }

    #[test]
    fn unbound_variable_errors() {
        let mut stream = TokenStream::from_string("nonexistent");
        let env = Environment::new();
        let form = read_expr(&mut stream, true).unwrap();
        assert!(matches!(eval(&form, &env, &mut stream), Err(EvalError::UnboundVariable(_))));
    }
}
