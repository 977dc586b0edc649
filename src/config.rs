// ABOUTME: Configuration and constants for the Lisp interpreter
//! Version/banner constants for the CLI.

pub const VERSION: &str = "1.0.0";
pub const WELCOME_MESSAGE: &str = "cell-lisp v1.0";
pub const WELCOME_SUBTITLE: &str = "a small Lisp with lexical closures and a streaming reader";

pub const HELP_TEXT: &str = r#"
Evaluate one form at a time: each line you enter is read and evaluated in turn.

Special forms: define lambda quote cond let begin include
Primitives:    + - * / cat < = > and or not cons car cdr list empty?

Use Ctrl-D to exit.
"#;
