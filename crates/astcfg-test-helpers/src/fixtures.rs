//! Ready-made programs for the scenarios every CFG test suite exercises.
//!
//! Node ids inside a fixture are stable: each function documents the ids of
//! the nodes tests usually want to point at.

use astcfg_core::ast::{Ast, AstBuilder};
use std::path::{Path, PathBuf};

/// `if (c) { a; } else { b; }`
///
/// Ids: `c` = #0, `a` = #1, `b` = #2.
pub fn if_else() -> Ast {
    let mut b = AstBuilder::new();
    let c = b.ident("c");
    let a = b.ident("a");
    let e = b.ident("b");
    let stmt = b.if_(c, vec![a], Some(vec![e]));
    b.finish_module("if_else", vec![stmt])
}

/// `while (c) { if (x) break; }`
pub fn while_with_break() -> Ast {
    let mut b = AstBuilder::new();
    let c = b.ident("c");
    let x = b.ident("x");
    let brk = b.break_(None);
    let stmt = b.if_(x, vec![brk], None);
    let body = b.block(vec![stmt]);
    let lp = b.while_(c, body);
    b.finish_module("while_with_break", vec![lp])
}

/// `switch (v) { case 1: a; case 2: b; break; default: c; }`
pub fn switch_fallthrough() -> Ast {
    let mut b = AstBuilder::new();
    let v = b.ident("v");
    let one = b.literal("1");
    let two = b.literal("2");
    let a = b.ident("a");
    let bb = b.ident("b");
    let brk = b.break_(None);
    let c = b.ident("c");
    let case1 = b.case(one, vec![a]);
    let case2 = b.case(two, vec![bb, brk]);
    let default = b.default_case(vec![c]);
    let sw = b.switch(v, vec![case1, case2, default]);
    b.finish_module("switch_fallthrough", vec![sw])
}

/// `switch (v)` with three cases where the `default` clause sits at
/// `position` (0 = first). Every body is a single expression without break.
pub fn switch_with_default_at(position: usize) -> Ast {
    let mut b = AstBuilder::new();
    let v = b.ident("v");
    let mut cases = Vec::new();
    let mut next_test = 1;
    for index in 0..3 {
        let body = b.ident(&format!("s{}", index));
        if index == position {
            cases.push(b.default_case(vec![body]));
        } else {
            let test = b.literal(&next_test.to_string());
            next_test += 1;
            cases.push(b.case(test, vec![body]));
        }
    }
    let sw = b.switch(v, cases);
    b.finish_module("switch_default", vec![sw])
}

/// `try { t; } catch (e) { c; } finally { f; }`
pub fn try_catch_finally() -> Ast {
    let mut b = AstBuilder::new();
    let t = b.ident("t");
    let c = b.ident("c");
    let f = b.ident("f");
    let catch = b.catch("e", vec![c]);
    let stmt = b.try_(vec![t], vec![catch], Some(vec![f]));
    b.finish_module("try_catch_finally", vec![stmt])
}

/// `function f() {}`
pub fn empty_function() -> Ast {
    let mut b = AstBuilder::new();
    let f = b.function("f", &[], vec![]);
    b.finish_module("empty_function", vec![f])
}

/// `while (c) { const g = function () { inner; }; }`
pub fn nested_function_in_loop() -> Ast {
    let mut b = AstBuilder::new();
    let c = b.ident("c");
    let inner = b.ident("inner");
    let lambda = b.lambda(&[], vec![inner]);
    let decl = b.const_("g", Some(lambda));
    let body = b.block(vec![decl]);
    let lp = b.while_(c, body);
    b.finish_module("nested_function_in_loop", vec![lp])
}

/// A module touching every construct the builder handles, used by the
/// driver tests and as a smoke test for the exporters.
pub fn kitchen_sink() -> Ast {
    let mut b = AstBuilder::new();
    let i = b.ident("i");
    let zero = b.literal("0");
    let init = b.let_("i", Some(zero));
    let ten = b.literal("10");
    let cond = b.binary("<", i, ten);
    let one = b.literal("1");
    let update = b.binary("+=", i, one);
    let skip = b.ident("skip");
    let cont = b.continue_(None);
    let skip_if = b.if_(skip, vec![cont], None);
    let work = b.call("work", vec![i]);
    let body = b.block(vec![skip_if, work]);
    let for_loop = b.for_(vec![init], Some(cond), vec![update], body);
    let for_loop = b.with_label(for_loop, "outer");

    let risky = b.call("risky", vec![]);
    let handle = b.call("handle", vec![]);
    let catch = b.catch("e", vec![handle]);
    let cleanup = b.call("cleanup", vec![]);
    let try_stmt = b.try_(vec![risky], vec![catch], Some(vec![cleanup]));

    let result = b.ident("result");
    let ret = b.ret(Some(result));
    let helper_body = b.ident("helper_body");
    let helper = b.function("helper", &["x"], vec![helper_body]);

    b.finish_module("kitchen_sink", vec![for_loop, try_stmt, helper, ret])
}

/// Write `ast` as JSON into `dir/name` and return the path.
pub fn write_ast_json(dir: &Path, name: &str, ast: &Ast) -> PathBuf {
    let json = serde_json::to_string_pretty(ast).expect("AST serializes to JSON");
    write_file(dir, name, &json)
}

/// Write raw text into `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("fixture file is writable");
    path
}
