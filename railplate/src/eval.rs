//! Tree-walking evaluation of a parsed template.
//!
//! Evaluation cannot fail: every lookup miss, unknown helper and
//! non-list iteration target is absorbed into empty output.  The only
//! errors a render can produce happen earlier, at parse time.

use std::cmp::Ordering;

use crate::ast;
use crate::helpers::Helper;
use crate::value::{Value, ValueKind, ValueMap, ValueRepr};

/// Scope stack for loop bodies.
///
/// Each loop iteration overlays a small frame with the element and
/// index bindings; lookups walk the stack innermost-first so loop
/// variables shadow outer fields of the same name.
struct Frames {
    stack: Vec<Value>,
}

impl Frames {
    fn new(root: Value) -> Frames {
        Frames { stack: vec![root] }
    }

    fn push(&mut self, frame: ValueMap) {
        self.stack.push(Value::from(frame));
    }

    fn pop(&mut self) {
        self.stack.pop();
    }

    fn lookup(&self, name: &str) -> Value {
        for frame in self.stack.iter().rev() {
            if let ValueRepr::Map(map) = &frame.0 {
                if let Some(value) = map.get(name) {
                    return value.clone();
                }
            }
        }
        Value::UNDEFINED
    }

    /// Resolves a dotted path, short-circuiting to undefined the
    /// moment any intermediate segment is missing.
    fn resolve_path(&self, segments: &[&str]) -> Value {
        let mut iter = segments.iter();
        let mut rv = match iter.next() {
            Some(first) => self.lookup(first),
            None => return Value::UNDEFINED,
        };
        for seg in iter {
            if rv.is_undefined() || rv.is_none() {
                return Value::UNDEFINED;
            }
            rv = rv.get_attr(seg);
        }
        rv
    }
}

/// Renders a parsed template against a root context.
pub fn eval(root_stmt: &ast::Stmt, root: Value) -> String {
    let mut out = String::new();
    let mut frames = Frames::new(root);
    eval_stmt(root_stmt, &mut frames, &mut out);
    out
}

fn eval_stmt(stmt: &ast::Stmt, frames: &mut Frames, out: &mut String) {
    match stmt {
        ast::Stmt::Template(tmpl) => {
            for child in &tmpl.children {
                eval_stmt(child, frames, out);
            }
        }
        ast::Stmt::EmitRaw(raw) => out.push_str(raw.raw),
        ast::Stmt::EmitExpr(emit) => {
            let value = eval_expr(&emit.expr, frames);
            if !value.is_undefined() && !value.is_none() {
                out.push_str(&value.to_string());
            }
        }
        ast::Stmt::IfCond(cond) => {
            let body = if eval_cond(&cond.cond, frames) {
                &cond.true_body
            } else {
                &cond.false_body
            };
            for child in body {
                eval_stmt(child, frames, out);
            }
        }
        ast::Stmt::ForEach(node) => eval_for_each(node, frames, out),
    }
}

fn eval_for_each(node: &ast::Spanned<ast::ForEach>, frames: &mut Frames, out: &mut String) {
    let source = frames.resolve_path(&node.source);
    let items = match source.as_list() {
        Some(items) => items.to_vec(),
        None => {
            if !source.is_undefined() && !source.is_none() {
                tracing::debug!(
                    source = %node.source.join("."),
                    line = node.span().start_line,
                    "forEach target is not a list, rendering empty block"
                );
            }
            return;
        }
    };
    for (idx, item) in items.iter().enumerate() {
        let mut frame = ValueMap::new();
        frame.insert(node.item_var.to_string(), item.clone());
        if let Some(index_var) = node.index_var {
            frame.insert(index_var.to_string(), Value::from(idx));
        }
        frames.push(frame);
        for child in &node.body {
            eval_stmt(child, frames, out);
        }
        frames.pop();
    }
}

fn eval_expr(expr: &ast::Expr, frames: &Frames) -> Value {
    match expr {
        ast::Expr::Path(path) => frames.resolve_path(&path.segments),
        ast::Expr::Const(constant) => constant.value.clone(),
        ast::Expr::Clock(clock) => clock.kind.invoke(),
        ast::Expr::Call(call) => {
            let args: Vec<Value> = call.args.iter().map(|arg| eval_expr(arg, frames)).collect();
            match Helper::from_name(call.name) {
                Some(helper) => helper.invoke(&args),
                None => Value::UNDEFINED,
            }
        }
    }
}

fn eval_cond(cond: &ast::Cond, frames: &Frames) -> bool {
    match cond {
        ast::Cond::Single(atom) => eval_atom(atom, frames),
        ast::Cond::All(atoms) => atoms.iter().all(|atom| eval_atom(atom, frames)),
        ast::Cond::Any(atoms) => atoms.iter().any(|atom| eval_atom(atom, frames)),
    }
}

fn eval_atom(atom: &ast::CondAtom, frames: &Frames) -> bool {
    match atom {
        ast::CondAtom::Truthy(expr) => eval_expr(expr, frames).is_true(),
        ast::CondAtom::Compare { op, left, right } => {
            let left = eval_expr(left, frames);
            let right = eval_expr(right, frames);
            match op {
                ast::CmpOp::StrictEq => strict_eq(&left, &right),
                ast::CmpOp::LooseEq => loose_eq(&left, &right),
                ast::CmpOp::Gt => order(&left, &right) == Ordering::Greater,
                ast::CmpOp::Lt => order(&left, &right) == Ordering::Less,
            }
        }
    }
}

/// `===`: same kind and equal value.  Lists and records never compare
/// equal, mirroring reference identity semantics.
fn strict_eq(left: &Value, right: &Value) -> bool {
    if left.kind() != right.kind() {
        return false;
    }
    match left.kind() {
        ValueKind::Seq | ValueKind::Map => false,
        _ => left == right,
    }
}

/// `==`: strict equality, plus numeric coercion of numeric strings
/// and booleans, plus null/undefined equivalence.
fn loose_eq(left: &Value, right: &Value) -> bool {
    if strict_eq(left, right) {
        return true;
    }
    if (left.is_undefined() || left.is_none()) && (right.is_undefined() || right.is_none()) {
        return true;
    }
    match (left.coerce_f64(), right.coerce_f64()) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

/// Orders two values numerically when both coerce to numbers,
/// lexicographically on their string forms otherwise.
fn order(left: &Value, right: &Value) -> Ordering {
    match (left.coerce_f64(), right.coerce_f64()) {
        (Some(left), Some(right)) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
        _ => left.to_string().cmp(&right.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn frames_with(ctx: Value) -> Frames {
        Frames::new(ctx)
    }

    #[test]
    fn test_path_short_circuit() {
        let frames = frames_with(crate::context! { a => crate::context! {} });
        assert_eq!(frames.resolve_path(&["a", "b", "c"]), Value::UNDEFINED);
        assert_eq!(frames.resolve_path(&[]), Value::UNDEFINED);
    }

    #[test]
    fn test_loop_bindings_shadow() {
        let mut frames = frames_with(crate::context! { photo => "outer" });
        let mut frame = ValueMap::new();
        frame.insert("photo".to_string(), Value::from("inner"));
        frames.push(frame);
        assert_eq!(frames.lookup("photo"), Value::from("inner"));
        frames.pop();
        assert_eq!(frames.lookup("photo"), Value::from("outer"));
    }

    #[test]
    fn test_comparisons() {
        assert!(strict_eq(&Value::from(1), &Value::from(1.0)));
        assert!(!strict_eq(&Value::from("1"), &Value::from(1)));
        assert!(loose_eq(&Value::from("1"), &Value::from(1)));
        assert!(loose_eq(&Value::UNDEFINED, &Value::from(())));
        assert_eq!(order(&Value::from(2), &Value::from(10)), Ordering::Less);
        assert_eq!(
            order(&Value::from("b"), &Value::from("a")),
            Ordering::Greater
        );
    }
}
