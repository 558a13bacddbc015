// パス: src/primitives.rs
// 役割: 特殊形式の一覧と、ルート環境へ登録する組み込み手続きを定義する
// 意図: 展開器と評価器が同じ特殊形式表を参照し、組み込み一覧を一箇所で管理する
// 関連ファイル: src/evaluator.rs, src/expander.rs, src/runtime.rs
//! プリミティブ定義モジュール
//!
//! - 特殊形式は名前から `SpecialForm` を引く表で管理する。
//! - 組み込み手続きはすべて「評価済み引数の並び → 値またはエラー」の関数。
//! - 算術は可変長の左畳み込み。実数が混ざれば実数、文字列が混ざれば型エラー。
//! - 比較は隣接するすべての組で性質が成り立つかを判定する。

use std::cmp::Ordering;
use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::errors::{EvalError, EvalResult};
use crate::runtime::{emit_line, Env, ListItem, Native, NativeFn, Value};

/// 評価器・展開器が構造的に解釈するリスト先頭のキーワード。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecialForm {
    Quote,
    Bind,
    If,
    Fn,
    Do,
    Defmacro,
    Quasiquote,
    Unquote,
    UnquoteSplicing,
}

static SPECIAL_FORMS: Lazy<HashMap<&'static str, SpecialForm>> = Lazy::new(|| {
    HashMap::from([
        ("quote", SpecialForm::Quote),
        ("bind", SpecialForm::Bind),
        ("if", SpecialForm::If),
        ("fn", SpecialForm::Fn),
        ("do", SpecialForm::Do),
        ("defmacro", SpecialForm::Defmacro),
        ("quasiquote", SpecialForm::Quasiquote),
        ("unquote", SpecialForm::Unquote),
        ("unquote-splicing", SpecialForm::UnquoteSplicing),
    ])
});

/// シンボル名が特殊形式であればその種別を返す。
pub fn special_form(name: &str) -> Option<SpecialForm> {
    SPECIAL_FORMS.get(name).copied()
}

/// 組み込み手続きの定義。
#[derive(Clone, Copy)]
pub struct PrimitiveDef {
    pub name: &'static str,
    pub f: NativeFn,
}

/// ルート環境に登録される組み込み手続きの一覧。
pub const PRIMITIVES: &[PrimitiveDef] = &[
    PrimitiveDef { name: "+", f: add_op },
    PrimitiveDef { name: "-", f: sub_op },
    PrimitiveDef { name: "*", f: mul_op },
    PrimitiveDef { name: "%", f: mod_op },
    PrimitiveDef { name: "<", f: lt_op },
    PrimitiveDef { name: ">", f: gt_op },
    PrimitiveDef { name: "=", f: eq_op },
    PrimitiveDef { name: "++", f: concat_op },
    PrimitiveDef { name: "bool?", f: is_bool },
    PrimitiveDef { name: "fixnum?", f: is_fixnum },
    PrimitiveDef { name: "double?", f: is_double },
    PrimitiveDef { name: "str?", f: is_str },
    PrimitiveDef { name: "sym?", f: is_sym },
    PrimitiveDef { name: "bound?", f: is_bound },
    PrimitiveDef { name: "str!", f: to_str },
    PrimitiveDef { name: "sym!", f: to_sym },
    PrimitiveDef { name: "cons", f: cons },
    PrimitiveDef { name: "head", f: head },
    PrimitiveDef { name: "tail", f: tail },
    PrimitiveDef { name: "list", f: list },
    PrimitiveDef { name: "join", f: join },
    PrimitiveDef { name: "#:n", f: newline_cmd },
    PrimitiveDef { name: "#:g", f: globals_cmd },
];

/// 組み込み手続きをすべて束縛したルート環境を生成する。
pub fn initial_env() -> Env {
    let map = PRIMITIVES
        .iter()
        .map(|p| {
            (
                p.name.to_string(),
                Value::Native(Native {
                    name: p.name,
                    f: p.f,
                }),
            )
        })
        .collect();
    Env::from_map(map)
}

fn expect_arity(name: &str, args: &[Value], expected: usize) -> EvalResult<()> {
    if args.len() != expected {
        return Err(EvalError::application(
            "EVAL040",
            format!(
                "{}: expected {} argument(s) but got {}",
                name,
                expected,
                args.len()
            ),
        ));
    }
    Ok(())
}

// ---- 算術 ----

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NumericOp {
    Add,
    Sub,
    Mul,
    Mod,
}

impl NumericOp {
    fn symbol(self) -> &'static str {
        match self {
            NumericOp::Add => "+",
            NumericOp::Sub => "-",
            NumericOp::Mul => "*",
            NumericOp::Mod => "%",
        }
    }

    fn identity(self) -> Option<i64> {
        match self {
            NumericOp::Add => Some(0),
            NumericOp::Mul => Some(1),
            NumericOp::Sub | NumericOp::Mod => None,
        }
    }

    fn apply_int(self, a: i64, b: i64) -> EvalResult<i64> {
        let overflow = || {
            EvalError::arithmetic(
                "EVAL060",
                format!("{}: integer overflow", self.symbol()),
            )
        };
        match self {
            NumericOp::Add => a.checked_add(b).ok_or_else(overflow),
            NumericOp::Sub => a.checked_sub(b).ok_or_else(overflow),
            NumericOp::Mul => a.checked_mul(b).ok_or_else(overflow),
            NumericOp::Mod => {
                if b == 0 {
                    return Err(EvalError::arithmetic("EVAL061", "%: divided by 0"));
                }
                let r = a.checked_rem(b).ok_or_else(overflow)?;
                // 剰余の符号は除数に合わせる（床除算）
                if r != 0 && (r < 0) != (b < 0) {
                    Ok(r + b)
                } else {
                    Ok(r)
                }
            }
        }
    }

    fn apply_double(self, a: f64, b: f64) -> f64 {
        match self {
            NumericOp::Add => a + b,
            NumericOp::Sub => a - b,
            NumericOp::Mul => a * b,
            NumericOp::Mod => {
                let r = a % b;
                if r != 0.0 && (r < 0.0) != (b < 0.0) {
                    r + b
                } else {
                    r
                }
            }
        }
    }
}

fn arith(op: NumericOp, args: &[Value]) -> EvalResult<Value> {
    if args.iter().any(|a| matches!(a, Value::Text(_))) {
        return Err(EvalError::type_mismatch(
            "EVAL050",
            "Types mismatch, can't add String to Number",
        ));
    }
    if let Some(bad) = args
        .iter()
        .find(|a| !matches!(a, Value::Int(_) | Value::Double(_)))
    {
        return Err(EvalError::type_mismatch(
            "EVAL050",
            format!(
                "unsupported operand type for {} operator: `{}` ({})",
                op.symbol(),
                bad.typename(),
                bad
            ),
        ));
    }
    let Some((first, rest)) = args.split_first() else {
        return match op.identity() {
            Some(unit) => Ok(Value::Int(unit)),
            None => Err(EvalError::application(
                "EVAL040",
                format!("{}: expected at least 1 argument(s) but got 0", op.symbol()),
            )),
        };
    };
    if args.iter().any(|a| matches!(a, Value::Double(_))) {
        let mut acc = as_double(first);
        for x in rest {
            acc = op.apply_double(acc, as_double(x));
        }
        return Ok(Value::Double(acc));
    }
    let mut acc = as_int(first);
    for x in rest {
        acc = op.apply_int(acc, as_int(x))?;
    }
    Ok(Value::Int(acc))
}

// 呼び出し前に数値であることを確認済み
fn as_double(v: &Value) -> f64 {
    match v {
        Value::Int(i) => *i as f64,
        Value::Double(d) => *d,
        _ => f64::NAN,
    }
}

fn as_int(v: &Value) -> i64 {
    match v {
        Value::Int(i) => *i,
        Value::Double(d) => *d as i64,
        _ => 0,
    }
}

fn add_op(args: &[Value], _env: &Env) -> EvalResult<Value> {
    arith(NumericOp::Add, args)
}

fn sub_op(args: &[Value], _env: &Env) -> EvalResult<Value> {
    arith(NumericOp::Sub, args)
}

fn mul_op(args: &[Value], _env: &Env) -> EvalResult<Value> {
    arith(NumericOp::Mul, args)
}

fn mod_op(args: &[Value], _env: &Env) -> EvalResult<Value> {
    arith(NumericOp::Mod, args)
}

// ---- 比較 ----

fn compare(op: &str, a: &Value, b: &Value) -> EvalResult<Option<Ordering>> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Some(x.cmp(y))),
        (Value::Int(_) | Value::Double(_), Value::Int(_) | Value::Double(_)) => {
            Ok(as_double(a).partial_cmp(&as_double(b)))
        }
        (Value::Text(x), Value::Text(y)) => Ok(Some(x.cmp(y))),
        _ => Err(EvalError::type_mismatch(
            "EVAL050",
            format!(
                "{}: cannot compare `{}` ({}) with `{}` ({})",
                op,
                a.typename(),
                a,
                b.typename(),
                b
            ),
        )),
    }
}

/// 隣接するすべての組で `want` が成り立つか。型エラーは全組を確認してから判定する。
fn compare_chain(op: &str, args: &[Value], want: Ordering) -> EvalResult<Value> {
    let mut all = true;
    for pair in args.windows(2) {
        if compare(op, &pair[0], &pair[1])? != Some(want) {
            all = false;
        }
    }
    Ok(Value::Bool(all))
}

/// 数値は種別をまたいで値で比べる構造的等価。
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_), Value::Double(_)) | (Value::Double(_), Value::Int(_)) => {
            as_double(a) == as_double(b)
        }
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        _ => a == b,
    }
}

fn lt_op(args: &[Value], _env: &Env) -> EvalResult<Value> {
    compare_chain("<", args, Ordering::Less)
}

fn gt_op(args: &[Value], _env: &Env) -> EvalResult<Value> {
    compare_chain(">", args, Ordering::Greater)
}

fn eq_op(args: &[Value], _env: &Env) -> EvalResult<Value> {
    Ok(Value::Bool(
        args.windows(2).all(|pair| values_equal(&pair[0], &pair[1])),
    ))
}

// ---- 連結・述語・変換 ----

fn concat_op(args: &[Value], _env: &Env) -> EvalResult<Value> {
    if args.iter().all(|a| matches!(a, Value::List(_))) {
        let parts: Vec<ListItem> = args
            .iter()
            .filter_map(|a| a.as_list().map(|xs| ListItem::Seq(xs.to_vec())))
            .collect();
        return Ok(Value::list_from(parts));
    }
    if args.iter().all(|a| matches!(a, Value::Text(_))) {
        let mut chars = Vec::new();
        for a in args {
            if let Value::Text(cs) = a {
                chars.extend(cs.iter().copied());
            }
        }
        return Ok(Value::Text(chars));
    }
    Err(EvalError::type_mismatch(
        "EVAL051",
        "Can't concatenate values. Please use + instead",
    ))
}

fn all_of(args: &[Value], pred: impl Fn(&Value) -> bool) -> EvalResult<Value> {
    Ok(Value::Bool(args.iter().all(pred)))
}

fn is_bool(args: &[Value], _env: &Env) -> EvalResult<Value> {
    all_of(args, |v| matches!(v, Value::Bool(_)))
}

fn is_fixnum(args: &[Value], _env: &Env) -> EvalResult<Value> {
    all_of(args, |v| matches!(v, Value::Int(_)))
}

fn is_double(args: &[Value], _env: &Env) -> EvalResult<Value> {
    all_of(args, |v| matches!(v, Value::Double(_)))
}

fn is_str(args: &[Value], _env: &Env) -> EvalResult<Value> {
    all_of(args, |v| matches!(v, Value::Text(_)))
}

fn is_sym(args: &[Value], _env: &Env) -> EvalResult<Value> {
    all_of(args, |v| matches!(v, Value::Symbol(_)))
}

fn is_bound(args: &[Value], env: &Env) -> EvalResult<Value> {
    all_of(args, |v| match v {
        Value::Symbol(name) | Value::Char(name) => env.is_bound(name),
        Value::Text(chars) => env.is_bound(&chars.iter().collect::<String>()),
        _ => false,
    })
}

/// リスト以外の引数の文字列表現を連結する。リストがあれば `target` への変換失敗。
fn concat_raw(args: &[Value], target: &str) -> EvalResult<String> {
    let mut out = String::new();
    for a in args {
        let Some(s) = a.raw_text() else {
            return Err(EvalError::type_mismatch(
                "EVAL052",
                format!("Can't cast List to {}", target),
            ));
        };
        out.push_str(&s);
    }
    Ok(out)
}

fn to_str(args: &[Value], _env: &Env) -> EvalResult<Value> {
    Ok(Value::text(&concat_raw(args, "String")?))
}

fn to_sym(args: &[Value], _env: &Env) -> EvalResult<Value> {
    Ok(Value::Symbol(concat_raw(args, "Symbol")?))
}

// ---- リスト操作 ----

fn cons(args: &[Value], _env: &Env) -> EvalResult<Value> {
    let Some((first, rest)) = args.split_first() else {
        return Err(EvalError::application(
            "EVAL040",
            "cons: expected at least 1 argument(s) but got 0",
        ));
    };
    if rest.iter().all(|r| matches!(r, Value::List(_))) {
        let mut parts = vec![ListItem::One(first.clone())];
        parts.extend(
            rest.iter()
                .filter_map(|r| r.as_list().map(|xs| ListItem::Seq(xs.to_vec()))),
        );
        return Ok(Value::list_from(parts));
    }
    if rest.iter().all(|r| matches!(r, Value::Text(_))) {
        let prefix = concat_raw(std::slice::from_ref(first), "String")?;
        let mut chars: Vec<char> = prefix.chars().collect();
        for r in rest {
            if let Value::Text(cs) = r {
                chars.extend(cs.iter().copied());
            }
        }
        return Ok(Value::Text(chars));
    }
    Ok(Value::List(args.to_vec()))
}

fn head(args: &[Value], _env: &Env) -> EvalResult<Value> {
    expect_arity("head", args, 1)?;
    Ok(args[0].car().cloned().unwrap_or(Value::Nil))
}

fn tail(args: &[Value], _env: &Env) -> EvalResult<Value> {
    expect_arity("tail", args, 1)?;
    match &args[0] {
        list @ Value::List(_) => Ok(Value::List(list.cdr().to_vec())),
        _ => Ok(Value::Nil),
    }
}

fn list(args: &[Value], _env: &Env) -> EvalResult<Value> {
    Ok(Value::List(args.to_vec()))
}

/// 先頭要素をリストの前に付け足す。準引用の展開結果が実行時に使う。
fn join(args: &[Value], _env: &Env) -> EvalResult<Value> {
    expect_arity("join", args, 2)?;
    let rest = match &args[1] {
        Value::List(items) => ListItem::Seq(items.clone()),
        other => ListItem::One(other.clone()),
    };
    Ok(Value::list_from(vec![ListItem::One(args[0].clone()), rest]))
}

// ---- 即時呼び出しコマンド ----

fn newline_cmd(_args: &[Value], _env: &Env) -> EvalResult<Value> {
    emit_line("");
    Ok(Value::Nil)
}

fn globals_cmd(_args: &[Value], env: &Env) -> EvalResult<Value> {
    emit_line(&env.root().names().join(" "));
    Ok(Value::Nil)
}
