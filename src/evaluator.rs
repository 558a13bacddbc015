// パス: src/evaluator.rs
// 役割: 展開済みフォームを環境に対して評価し、手続きを適用する
// 意図: 特殊形式の意味と関数適用の規則を一箇所にまとめる
// 関連ファイル: src/expander.rs, src/primitives.rs, src/runtime.rs
//! 評価器（evaluator）
//!
//! 目的:
//! - 展開済みの値の木を、レキシカルスコープの環境に対して評価する木巡回インタプリタ。
//!
//! 仕様要点:
//! - 数値・真偽値・文字列は自己評価。シンボルは環境参照。
//! - `#:name` マーカーは環境から引いた手続きを引数なしで即時に呼ぶ。
//! - `bind` は名前が祖先のどこかで束縛済みなら失敗する（子スコープでの隠蔽も不可）。
//! - クロージャ適用は捕捉環境を親とする新しいフレームで本体を評価する。
//! - 末尾呼び出し最適化はない。深い再帰はホストのスタックを使い切る。

use crate::errors::{EvalError, EvalResult};
use crate::primitives::{special_form, SpecialForm};
use crate::runtime::{Closure, Env, Value};
use std::rc::Rc;

/// 1 つのフォームを評価する。
///
/// # Examples
/// ```
/// let env = warp::primitives::initial_env();
/// let form = warp::parser::read("(+ 1 2)").unwrap();
/// assert_eq!(warp::evaluator::evaluate(&form, &env).unwrap().to_string(), "3");
/// ```
pub fn evaluate(form: &Value, env: &Env) -> EvalResult<Value> {
    match form {
        Value::Int(_)
        | Value::Double(_)
        | Value::Bool(_)
        | Value::Text(_)
        | Value::Nil
        | Value::Closure(_)
        | Value::Native(_) => Ok(form.clone()),
        Value::Char(name) => {
            let command = env.find(name)?;
            apply(&command, &[], env)
        }
        Value::Symbol(name) => env.find(name),
        Value::List(items) => eval_list(form, items, env),
    }
}

fn eval_list(form: &Value, items: &[Value], env: &Env) -> EvalResult<Value> {
    let Some((head, rest)) = items.split_first() else {
        return Err(unknown_expression(form));
    };
    if let Value::Symbol(name) = head {
        if let Some(kind) = special_form(name) {
            return eval_special(kind, rest, env);
        }
        let f = env.find(name)?;
        let args = eval_args(rest, env)?;
        return apply(&f, &args, env);
    }
    let f = evaluate(head, env)?;
    if !f.is_callable() {
        return Err(unknown_expression(form));
    }
    let args = eval_args(rest, env)?;
    apply(&f, &args, env)
}

fn unknown_expression(form: &Value) -> EvalError {
    EvalError::application(
        "EVAL030",
        format!("Cannot evaluate unknown expression: {}", form),
    )
}

fn eval_args(forms: &[Value], env: &Env) -> EvalResult<Vec<Value>> {
    forms.iter().map(|f| evaluate(f, env)).collect()
}

fn eval_special(kind: SpecialForm, rest: &[Value], env: &Env) -> EvalResult<Value> {
    match kind {
        SpecialForm::Quote => match rest {
            [quoted] => Ok(quoted.clone()),
            _ => Err(arity_error("quote", "exactly one operand")),
        },
        SpecialForm::Bind => eval_bind(rest, env),
        SpecialForm::If => match rest {
            [test, success, error] => {
                if evaluate(test, env)?.truthy() {
                    evaluate(success, env)
                } else {
                    evaluate(error, env)
                }
            }
            _ => Err(arity_error("if", "a test, a success branch and an error branch")),
        },
        SpecialForm::Fn => eval_fn(rest, env),
        SpecialForm::Do => {
            let mut last = Value::Nil;
            for form in rest {
                last = evaluate(form, env)?;
            }
            Ok(last)
        }
        SpecialForm::Defmacro
        | SpecialForm::Quasiquote
        | SpecialForm::Unquote
        | SpecialForm::UnquoteSplicing => Err(EvalError::syntax(
            "EVAL002",
            format!("{} must be macro-expanded before evaluation", special_name(kind)),
        )),
    }
}

fn special_name(kind: SpecialForm) -> &'static str {
    match kind {
        SpecialForm::Quote => "quote",
        SpecialForm::Bind => "bind",
        SpecialForm::If => "if",
        SpecialForm::Fn => "fn",
        SpecialForm::Do => "do",
        SpecialForm::Defmacro => "defmacro",
        SpecialForm::Quasiquote => "quasiquote",
        SpecialForm::Unquote => "unquote",
        SpecialForm::UnquoteSplicing => "unquote-splicing",
    }
}

fn arity_error(form: &str, expected: &str) -> EvalError {
    EvalError::syntax("EVAL001", format!("{} expects {}", form, expected))
}

/// `bind` の名前位置を解決する。リストなら評価した結果を名前として使う。
fn binding_name(name_form: &Value, env: &Env) -> EvalResult<String> {
    let resolved = match name_form {
        Value::List(_) => evaluate(name_form, env)?,
        other => other.clone(),
    };
    match resolved {
        Value::Symbol(name) | Value::Char(name) => Ok(name),
        Value::Text(chars) => Ok(chars.into_iter().collect()),
        other => Err(EvalError::type_mismatch(
            "EVAL053",
            format!("bind: cannot use `{}` ({}) as a name", other.typename(), other),
        )),
    }
}

fn eval_bind(rest: &[Value], env: &Env) -> EvalResult<Value> {
    let [name_form, value_form] = rest else {
        return Err(arity_error("bind", "a name and a value"));
    };
    let name = binding_name(name_form, env)?;
    if env.is_bound(&name) {
        return Err(EvalError::binding("EVAL011", "Var already bound"));
    }
    let value = evaluate(value_form, env)?;
    env.bind(name, value.clone())?;
    Ok(value)
}

fn eval_fn(rest: &[Value], env: &Env) -> EvalResult<Value> {
    let Some((params_form, body_forms)) = rest.split_first() else {
        return Err(arity_error("fn", "a parameter list and a body"));
    };
    let params = parameter_names(params_form, "EVAL003")?;
    let body = match body_forms {
        [] => return Err(arity_error("fn", "a parameter list and a body")),
        [single] => single.clone(),
        many => implicit_do(many),
    };
    Ok(Value::Closure(Rc::new(Closure {
        params,
        body,
        env: env.clone(),
    })))
}

/// 複数の本体フォームを `(do ...)` で包む。
pub(crate) fn implicit_do(forms: &[Value]) -> Value {
    let mut items = Vec::with_capacity(forms.len() + 1);
    items.push(Value::symbol("do"));
    items.extend(forms.iter().cloned());
    Value::List(items)
}

/// 仮引数リストを検証し、名前の並びを返す。すべてシンボルで重複なし。
pub(crate) fn parameter_names(params_form: &Value, code: &'static str) -> EvalResult<Vec<String>> {
    let Value::List(items) = params_form else {
        return Err(EvalError::syntax(
            code,
            format!("fn: parameters must be a list, got {}", params_form),
        ));
    };
    let mut names: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let Value::Symbol(name) = item else {
            return Err(EvalError::syntax(
                code,
                format!("fn: parameter {} is not a symbol", item),
            ));
        };
        if names.contains(name) {
            return Err(EvalError::syntax(
                code,
                format!("fn: duplicate parameter {}", name),
            ));
        }
        names.push(name.clone());
    }
    Ok(names)
}

/// 手続きを評価済み引数へ適用する。
///
/// クロージャの仮引数と引数は位置で対応させ、余った引数は捨て、足りない仮引数は `nil` とする。
pub fn apply(f: &Value, args: &[Value], env: &Env) -> EvalResult<Value> {
    match f {
        Value::Native(native) => native.call(args, env),
        Value::Closure(closure) => {
            let frame = closure.env.child();
            for (i, param) in closure.params.iter().enumerate() {
                let arg = args.get(i).cloned().unwrap_or(Value::Nil);
                frame.bind(param.clone(), arg)?;
            }
            evaluate(&closure.body, &frame)
        }
        other => Err(EvalError::application(
            "EVAL020",
            format!("`{}` ({}) is not a function", other.typename(), other),
        )),
    }
}
