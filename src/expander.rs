// パス: src/expander.rs
// 役割: 評価前に 1 度だけ木を書き換えるマクロ展開器と準引用の脱糖
// 意図: 特殊形式の形をここで検証し、評価器には展開済みの形だけを渡す
// 関連ファイル: src/evaluator.rs, src/primitives.rs, tests/expander.rs
//! マクロ展開
//!
//! - 特殊形式は、その形が式位置と定める部分だけを展開する（`bind` の名前位置は展開しない）。
//! - `defmacro` は展開時にベース環境で手続きを評価してマクロ表へ登録し、フォーム自体は消える。
//! - 登録済みマクロを頭に持つリストは、未評価の引数でマクロを呼んだ結果をもう一度展開する。
//! - 準引用は実行時の `join` / `++` 呼び出しへ書き換える。

use std::collections::HashMap;

use crate::errors::{EvalError, EvalResult};
use crate::evaluator::{apply, evaluate, implicit_do, parameter_names};
use crate::primitives::{special_form, SpecialForm};
use crate::runtime::{Env, Value};

/// マクロ名から展開手続きへの表。セッションごとに 1 つ持つ。
#[derive(Debug, Default, Clone)]
pub struct MacroTable {
    macros: HashMap<String, Value>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// マクロを登録する。同名の既存マクロは置き換える。
    pub fn define(&mut self, name: impl Into<String>, expander: Value) {
        self.macros.insert(name.into(), expander);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.macros.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// 登録済みのマクロ名（昇順）。
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.macros.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

/// フォームを展開する。`defmacro` のように何も残らない場合は `None`。
///
/// # Examples
/// ```
/// use warp::expander::{expand, MacroTable};
/// let env = warp::primitives::initial_env();
/// let mut macros = MacroTable::new();
/// let form = warp::parser::read("`(1 ,x)").unwrap();
/// let out = expand(&form, &mut macros, &env).unwrap().unwrap();
/// assert_eq!(out.to_string(), "(join (quote 1) (join x (quote ())))");
/// ```
pub fn expand(form: &Value, macros: &mut MacroTable, env: &Env) -> EvalResult<Option<Value>> {
    let Value::List(items) = form else {
        return Ok(Some(form.clone()));
    };
    let Some((head, rest)) = items.split_first() else {
        return Ok(Some(form.clone()));
    };
    if let Value::Symbol(name) = head {
        if let Some(kind) = special_form(name) {
            return expand_special(kind, form, rest, macros, env);
        }
        if let Some(expander) = macros.get(name).cloned() {
            let produced = apply(&expander, rest, env)?;
            return expand(&produced, macros, env);
        }
    }
    Ok(Some(Value::List(expand_all(items, macros, env)?)))
}

/// 必ず式が要る位置の展開。何も残らなければ `nil` で埋める。
fn expand_required(form: &Value, macros: &mut MacroTable, env: &Env) -> EvalResult<Value> {
    Ok(expand(form, macros, env)?.unwrap_or(Value::Nil))
}

/// 各要素を独立に展開し、何も残さなかった要素は取り除く。
fn expand_all(forms: &[Value], macros: &mut MacroTable, env: &Env) -> EvalResult<Vec<Value>> {
    let mut out = Vec::with_capacity(forms.len());
    for form in forms {
        if let Some(expanded) = expand(form, macros, env)? {
            out.push(expanded);
        }
    }
    Ok(out)
}

fn shape_error(form: &str, expected: &str, got: &Value) -> EvalError {
    EvalError::syntax("EXP001", format!("{} expects {}, got {}", form, expected, got))
}

fn expand_special(
    kind: SpecialForm,
    form: &Value,
    rest: &[Value],
    macros: &mut MacroTable,
    env: &Env,
) -> EvalResult<Option<Value>> {
    match kind {
        SpecialForm::Quote => match rest {
            [_] => Ok(Some(form.clone())),
            _ => Err(shape_error("quote", "exactly one operand", form)),
        },
        SpecialForm::If => match rest {
            [test, success, error] => Ok(Some(Value::List(vec![
                Value::symbol("if"),
                expand_required(test, macros, env)?,
                expand_required(success, macros, env)?,
                expand_required(error, macros, env)?,
            ]))),
            _ => Err(shape_error(
                "if",
                "a test, a success branch and an error branch",
                form,
            )),
        },
        SpecialForm::Bind => match rest {
            [name @ (Value::Symbol(_) | Value::List(_)), value] => Ok(Some(Value::List(vec![
                Value::symbol("bind"),
                name.clone(),
                expand_required(value, macros, env)?,
            ]))),
            [name, _] => Err(EvalError::syntax(
                "EXP002",
                format!("bind: name must be a symbol or a computed list, got {}", name),
            )),
            _ => Err(shape_error("bind", "a name and a value", form)),
        },
        SpecialForm::Fn => {
            let [params, body @ ..] = rest else {
                return Err(shape_error("fn", "a parameter list and a body", form));
            };
            if body.is_empty() {
                return Err(shape_error("fn", "a parameter list and a body", form));
            }
            parameter_names(params, "EXP003")?;
            let body = match expand_all(body, macros, env)?.as_slice() {
                [] => Value::Nil,
                [single] => single.clone(),
                many => implicit_do(many),
            };
            Ok(Some(Value::List(vec![Value::symbol("fn"), params.clone(), body])))
        }
        SpecialForm::Do => {
            let mut items = vec![Value::symbol("do")];
            items.extend(expand_all(rest, macros, env)?);
            Ok(Some(Value::List(items)))
        }
        SpecialForm::Defmacro => {
            let [name, body] = rest else {
                return Err(shape_error("defmacro", "a name and a procedure", form));
            };
            let Value::Symbol(name) = name else {
                return Err(EvalError::syntax(
                    "EXP004",
                    format!("defmacro: name must be a symbol, got {}", name),
                ));
            };
            if special_form(name).is_some() {
                return Err(EvalError::syntax(
                    "EXP004",
                    format!("defmacro: cannot redefine special form {}", name),
                ));
            }
            let procedure = evaluate(&expand_required(body, macros, env)?, env)?;
            if !procedure.is_callable() {
                return Err(EvalError::application(
                    "EXP005",
                    format!("defmacro: {} is not a function", procedure),
                ));
            }
            macros.define(name.clone(), procedure);
            Ok(None)
        }
        SpecialForm::Quasiquote => match rest {
            [template] => Ok(Some(expand_quasi(template, macros, env)?)),
            _ => Err(shape_error("quasiquote", "exactly one operand", form)),
        },
        SpecialForm::Unquote | SpecialForm::UnquoteSplicing => Err(EvalError::syntax(
            "EXP006",
            format!("{} outside of a quasiquote template", form),
        )),
    }
}

fn quoted(x: Value) -> Value {
    Value::List(vec![Value::symbol("quote"), x])
}

/// `(name operand)` の形なら operand を返す。
fn marker_operand<'v>(form: &'v Value, name: &str) -> Option<&'v [Value]> {
    match form.as_list() {
        Some([Value::Symbol(head), operands @ ..]) if head == name => Some(operands),
        _ => None,
    }
}

/// 準引用テンプレートを実行時のリスト構築呼び出しへ書き換える。
fn expand_quasi(template: &Value, macros: &mut MacroTable, env: &Env) -> EvalResult<Value> {
    let Value::List(items) = template else {
        return Ok(quoted(template.clone()));
    };
    if items.is_empty() {
        return Ok(quoted(Value::empty_list()));
    }
    if let Some(operands) = marker_operand(template, "unquote") {
        return match operands {
            [operand] => expand_required(operand, macros, env),
            _ => Err(shape_error("unquote", "exactly one operand", template)),
        };
    }
    if marker_operand(template, "unquote-splicing").is_some() {
        return Err(EvalError::syntax(
            "EXP007",
            format!("{} cannot be spliced outside of a list", template),
        ));
    }
    let head = &items[0];
    let tail = expand_quasi(&Value::List(items[1..].to_vec()), macros, env)?;
    if let Some(operands) = marker_operand(head, "unquote-splicing") {
        let [operand] = operands else {
            return Err(shape_error("unquote-splicing", "exactly one operand", head));
        };
        return Ok(Value::List(vec![
            Value::symbol("++"),
            expand_required(operand, macros, env)?,
            tail,
        ]));
    }
    Ok(Value::List(vec![
        Value::symbol("join"),
        expand_quasi(head, macros, env)?,
        tail,
    ]))
}
