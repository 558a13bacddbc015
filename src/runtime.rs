// パス: src/runtime.rs
// 役割: 実行時の値表現と、親へ連鎖する束縛環境を提供する
// 意図: リーダ・展開器・評価器・プリミティブが同じ値モデルを共有する
// 関連ファイル: src/evaluator.rs, src/primitives.rs, src/expander.rs
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::rc::{Rc, Weak};

use crate::errors::{EvalError, EvalResult};

thread_local! {
    static OUTPUT_CAPTURE: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// 束縛環境のハンドル。複数の子フレームやクロージャから共有される。
#[derive(Clone)]
pub struct Env {
    inner: Rc<EnvFrame>,
}

struct EnvFrame {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<EnvFrame>>,
    // 同じルートから派生した全フレーム。teardown がここから循環を断つ
    frames: Rc<FrameRegistry>,
}

impl EnvFrame {
    fn root(map: HashMap<String, Value>) -> Self {
        Self {
            bindings: RefCell::new(map),
            parent: None,
            frames: Rc::new(FrameRegistry::default()),
        }
    }

    fn child(parent: Rc<EnvFrame>) -> Self {
        Self {
            bindings: RefCell::new(HashMap::new()),
            frames: Rc::clone(&parent.frames),
            parent: Some(parent),
        }
    }
}

/// 子フレームへの弱参照の一覧。
///
/// 関数本体で束縛したクロージャは呼び出しフレームと循環するため、
/// ルートの束縛を消すだけでは解放されない。
#[derive(Default)]
struct FrameRegistry {
    frames: RefCell<Vec<Weak<EnvFrame>>>,
}

impl FrameRegistry {
    const PRUNE_FROM: usize = 64;

    fn register(&self, frame: &Rc<EnvFrame>) {
        let mut frames = self.frames.borrow_mut();
        if frames.len() >= Self::PRUNE_FROM && frames.len().is_power_of_two() {
            frames.retain(|w| w.strong_count() > 0);
        }
        frames.push(Rc::downgrade(frame));
    }

    fn live(&self) -> Vec<Rc<EnvFrame>> {
        self.frames.borrow().iter().filter_map(Weak::upgrade).collect()
    }

    fn clear(&self) {
        self.frames.borrow_mut().clear();
    }
}

fn lookup_binding(frame: &Rc<EnvFrame>, key: &str) -> Option<Value> {
    if let Some(value) = frame.bindings.borrow().get(key) {
        return Some(value.clone());
    }
    frame
        .parent
        .as_ref()
        .and_then(|parent| lookup_binding(parent, key))
}

impl Env {
    /// 空のルート環境を生成する。
    pub fn new() -> Self {
        Self::from_map(HashMap::new())
    }

    /// 既存のマップからルート環境を生成する。
    pub fn from_map(map: HashMap<String, Value>) -> Self {
        Self {
            inner: Rc::new(EnvFrame::root(map)),
        }
    }

    /// この環境を親とする空の子フレームを返す。
    pub fn child(&self) -> Self {
        let inner = Rc::new(EnvFrame::child(Rc::clone(&self.inner)));
        inner.frames.register(&inner);
        Self { inner }
    }

    /// 祖先を辿って名前を探す。見つからなければ `None`。
    pub fn lookup(&self, name: &str) -> Option<Value> {
        lookup_binding(&self.inner, name)
    }

    /// 祖先を辿って名前を探す。見つからなければ未束縛変数エラー。
    pub fn find(&self, name: &str) -> EvalResult<Value> {
        self.lookup(name).ok_or_else(|| {
            EvalError::binding("EVAL010", format!("Cannot find var in ENV: {}", name))
        })
    }

    /// 名前が祖先のどこかで束縛済みかどうか。
    pub fn is_bound(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// 現在のフレームへ新しい名前を追加する。
    ///
    /// 既存の束縛を置き換えることはない。祖先での束縛確認は呼び出し側
    /// （`bind` 特殊形式）の責務。
    pub fn bind(&self, name: impl Into<String>, value: Value) -> EvalResult<()> {
        let name = name.into();
        let mut bindings = self.inner.bindings.borrow_mut();
        if bindings.contains_key(&name) {
            return Err(EvalError::binding("EVAL011", "Var already bound"));
        }
        bindings.insert(name, value);
        Ok(())
    }

    /// このフレームで束縛されている名前を昇順で返す（祖先は含まない）。
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.bindings.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// ルートから数えたフレームの深さ（ルートは 1）。
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut frame = &self.inner;
        while let Some(parent) = &frame.parent {
            depth += 1;
            frame = parent;
        }
        depth
    }

    /// 祖先を辿った先のルートフレーム。
    pub fn root(&self) -> Env {
        let mut frame = &self.inner;
        while let Some(parent) = &frame.parent {
            frame = parent;
        }
        Env {
            inner: Rc::clone(frame),
        }
    }

    /// 環境を破棄する前に全束縛を明示的に解放し、クロージャとの `Rc` 循環を断つ。
    ///
    /// 自分のフレームに加えて、同じルートから作られたまだ生きている子フレームもすべて空にする。
    /// セッションを継続利用する場合は呼び出さないこと。
    pub fn teardown(&self) {
        let live = self.inner.frames.live();
        self.inner.frames.clear();
        // 借用を返してから値を落とす
        for frame in live.iter().chain(std::iter::once(&self.inner)) {
            let bindings = std::mem::take(&mut *frame.bindings.borrow_mut());
            drop(bindings);
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Env {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("depth", &self.depth())
            .field("names", &self.names())
            .finish()
    }
}

/// ネイティブ関数の実体。評価済み引数と呼び出し元の環境を受け取る。
pub type NativeFn = fn(&[Value], &Env) -> EvalResult<Value>;

#[derive(Clone, Copy)]
pub struct Native {
    pub name: &'static str,
    pub f: NativeFn,
}

impl Native {
    pub fn call(&self, args: &[Value], env: &Env) -> EvalResult<Value> {
        (self.f)(args, env)
    }
}

impl Debug for Native {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Native({})", self.name)
    }
}

/// 利用者定義の手続き。定義時の環境を参照で捕捉する。
pub struct Closure {
    pub params: Vec<String>,
    pub body: Value,
    pub env: Env,
}

impl Debug for Closure {
    // 捕捉環境は自身を含みうるので表示しない
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.params)
            .field("body", &self.body)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    Int(i64),
    Double(f64),
    Bool(bool),
    /// `#:name` 形式の即時呼び出しマーカー。
    Char(String),
    /// 1 文字ずつの並びとして保持する文字列。
    Text(Vec<char>),
    Symbol(String),
    List(Vec<Value>),
    Closure(Rc<Closure>),
    Native(Native),
    /// 値が存在しないことを表す。
    Nil,
}

/// リスト構築時の要素。`Seq` は 1 段だけ平坦化されて展開される。
#[derive(Clone, Debug)]
pub enum ListItem {
    One(Value),
    Seq(Vec<Value>),
}

impl From<Value> for ListItem {
    fn from(value: Value) -> Self {
        ListItem::One(value)
    }
}

impl From<Vec<Value>> for ListItem {
    fn from(values: Vec<Value>) -> Self {
        ListItem::Seq(values)
    }
}

impl Value {
    /// 入れ子の並びを 1 段平坦化してリストを構築する。
    ///
    /// # Examples
    /// ```
    /// use warp::runtime::{ListItem, Value};
    /// let v = Value::list_from(vec![
    ///     ListItem::Seq(vec![Value::Int(1), Value::Int(2)]),
    ///     ListItem::One(Value::Int(3)),
    /// ]);
    /// assert_eq!(v.to_string(), "(1 2 3)");
    /// ```
    pub fn list_from<I, T>(parts: I) -> Value
    where
        I: IntoIterator<Item = T>,
        T: Into<ListItem>,
    {
        let mut items = Vec::new();
        for part in parts {
            match part.into() {
                ListItem::One(v) => items.push(v),
                ListItem::Seq(vs) => items.extend(vs),
            }
        }
        Value::List(items)
    }

    pub fn text(s: &str) -> Value {
        Value::Text(s.chars().collect())
    }

    pub fn symbol(name: impl Into<String>) -> Value {
        Value::Symbol(name.into())
    }

    pub fn empty_list() -> Value {
        Value::List(Vec::new())
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// リストの先頭要素。
    pub fn car(&self) -> Option<&Value> {
        self.as_list().and_then(|items| items.first())
    }

    /// リストの残り。長さ 1 以下なら空スライス。
    pub fn cdr(&self) -> &[Value] {
        match self.as_list() {
            Some(items) if !items.is_empty() => &items[1..],
            _ => &[],
        }
    }

    /// 真偽判定。`false`、空リスト、`nil` のみ偽。
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::List(items) => !items.is_empty(),
            Value::Nil => false,
            _ => true,
        }
    }

    /// 引用符なしの文字列表現。リストは `None`。
    pub fn raw_text(&self) -> Option<String> {
        match self {
            Value::Text(chars) => Some(chars.iter().collect()),
            Value::List(_) => None,
            other => Some(other.to_string()),
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Closure(_) | Value::Native(_))
    }

    pub fn typename(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Double(_) => "real",
            Value::Bool(_) => "boolean",
            Value::Char(_) => "marker",
            Value::Text(_) => "text",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Closure(_) => "function",
            Value::Native(_) => "builtin",
            Value::Nil => "nil",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => a.name == b.name,
            (Value::Nil, Value::Nil) => true,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Double(d) => write_real(f, *d),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Char(name) => write!(f, "{}", name),
            Value::Text(chars) => {
                write!(f, "\"")?;
                for c in chars {
                    write!(f, "{}", c)?;
                }
                write!(f, "\"")
            }
            Value::Symbol(name) => write!(f, "{}", name),
            Value::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::Closure(_) => write!(f, "function"),
            Value::Native(n) => write!(f, "#<builtin {}>", n.name),
            Value::Nil => write!(f, "nil"),
        }
    }
}

/// 実数を指数表記なしで書く。リーダの実数文法に指数形がないため、
/// 有限値は必ず小数点を含む形で出し、`NaN` と `inf` はそのまま書く。
fn write_real(f: &mut Formatter<'_>, d: f64) -> fmt::Result {
    if !d.is_finite() {
        return write!(f, "{}", d);
    }
    let text = d.to_string();
    if text.contains('.') {
        f.write_str(&text)
    } else {
        write!(f, "{}.0", text)
    }
}

/// 副作用コマンドの出力先。キャプチャ中ならバッファへ、そうでなければ標準出力へ。
pub(crate) fn emit_line(text: &str) {
    let intercepted = OUTPUT_CAPTURE.with(|slot| {
        let mut guard = slot.borrow_mut();
        if let Some(buffer) = guard.as_mut() {
            buffer.push(text.to_string());
            true
        } else {
            false
        }
    });
    if !intercepted {
        println!("{}", text);
    }
}

/// `action` 実行中に `emit_line` された行を集めて返す。入れ子のキャプチャは不可。
pub fn capture_output<F, R>(action: F) -> (R, Vec<String>)
where
    F: FnOnce() -> R,
{
    OUTPUT_CAPTURE.with(|slot| {
        let mut guard = slot.borrow_mut();
        assert!(guard.is_none(), "capture_output: nested capture not supported");
        *guard = Some(Vec::new());
    });
    let result = action();
    let lines = OUTPUT_CAPTURE.with(|slot| slot.borrow_mut().take().unwrap_or_default());
    (result, lines)
}
