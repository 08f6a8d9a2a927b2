use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::context::TestContext;
use crate::errors::TestError;

/// Insertion-ordered property table of an [`Object`].
pub type Properties = IndexMap<String, Value>;

/// Signature shared by test bodies, fixtures, and catalog predicates.
pub type NativeFn = dyn Fn(&mut TestContext, &[Value]) -> Result<Value, TestError>;

/// A dynamically typed value as seen by assertions and suite scopes.
///
/// Composite values (`Object`, `Function`) are handles: cloning one yields a second
/// reference to the same allocation, and [`Value::identical`] compares them by identity.
///
/// # Examples
///
/// ```rust
/// use tapsuite::value::Value;
/// let n = Value::from(3);
/// assert_eq!(n.type_of(), "number");
/// assert_eq!(n.to_string(), "3");
/// assert!(Value::default().is_undefined());
/// ```
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(Object),
    Function(Callable),
}

impl Value {
    /// Builds an array object from the given elements.
    pub fn array<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::Object(Object::array(items))
    }

    /// Builds a plain object from key/value pairs, keeping their order.
    pub fn object<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let object = Object::new();
        for (key, value) in pairs {
            object.set(key, value);
        }
        Value::Object(object)
    }

    /// The `typeof` name of this value.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for objects and functions.
    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Function(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Truthiness: `false`, `0`, `NaN`, `""`, `null` and `undefined` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// Numeric coercion used by the NaN predicates.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
            Value::Object(_) | Value::Function(_) => f64::NAN,
        }
    }

    pub fn is_nan(&self) -> bool {
        self.to_number().is_nan()
    }

    /// Strict identity: primitives by value (`NaN` is never identical to itself),
    /// composites by reference.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Class-chain membership test. Primitives are never instances of anything.
    pub fn instance_of(&self, class: &str) -> bool {
        match self {
            Value::Object(o) => o.is_instance_of(class),
            Value::Function(_) => class == "Function" || class == "Object",
            _ => false,
        }
    }

    /// Identity of a composite value, used for cycle detection.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Object(o) => Some(o.id()),
            Value::Function(f) => Some(f.id()),
            _ => None,
        }
    }

    /// Canonical string coercion of a primitive value.
    ///
    /// Composites coerce to `[object <Class>]` / `[function <name>]`; the fingerprint
    /// never asks for those.
    pub fn coerce_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Object(o) => format!("[object {}]", o.class_name()),
            Value::Function(f) => format!("[function {}]", f.name()),
        }
    }

    // ------------------------------------------------------------------------
    // Display formatting helpers
    // ------------------------------------------------------------------------

    fn render(&self, f: &mut fmt::Formatter<'_>, path: &mut Vec<usize>, nested: bool) -> fmt::Result {
        match self {
            Value::String(s) if nested => write!(f, "{:?}", s),
            Value::Object(o) => {
                if path.contains(&o.id()) {
                    return write!(f, "[circular]");
                }
                path.push(o.id());
                let entries = o.entries();
                let result = if o.is_array() {
                    Self::render_array(f, &entries, path)
                } else {
                    Self::render_object(f, &entries, path)
                };
                path.pop();
                result
            }
            Value::Function(c) => write!(f, "[Function {}]", c.name()),
            other => write!(f, "{}", other.coerce_string()),
        }
    }

    fn render_array(f: &mut fmt::Formatter<'_>, entries: &[(String, Value)], path: &mut Vec<usize>) -> fmt::Result {
        if entries.is_empty() {
            return write!(f, "[ ]");
        }
        write!(f, "[ ")?;
        for (i, (_, item)) in entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            item.render(f, path, true)?;
        }
        write!(f, " ]")
    }

    fn render_object(f: &mut fmt::Formatter<'_>, entries: &[(String, Value)], path: &mut Vec<usize>) -> fmt::Result {
        if entries.is_empty() {
            return write!(f, "{{ }}");
        }
        write!(f, "{{ ")?;
        for (i, (key, item)) in entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?} : ", key)?;
            item.render(f, path, true)?;
        }
        write!(f, " }}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, &mut Vec::new(), false)
    }
}

/// Formats a number the way the results protocol expects: integers without a
/// fractional part, `NaN`, `Infinity`, and exponent form from `1e21` upwards.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.abs() >= 1e21 {
        let exp = format!("{:e}", n);
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        };
    }
    if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    match trimmed {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // "inf"/"nan" spellings are not numeric literals here
        t if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        t => t.parse().unwrap_or(f64::NAN),
    }
}

// ============================================================================
// OBJECTS
// ============================================================================

#[derive(Debug)]
struct ObjectData {
    class: Vec<String>,
    props: Properties,
}

/// Shared, interior-mutable object handle.
///
/// Suites hand the same scope object to every fixture and test, so writes made in
/// `setUp` are visible to the test body.
#[derive(Clone)]
pub struct Object(Rc<RefCell<ObjectData>>);

impl Object {
    /// A plain object of class `Object`.
    pub fn new() -> Self {
        Self::with_class(["Object"])
    }

    /// An object with an explicit class chain, most derived class first.
    pub fn with_class<I, S>(chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Object(Rc::new(RefCell::new(ObjectData {
            class: chain.into_iter().map(Into::into).collect(),
            props: Properties::new(),
        })))
    }

    /// An `Array` whose own keys are the element indices.
    pub fn array<I: IntoIterator<Item = Value>>(items: I) -> Self {
        let object = Self::with_class(["Array", "Object"]);
        for (i, item) in items.into_iter().enumerate() {
            object.set(i.to_string(), item);
        }
        object
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().props.get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.borrow_mut().props.insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().props.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().props.contains_key(key)
    }

    /// Own keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().props.keys().cloned().collect()
    }

    /// Snapshot of own properties in insertion order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .borrow()
            .props
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().props.is_empty()
    }

    pub fn class_name(&self) -> String {
        self.0
            .borrow()
            .class
            .first()
            .cloned()
            .unwrap_or_else(|| "Object".to_string())
    }

    pub fn is_instance_of(&self, class: &str) -> bool {
        self.0.borrow().class.iter().any(|c| c == class)
    }

    pub fn is_array(&self) -> bool {
        self.0.borrow().class.first().is_some_and(|c| c == "Array")
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", Value::Object(self.clone()))
    }
}

// ============================================================================
// CALLABLES
// ============================================================================

/// A named function value: test bodies, fixtures, helpers, and attached assertions.
#[derive(Clone)]
pub struct Callable {
    name: Rc<str>,
    func: Rc<NativeFn>,
}

impl Callable {
    /// Wraps a function with the full calling convention.
    pub fn new<F>(name: impl AsRef<str>, func: F) -> Self
    where
        F: Fn(&mut TestContext, &[Value]) -> Result<Value, TestError> + 'static,
    {
        Self {
            name: Rc::from(name.as_ref()),
            func: Rc::new(func),
        }
    }

    /// Wraps a test body or fixture that ignores its argument and produces no value.
    pub fn test<F>(name: impl AsRef<str>, func: F) -> Self
    where
        F: Fn(&mut TestContext) -> Result<(), TestError> + 'static,
    {
        Self::new(name, move |ctx, _args| func(ctx).map(|()| Value::Undefined))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
        (self.func)(ctx, args)
    }

    /// Calls the function, converting a panic into a raised [`TestError`].
    pub fn call_guarded(&self, ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.call(ctx, args))) {
            Ok(result) => result,
            Err(payload) => Err(TestError::from_panic(payload.as_ref())),
        }
    }

    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }

    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.func) as *const () as usize
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.name)
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        Value::Function(c)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::array(items.into_iter().map(Value::from)),
            serde_json::Value::Object(map) => Value::object(map.into_iter().map(|(k, v)| (k, Value::from(v)))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_follow_typeof() {
        assert_eq!(Value::Undefined.type_of(), "undefined");
        assert_eq!(Value::Null.type_of(), "object");
        assert_eq!(Value::from(true).type_of(), "boolean");
        assert_eq!(Value::from("x").type_of(), "string");
        assert_eq!(Value::array(vec![]).type_of(), "object");
        let f = Callable::test("helper", |_| Ok(()));
        assert_eq!(Value::from(f).type_of(), "function");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::from(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::object(Vec::<(String, Value)>::new()).is_truthy());
    }

    #[test]
    fn numeric_coercion() {
        assert!(Value::Undefined.is_nan());
        assert!(!Value::Null.is_nan());
        assert!(Value::from("abc").is_nan());
        assert!(!Value::from(" 12 ").is_nan());
        assert!(!Value::from("1e3").is_nan());
        assert!(Value::from("inf").is_nan());
        assert_eq!(Value::from(true).to_number(), 1.0);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(123456789.0), "123456789");
    }

    #[test]
    fn identity_is_by_reference_for_objects() {
        let a = Object::new();
        let b = Object::new();
        assert!(Value::from(a.clone()).identical(&Value::from(a)));
        assert!(!Value::from(b).identical(&Value::from(Object::new())));
        assert!(!Value::from(f64::NAN).identical(&Value::from(f64::NAN)));
        assert!(!Value::from(1).identical(&Value::from("1")));
    }

    #[test]
    fn display_handles_cycles() {
        let o = Object::new();
        o.set("name", Value::from("root"));
        o.set("self", Value::from(o.clone()));
        assert_eq!(Value::from(o).to_string(), r#"{ "name" : "root", "self" : [circular] }"#);
    }

    #[test]
    fn display_arrays_and_strings() {
        let v = Value::array(vec![Value::from(1), Value::from("two"), Value::Null]);
        assert_eq!(v.to_string(), r#"[ 1, "two", null ]"#);
        assert_eq!(Value::from("raw").to_string(), "raw");
    }

    #[test]
    fn converts_json() {
        let json: serde_json::Value = serde_json::json!({"b": [1, 2], "a": null});
        let v = Value::from(json);
        let o = v.as_object().cloned().unwrap_or_default();
        assert_eq!(o.keys(), vec!["b".to_string(), "a".to_string()]);
        assert!(o.get("b").is_some_and(|b| b.as_object().is_some_and(Object::is_array)));
    }

    #[test]
    fn instance_of_consults_class_chain() {
        let err = Value::from(Object::with_class(["TypeError", "Error", "Object"]));
        assert!(err.instance_of("Error"));
        assert!(!err.instance_of("Array"));
        assert!(!Value::from(1).instance_of("Object"));
    }
}
