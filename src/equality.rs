//! Deep structural equality and hashing for route identity
//!
//! Routes are identified by their concrete type plus a list of [`PropValue`]s. Two
//! prop lists are equal when they are structurally equal:
//!
//! - numbers compare by numeric value regardless of representation (`3 == 3.0`)
//! - `NaN` is never equal to anything, itself included
//! - sets and maps compare independently of insertion order; sets holding duplicate
//!   entries compare as multisets, so `{1, 1, 2}` differs from `{1, 2, 2}`
//! - lists compare positionally and must have equal length
//! - [`PropValue::Custom`] values delegate to their own [`CustomProp`] equality
//!
//! [`deep_hash`] is consistent with [`deep_equals`]: equal values hash identically.
//! Sets and maps combine element hashes with a commutative fold so the order of
//! insertion does not leak into the hash.

use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A value object that participates in route identity.
///
/// Implement this for application types that are stored as route props and cannot be
/// expressed with the built-in [`PropValue`] variants.
pub trait CustomProp: fmt::Debug {
    /// Equality against another custom prop (usually a downcast + `==`).
    fn prop_eq(&self, other: &dyn CustomProp) -> bool;

    /// Hash consistent with [`CustomProp::prop_eq`].
    fn prop_hash(&self) -> u64;

    /// Access to the concrete type for downcasting in `prop_eq`.
    fn as_any(&self) -> &dyn Any;
}

/// Blanket implementation for plain `Eq + Hash` value types.
impl<T> CustomProp for T
where
    T: PartialEq + Hash + fmt::Debug + 'static,
{
    fn prop_eq(&self, other: &dyn CustomProp) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map(|other| self == other)
            .unwrap_or(false)
    }

    fn prop_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        std::any::TypeId::of::<T>().hash(&mut hasher);
        self.hash(&mut hasher);
        hasher.finish()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A structurally comparable value used as route identity.
#[derive(Clone)]
pub enum PropValue {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Integer number
    Int(i64),
    /// Floating point number (compares equal to an `Int` of the same value)
    Float(f64),
    /// String
    Str(String),
    /// Ordered sequence (positional comparison)
    List(Vec<PropValue>),
    /// Unordered collection (order-independent comparison)
    ///
    /// Duplicates are counted: each element must be matched by a distinct element of
    /// the other side, which keeps equality in line with the summed element hashes.
    Set(Vec<PropValue>),
    /// Unordered key/value collection (order-independent comparison)
    Map(Vec<(PropValue, PropValue)>),
    /// Application value object
    Custom(Rc<dyn CustomProp>),
}

impl PropValue {
    /// Wrap an application value object.
    pub fn custom<T: CustomProp + 'static>(value: T) -> Self {
        PropValue::Custom(Rc::new(value))
    }

    /// Borrow the string content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropValue::Int(i) => Some(*i as f64),
            PropValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => write!(f, "null"),
            PropValue::Bool(b) => write!(f, "{b}"),
            PropValue::Int(i) => write!(f, "{i}"),
            PropValue::Float(x) => write!(f, "{x:?}"),
            PropValue::Str(s) => write!(f, "{s:?}"),
            PropValue::List(items) => f.debug_list().entries(items).finish(),
            PropValue::Set(items) => f.debug_set().entries(items).finish(),
            PropValue::Map(entries) => f
                .debug_map()
                .entries(entries.iter().map(|(k, v)| (k, v)))
                .finish(),
            PropValue::Custom(value) => fmt::Debug::fmt(value.as_ref(), f),
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        deep_equals(self, other)
    }
}

impl Hash for PropValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(deep_hash(self));
    }
}

/// Structural equality over nested prop values.
pub fn deep_equals(a: &PropValue, b: &PropValue) -> bool {
    use PropValue::*;

    match (a, b) {
        (Null, Null) => true,
        (Bool(x), Bool(y)) => x == y,
        (Int(x), Int(y)) => x == y,
        (Float(x), Float(y)) => x == y,
        (Int(i), Float(f)) | (Float(f), Int(i)) => int_equals_float(*i, *f),
        (Str(x), Str(y)) => x == y,
        (List(xs), List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equals(x, y))
        }
        (Set(xs), Set(ys)) => unordered_equals(xs, ys, deep_equals),
        (Map(xs), Map(ys)) => unordered_equals(xs, ys, |(ka, va), (kb, vb)| {
            deep_equals(ka, kb) && deep_equals(va, vb)
        }),
        (Custom(x), Custom(y)) => x.prop_eq(y.as_ref()),
        _ => false,
    }
}

/// Structural equality over two prop lists.
pub fn deep_equals_list(a: &[PropValue], b: &[PropValue]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_equals(x, y))
}

/// Hash consistent with [`deep_equals`].
pub fn deep_hash(value: &PropValue) -> u64 {
    let mut hasher = DefaultHasher::new();
    hash_into(value, &mut hasher);
    hasher.finish()
}

/// Hash of a prop list (order-sensitive).
pub fn deep_hash_list(values: &[PropValue]) -> u64 {
    let mut hasher = DefaultHasher::new();
    values.len().hash(&mut hasher);
    for value in values {
        hash_into(value, &mut hasher);
    }
    hasher.finish()
}

fn hash_into<H: Hasher>(value: &PropValue, state: &mut H) {
    match value {
        PropValue::Null => 0u8.hash(state),
        PropValue::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        PropValue::Int(i) => hash_number(*i as f64, Some(*i), state),
        PropValue::Float(f) => hash_number(*f, None, state),
        PropValue::Str(s) => {
            3u8.hash(state);
            s.hash(state);
        }
        PropValue::List(items) => {
            4u8.hash(state);
            items.len().hash(state);
            for item in items {
                hash_into(item, state);
            }
        }
        PropValue::Set(items) => {
            5u8.hash(state);
            items.len().hash(state);
            let combined = items.iter().fold(0u64, |acc, item| {
                acc.wrapping_add(deep_hash(item))
            });
            combined.hash(state);
        }
        PropValue::Map(entries) => {
            6u8.hash(state);
            entries.len().hash(state);
            let combined = entries.iter().fold(0u64, |acc, (k, v)| {
                let mut entry = DefaultHasher::new();
                hash_into(k, &mut entry);
                hash_into(v, &mut entry);
                acc.wrapping_add(entry.finish())
            });
            combined.hash(state);
        }
        PropValue::Custom(value) => {
            7u8.hash(state);
            value.prop_hash().hash(state);
        }
    }
}

/// Integers and integral floats must hash identically.
fn hash_number<H: Hasher>(value: f64, exact: Option<i64>, state: &mut H) {
    2u8.hash(state);
    if let Some(i) = exact {
        i.hash(state);
    } else if value.is_nan() {
        u64::MAX.hash(state);
    } else if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        (value as i64).hash(state);
    } else {
        value.to_bits().hash(state);
    }
}

fn int_equals_float(i: i64, f: f64) -> bool {
    if !f.is_finite() || f.fract() != 0.0 {
        return false;
    }
    if f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return false;
    }
    f as i64 == i
}

/// Multiset comparison: same cardinality and every element of `a` matched by a
/// distinct element of `b`.
fn unordered_equals<T>(a: &[T], b: &[T], eq: impl Fn(&T, &T) -> bool) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    'outer: for x in a {
        for (j, y) in b.iter().enumerate() {
            if !used[j] && eq(x, y) {
                used[j] = true;
                continue 'outer;
            }
        }
        return false;
    }
    true
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for PropValue {
                fn from(value: $ty) -> Self {
                    PropValue::Int(i64::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for PropValue {
    fn from(value: f32) -> Self {
        PropValue::Float(f64::from(value))
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<&String> for PropValue {
    fn from(value: &String) -> Self {
        PropValue::Str(value.clone())
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PropValue::Null)
    }
}

impl<T: Into<PropValue>> From<Vec<T>> for PropValue {
    fn from(value: Vec<T>) -> Self {
        PropValue::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PropValue>> From<HashSet<T>> for PropValue {
    fn from(value: HashSet<T>) -> Self {
        PropValue::Set(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PropValue>> From<BTreeSet<T>> for PropValue {
    fn from(value: BTreeSet<T>) -> Self {
        PropValue::Set(value.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<PropValue>, V: Into<PropValue>> From<HashMap<K, V>> for PropValue {
    fn from(value: HashMap<K, V>) -> Self {
        PropValue::Map(
            value
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<PropValue>, V: Into<PropValue>> From<BTreeMap<K, V>> for PropValue {
    fn from(value: BTreeMap<K, V>) -> Self {
        PropValue::Map(
            value
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
