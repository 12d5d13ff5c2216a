use std::any::type_name;
use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};
use patchgate_core::{AppError, AppResult};
use serde::{Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

/// Primitive value compared by plain equality.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// `bool`.
    Bool(bool),
    /// `i8`.
    I8(i8),
    /// `i16`.
    I16(i16),
    /// `i32`.
    I32(i32),
    /// `i64`.
    I64(i64),
    /// `isize`.
    Isize(isize),
    /// `u8`.
    U8(u8),
    /// `u16`.
    U16(u16),
    /// `u32`.
    U32(u32),
    /// `u64`.
    U64(u64),
    /// `usize`.
    Usize(usize),
    /// `f32`.
    F32(f32),
    /// `f64`.
    F64(f64),
    /// `String`.
    String(String),
}

impl Scalar {
    /// Returns the name of the Rust type this scalar was taken from.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::I8(_) => "i8",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::Isize(_) => "isize",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::Usize(_) => "usize",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::String(_) => "String",
        }
    }

    fn matches(&self, other: &Self) -> Option<bool> {
        let matched = match (self, other) {
            (Self::Bool(left), Self::Bool(right)) => left == right,
            (Self::I8(left), Self::I8(right)) => left == right,
            (Self::I16(left), Self::I16(right)) => left == right,
            (Self::I32(left), Self::I32(right)) => left == right,
            (Self::I64(left), Self::I64(right)) => left == right,
            (Self::Isize(left), Self::Isize(right)) => left == right,
            (Self::U8(left), Self::U8(right)) => left == right,
            (Self::U16(left), Self::U16(right)) => left == right,
            (Self::U32(left), Self::U32(right)) => left == right,
            (Self::U64(left), Self::U64(right)) => left == right,
            (Self::Usize(left), Self::Usize(right)) => left == right,
            (Self::F32(left), Self::F32(right)) => left == right,
            (Self::F64(left), Self::F64(right)) => left == right,
            (Self::String(left), Self::String(right)) => left == right,
            _ => return None,
        };

        Some(matched)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::I8(value) => serializer.serialize_i8(*value),
            Self::I16(value) => serializer.serialize_i16(*value),
            Self::I32(value) => serializer.serialize_i32(*value),
            Self::I64(value) => serializer.serialize_i64(*value),
            Self::Isize(value) => serializer.serialize_i64(*value as i64),
            Self::U8(value) => serializer.serialize_u8(*value),
            Self::U16(value) => serializer.serialize_u16(*value),
            Self::U32(value) => serializer.serialize_u32(*value),
            Self::U64(value) => serializer.serialize_u64(*value),
            Self::Usize(value) => serializer.serialize_u64(*value as u64),
            Self::F32(value) => serializer.serialize_f32(*value),
            Self::F64(value) => serializer.serialize_f64(*value),
            Self::String(value) => serializer.serialize_str(value),
        }
    }
}

/// Field value tagged with the strategy used to compare it.
///
/// Strategies are tried in this order: scalars, optionals, sequences,
/// serialized values and display values. Values of different strategies or
/// different runtime types never compare; they produce a [`TypeMismatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Primitive compared by value.
    Scalar(Scalar),
    /// Optional value compared by its contents; two absent values are equal.
    Optional {
        /// Rust type of the optional.
        type_name: &'static str,
        /// Contained value, if any.
        value: Option<Box<FieldValue>>,
    },
    /// Homogeneous sequence compared element-wise.
    Sequence {
        /// Rust type of the sequence.
        type_name: &'static str,
        /// Elements in order.
        items: Vec<FieldValue>,
    },
    /// Value compared by its canonical serialized bytes.
    Serialized {
        /// Rust type of the value.
        type_name: &'static str,
        /// Canonical serialized form.
        value: Value,
    },
    /// Value compared by its display string.
    Display {
        /// Rust type of the value.
        type_name: &'static str,
        /// Rendered string.
        text: String,
    },
}

/// Incomparable pair of values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    /// Runtime type of the left-hand value.
    pub old_type: String,
    /// Runtime type of the right-hand value.
    pub new_type: String,
}

impl TypeMismatch {
    /// Converts the mismatch into an error attributed to `field`.
    #[must_use]
    pub fn into_error(self, field: &str) -> AppError {
        AppError::TypeMismatch {
            field: field.to_owned(),
            old_type: self.old_type,
            new_type: self.new_type,
        }
    }
}

impl FieldValue {
    /// Wraps any serializable value, compared by its serialized form.
    pub fn serialized<T: Serialize + ?Sized>(value: &T) -> AppResult<Self> {
        let value = serde_json::to_value(value).map_err(|error| {
            AppError::Internal(format!(
                "failed to serialize {} for comparison: {error}",
                type_name::<T>()
            ))
        })?;

        Ok(Self::Serialized {
            type_name: type_name::<T>(),
            value,
        })
    }

    /// Wraps any displayable value, compared by its string form.
    pub fn display<T: Display + ?Sized>(value: &T) -> AppResult<Self> {
        Ok(Self::Display {
            type_name: type_name::<T>(),
            text: value.to_string(),
        })
    }

    /// Returns the name of the runtime type carried by this value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Scalar(scalar) => scalar.type_name(),
            Self::Optional { type_name, .. }
            | Self::Sequence { type_name, .. }
            | Self::Serialized { type_name, .. }
            | Self::Display { type_name, .. } => type_name,
        }
    }

    /// Compares two values under the type-polymorphic equality rule.
    pub fn matches(&self, other: &Self) -> Result<bool, TypeMismatch> {
        let mismatch = || TypeMismatch {
            old_type: self.type_name().to_owned(),
            new_type: other.type_name().to_owned(),
        };

        match (self, other) {
            (Self::Scalar(left), Self::Scalar(right)) => left.matches(right).ok_or_else(mismatch),
            (
                Self::Optional {
                    type_name: left_type,
                    value: left,
                },
                Self::Optional {
                    type_name: right_type,
                    value: right,
                },
            ) if left_type == right_type => match (left, right) {
                (None, None) => Ok(true),
                (Some(left), Some(right)) => left.matches(right),
                _ => Ok(false),
            },
            (
                Self::Sequence {
                    type_name: left_type,
                    items: left,
                },
                Self::Sequence {
                    type_name: right_type,
                    items: right,
                },
            ) if left_type == right_type => {
                if left.len() != right.len() {
                    return Ok(false);
                }
                for (left, right) in left.iter().zip(right) {
                    if !left.matches(right)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (
                Self::Serialized {
                    type_name: left_type,
                    value: left,
                },
                Self::Serialized {
                    type_name: right_type,
                    value: right,
                },
            ) if left_type == right_type => Ok(canonical_bytes(left) == canonical_bytes(right)),
            (
                Self::Display {
                    type_name: left_type,
                    text: left,
                },
                Self::Display {
                    type_name: right_type,
                    text: right,
                },
            ) if left_type == right_type => Ok(left == right),
            _ => Err(mismatch()),
        }
    }
}

fn canonical_bytes(value: &Value) -> Vec<u8> {
    // Serializing a Value cannot fail: map keys are always strings.
    serde_json::to_vec(value).unwrap_or_default()
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(scalar) => scalar.serialize(serializer),
            Self::Optional { value, .. } => match value {
                Some(value) => value.serialize(serializer),
                None => serializer.serialize_none(),
            },
            Self::Sequence { items, .. } => serializer.collect_seq(items),
            Self::Serialized { value, .. } => value.serialize(serializer),
            Self::Display { text, .. } => serializer.serialize_str(text),
        }
    }
}

/// Types that know which comparison strategy applies to them.
///
/// Field types without an implementation can opt into
/// `#[patch(compare = "serialize")]` or `#[patch(compare = "display")]`.
pub trait Comparable {
    /// Captures the value for comparison.
    fn to_field_value(&self) -> AppResult<FieldValue>;
}

macro_rules! impl_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Comparable for $ty {
                fn to_field_value(&self) -> AppResult<FieldValue> {
                    Ok(FieldValue::Scalar(Scalar::$variant(self.clone())))
                }
            }

            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    Self::Scalar(Scalar::$variant(value))
                }
            }
        )*
    };
}

impl_scalar!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    f32 => F32,
    f64 => F64,
    String => String,
);

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Scalar(Scalar::String(value.to_owned()))
    }
}

impl<T: Comparable> Comparable for Option<T> {
    fn to_field_value(&self) -> AppResult<FieldValue> {
        let value = match self {
            Some(value) => Some(Box::new(value.to_field_value()?)),
            None => None,
        };

        Ok(FieldValue::Optional {
            type_name: type_name::<Self>(),
            value,
        })
    }
}

impl<T: Comparable> Comparable for Vec<T> {
    fn to_field_value(&self) -> AppResult<FieldValue> {
        let items = self
            .iter()
            .map(Comparable::to_field_value)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(FieldValue::Sequence {
            type_name: type_name::<Self>(),
            items,
        })
    }
}

impl<T: Comparable + ?Sized> Comparable for Box<T> {
    fn to_field_value(&self) -> AppResult<FieldValue> {
        (**self).to_field_value()
    }
}

impl Comparable for Uuid {
    fn to_field_value(&self) -> AppResult<FieldValue> {
        FieldValue::serialized(self)
    }
}

impl Comparable for DateTime<Utc> {
    fn to_field_value(&self) -> AppResult<FieldValue> {
        FieldValue::serialized(self)
    }
}

impl Comparable for NaiveDate {
    fn to_field_value(&self) -> AppResult<FieldValue> {
        FieldValue::serialized(self)
    }
}

impl Comparable for Value {
    fn to_field_value(&self) -> AppResult<FieldValue> {
        FieldValue::serialized(self)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::{Comparable, FieldValue};

    fn value_of<T: Comparable>(value: T) -> FieldValue {
        value.to_field_value().unwrap_or_else(|_| unreachable!())
    }

    fn matched(left: FieldValue, right: FieldValue) -> Option<bool> {
        left.matches(&right).ok()
    }

    #[test]
    fn scalars_compare_by_value() {
        assert_eq!(matched(value_of(1_i64), value_of(1_i64)), Some(true));
        assert_eq!(matched(value_of(1_i64), value_of(4_i64)), Some(false));
        assert_eq!(matched(value_of(1.5_f32), value_of(1.5_f32)), Some(true));
        assert_eq!(matched(value_of(true), value_of(true)), Some(true));
        assert_eq!(
            matched(value_of("a".to_owned()), value_of("b".to_owned())),
            Some(false)
        );
    }

    #[test]
    fn scalars_of_different_width_do_not_compare() {
        let result = value_of(1_i32).matches(&value_of(1_i64));
        let Err(mismatch) = result else {
            panic!("expected a type mismatch");
        };
        assert_eq!(mismatch.old_type, "i32");
        assert_eq!(mismatch.new_type, "i64");
    }

    #[test]
    fn optionals_treat_two_absent_values_as_equal() {
        assert_eq!(matched(value_of(None::<i64>), value_of(None::<i64>)), Some(true));
        assert_eq!(matched(value_of(Some(1_i64)), value_of(None::<i64>)), Some(false));
        assert_eq!(matched(value_of(Some(1_i64)), value_of(Some(1_i64))), Some(true));
        assert_eq!(matched(value_of(Some(1_i64)), value_of(Some(2_i64))), Some(false));
    }

    #[test]
    fn optionals_of_different_inner_types_do_not_compare() {
        assert!(value_of(None::<i64>).matches(&value_of(None::<u64>)).is_err());
    }

    #[test]
    fn sequences_compare_element_wise() {
        assert_eq!(matched(value_of(vec![1_i64, 5]), value_of(vec![1_i64, 5])), Some(true));
        assert_eq!(matched(value_of(vec![1_i64, 5]), value_of(vec![4_i64, 5])), Some(false));
        assert_eq!(matched(value_of(vec![1_i64, 5]), value_of(vec![1_i64])), Some(false));
        assert_eq!(
            matched(
                value_of(vec![Some(1_i64), None]),
                value_of(vec![Some(1_i64), None])
            ),
            Some(true)
        );
    }

    #[test]
    fn serialized_values_compare_by_bytes() {
        let instant = Utc
            .with_ymd_and_hms(2032, 4, 23, 12, 2, 3)
            .single()
            .unwrap_or_else(|| unreachable!());
        let later = instant + Duration::hours(1);

        assert_eq!(matched(value_of(instant), value_of(instant)), Some(true));
        assert_eq!(matched(value_of(instant), value_of(later)), Some(false));
        assert_eq!(
            matched(value_of(vec![instant, later]), value_of(vec![instant, later])),
            Some(true)
        );

        let id = Uuid::new_v4();
        assert_eq!(matched(value_of(id), value_of(id)), Some(true));
        assert_eq!(matched(value_of(id), value_of(Uuid::new_v4())), Some(false));
    }

    #[test]
    fn display_values_compare_by_text() {
        let left = FieldValue::display(&7_u16).unwrap_or_else(|_| unreachable!());
        let right = FieldValue::display(&7_u16).unwrap_or_else(|_| unreachable!());
        let other = FieldValue::display(&8_u16).unwrap_or_else(|_| unreachable!());

        assert_eq!(left.matches(&right).ok(), Some(true));
        assert_eq!(left.matches(&other).ok(), Some(false));
    }

    #[test]
    fn different_strategies_never_compare() {
        let display = FieldValue::display(&1_i64).unwrap_or_else(|_| unreachable!());
        assert!(display.matches(&value_of(1_i64)).is_err());

        let serialized = FieldValue::serialized(&"1").unwrap_or_else(|_| unreachable!());
        let text = FieldValue::display("1").unwrap_or_else(|_| unreachable!());
        assert!(serialized.matches(&text).is_err());
    }

    #[test]
    fn values_serialize_to_plain_json() {
        let value = value_of(vec![Some(1_i64), None]);
        assert_eq!(
            serde_json::to_value(&value).ok(),
            Some(serde_json::json!([1, null]))
        );
    }
}
