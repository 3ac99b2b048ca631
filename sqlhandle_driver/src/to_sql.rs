use crate::Value;

/// A Rust value that can be bound to a `?` placeholder.
pub trait ToSql: Send + Sync {
    fn to_value(&self) -> Value;
}

/// The bound values of a statement, in placeholder order.
#[must_use]
pub fn to_values(params: &[&dyn ToSql]) -> Vec<Value> {
    params.iter().map(|param| param.to_value()).collect()
}

impl ToSql for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

macro_rules! copy_to_sql {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl ToSql for $ty {
                fn to_value(&self) -> Value {
                    Value::$variant(*self)
                }
            }
        )+
    };
}

copy_to_sql!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    rust_decimal::Decimal => Decimal,
    chrono::NaiveDate => Date,
    chrono::NaiveTime => Time,
    chrono::NaiveDateTime => DateTime,
);

impl ToSql for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl ToSql for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToSql for [u8] {
    fn to_value(&self) -> Value {
        Value::Bytes(self.to_vec())
    }
}

impl ToSql for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl<T: ToSql> ToSql for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(value) => value.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: ToSql + ?Sized> ToSql for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}
