//! Application values, wire values, and the coercions between them.
//!
//! [`VariableValue`] is what callers hold; [`WireValue`] is the tagged union
//! exchanged with the controller. Decoding never fails (anomalies become an
//! absent value), encoding does.

use crate::errors::{VariableError, VariableResult};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Fractional digits kept when decoding floating wire values.
pub const DECODED_FLOAT_DECIMALS: usize = 6;

/// A scalar application value. Exactly one kind is active.
///
/// An absent value is modelled as `Option::<VariableValue>::None` by the
/// callers, never as a variant.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableValue {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
}

impl VariableValue {
    /// Short kind name, used in logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::I8(_) => "i8",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::String(_) => "string",
        }
    }

    /// Widens any integer kind. `None` for booleans, floats, and text.
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            Self::I8(v) => Some(i128::from(v)),
            Self::I16(v) => Some(i128::from(v)),
            Self::I32(v) => Some(i128::from(v)),
            Self::I64(v) => Some(i128::from(v)),
            Self::U8(v) => Some(i128::from(v)),
            Self::U16(v) => Some(i128::from(v)),
            Self::U32(v) => Some(i128::from(v)),
            Self::U64(v) => Some(i128::from(v)),
            _ => None,
        }
    }

    /// Infers a value from operator input.
    ///
    /// `true`/`false` (any case) become booleans, integer text a 64-bit
    /// integer, decimal text a double, anything else is kept as text.
    pub fn infer(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            return Self::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Self::Bool(false);
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Self::I64(i);
        }
        if let Ok(f) = trimmed.parse::<f64>()
            && f.is_finite()
        {
            return Self::F64(f);
        }
        Self::String(input.to_string())
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            // Debug keeps the trailing ".0" on whole floats.
            Self::F32(v) => write!(f, "{v:?}"),
            Self::F64(v) => write!(f, "{v:?}"),
            Self::String(v) => f.write_str(v),
        }
    }
}

impl From<bool> for VariableValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for VariableValue {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<i64> for VariableValue {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<f64> for VariableValue {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<&str> for VariableValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// The tagged union carried by the data-access protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
}

impl WireValue {
    /// Tag name as it appears on the wire.
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolValue",
            Self::Int8(_) => "int8Value",
            Self::Int16(_) => "int16Value",
            Self::Int32(_) => "int32Value",
            Self::Int64(_) => "int64Value",
            Self::UInt8(_) => "uint8Value",
            Self::UInt16(_) => "uint16Value",
            Self::UInt32(_) => "uint32Value",
            Self::UInt64(_) => "uint64Value",
            Self::Float(_) => "floatValue",
            Self::Double(_) => "doubleValue",
            Self::String(_) => "stringValue",
        }
    }
}

/// A named wire value, the unit of both read replies and write requests.
#[derive(Debug, Clone, PartialEq)]
pub struct DataItem {
    /// The port name as reported (reads) or addressed (writes).
    pub port_name: String,
    /// `None` when the wire carried no tag.
    pub value: Option<WireValue>,
}

impl DataItem {
    pub fn new(port_name: impl Into<String>, value: WireValue) -> Self {
        Self {
            port_name: port_name.into(),
            value: Some(value),
        }
    }
}

/// Caller-supplied hint for how to encode a value on write.
///
/// Parsed case-insensitively from the PLC type names. Unknown names fall
/// back to [`DeclaredType::Auto`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeclaredType {
    #[default]
    Auto,
    Bool,
    Int16,
    Int32,
    UInt16,
    UInt32,
    Float,
    Double,
    String,
}

impl DeclaredType {
    /// Every explicit type plus `Auto`, in the order the console cycles them.
    pub const ALL: [Self; 9] = [
        Self::Auto,
        Self::Bool,
        Self::Int16,
        Self::Int32,
        Self::UInt16,
        Self::UInt32,
        Self::Float,
        Self::Double,
        Self::String,
    ];

    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "BOOL" => Self::Bool,
            "INT" | "INT16" => Self::Int16,
            "DINT" | "INT32" => Self::Int32,
            "UINT" | "UINT16" => Self::UInt16,
            "UDINT" | "UINT32" => Self::UInt32,
            "LREAL" | "DOUBLE" | "FLOAT64" => Self::Double,
            "REAL" | "FLOAT" => Self::Float,
            "STRING" | "WSTRING" => Self::String,
            _ => Self::Auto,
        }
    }

    /// The next type in [`DeclaredType::ALL`], wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl FromStr for DeclaredType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "AUTO",
            Self::Bool => "BOOL",
            Self::Int16 => "INT",
            Self::Int32 => "DINT",
            Self::UInt16 => "UINT",
            Self::UInt32 => "UDINT",
            Self::Float => "REAL",
            Self::Double => "LREAL",
            Self::String => "STRING",
        };
        f.write_str(name)
    }
}

/// Rounds to [`DECODED_FLOAT_DECIMALS`] fractional digits.
///
/// Goes through the exact decimal expansion so that values just below a
/// rounding boundary are not pushed over it by an intermediate multiply.
pub fn round_decoded_float(value: f64) -> VariableResult<f64> {
    if !value.is_finite() {
        return Ok(value);
    }
    format!("{value:.prec$}", prec = DECODED_FLOAT_DECIMALS)
        .parse::<f64>()
        .map_err(|e| VariableError::Decode(format!("cannot round {value}: {e}")))
}

/// Converts a wire value into an application value.
///
/// Integers keep their width, floats of either precision come back as
/// rounded doubles. A missing tag or any anomaly yields `None`.
pub fn decode_value(wire: Option<&WireValue>) -> Option<VariableValue> {
    let wire = wire?;
    let decoded = match wire {
        WireValue::Bool(v) => VariableValue::Bool(*v),
        WireValue::Int8(v) => VariableValue::I8(*v),
        WireValue::Int16(v) => VariableValue::I16(*v),
        WireValue::Int32(v) => VariableValue::I32(*v),
        WireValue::Int64(v) => VariableValue::I64(*v),
        WireValue::UInt8(v) => VariableValue::U8(*v),
        WireValue::UInt16(v) => VariableValue::U16(*v),
        WireValue::UInt32(v) => VariableValue::U32(*v),
        WireValue::UInt64(v) => VariableValue::U64(*v),
        WireValue::Float(v) => match round_decoded_float(f64::from(*v)) {
            Ok(rounded) => VariableValue::F64(rounded),
            Err(e) => {
                tracing::warn!(error = %e, tag = wire.tag(), "Value extraction error");
                return None;
            }
        },
        WireValue::Double(v) => match round_decoded_float(*v) {
            Ok(rounded) => VariableValue::F64(rounded),
            Err(e) => {
                tracing::warn!(error = %e, tag = wire.tag(), "Value extraction error");
                return None;
            }
        },
        WireValue::String(v) => VariableValue::String(v.clone()),
    };
    Some(decoded)
}

/// Converts an application value into a wire value of the declared type.
///
/// With [`DeclaredType::Auto`] the kind is detected from the value itself:
/// boolean first, then integer (as a 32-bit signed), then floating (as a
/// double), then text.
pub fn encode_value(value: &VariableValue, declared: DeclaredType) -> VariableResult<WireValue> {
    let encoded = match declared {
        DeclaredType::Bool => coerce_bool(value).map(WireValue::Bool),
        DeclaredType::Int16 => coerce_int::<i16>(value).map(WireValue::Int16),
        DeclaredType::Int32 => coerce_int::<i32>(value).map(WireValue::Int32),
        DeclaredType::UInt16 => coerce_int::<u16>(value).map(WireValue::UInt16),
        DeclaredType::UInt32 => coerce_int::<u32>(value).map(WireValue::UInt32),
        DeclaredType::Double => coerce_float(value).map(WireValue::Double),
        #[allow(clippy::cast_possible_truncation)]
        DeclaredType::Float => coerce_float(value).map(|f| WireValue::Float(f as f32)),
        DeclaredType::String => Ok(WireValue::String(value.to_string())),
        DeclaredType::Auto => auto_detect(value),
    };

    encoded.map_err(|reason| {
        let err = VariableError::Encode {
            value: value.to_string(),
            declared,
            reason,
        };
        tracing::error!(error = %err, kind = value.kind(), "Type conversion error");
        err
    })
}

fn auto_detect(value: &VariableValue) -> Result<WireValue, String> {
    // Booleans are checked before integers so they never encode as numbers.
    match value {
        VariableValue::Bool(b) => Ok(WireValue::Bool(*b)),
        VariableValue::F32(f) => Ok(WireValue::Double(f64::from(*f))),
        VariableValue::F64(f) => Ok(WireValue::Double(*f)),
        VariableValue::String(s) => Ok(WireValue::String(s.clone())),
        other => coerce_int::<i32>(other).map(WireValue::Int32),
    }
}

fn coerce_bool(value: &VariableValue) -> Result<bool, String> {
    match value {
        VariableValue::Bool(b) => Ok(*b),
        VariableValue::F32(f) => Ok(*f != 0.0),
        VariableValue::F64(f) => Ok(*f != 0.0),
        VariableValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(format!("'{s}' is not a boolean")),
        },
        other => Ok(other.as_integer().is_some_and(|i| i != 0)),
    }
}

fn coerce_int<T>(value: &VariableValue) -> Result<T, String>
where
    T: TryFrom<i128>,
{
    let wide: i128 = match value {
        VariableValue::Bool(b) => i128::from(*b),
        VariableValue::F32(f) => truncate_float(f64::from(*f))?,
        VariableValue::F64(f) => truncate_float(*f)?,
        VariableValue::String(s) => s
            .trim()
            .parse::<i128>()
            .map_err(|_| format!("'{s}' is not an integer"))?,
        other => other
            .as_integer()
            .ok_or_else(|| format!("{} is not numeric", other.kind()))?,
    };
    T::try_from(wide).map_err(|_| format!("{wide} is out of range"))
}

#[allow(clippy::cast_possible_truncation)]
fn truncate_float(f: f64) -> Result<i128, String> {
    if !f.is_finite() {
        return Err(format!("{f} has no integer value"));
    }
    // Saturating cast; the target-width range check rejects anything this big.
    Ok(f.trunc() as i128)
}

#[allow(clippy::cast_precision_loss)]
fn coerce_float(value: &VariableValue) -> Result<f64, String> {
    match value {
        VariableValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        VariableValue::F32(f) => Ok(f64::from(*f)),
        VariableValue::F64(f) => Ok(*f),
        VariableValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{s}' is not a number")),
        other => other
            .as_integer()
            .map(|i| i as f64)
            .ok_or_else(|| format!("{} is not numeric", other.kind())),
    }
}
