//! Scalar data descriptors: how one `always` field is laid out on the wire.

use crate::scope::FieldRef;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DataType {
    /// Bits that are skipped on decode and zeroed on encode.
    Ignore,
    Sint,
    Uint,
}

impl DataType {
    pub fn keyword(self) -> &'static str {
        match self {
            DataType::Ignore => "_",
            DataType::Sint => "sint",
            DataType::Uint => "uint",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Endianness {
    Big,
    Little,
}

/// Width unit. Byte order only exists for byte-granular widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Unit {
    Bits,
    Bytes(Option<Endianness>),
}

/// A literal size or one read at decode time from an earlier scalar field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Size {
    Literal(u64),
    Field(FieldRef),
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Size::Literal(n) => write!(f, "{}", n),
            Size::Field(r) => write!(f, "&{}", r.ident),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Width {
    pub count: Size,
    pub unit: Unit,
}

impl Width {
    pub fn bits(count: Size) -> Self {
        Width { count, unit: Unit::Bits }
    }

    pub fn bytes(count: Size, order: Option<Endianness>) -> Self {
        Width {
            count,
            unit: Unit::Bytes(order),
        }
    }
}

impl Default for Width {
    fn default() -> Self {
        Width::bytes(Size::Literal(1), None)
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            Unit::Bits => write!(f, "{} bits", self.count),
            Unit::Bytes(None) => write!(f, "{} bytes", self.count),
            Unit::Bytes(Some(Endianness::Big)) => write!(f, "{} bytes be", self.count),
            Unit::Bytes(Some(Endianness::Little)) => write!(f, "{} bytes le", self.count),
        }
    }
}

/// Encoding of one scalar field: type, element width and repetition count.
///
/// Defaults to one element one byte wide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Data {
    pub ty: DataType,
    pub width: Width,
    pub count: Size,
}

impl Data {
    pub fn new(ty: DataType) -> Self {
        Data {
            ty,
            width: Width::default(),
            count: Size::Literal(1),
        }
    }

    pub fn with_width(mut self, width: Width) -> Self {
        self.width = width;
        self
    }

    pub fn with_count(mut self, count: Size) -> Self {
        self.count = count;
        self
    }

    /// Width in bits of one element, when known statically.
    pub fn element_bits(&self) -> Option<u64> {
        match (&self.width.count, self.width.unit) {
            (Size::Literal(n), Unit::Bits) => Some(*n),
            (Size::Literal(n), Unit::Bytes(_)) => n.checked_mul(8),
            (Size::Field(_), _) => None,
        }
    }

    /// Fields this descriptor reads its sizes from.
    pub fn references(&self) -> impl Iterator<Item = &FieldRef> {
        [&self.width.count, &self.count]
            .into_iter()
            .filter_map(|s| match s {
                Size::Field(r) => Some(r),
                Size::Literal(_) => None,
            })
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.ty.keyword(), self.width)?;
        if self.count != Size::Literal(1) {
            write!(f, " : {}", self.count)?;
        }
        Ok(())
    }
}
