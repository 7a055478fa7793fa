//! The numeric shape lattice.
//!
//! Six shapes partially ordered by generality: Long < Signed Long, Long <
//! Double < Double-with-Exponent, with signedness orthogonal. Promotion of
//! two shapes is their join, computed field-wise at compile time rather
//! than through any runtime lookup.

/// One point in the numeric lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NumericShape {
    /// A leading minus sign was observed.
    pub signed: bool,
    /// A decimal separator was observed.
    pub decimal: bool,
    /// An exponent suffix was observed (implies decimal generality).
    pub exponent: bool,
}

/// Pattern for an unsigned integer.
pub const LONG_PATTERN: &str = "\\d+";
/// Pattern for a signed integer.
pub const SIGNED_LONG_PATTERN: &str = "-?\\d+";
/// Pattern for an unsigned decimal number.
pub const DOUBLE_PATTERN: &str = "\\.\\d+|\\d+(\\.\\d+)?";
/// Pattern for a signed decimal number.
pub const SIGNED_DOUBLE_PATTERN: &str = "-?\\.\\d+|-?\\d+(\\.\\d+)?";
/// Pattern for an unsigned decimal with optional exponent.
pub const DOUBLE_EXPONENT_PATTERN: &str = "(\\.\\d+|\\d+(\\.\\d+)?)([eE][-+]?\\d+)?";
/// Pattern for a signed decimal with optional exponent.
pub const SIGNED_DOUBLE_EXPONENT_PATTERN: &str = "-?(\\.\\d+|\\d+(\\.\\d+)?)([eE][-+]?\\d+)?";

impl NumericShape {
    pub const LONG: NumericShape = NumericShape {
        signed: false,
        decimal: false,
        exponent: false,
    };
    pub const SIGNED_LONG: NumericShape = NumericShape {
        signed: true,
        decimal: false,
        exponent: false,
    };
    pub const DOUBLE: NumericShape = NumericShape {
        signed: false,
        decimal: true,
        exponent: false,
    };
    pub const SIGNED_DOUBLE: NumericShape = NumericShape {
        signed: true,
        decimal: true,
        exponent: false,
    };
    pub const DOUBLE_EXPONENT: NumericShape = NumericShape {
        signed: false,
        decimal: true,
        exponent: true,
    };
    pub const SIGNED_DOUBLE_EXPONENT: NumericShape = NumericShape {
        signed: true,
        decimal: true,
        exponent: true,
    };

    /// Join of two shapes: the least shape at or above both.
    pub const fn promote(self, other: NumericShape) -> NumericShape {
        let exponent = self.exponent || other.exponent;
        NumericShape {
            signed: self.signed || other.signed,
            decimal: self.decimal || other.decimal || exponent,
            exponent,
        }
    }

    /// The registered pattern string for this shape.
    pub const fn pattern(&self) -> &'static str {
        match (self.signed, self.decimal, self.exponent) {
            (false, false, _) => LONG_PATTERN,
            (true, false, _) => SIGNED_LONG_PATTERN,
            (false, true, false) => DOUBLE_PATTERN,
            (true, true, false) => SIGNED_DOUBLE_PATTERN,
            (false, true, true) => DOUBLE_EXPONENT_PATTERN,
            (true, true, true) => SIGNED_DOUBLE_EXPONENT_PATTERN,
        }
    }

    /// The shape with signedness erased to signed (most general sign form).
    pub const fn signed_form(&self) -> NumericShape {
        NumericShape {
            signed: true,
            decimal: self.decimal,
            exponent: self.exponent,
        }
    }

    /// Look a registered numeric pattern back up as a shape.
    pub fn from_pattern(pattern: &str) -> Option<NumericShape> {
        match pattern {
            LONG_PATTERN => Some(Self::LONG),
            SIGNED_LONG_PATTERN => Some(Self::SIGNED_LONG),
            DOUBLE_PATTERN => Some(Self::DOUBLE),
            SIGNED_DOUBLE_PATTERN => Some(Self::SIGNED_DOUBLE),
            DOUBLE_EXPONENT_PATTERN => Some(Self::DOUBLE_EXPONENT),
            SIGNED_DOUBLE_EXPONENT_PATTERN => Some(Self::SIGNED_DOUBLE_EXPONENT),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [NumericShape; 6] = [
        NumericShape::LONG,
        NumericShape::SIGNED_LONG,
        NumericShape::DOUBLE,
        NumericShape::SIGNED_DOUBLE,
        NumericShape::DOUBLE_EXPONENT,
        NumericShape::SIGNED_DOUBLE_EXPONENT,
    ];

    #[test]
    fn test_promotions() {
        assert_eq!(
            NumericShape::LONG.promote(NumericShape::SIGNED_LONG),
            NumericShape::SIGNED_LONG
        );
        assert_eq!(
            NumericShape::LONG.promote(NumericShape::DOUBLE),
            NumericShape::DOUBLE
        );
        assert_eq!(
            NumericShape::SIGNED_LONG.promote(NumericShape::DOUBLE),
            NumericShape::SIGNED_DOUBLE
        );
        assert_eq!(
            NumericShape::SIGNED_LONG.promote(NumericShape::DOUBLE_EXPONENT),
            NumericShape::SIGNED_DOUBLE_EXPONENT
        );
        assert_eq!(
            NumericShape::LONG.promote(NumericShape::DOUBLE_EXPONENT),
            NumericShape::DOUBLE_EXPONENT
        );
    }

    #[test]
    fn test_promotion_is_idempotent_and_commutative() {
        for a in ALL {
            assert_eq!(a.promote(a), a);
            for b in ALL {
                assert_eq!(a.promote(b), b.promote(a));
            }
        }
    }

    #[test]
    fn test_pattern_round_trip() {
        for shape in ALL {
            assert_eq!(NumericShape::from_pattern(shape.pattern()), Some(shape));
        }
        assert_eq!(NumericShape::from_pattern("\\p{Alpha}+"), None);
    }
}
