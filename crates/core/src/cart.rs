//! Cart quantity rules.

/// Errors from cart quantity changes.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartError {
    /// A line cannot hold fewer than one unit; remove it instead.
    #[error("quantity cannot go below {min}")]
    BelowMinimum { min: u32 },
}

/// Smallest quantity a cart line may hold.
pub const MIN_QUANTITY: u32 = 1;

/// A requested change to a line's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    Increment,
    Decrement,
    Set(u32),
}

/// Quantity resulting from applying `change` to `current`.
///
/// # Errors
///
/// Returns [`CartError::BelowMinimum`] if the result would be below one.
pub const fn next_quantity(current: u32, change: QuantityChange) -> Result<u32, CartError> {
    let next = match change {
        QuantityChange::Increment => current.saturating_add(1),
        QuantityChange::Decrement => current.saturating_sub(1),
        QuantityChange::Set(quantity) => quantity,
    };
    if next < MIN_QUANTITY {
        Err(CartError::BelowMinimum { min: MIN_QUANTITY })
    } else {
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decrement_from_one_rejected() {
        assert_eq!(
            next_quantity(1, QuantityChange::Decrement),
            Err(CartError::BelowMinimum { min: 1 })
        );
        assert_eq!(next_quantity(2, QuantityChange::Decrement), Ok(1));
    }

    #[test]
    fn test_set_and_increment() {
        assert_eq!(next_quantity(3, QuantityChange::Increment), Ok(4));
        assert_eq!(next_quantity(3, QuantityChange::Set(10)), Ok(10));
        assert!(next_quantity(3, QuantityChange::Set(0)).is_err());
        assert_eq!(next_quantity(u32::MAX, QuantityChange::Increment), Ok(u32::MAX));
    }

    proptest! {
        #[test]
        fn prop_decrement_never_goes_below_one(start in 1u32..10_000, presses in 0usize..50) {
            let mut quantity = start;
            for _ in 0..presses {
                if let Ok(next) = next_quantity(quantity, QuantityChange::Decrement) {
                    quantity = next;
                }
                prop_assert!(quantity >= MIN_QUANTITY);
            }
        }
    }
}
