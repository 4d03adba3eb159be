//! Newtype IDs for the shop's entities.
//!
//! Every table keyed by a `SERIAL` column gets its own ID type so a
//! `ProductId` can never be passed where a `CartId` is expected.

/// Define a type-safe `i32` ID wrapper.
///
/// The generated type is `Copy`, serializes as a bare integer, parses from a
/// path segment via `FromStr`, and (with the `postgres` feature) binds and
/// decodes as `INT4`, including `INT4[]` for `= ANY($1)` queries.
///
/// # Example
///
/// ```rust
/// # use bazaar_core::define_id;
/// define_id!(ShelfId);
/// define_id!(BinId);
///
/// let shelf = ShelfId::new(7);
/// assert_eq!(shelf.as_i32(), 7);
/// assert_eq!("7".parse::<ShelfId>().ok(), Some(shelf));
///
/// // Distinct types, so this won't compile:
/// // let _: BinId = shelf;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Wrap a raw database id.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// The raw database id.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i32>().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::postgres::PgHasArrayType for $name {
            fn array_type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::postgres::PgHasArrayType>::array_type_info()
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value).map(Self)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::core::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_id!(UserId);
define_id!(CategoryId);
define_id!(ProductId);
define_id!(CartId);
define_id!(CartItemId);
define_id!(CouponId);
define_id!(OrderId);
define_id!(OrderItemId);
define_id!(PaymentId);
define_id!(AddressId);
define_id!(WishlistId);
define_id!(WishlistItemId);
define_id!(ReviewId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_from_path_segment() {
        assert_eq!("42".parse::<ProductId>().unwrap(), ProductId::new(42));
        assert_eq!(" 3 ".parse::<OrderId>().unwrap(), OrderId::new(3));
        assert!("abc".parse::<ProductId>().is_err());
        assert!("".parse::<CartId>().is_err());
    }

    #[test]
    fn test_serializes_as_bare_integer() {
        let json = serde_json::to_string(&AddressId::new(9)).unwrap();
        assert_eq!(json, "9");
        let id: AddressId = serde_json::from_str("9").unwrap();
        assert_eq!(id, AddressId::new(9));
    }

    #[test]
    fn test_display() {
        assert_eq!(UserId::new(15).to_string(), "15");
    }
}
