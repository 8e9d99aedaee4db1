//! Typed object ids.
//!
//! Every table in the engine hands out small integer ids. Each kind of object
//! gets its own newtype so a tree id cannot be passed where a buffer id is
//! expected. Absence is `Option::None`, never a magic value.

use std::fmt;

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl From<$name> for u32 {
            #[inline]
            fn from(id: $name) -> u32 {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

object_id!(
    /// A loaded renderlet module.
    RenderletId,
    "renderlet"
);

object_id!(
    /// A render tree built from one renderlet invocation.
    TreeId,
    "tree"
);

object_id!(
    /// A backend buffer or texture.
    BufferId,
    "buffer"
);

object_id!(
    /// A registered vector command list.
    VectorId,
    "vector"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_kind() {
        assert_eq!(TreeId::new(3).to_string(), "tree#3");
        assert_eq!(BufferId::new(0).to_string(), "buffer#0");
    }

    #[test]
    fn raw_round_trips() {
        let id = VectorId::new(42);
        assert_eq!(u32::from(id), 42);
    }
}
