//! Typed domain separators for trace digests.
//!
//! Every digest selects a domain via [`HashDomain`]. Adding a domain is one
//! line in the macro invocation below; the enum, `as_bytes()`, `ALL` and
//! `Display` are generated from it.

macro_rules! define_hash_domains {
    (
        $(
            $(#[$meta:meta])*
            $variant:ident => $bytes:expr
        ),+ $(,)?
    ) => {
        /// Typed domain separator for [`super::hash::canonical_hash`].
        ///
        /// Every variant maps to a unique, null-terminated byte string that is
        /// fed to SHA-256 ahead of the payload.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum HashDomain {
            $(
                $(#[$meta])*
                $variant,
            )+
        }

        impl HashDomain {
            /// The raw domain-separator bytes (null-terminated).
            #[must_use]
            pub const fn as_bytes(&self) -> &'static [u8] {
                match self {
                    $( Self::$variant => $bytes, )+
                }
            }

            /// All domain variants in declaration order.
            pub const ALL: &[HashDomain] = &[
                $( Self::$variant, )+
            ];
        }

        impl core::fmt::Display for HashDomain {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $( Self::$variant => write!(f, stringify!($variant)), )+
                }
            }
        }
    };
}

define_hash_domains! {
    /// Full event trace of one search run.
    SearchTrace => b"ARBOR::SEARCH_TRACE::V1\0",

    /// Search policy echo recorded in a trace header.
    SearchPolicy => b"ARBOR::SEARCH_POLICY::V1\0",

    /// A yielded solution (state/label sequence plus value).
    Solution => b"ARBOR::SOLUTION::V1\0",

    /// Harness run report (solutions, statistics, trace digest).
    RunReport => b"ARBOR::RUN_REPORT::V1\0",
}
