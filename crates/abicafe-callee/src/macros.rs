//! Helper macros for callee fixture generation.
//!
//! `callee_fn!` generates one `#[unsafe(no_mangle)] pub unsafe extern "C" fn`.
//! `wide_callees!` stamps out every wide-integer fixture once per
//! representation and builds the matching symbol table.

/// Generate an exported callee entry point.
///
/// ```ignore
/// callee_fn! {
///     /// Doc comment for the function.
///     fn abicafe_callee_example(a: u64, b: *const u64) -> u64 {
///         // body may dereference raw pointers
///     }
/// }
/// ```
macro_rules! callee_fn {
    (
        $(#[$meta:meta])*
        fn $name:ident( $($arg:ident : $argty:ty),* $(,)? ) -> $ret:ty
        $body:block
    ) => {
        $(#[$meta])*
        #[unsafe(no_mangle)]
        #[allow(unused_unsafe)]
        pub unsafe extern "C" fn $name( $($arg : $argty),* ) -> $ret {
            unsafe { $body }
        }
    };
}

/// Generate the wide-integer fixtures for each representation.
///
/// Each arm names the representation, its callee-side type, and the exported
/// symbol of every wide signature. Also defines `wide_symbols()`.
macro_rules! wide_callees {
    (
        $(
            $repr:ident => $wide:ty {
                six_args: $six:ident,
                by_ref: $by_ref:ident $(,)?
            }
        ),+ $(,)?
    ) => {
        $(
            callee_fn! {
                #[doc = concat!("`", stringify!($wide), "` callee for `i128_six_args`.")]
                fn $six(
                    a0: $wide,
                    a1: $wide,
                    a2: f32,
                    a3: $wide,
                    a4: u8,
                    a5: $wide,
                ) -> $wide {
                    $crate::fixtures::six_args_body::<$wide>(a0, a1, a2, a3, a4, a5)
                }
            }

            callee_fn! {
                #[doc = concat!("`", stringify!($wide), "` callee for `i128_by_ref`.")]
                fn $by_ref(a0: *const $wide, a1: *const $wide, a2: *const $wide) -> $wide {
                    $crate::fixtures::by_ref_body::<$wide>(a0, a1, a2)
                }
            }
        )+

        pub(crate) fn wide_symbols() -> Vec<abicafe_capture::CalleeSymbol> {
            use abicafe_capture::{CalleeSymbol, Representation};
            use $crate::fixtures::{I128_BY_REF, I128_SIX_ARGS};

            let mut out = Vec::new();
            $(
                // SAFETY: the generated function's parameters use the
                // representation's wide type in every wide position.
                out.push(unsafe {
                    CalleeSymbol::new(
                        stringify!($six),
                        I128_SIX_ARGS,
                        Representation::$repr,
                        $six as *const (),
                    )
                });
                // SAFETY: as above.
                out.push(unsafe {
                    CalleeSymbol::new(
                        stringify!($by_ref),
                        I128_BY_REF,
                        Representation::$repr,
                        $by_ref as *const (),
                    )
                });
            )+
            out
        }
    };
}
