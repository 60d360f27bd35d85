//! The conformance probe: fixture functions invoked across the C ABI.
//!
//! Symbol names, the `opFunc` typedef, and the `simpleUnknownStruct` layout are
//! matched verbatim by binding layers under test and must not change.

use std::os::raw::{c_char, c_int};

use log::trace;

/// Binary integer operation passed by value across the boundary.
///
/// Contract: the pointer must be non-null and the pointee must match this
/// signature exactly. The probe performs no validation before invoking it.
#[allow(non_camel_case_types)]
pub type opFunc = extern "C" fn(c_int, c_int) -> c_int;

/// Fixed-layout record probed by [`validateStruct`].
///
/// The field order and widths (char, 32-bit float, int) are part of the
/// external contract; a binding layer must reproduce this exact sequence.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(non_camel_case_types)]
pub struct simpleUnknownStruct {
    pub a: c_char,
    pub b: f32,
    pub c: c_int,
}

/// Returns `a + b`, wrapping around on overflow.
#[unsafe(no_mangle)]
pub extern "C" fn add(a: c_int, b: c_int) -> c_int {
    let sum = a.wrapping_add(b);
    trace!("add({a}, {b}) -> {sum}");
    sum
}

/// Returns 1 when `a == b`, 0 otherwise.
#[unsafe(no_mangle)]
pub extern "C" fn check(a: c_int, b: c_int) -> c_int {
    let equal = a == b;
    trace!("check({a}, {b}) -> {equal}");
    equal as c_int
}

/// Writes `b` into the location referenced by `a`.
///
/// # Safety
///
/// `a` must be a valid, writable `int` location owned by the caller. Passing a
/// null or dangling pointer is undefined behavior; the probe does not check.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn set(a: *mut c_int, b: c_int) {
    trace!("set({a:p}, {b})");
    // Safety: caller guarantees a valid, writable location.
    unsafe {
        *a = b;
    }
}

/// Invokes `op(a, b)` and returns its result.
///
/// Exists to verify that a caller on the other side of a language boundary can
/// construct a function value this library can invoke.
///
/// # Safety
///
/// `op` must be a non-null pointer to a function matching the [`opFunc`]
/// signature exactly. No validation is performed.
#[unsafe(no_mangle)]
#[allow(non_snake_case)]
pub unsafe extern "C" fn runOpFunc(op: opFunc, a: c_int, b: c_int) -> c_int {
    let result = op(a, b);
    trace!("runOpFunc({:p}, {a}, {b}) -> {result}", op as *const ());
    result
}

/// Compares each field of `*s` against the given values, returning 1 on a full
/// match and 0 on any mismatch.
///
/// The float field is compared exactly, never with a tolerance; fixtures must
/// supply bit-identical values.
///
/// # Safety
///
/// `s` must be a non-null pointer to a readable [`simpleUnknownStruct`].
#[unsafe(no_mangle)]
#[allow(non_snake_case, clippy::float_cmp)]
pub unsafe extern "C" fn validateStruct(
    s: *const simpleUnknownStruct,
    a: c_char,
    b: f32,
    c: c_int,
) -> c_int {
    // Safety: caller guarantees a valid, readable record.
    let record = unsafe { &*s };
    let matched = record.a == a && record.b == b && record.c == c;
    trace!(
        "validateStruct({s:p}, {a}, {b}, {c}) -> {matched} (record: {}, {}, {})",
        record.a, record.b, record.c
    );
    matched as c_int
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use proptest::prelude::*;

    use super::*;

    extern "C" fn mul(a: c_int, b: c_int) -> c_int {
        a.wrapping_mul(b)
    }

    extern "C" fn sub(a: c_int, b: c_int) -> c_int {
        a.wrapping_sub(b)
    }

    fn record(a: char, b: f32, c: c_int) -> simpleUnknownStruct {
        simpleUnknownStruct {
            a: a as c_char,
            b,
            c,
        }
    }

    #[test]
    fn add_returns_sum() {
        assert_eq!(add(2, 3), 5);
        assert_eq!(add(-4, 4), 0);
    }

    #[test]
    fn add_wraps_on_overflow() {
        assert_eq!(add(c_int::MAX, 1), c_int::MIN);
        assert_eq!(add(c_int::MIN, -1), c_int::MAX);
    }

    #[test]
    fn check_reports_equality() {
        assert_eq!(check(7, 7), 1);
        assert_eq!(check(7, 8), 0);
    }

    #[test]
    fn set_overwrites_prior_value() {
        let mut x: c_int = 7;
        unsafe { set(&mut x, 42) };
        assert_eq!(x, 42);
        unsafe { set(&mut x, -1) };
        assert_eq!(x, -1);
    }

    #[test]
    fn run_op_func_delegates_to_add() {
        assert_eq!(unsafe { runOpFunc(add, 2, 3) }, 5);
    }

    #[test]
    fn run_op_func_invokes_the_supplied_operation() {
        assert_eq!(unsafe { runOpFunc(mul, 6, 7) }, 42);
        assert_eq!(unsafe { runOpFunc(sub, 10, 4) }, 6);
    }

    #[test]
    fn validate_struct_accepts_matching_fields() {
        let r = record('x', 1.5, 42);
        assert_eq!(unsafe { validateStruct(&r, 'x' as c_char, 1.5, 42) }, 1);
    }

    #[test]
    fn validate_struct_rejects_each_field_mismatch() {
        let r = record('x', 1.5, 42);
        assert_eq!(unsafe { validateStruct(&r, 'y' as c_char, 1.5, 42) }, 0);
        assert_eq!(unsafe { validateStruct(&r, 'x' as c_char, 2.5, 42) }, 0);
        assert_eq!(unsafe { validateStruct(&r, 'x' as c_char, 1.5, 43) }, 0);
    }

    #[test]
    fn validate_struct_float_comparison_is_exact() {
        let r = record('x', 1.5, 42);
        assert_eq!(unsafe { validateStruct(&r, 'x' as c_char, 1.500_01, 42) }, 0);
    }

    #[test]
    fn struct_layout_matches_the_declared_field_order() {
        let r = record('x', 1.5, 42);
        let base = ptr::from_ref(&r).cast::<u8>();
        let a_offset = ptr::from_ref(&r.a).cast::<u8>() as usize - base as usize;
        let b_offset = ptr::from_ref(&r.b).cast::<u8>() as usize - base as usize;
        let c_offset = ptr::from_ref(&r.c).cast::<u8>() as usize - base as usize;
        assert_eq!(a_offset, 0);
        assert!(a_offset < b_offset && b_offset < c_offset);
    }

    proptest! {
        #[test]
        fn add_matches_wrapping_sum(a in any::<i32>(), b in any::<i32>()) {
            prop_assert_eq!(add(a, b), a.wrapping_add(b));
        }

        #[test]
        fn check_matches_native_equality(a in any::<i32>(), b in any::<i32>()) {
            prop_assert_eq!(check(a, b), (a == b) as c_int);
        }

        #[test]
        fn set_stores_regardless_of_prior_value(prior in any::<i32>(), b in any::<i32>()) {
            let mut x = prior;
            unsafe { set(&mut x, b) };
            prop_assert_eq!(x, b);
        }

        #[test]
        fn run_op_func_is_plain_delegation(a in any::<i32>(), b in any::<i32>()) {
            prop_assert_eq!(unsafe { runOpFunc(sub, a, b) }, a.wrapping_sub(b));
        }

        #[test]
        fn validate_struct_iff_all_fields_match(
            a in any::<i8>(),
            b in proptest::num::f32::NORMAL,
            c in any::<i32>(),
            a2 in any::<i8>(),
            b2 in proptest::num::f32::NORMAL,
            c2 in any::<i32>(),
        ) {
            let r = simpleUnknownStruct { a: a as c_char, b, c };
            let expected = a == a2 && b == b2 && c == c2;
            let result = unsafe { validateStruct(&r, a2 as c_char, b2, c2) };
            prop_assert_eq!(result, expected as c_int);
        }

        #[test]
        fn pure_operations_are_idempotent(a in any::<i32>(), b in any::<i32>()) {
            prop_assert_eq!(add(a, b), add(a, b));
            prop_assert_eq!(check(a, b), check(a, b));
            prop_assert_eq!(
                unsafe { runOpFunc(mul, a, b) },
                unsafe { runOpFunc(mul, a, b) }
            );
        }
    }
}
