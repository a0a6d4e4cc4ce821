#![allow(unused_macros)]

/// Helper macro for reading a snapshot handle
///
/// Snapshot handles only ever hold complete, immutable values, so a guard poisoned by a
/// panicking writer still protects consistent data and is recovered instead of propagated.
///
/// ```rust, ignore
///  let rows = read_lock!(self.rows).clone();
/// ```
macro_rules! read_lock {
    ($rwlock:expr) => {
        $rwlock
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Helper macro for swapping a snapshot handle
///
/// ```rust, ignore
///  *write_lock!(self.rows) = Some(Arc::new(rows));
/// ```
macro_rules! write_lock {
    ($rwlock:expr) => {
        $rwlock
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Checks an internal invariant
///
/// A broken invariant is a defect in this crate. Development and test builds stop right
/// there, release builds log the breach and carry on with a possibly less pretty layout.
///
/// ```rust, ignore
///  invariant!(lanes.len() == segments.len(), "row {} has {} lanes", index, lanes.len());
/// ```
macro_rules! invariant {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            let err = invariant_error!($($arg)*);
            debug_assert!(false, "{}", err);
            log::error!("{}", err);
        }
    };
}
