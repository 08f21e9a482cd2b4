//! Paylink utils

/// Return early with `$err` when `$cond` does not hold
#[macro_export]
macro_rules! ensure_paylink {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}
