//! Pure computations for loan timing and withdrawal fees.

pub mod fees;
pub mod loan_timing;

pub use fees::{
    calculate_early_exit_fee, calculate_net_amount_after_fee, is_in_warmup, FeeQuote,
};
pub use loan_timing::{
    compute_remaining_time, format_due_date, format_remaining_days, format_usd, Loan, LoanKind,
    RemainingTime,
};
