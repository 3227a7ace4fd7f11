pub mod cropper;

pub use cropper::{BanknoteCropper, PendingReview, SessionSummary};
