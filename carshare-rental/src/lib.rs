pub mod models;
pub mod fees;
pub mod messages;
pub mod notify;
pub mod lifecycle;
pub mod payments;
pub mod overdue;

pub use models::{
    CancelPaymentResponse, CreatePaymentSessionRequest, CreateRentalRequest, PaymentResponse,
    RentalResponse, ReturnRentalRequest,
};
pub use lifecycle::RentalService;
pub use payments::{CheckoutSettings, MockPaymentProvider, PaymentService};
pub use overdue::{next_run_after, OverdueSweep, SweepReport};
