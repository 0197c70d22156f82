pub mod gateway_response;
pub mod notification;
pub mod payment_result;
pub mod result_code;
pub mod state_data;
pub mod transaction;

pub use gateway_response::GatewayResponse;
pub use notification::PaymentStateChangedPayload;
pub use payment_result::PaymentResultResponse;
pub use result_code::ResultCode;
pub use transaction::{CreateTransactionRequest, TransactionResponse, TransactionState};
