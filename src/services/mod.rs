pub mod http;
pub mod invoice;

pub use http::HttpInvoiceService;
pub use invoice::InvoiceService;
