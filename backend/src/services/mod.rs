//! Business logic services for the ERP backend

pub mod account;
pub mod auth;
pub mod customer;
pub mod employee;
pub mod ledger;
pub mod memo;
pub mod order;
pub mod product;
pub mod purchase;
pub mod reporting;
pub mod sale;

pub use account::AccountService;
pub use auth::AuthService;
pub use customer::CustomerService;
pub use employee::EmployeeService;
pub use order::OrderService;
pub use product::ProductService;
pub use purchase::PurchaseService;
pub use reporting::ReportingService;
pub use sale::SaleService;
