//! Standard leaf handlers.
//!
//! Each handler reports argument problems as a 400 response rather than an
//! error; `Err` is reserved for genuinely unexpected faults, which the
//! dispatcher's fault boundary turns into 400 replies anyway.

mod build_info;
mod calculator;
mod pages;
mod quit;

pub use build_info::BuildInfoHandler;
pub use calculator::CalculatorHandler;
pub use pages::GetPagesHandler;
pub use quit::QuitHandler;
