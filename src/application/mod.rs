pub mod toolkit;
pub mod use_cases;

pub use toolkit::Toolkit;
