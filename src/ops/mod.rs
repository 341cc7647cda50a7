pub mod catalog;
pub mod check;
pub mod navigate;
pub mod search;
