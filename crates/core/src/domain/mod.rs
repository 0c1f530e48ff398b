pub mod conversation;
pub mod price;
