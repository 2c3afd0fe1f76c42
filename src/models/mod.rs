pub mod news;
pub mod order;
pub mod position;
pub mod user;

pub use news::News;
pub use order::Order;
pub use position::Position;
pub use user::User;
