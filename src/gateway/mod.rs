pub mod category;
pub mod dispatcher;
pub mod request;
pub mod shaper;
pub mod validator;

pub use category::{resolve_for_read, resolve_for_write, ReadOperation, RegisterCategory, WriteOperation};
pub use dispatcher::Gateway;
pub use request::{ReadRequest, WriteRequest};
pub use shaper::{ReadResult, RegisterReading, RegisterValue, WriteResult};
pub use validator::{validate_read, validate_write};
